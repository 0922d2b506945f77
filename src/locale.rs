//! User-facing strings live behind a trait so hosts can plug in their own
//! translation catalogs. The engine only ever refers to messages by key.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    GasFeeSlow,
    GasFeeAverage,
    GasFeeFast,
    GasPriceLabel,
    GasLimitLabel,
    AdvancedOptions,
    HideAdvancedOptions,
    LoadingEstimates,
    EstimatesUnavailable,
    WarnGasPriceMalformed,
    WarnGasLimitMalformed,
    WarnGasLimitBelowIntrinsic,
    AccountsTitle,
    CreateNewAccount,
    UnitEth,
}

pub trait Localizer: Send + Sync {
    fn text(&self, key: MessageKey) -> String;
}

/// Built-in English catalog, also the fallback for hosts without one.
pub struct EnglishCatalog;

impl Localizer for EnglishCatalog {
    fn text(&self, key: MessageKey) -> String {
        let text = match key {
            MessageKey::GasFeeSlow => "Safe Low",
            MessageKey::GasFeeAverage => "Average",
            MessageKey::GasFeeFast => "Fast",
            MessageKey::GasPriceLabel => "Gas Price (GWEI)",
            MessageKey::GasLimitLabel => "Gas Limit",
            MessageKey::AdvancedOptions => "Advanced Options",
            MessageKey::HideAdvancedOptions => "Hide Advanced Options",
            MessageKey::LoadingEstimates => "Loading gas estimates...",
            MessageKey::EstimatesUnavailable => "Gas estimates are unavailable",
            MessageKey::WarnGasPriceMalformed => "Gas price must be a number in GWEI",
            MessageKey::WarnGasLimitMalformed => "Gas limit must be a whole number",
            MessageKey::WarnGasLimitBelowIntrinsic => {
                "Gas limit is below the 21000 a transfer needs"
            }
            MessageKey::AccountsTitle => "Accounts",
            MessageKey::CreateNewAccount => "Create New Account",
            MessageKey::UnitEth => "ETH",
        };
        text.to_string()
    }
}
