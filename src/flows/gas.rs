//! Fee selection for an outgoing transaction: three estimate tiers, a manual
//! price/limit editor, and a single atomically updated `FeeSelection` output.

use super::OpGuard;
use crate::error::GasdeckError;
use crate::locale::{Localizer, MessageKey};
use crate::models::{EstimateStatus, FeeSelection, GasEstimateSnapshot, Selection, Tier};
use crate::services::GasEstimator;
use crate::units::{self, INTRINSIC_TX_GAS};
use ethers::types::U256;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

pub const DEFAULT_TICKER: &str = "ETH";

/// Manual price field starts at a sane mid-range value so the editor never
/// opens on an empty input.
const DEFAULT_CUSTOM_GAS_PRICE_GWEI: &str = "10";

/// Why a manual field is currently flagged. `Malformed` means the last edit
/// was rejected and the field kept its prior value; `BelowIntrinsic` is
/// advisory only, the value was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputWarning {
    Malformed,
    BelowIntrinsic,
}

impl InputWarning {
    fn price_key(self) -> MessageKey {
        match self {
            InputWarning::Malformed => MessageKey::WarnGasPriceMalformed,
            InputWarning::BelowIntrinsic => MessageKey::WarnGasLimitBelowIntrinsic,
        }
    }

    fn limit_key(self) -> MessageKey {
        match self {
            InputWarning::Malformed => MessageKey::WarnGasLimitMalformed,
            InputWarning::BelowIntrinsic => MessageKey::WarnGasLimitBelowIntrinsic,
        }
    }
}

/// Per-transaction inputs the host supplies at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeContext {
    /// Gas limit estimated for the transaction by the host. Stays the source
    /// of truth for tier emissions and reseeds the editable copy.
    pub gas_limit: U256,
    pub ticker: String,
    pub conversion_rate: Option<f64>,
    pub fiat_currency: String,
}

impl FeeContext {
    pub fn new(gas_limit: U256) -> Self {
        Self {
            gas_limit,
            ticker: DEFAULT_TICKER.to_string(),
            conversion_rate: None,
            fiat_currency: "usd".to_string(),
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        let ticker = ticker.into();
        self.ticker = if ticker.is_empty() {
            DEFAULT_TICKER.to_string()
        } else {
            ticker
        };
        self
    }

    pub fn with_conversion_rate(mut self, rate: f64) -> Self {
        self.conversion_rate = Some(rate);
        self
    }

    pub fn with_fiat_currency(mut self, currency: impl Into<String>) -> Self {
        self.fiat_currency = currency.into();
        self
    }
}

/// One tier rendered for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TierQuote {
    pub tier: Tier,
    pub label: String,
    pub wait_text: String,
    pub native_fee_text: String,
    pub fiat_fee_text: Option<String>,
}

struct SelectorState {
    snapshot: Option<GasEstimateSnapshot>,
    status: EstimateStatus,
    /// Remembered across editor round trips; restored when the editor closes.
    selected_tier: Tier,
    advanced: bool,
    /// Invariant: both fields always hold the last accepted, parseable text.
    custom_price: String,
    custom_limit: String,
    price_warning: Option<InputWarning>,
    limit_warning: Option<InputWarning>,
    context: FeeContext,
    last_fee: Option<FeeSelection>,
}

pub struct GasFeeSelector {
    estimator: Arc<dyn GasEstimator>,
    localizer: Arc<dyn Localizer>,
    state: Mutex<SelectorState>,
    refreshing: AtomicBool,
    fee_tx: watch::Sender<Option<FeeSelection>>,
}

impl GasFeeSelector {
    pub fn new(
        estimator: Arc<dyn GasEstimator>,
        localizer: Arc<dyn Localizer>,
        context: FeeContext,
    ) -> Self {
        // Tier estimates only price the native asset. Paying fees in anything
        // else sends the user straight to the manual editor.
        let advanced = context.ticker != DEFAULT_TICKER;
        let custom_limit = context.gas_limit.to_string();
        let (fee_tx, _) = watch::channel(None);
        Self {
            estimator,
            localizer,
            state: Mutex::new(SelectorState {
                snapshot: None,
                status: EstimateStatus::Pending,
                selected_tier: Tier::Average,
                advanced,
                custom_price: DEFAULT_CUSTOM_GAS_PRICE_GWEI.to_string(),
                custom_limit,
                price_warning: None,
                limit_warning: None,
                context,
                last_fee: None,
            }),
            refreshing: AtomicBool::new(false),
            fee_tx,
        }
    }

    /// Fetches a fresh estimate snapshot. A failed refresh keeps any earlier
    /// snapshot usable; only a first-ever failure flags the tiers unavailable.
    pub async fn refresh_estimates(&self) -> Result<GasEstimateSnapshot, GasdeckError> {
        let _guard = OpGuard::acquire(&self.refreshing, "estimate refresh")?;
        match self.estimator.fetch_estimates().await {
            Ok(snapshot) => {
                let mut state = self.state.lock();
                state.snapshot = Some(snapshot.clone());
                state.status = EstimateStatus::Ready;
                Ok(snapshot)
            }
            Err(err) => {
                let mut state = self.state.lock();
                if state.snapshot.is_some() {
                    warn!("Gas estimate refresh failed, keeping previous snapshot: {err}");
                } else {
                    state.status = EstimateStatus::Unavailable;
                    warn!("Gas estimate fetch failed with nothing to fall back on: {err}");
                }
                Err(err)
            }
        }
    }

    /// Picks one of the preset tiers and emits `(external limit, tier price)`.
    /// The tapped price is mirrored into the manual price field so the editor
    /// opens on the same value.
    pub fn select_tier(&self, tier: Tier) -> Result<FeeSelection, GasdeckError> {
        let mut state = self.state.lock();
        if state.advanced {
            return Err(GasdeckError::AdvancedEditorOpen);
        }
        let price_wei = state
            .snapshot
            .as_ref()
            .ok_or(GasdeckError::EstimatesNotReady)?
            .tier(tier)
            .price_wei;
        state.selected_tier = tier;
        state.custom_price = units::format_gwei(price_wei);
        state.price_warning = None;
        let fee = FeeSelection {
            gas_limit: state.context.gas_limit,
            gas_price_wei: price_wei,
        };
        self.commit(&mut state, fee);
        Ok(fee)
    }

    /// Opens or closes the manual editor. Opening reseeds the limit field
    /// from the external estimate and emits the custom pair; closing re-emits
    /// whichever tier was last active.
    pub fn toggle_advanced(&self) -> Result<FeeSelection, GasdeckError> {
        let mut state = self.state.lock();
        let fee = if state.advanced {
            let price_wei = state
                .snapshot
                .as_ref()
                .ok_or(GasdeckError::EstimatesNotReady)?
                .tier(state.selected_tier)
                .price_wei;
            state.advanced = false;
            FeeSelection {
                gas_limit: state.context.gas_limit,
                gas_price_wei: price_wei,
            }
        } else {
            // Parse before touching any field; a rejected toggle must leave
            // the selector exactly as it was.
            let price_wei = units::parse_gwei(&state.custom_price)?;
            state.custom_limit = state.context.gas_limit.to_string();
            state.limit_warning = limit_advisory(state.context.gas_limit);
            state.price_warning = None;
            state.advanced = true;
            FeeSelection {
                gas_limit: state.context.gas_limit,
                gas_price_wei: price_wei,
            }
        };
        self.commit(&mut state, fee);
        Ok(fee)
    }

    /// Applies a manual gas price in gwei. Rejected input flags the field and
    /// leaves both the stored value and the emitted fee untouched.
    pub fn set_custom_gas_price(&self, input: &str) -> Result<FeeSelection, GasdeckError> {
        let mut state = self.state.lock();
        if !state.advanced {
            return Err(GasdeckError::AdvancedEditorClosed);
        }
        let price_wei = match units::parse_gwei(input) {
            Ok(wei) => wei,
            Err(err) => {
                state.price_warning = Some(InputWarning::Malformed);
                return Err(err);
            }
        };
        state.custom_price = input.trim().to_string();
        state.price_warning = None;
        let gas_limit = units::parse_gas_limit(&state.custom_limit)?;
        let fee = FeeSelection {
            gas_limit,
            gas_price_wei: price_wei,
        };
        self.commit(&mut state, fee);
        Ok(fee)
    }

    /// Applies a manual gas limit in units of gas. A limit below the plain
    /// transfer minimum is accepted with an advisory warning.
    pub fn set_custom_gas_limit(&self, input: &str) -> Result<FeeSelection, GasdeckError> {
        let mut state = self.state.lock();
        if !state.advanced {
            return Err(GasdeckError::AdvancedEditorClosed);
        }
        let gas_limit = match units::parse_gas_limit(input) {
            Ok(limit) => limit,
            Err(err) => {
                state.limit_warning = Some(InputWarning::Malformed);
                return Err(err);
            }
        };
        state.custom_limit = input.trim().to_string();
        state.limit_warning = limit_advisory(gas_limit);
        let price_wei = units::parse_gwei(&state.custom_price)?;
        let fee = FeeSelection {
            gas_limit,
            gas_price_wei: price_wei,
        };
        self.commit(&mut state, fee);
        Ok(fee)
    }

    /// Host-side gas limit re-estimate. Updates the source of truth and, while
    /// the editor is open, resyncs the editable copy. Never emits; the flow is
    /// strictly one-way from the host into the fields.
    pub fn set_gas_limit(&self, gas_limit: U256) {
        let mut state = self.state.lock();
        let changed = state.context.gas_limit != gas_limit;
        state.context.gas_limit = gas_limit;
        if state.advanced && changed {
            state.custom_limit = gas_limit.to_string();
            state.limit_warning = limit_advisory(gas_limit);
        }
    }

    pub fn set_conversion_rate(&self, rate: Option<f64>) {
        self.state.lock().context.conversion_rate = rate;
    }

    pub fn set_fiat_currency(&self, currency: impl Into<String>) {
        self.state.lock().context.fiat_currency = currency.into();
    }

    /// Renders one tier for display, priced against the external gas limit.
    pub fn quote(&self, tier: Tier) -> Result<TierQuote, GasdeckError> {
        let state = self.state.lock();
        let estimate = state
            .snapshot
            .as_ref()
            .ok_or(GasdeckError::EstimatesNotReady)?
            .tier(tier)
            .clone();
        let total = FeeSelection {
            gas_limit: state.context.gas_limit,
            gas_price_wei: estimate.price_wei,
        }
        .total_fee_wei()?;
        let label = self.localizer.text(match tier {
            Tier::Slow => MessageKey::GasFeeSlow,
            Tier::Average => MessageKey::GasFeeAverage,
            Tier::Fast => MessageKey::GasFeeFast,
        });
        Ok(TierQuote {
            tier,
            label,
            wait_text: units::format_wait(estimate.wait),
            native_fee_text: format!("{} {}", units::format_eth(total), state.context.ticker),
            fiat_fee_text: state
                .context
                .conversion_rate
                .map(|rate| units::fiat_fee_text(total, rate, &state.context.fiat_currency)),
        })
    }

    /// Total of the currently emitted fee, or `None` before the first
    /// emission or on overflow.
    pub fn total_fee_text(&self) -> Option<String> {
        let state = self.state.lock();
        let total = state.last_fee?.total_fee_wei().ok()?;
        Some(format!(
            "{} {}",
            units::format_eth(total),
            state.context.ticker
        ))
    }

    /// Placeholder line while tiers cannot be shown, `None` once ready.
    pub fn status_text(&self) -> Option<String> {
        match self.state.lock().status {
            EstimateStatus::Pending => Some(self.localizer.text(MessageKey::LoadingEstimates)),
            EstimateStatus::Unavailable => {
                Some(self.localizer.text(MessageKey::EstimatesUnavailable))
            }
            EstimateStatus::Ready => None,
        }
    }

    pub fn advanced_toggle_label(&self) -> String {
        if self.is_advanced() {
            self.localizer.text(MessageKey::HideAdvancedOptions)
        } else {
            self.localizer.text(MessageKey::AdvancedOptions)
        }
    }

    pub fn status(&self) -> EstimateStatus {
        self.state.lock().status
    }

    pub fn snapshot(&self) -> Option<GasEstimateSnapshot> {
        self.state.lock().snapshot.clone()
    }

    pub fn selection(&self) -> Selection {
        let state = self.state.lock();
        if state.advanced {
            Selection::Custom
        } else {
            Selection::Tier(state.selected_tier)
        }
    }

    pub fn is_advanced(&self) -> bool {
        self.state.lock().advanced
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    pub fn custom_gas_price(&self) -> String {
        self.state.lock().custom_price.clone()
    }

    pub fn custom_gas_limit(&self) -> String {
        self.state.lock().custom_limit.clone()
    }

    pub fn gas_price_warning(&self) -> Option<InputWarning> {
        self.state.lock().price_warning
    }

    pub fn gas_limit_warning(&self) -> Option<InputWarning> {
        self.state.lock().limit_warning
    }

    pub fn gas_price_warning_text(&self) -> Option<String> {
        self.gas_price_warning()
            .map(|warning| self.localizer.text(warning.price_key()))
    }

    pub fn gas_limit_warning_text(&self) -> Option<String> {
        self.gas_limit_warning()
            .map(|warning| self.localizer.text(warning.limit_key()))
    }

    /// Latest emitted fee, `None` until the first user action.
    pub fn fee(&self) -> Option<FeeSelection> {
        self.state.lock().last_fee
    }

    /// Watch the emitted fee. Only the latest value is retained; hosts that
    /// miss intermediate updates still converge on the current pair.
    pub fn subscribe(&self) -> watch::Receiver<Option<FeeSelection>> {
        self.fee_tx.subscribe()
    }

    fn commit(&self, state: &mut SelectorState, fee: FeeSelection) {
        state.last_fee = Some(fee);
        self.fee_tx.send_replace(Some(fee));
    }
}

fn limit_advisory(gas_limit: U256) -> Option<InputWarning> {
    if gas_limit < U256::from(INTRINSIC_TX_GAS) {
        Some(InputWarning::BelowIntrinsic)
    } else {
        None
    }
}
