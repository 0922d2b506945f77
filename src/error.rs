use thiserror::Error;

#[derive(Error, Debug)]
pub enum GasdeckError {
    #[error("invalid gas price {input:?}: expected a non-negative decimal gwei amount")]
    InvalidGasPrice { input: String },

    #[error("invalid gas limit {input:?}: expected a non-negative integer")]
    InvalidGasLimit { input: String },

    #[error("gas estimates have not been fetched yet")]
    EstimatesNotReady,

    #[error("estimate feed returned malformed data: {0}")]
    MalformedEstimate(String),

    #[error("estimate feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("another {0} request is already in flight")]
    RequestInFlight(&'static str),

    #[error("no account at index {0}")]
    UnknownAccountIndex(usize),

    #[error("account backend rejected the request: {0}")]
    Backend(String),

    #[error("tier selection is unavailable while the advanced editor is open")]
    AdvancedEditorOpen,

    #[error("custom gas fields require the advanced editor")]
    AdvancedEditorClosed,

    #[error("fee computation overflowed")]
    FeeOverflow,
}

impl GasdeckError {
    /// Whether the operation may simply be retried once the current one settles.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RequestInFlight(_) | Self::Http(_))
    }
}
