pub mod accounts;
pub mod estimator;

pub use accounts::{AccountService, InMemoryAccounts};
pub use estimator::{GasEstimator, HttpGasEstimator};
