//! Headless presentation engines for a mobile Ethereum wallet: gas fee
//! selection with a manual price/limit editor, and keyring-backed account
//! switching. Chain access is injected behind the traits in [`services`].

pub mod config;
pub mod error;
pub mod flows;
pub mod locale;
pub mod models;
pub mod services;
pub mod units;

pub use error::GasdeckError;
pub use flows::{AccountSwitcher, FeeContext, GasFeeSelector};
pub use models::FeeSelection;
