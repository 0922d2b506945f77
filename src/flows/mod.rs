pub mod accounts;
pub mod gas;

pub use accounts::AccountSwitcher;
pub use gas::{FeeContext, GasFeeSelector, InputWarning, TierQuote};

use crate::error::GasdeckError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Re-entrancy latch for the async operations. A second trigger while one is
/// running is rejected rather than queued, and the latch releases even if the
/// operation's future is dropped mid-flight.
pub(crate) struct OpGuard<'a>(&'a AtomicBool);

impl<'a> OpGuard<'a> {
    pub(crate) fn acquire(
        flag: &'a AtomicBool,
        operation: &'static str,
    ) -> Result<Self, GasdeckError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GasdeckError::RequestInFlight(operation));
        }
        Ok(Self(flag))
    }
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
