pub mod account;
pub mod gas;

pub use account::*;
pub use gas::*;
