pub mod error;
pub mod ledger;
pub mod round;
pub mod shareholder;
pub mod snapshot;
