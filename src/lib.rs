//! # cap-table-engine
//!
//! Cap table evolution and liquidation waterfall engine for venture
//! financing rounds.
//!
//! Given a founding share count and an ordered list of priced rounds,
//! this engine folds the rounds into a history of immutable cap table
//! snapshots and distributes an exit valuation across the final table.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: round terms, shareholders, snapshots, ledger
//! - **dilution**: Option pool, anti-dilution, pro-rata and the round processor
//! - **exit**: Liquidation waterfall and summary metrics
//! - **simulation**: Random financing histories for stress testing

pub mod core;
pub mod dilution;
pub mod exit;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::error::{DomainError, ValidationError};
    pub use crate::core::ledger::{compute_cap_table, CapTableError, CapTableLedger};
    pub use crate::core::round::{AntiDilution, PoolTiming, RoundTerms};
    pub use crate::core::shareholder::{ShareClass, Shareholder, FOUNDERS, OPTION_POOL};
    pub use crate::core::snapshot::CapTableSnapshot;
    pub use crate::exit::summary::CapTableSummary;
    pub use crate::exit::waterfall::{
        compute_liquidation, LiquidationWaterfallEngine, WaterfallResult, WaterfallTier,
    };
}
