use rust_decimal::Decimal;
use thiserror::Error;

/// Malformed inputs, rejected before they reach the ledger.
///
/// Nothing is ever coerced into range: a round carrying any of these
/// problems is refused and the ledger keeps its last valid state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("round name must not be empty")]
    EmptyName,
    #[error("'{0}' is reserved for a built-in shareholder")]
    ReservedName(String),
    #[error("a round named '{0}' already exists")]
    DuplicateName(String),
    #[error("investment must be positive, got {0}")]
    NonPositiveInvestment(Decimal),
    #[error("pre-money valuation must be positive, got {0}")]
    NonPositiveValuation(Decimal),
    #[error("post-money valuation of {pre_money} + {investment} is not representable")]
    ValuationOverflow { pre_money: Decimal, investment: Decimal },
    #[error("option pool percent must be within 0-100, got {0}")]
    OptionPoolOutOfRange(Decimal),
    #[error("a pre-money option pool of {0}% cannot be sized (100% leaves no room for existing shares)")]
    OptionPoolSingularity(Decimal),
    #[error("liquidation preference must be at least 1x, got {0}")]
    InvalidLiquidationPreference(Decimal),
    #[error("participation cap must be at least 1x, got {0}")]
    InvalidParticipationCap(Decimal),
    #[error("founding share count must be positive, got {0}")]
    NonPositiveFoundingShares(Decimal),
    #[error("exit valuation must not be negative, got {0}")]
    NegativeExitValuation(Decimal),
}

/// Arithmetic singularities hit while processing a round.
///
/// Fatal to the round being processed; no snapshot is produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("pre-money share count must be positive, got {0}")]
    NonPositivePreMoneyShares(Decimal),
    #[error("share price must be positive, got {0}")]
    NonPositiveSharePrice(Decimal),
    #[error("option pool of {0}% cannot be allocated pre-money")]
    OptionPoolSingularity(Decimal),
    #[error("anti-dilution conversion price for '{holder}' must be positive, got {price}")]
    NonPositiveConversionPrice { holder: String, price: Decimal },
    #[error("arithmetic overflow computing {step}")]
    ArithmeticOverflow { step: &'static str },
}
