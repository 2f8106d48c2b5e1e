use crate::core::error::{DomainError, ValidationError};
use crate::core::round::RoundTerms;
use crate::core::snapshot::CapTableSnapshot;
use crate::dilution::round_processor::RoundProcessor;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Errors from building or editing a cap table ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapTableError {
    #[error("invalid founding terms: {0}")]
    Founding(#[from] ValidationError),
    #[error("invalid round '{round}': {source}")]
    InvalidRound {
        round: String,
        #[source]
        source: ValidationError,
    },
    #[error("round '{round}' (#{index}) could not be processed: {source}")]
    RoundFailed {
        index: usize,
        round: String,
        #[source]
        source: DomainError,
    },
    #[error("no round at index {index} (ledger has {len})")]
    RoundIndexOutOfRange { index: usize, len: usize },
}

/// Fold every round over the founding snapshot.
///
/// Returns the full history, founding snapshot first. Inputs are
/// validated before anything is computed; a round that fails mid-fold
/// is reported by name and index, and no partial history is returned.
///
/// # Examples
///
/// ```
/// use cap_table_engine::core::ledger::compute_cap_table;
/// use cap_table_engine::core::round::RoundTerms;
/// use rust_decimal_macros::dec;
///
/// let rounds = vec![RoundTerms::new("Seed", dec!(1_000_000), dec!(4_000_000))];
/// let history = compute_cap_table(dec!(1_000_000), &rounds).unwrap();
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history[1].ownership_of("Founders"), dec!(80));
/// ```
pub fn compute_cap_table(
    founding_shares: Decimal,
    rounds: &[RoundTerms],
) -> Result<Vec<CapTableSnapshot>, CapTableError> {
    validate_inputs(founding_shares, rounds)?;

    let mut history = Vec::with_capacity(rounds.len() + 1);
    history.push(CapTableSnapshot::founding(founding_shares));
    for (index, round) in rounds.iter().enumerate() {
        let previous = &history[history.len() - 1];
        let next = process_round(previous, round, index)?;
        history.push(next);
    }
    debug!(
        "computed {} snapshots from {} founding shares",
        history.len(),
        founding_shares
    );
    Ok(history)
}

fn validate_founding(founding_shares: Decimal) -> Result<(), ValidationError> {
    if founding_shares <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveFoundingShares(founding_shares));
    }
    Ok(())
}

fn validate_round(round: &RoundTerms, seen: &HashSet<&str>) -> Result<(), CapTableError> {
    let invalid = |source| CapTableError::InvalidRound {
        round: round.name.clone(),
        source,
    };
    round.validate().map_err(invalid)?;
    let name = round.name.trim();
    if seen.contains(name) {
        return Err(invalid(ValidationError::DuplicateName(name.to_string())));
    }
    Ok(())
}

fn validate_inputs(founding_shares: Decimal, rounds: &[RoundTerms]) -> Result<(), CapTableError> {
    validate_founding(founding_shares)?;
    let mut seen = HashSet::new();
    for round in rounds {
        validate_round(round, &seen)?;
        seen.insert(round.name.trim());
    }
    Ok(())
}

fn process_round(
    previous: &CapTableSnapshot,
    round: &RoundTerms,
    index: usize,
) -> Result<CapTableSnapshot, CapTableError> {
    RoundProcessor::process(previous, round, index).map_err(|source| CapTableError::RoundFailed {
        index,
        round: round.name.clone(),
        source,
    })
}

/// The editable list of round terms together with its derived history.
///
/// The ledger is the only mutable piece: it holds the inputs and
/// re-derives every snapshot from founding whenever they change. Each
/// edit is all-or-nothing; if the new inputs do not produce a valid
/// history the ledger keeps its previous inputs and snapshots.
///
/// # Examples
///
/// ```
/// use cap_table_engine::core::ledger::CapTableLedger;
/// use cap_table_engine::core::round::RoundTerms;
/// use rust_decimal_macros::dec;
///
/// let mut ledger = CapTableLedger::new(dec!(1_000_000)).unwrap();
/// ledger.add_round(RoundTerms::new("Seed", dec!(1_000_000), dec!(4_000_000))).unwrap();
///
/// assert_eq!(ledger.latest().total_shares, dec!(1_250_000));
///
/// // Invalid edits leave the ledger as it was.
/// assert!(ledger.add_round(RoundTerms::new("Seed", dec!(1), dec!(1))).is_err());
/// assert_eq!(ledger.rounds().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapTableLedger {
    founding_shares: Decimal,
    rounds: Vec<RoundTerms>,
    snapshots: Vec<CapTableSnapshot>,
}

impl CapTableLedger {
    /// Create a ledger holding only the founding snapshot.
    pub fn new(founding_shares: Decimal) -> Result<Self, CapTableError> {
        Self::with_rounds(founding_shares, Vec::new())
    }

    pub fn with_rounds(founding_shares: Decimal, rounds: Vec<RoundTerms>) -> Result<Self, CapTableError> {
        let snapshots = compute_cap_table(founding_shares, &rounds)?;
        Ok(Self {
            founding_shares,
            rounds,
            snapshots,
        })
    }

    pub fn founding_shares(&self) -> Decimal {
        self.founding_shares
    }

    pub fn rounds(&self) -> &[RoundTerms] {
        &self.rounds
    }

    /// Founding snapshot followed by one snapshot per round.
    pub fn snapshots(&self) -> &[CapTableSnapshot] {
        &self.snapshots
    }

    /// The most recent snapshot. Always present: a ledger starts at founding.
    pub fn latest(&self) -> &CapTableSnapshot {
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Append a round. Only the new snapshot needs computing.
    pub fn add_round(&mut self, round: RoundTerms) -> Result<&CapTableSnapshot, CapTableError> {
        let seen: HashSet<&str> = self.rounds.iter().map(|r| r.name.trim()).collect();
        validate_round(&round, &seen)?;

        let index = self.rounds.len();
        let next = process_round(self.latest(), &round, index)?;
        info!("added round '{}' (#{})", round.name, index);
        self.rounds.push(round);
        self.snapshots.push(next);
        Ok(self.latest())
    }

    /// Replace the round at `index` and recompute the whole history.
    pub fn update_round(&mut self, index: usize, round: RoundTerms) -> Result<(), CapTableError> {
        self.check_index(index)?;
        let mut rounds = self.rounds.clone();
        rounds[index] = round;
        self.recompute(self.founding_shares, rounds)
    }

    /// Remove the round at `index` and recompute the whole history.
    pub fn remove_round(&mut self, index: usize) -> Result<RoundTerms, CapTableError> {
        self.check_index(index)?;
        let mut rounds = self.rounds.clone();
        let removed = rounds.remove(index);
        self.recompute(self.founding_shares, rounds)?;
        Ok(removed)
    }

    pub fn set_founding_shares(&mut self, founding_shares: Decimal) -> Result<(), CapTableError> {
        self.recompute(founding_shares, self.rounds.clone())
    }

    fn check_index(&self, index: usize) -> Result<(), CapTableError> {
        if index >= self.rounds.len() {
            return Err(CapTableError::RoundIndexOutOfRange {
                index,
                len: self.rounds.len(),
            });
        }
        Ok(())
    }

    fn recompute(&mut self, founding_shares: Decimal, rounds: Vec<RoundTerms>) -> Result<(), CapTableError> {
        let snapshots = compute_cap_table(founding_shares, &rounds)?;
        info!("recomputed cap table: {} rounds", rounds.len());
        self.founding_shares = founding_shares;
        self.rounds = rounds;
        self.snapshots = snapshots;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shareholder::FOUNDERS;
    use rust_decimal_macros::dec;

    fn seed() -> RoundTerms {
        RoundTerms::new("Seed", dec!(1_000_000), dec!(4_000_000))
    }

    fn series_a() -> RoundTerms {
        RoundTerms::new("Series A", dec!(5_000_000), dec!(20_000_000))
    }

    #[test]
    fn test_founding_only() {
        let history = compute_cap_table(dec!(1_000_000), &[]).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].ownership_of(FOUNDERS), dec!(100));
        assert_eq!(history[0].share_price, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_bad_founding() {
        assert_eq!(
            compute_cap_table(Decimal::ZERO, &[]),
            Err(CapTableError::Founding(
                ValidationError::NonPositiveFoundingShares(Decimal::ZERO)
            ))
        );
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = compute_cap_table(dec!(1_000_000), &[seed(), seed()]).unwrap_err();
        assert!(matches!(
            err,
            CapTableError::InvalidRound {
                source: ValidationError::DuplicateName(_),
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_names_ignore_surrounding_whitespace() {
        let padded = RoundTerms::new("Seed ", dec!(2_000_000), dec!(8_000_000));
        assert_eq!(
            compute_cap_table(dec!(1_000_000), &[seed(), padded.clone()]),
            Err(CapTableError::InvalidRound {
                round: "Seed ".into(),
                source: ValidationError::DuplicateName("Seed".into()),
            })
        );

        let mut ledger = CapTableLedger::with_rounds(dec!(1_000_000), vec![seed()]).unwrap();
        assert!(matches!(
            ledger.add_round(padded),
            Err(CapTableError::InvalidRound {
                source: ValidationError::DuplicateName(_),
                ..
            })
        ));
        assert_eq!(ledger.rounds().len(), 1);
    }

    #[test]
    fn test_invalid_round_is_named() {
        let mut bad = series_a();
        bad.investment = Decimal::ZERO;
        let err = compute_cap_table(dec!(1_000_000), &[seed(), bad]).unwrap_err();
        match err {
            CapTableError::InvalidRound { round, .. } => assert_eq!(round, "Series A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_seniority_follows_round_order() {
        let history = compute_cap_table(dec!(1_000_000), &[seed(), series_a()]).unwrap();
        let latest = &history[2];
        assert_eq!(latest.shareholder("Seed").unwrap().seniority(), Some(0));
        assert_eq!(latest.shareholder("Series A").unwrap().seniority(), Some(1));
    }

    #[test]
    fn test_add_matches_batch() {
        let mut ledger = CapTableLedger::new(dec!(1_000_000)).unwrap();
        ledger.add_round(seed()).unwrap();
        ledger.add_round(series_a()).unwrap();

        let batch = compute_cap_table(dec!(1_000_000), &[seed(), series_a()]).unwrap();
        assert_eq!(ledger.snapshots(), batch.as_slice());
    }

    #[test]
    fn test_failed_edit_leaves_ledger_unchanged() {
        let mut ledger = CapTableLedger::with_rounds(dec!(1_000_000), vec![seed()]).unwrap();
        let before = ledger.clone();

        let mut bad = seed();
        bad.pre_money_valuation = dec!(-1);
        assert!(ledger.update_round(0, bad).is_err());
        assert!(ledger.add_round(RoundTerms::new("", dec!(1), dec!(1))).is_err());
        assert!(ledger.set_founding_shares(Decimal::ZERO).is_err());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_update_and_remove_recompute() {
        let mut ledger =
            CapTableLedger::with_rounds(dec!(1_000_000), vec![seed(), series_a()]).unwrap();

        ledger
            .update_round(0, RoundTerms::new("Seed", dec!(2_000_000), dec!(8_000_000)))
            .unwrap();
        assert_eq!(ledger.snapshots()[1].investment, dec!(2_000_000));
        assert_eq!(ledger.snapshots().len(), 3);

        let removed = ledger.remove_round(0).unwrap();
        assert_eq!(removed.name, "Seed");
        assert_eq!(ledger.snapshots().len(), 2);
        assert_eq!(ledger.latest().stage, "Series A");
        // Series A is now the first round, so its seniority index is 0.
        assert_eq!(
            ledger.latest().shareholder("Series A").unwrap().seniority(),
            Some(0)
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let mut ledger = CapTableLedger::new(dec!(1_000_000)).unwrap();
        assert_eq!(
            ledger.remove_round(0),
            Err(CapTableError::RoundIndexOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let a = compute_cap_table(dec!(1_000_000), &[seed(), series_a()]).unwrap();
        let b = compute_cap_table(dec!(1_000_000), &[seed(), series_a()]).unwrap();
        assert_eq!(a, b);
    }
}
