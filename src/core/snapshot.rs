use crate::core::round::{AntiDilution, PoolTiming};
use crate::core::shareholder::{Shareholder, FOUNDERS, OPTION_POOL};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stage name of the first snapshot in every history.
pub const FOUNDING_STAGE: &str = "Founding";

/// Pro-rata entitlement of an existing preferred holder in a new round.
///
/// Informational only: nothing is issued on the strength of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRataAllocation {
    /// Shares needed to hold the current ownership fraction.
    pub shares: Decimal,
    /// Cost of those shares at the round price.
    pub investment: Decimal,
    /// Current ownership before the round, in percent.
    pub ownership: Decimal,
}

/// Extra shares granted to a preferred holder in a down round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiDilutionAdjustment {
    pub holder: String,
    pub method: AntiDilution,
    pub shares_before: Decimal,
    pub shares_after: Decimal,
    pub shares_granted: Decimal,
    /// Price the holder's capital is re-converted at.
    pub effective_price: Decimal,
}

/// What happened in the round that produced a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDetails {
    pub option_pool_pct: Decimal,
    pub option_pool_timing: PoolTiming,
    /// Pool shares issued by this round alone.
    pub option_pool_shares: Decimal,
    pub new_investor_shares: Decimal,
    pub liquidation_preference: Decimal,
    pub participating: bool,
    pub participation_cap: Decimal,
    pub anti_dilution: AntiDilution,
    pub pro_rata_rights: bool,
    pub down_round: bool,
    pub anti_dilution_adjustments: Vec<AntiDilutionAdjustment>,
    pub pro_rata_allocations: BTreeMap<String, ProRataAllocation>,
}

/// The full cap table after the founding event or after one round.
///
/// Every snapshot owns its shareholder map outright; later snapshots are
/// built from clones, so no two snapshots share state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapTableSnapshot {
    pub stage: String,
    pub total_shares: Decimal,
    /// Price per share of the round; zero for founding.
    pub share_price: Decimal,
    pub post_money_valuation: Decimal,
    /// New money raised in the round; zero for founding.
    pub investment: Decimal,
    pub shareholders: BTreeMap<String, Shareholder>,
    /// Name -> percent of `total_shares`.
    pub ownership: BTreeMap<String, Decimal>,
    /// `None` for the founding snapshot.
    pub round_details: Option<RoundDetails>,
}

impl CapTableSnapshot {
    /// Founders hold everything; the option pool exists but is empty.
    pub fn founding(founding_shares: Decimal) -> Self {
        let mut shareholders = BTreeMap::new();
        shareholders.insert(FOUNDERS.to_string(), Shareholder::common(founding_shares));
        shareholders.insert(OPTION_POOL.to_string(), Shareholder::options(Decimal::ZERO));
        let ownership = compute_ownership(&shareholders, founding_shares);

        Self {
            stage: FOUNDING_STAGE.to_string(),
            total_shares: founding_shares,
            share_price: Decimal::ZERO,
            post_money_valuation: Decimal::ZERO,
            investment: Decimal::ZERO,
            shareholders,
            ownership,
            round_details: None,
        }
    }

    pub fn is_founding(&self) -> bool {
        self.round_details.is_none()
    }

    pub fn shareholder(&self, name: &str) -> Option<&Shareholder> {
        self.shareholders.get(name)
    }

    pub fn shares_of(&self, name: &str) -> Decimal {
        self.shareholders
            .get(name)
            .map(|s| s.shares)
            .unwrap_or(Decimal::ZERO)
    }

    /// Ownership percentage of a holder; zero if unknown.
    pub fn ownership_of(&self, name: &str) -> Decimal {
        self.ownership.get(name).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of all ownership percentages (100 up to rounding).
    pub fn ownership_total(&self) -> Decimal {
        self.ownership.values().sum()
    }

    /// Preferred holders, most senior first.
    ///
    /// Seniority is the issuing round's index; equal seniority falls back
    /// to reverse name order so the result is fully deterministic.
    pub fn preferred_by_seniority(&self) -> Vec<(&str, &Shareholder)> {
        let mut preferred: Vec<(&str, &Shareholder)> = self
            .shareholders
            .iter()
            .filter(|(_, s)| s.is_preferred())
            .map(|(name, s)| (name.as_str(), s))
            .collect();
        preferred.sort_by(|(a_name, a), (b_name, b)| {
            b.seniority()
                .cmp(&a.seniority())
                .then_with(|| b_name.cmp(a_name))
        });
        preferred
    }
}

/// Percent of `total_shares` held by each shareholder.
///
/// An empty share base yields zero ownership for everyone rather than
/// dividing by zero.
pub fn compute_ownership(
    shareholders: &BTreeMap<String, Shareholder>,
    total_shares: Decimal,
) -> BTreeMap<String, Decimal> {
    shareholders
        .iter()
        .map(|(name, holder)| {
            let pct = holder
                .shares
                .checked_div(total_shares)
                .map(|f| f * Decimal::ONE_HUNDRED)
                .unwrap_or(Decimal::ZERO);
            (name.clone(), pct)
        })
        .collect()
}

impl fmt::Display for CapTableSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.stage)?;
        writeln!(f, "Total Shares:   {}", self.total_shares.round_dp(2))?;
        if !self.is_founding() {
            writeln!(f, "Share Price:    {}", self.share_price.round_dp(4))?;
            writeln!(f, "Investment:     {}", self.investment.round_dp(2))?;
            writeln!(f, "Post-Money:     {}", self.post_money_valuation.round_dp(2))?;
        }

        let mut rows: Vec<(&String, &Shareholder)> = self.shareholders.iter().collect();
        rows.sort_by(|a, b| b.1.shares.cmp(&a.1.shares));
        for (name, holder) in rows {
            writeln!(
                f,
                "  {:<16} {:<10} {:>18} {:>8}%",
                name,
                holder.class,
                holder.shares.round_dp(0),
                self.ownership_of(name).round_dp(2)
            )?;
        }

        if let Some(details) = &self.round_details {
            if details.option_pool_shares > Decimal::ZERO {
                writeln!(
                    f,
                    "  Option pool: {}% {} ({} shares)",
                    details.option_pool_pct,
                    details.option_pool_timing,
                    details.option_pool_shares.round_dp(0)
                )?;
            }
            for adj in &details.anti_dilution_adjustments {
                writeln!(
                    f,
                    "  Anti-dilution ({}): {} +{} shares at {}",
                    adj.method,
                    adj.holder,
                    adj.shares_granted.round_dp(0),
                    adj.effective_price.round_dp(4)
                )?;
            }
            for (name, alloc) in &details.pro_rata_allocations {
                writeln!(
                    f,
                    "  Pro-rata: {} may buy {} shares for {}",
                    name,
                    alloc.shares.round_dp(0),
                    alloc.investment.round_dp(2)
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::round::RoundTerms;
    use crate::core::shareholder::PreferenceTerms;
    use rust_decimal_macros::dec;

    fn preferred(seniority: usize) -> Shareholder {
        let round = RoundTerms::new("x", dec!(100), dec!(400));
        Shareholder::preferred(
            dec!(25),
            dec!(100),
            PreferenceTerms::from_round(&round, dec!(4), seniority),
        )
    }

    #[test]
    fn test_founding_snapshot() {
        let snap = CapTableSnapshot::founding(dec!(1_000_000));
        assert_eq!(snap.stage, FOUNDING_STAGE);
        assert!(snap.is_founding());
        assert_eq!(snap.share_price, Decimal::ZERO);
        assert_eq!(snap.ownership_of(FOUNDERS), dec!(100));
        assert_eq!(snap.ownership_of(OPTION_POOL), Decimal::ZERO);
        assert_eq!(snap.shares_of(OPTION_POOL), Decimal::ZERO);
    }

    #[test]
    fn test_ownership_on_empty_base() {
        let snap = CapTableSnapshot::founding(Decimal::ZERO);
        assert_eq!(snap.ownership_total(), Decimal::ZERO);
    }

    #[test]
    fn test_preferred_by_seniority() {
        let mut snap = CapTableSnapshot::founding(dec!(100));
        snap.shareholders.insert("Seed".into(), preferred(0));
        snap.shareholders.insert("Series B".into(), preferred(2));
        snap.shareholders.insert("Series A".into(), preferred(1));

        let order: Vec<&str> = snap
            .preferred_by_seniority()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(order, vec!["Series B", "Series A", "Seed"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = CapTableSnapshot::founding(dec!(100));
        let mut copy = original.clone();
        copy.shareholders.get_mut(FOUNDERS).unwrap().shares = dec!(1);
        assert_eq!(original.shares_of(FOUNDERS), dec!(100));
    }
}
