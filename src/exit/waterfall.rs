use crate::core::error::ValidationError;
use crate::core::shareholder::{ShareClass, Shareholder};
use crate::core::snapshot::CapTableSnapshot;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What a single shareholder takes home from an exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationDistribution {
    pub proceeds: Decimal,
    pub invested: Decimal,
    /// proceeds / invested; zero when nothing was invested.
    pub multiple: Decimal,
    /// proceeds / exit valuation × 100; zero for a zero exit.
    pub percent_of_total: Decimal,
}

/// Tier of the waterfall a payment was made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterfallTier {
    /// Preferred holders paid their preference amount, most senior first.
    LiquidationPreference,
    /// Participating preferred and common share the residual, capped.
    Participation,
    /// Residual split between common and the option pool.
    CommonResidual,
}

impl fmt::Display for WaterfallTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaterfallTier::LiquidationPreference => write!(f, "Liquidation Preference"),
            WaterfallTier::Participation => write!(f, "Participation"),
            WaterfallTier::CommonResidual => write!(f, "Common Residual"),
        }
    }
}

/// A single payment made while walking the waterfall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPayment {
    pub tier: WaterfallTier,
    pub holder: String,
    /// What the holder was owed in this tier before proceeds ran out or
    /// the participation cap applied.
    pub entitlement: Decimal,
    pub paid: Decimal,
}

/// Outcome of running an exit through the waterfall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallResult {
    exit_valuation: Decimal,
    /// Every shareholder of the snapshot, including those receiving nothing.
    distributions: BTreeMap<String, LiquidationDistribution>,
    /// Payments in the order they were made.
    payments: Vec<TierPayment>,
    /// Proceeds left over, e.g. amounts clipped by participation caps.
    undistributed: Decimal,
}

impl WaterfallResult {
    pub fn exit_valuation(&self) -> Decimal {
        self.exit_valuation
    }

    pub fn distributions(&self) -> &BTreeMap<String, LiquidationDistribution> {
        &self.distributions
    }

    pub fn distribution(&self, name: &str) -> Option<&LiquidationDistribution> {
        self.distributions.get(name)
    }

    /// Proceeds of a holder; zero if unknown.
    pub fn proceeds_of(&self, name: &str) -> Decimal {
        self.distributions
            .get(name)
            .map(|d| d.proceeds)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn payments(&self) -> &[TierPayment] {
        &self.payments
    }

    pub fn payments_in(&self, tier: WaterfallTier) -> impl Iterator<Item = &TierPayment> {
        self.payments.iter().filter(move |p| p.tier == tier)
    }

    pub fn total_distributed(&self) -> Decimal {
        self.distributions.values().map(|d| d.proceeds).sum()
    }

    pub fn undistributed(&self) -> Decimal {
        self.undistributed
    }
}

impl fmt::Display for WaterfallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Liquidation Waterfall ===")?;
        writeln!(f, "Exit Valuation: {}", self.exit_valuation.round_dp(2))?;

        for tier in [
            WaterfallTier::LiquidationPreference,
            WaterfallTier::Participation,
            WaterfallTier::CommonResidual,
        ] {
            let mut payments = self.payments_in(tier).peekable();
            if payments.peek().is_none() {
                continue;
            }
            writeln!(f, "\n--- {} ---", tier)?;
            for p in payments {
                writeln!(
                    f,
                    "  {:<16} owed {:>16}  paid {:>16}",
                    p.holder,
                    p.entitlement.round_dp(2),
                    p.paid.round_dp(2)
                )?;
            }
        }

        writeln!(f, "\n--- Distribution ---")?;
        let mut rows: Vec<(&String, &LiquidationDistribution)> = self.distributions.iter().collect();
        rows.sort_by(|a, b| b.1.proceeds.cmp(&a.1.proceeds));
        for (name, d) in rows {
            writeln!(
                f,
                "  {:<16} {:>16} {:>7}x {:>7}%",
                name,
                d.proceeds.round_dp(2),
                d.multiple.round_dp(2),
                d.percent_of_total.round_dp(1)
            )?;
        }
        if self.undistributed > Decimal::ZERO {
            writeln!(f, "Undistributed:  {}", self.undistributed.round_dp(2))?;
        }
        Ok(())
    }
}

/// Distributes exit proceeds by seniority, preference and participation.
///
/// # Algorithm
///
/// 1. **Liquidation preferences.** Preferred holders, most senior
///    (latest round) first, each take `min(remaining, invested × preference)`.
///    The walk stops as soon as proceeds run out.
/// 2. **Participation.** If any preferred holder participates and money
///    remains, participating holders and common share the remainder pro
///    rata by shares. A participant's extra is capped at
///    `cap × invested − already received`. Common then takes its pro-rata
///    share of the same remainder, bounded by what is left. Amounts a
///    cap clips off are not re-offered to anyone and stay undistributed.
/// 3. **Common residual.** Otherwise the remainder is split by shares
///    between common and the option pool. Non-participating preferred
///    holders keep only their preference; there is no as-converted
///    election.
///
/// Empty share bases (no common, no participants) skip their tier
/// instead of dividing by zero.
pub struct LiquidationWaterfallEngine;

impl LiquidationWaterfallEngine {
    pub fn distribute(
        snapshot: &CapTableSnapshot,
        exit_valuation: Decimal,
    ) -> Result<WaterfallResult, ValidationError> {
        if exit_valuation < Decimal::ZERO {
            return Err(ValidationError::NegativeExitValuation(exit_valuation));
        }

        let mut received: BTreeMap<&str, Decimal> = snapshot
            .shareholders
            .keys()
            .map(|name| (name.as_str(), Decimal::ZERO))
            .collect();
        let mut payments = Vec::new();
        let mut remaining = exit_valuation;

        let preferred = snapshot.preferred_by_seniority();

        // Tier 1
        for (name, holder) in &preferred {
            if remaining <= Decimal::ZERO {
                break;
            }
            let entitlement = holder.preference_amount();
            let paid = entitlement.min(remaining);
            remaining -= paid;
            credit(&mut received, name, paid);
            payments.push(TierPayment {
                tier: WaterfallTier::LiquidationPreference,
                holder: name.to_string(),
                entitlement,
                paid,
            });
        }
        debug!("after preferences: {} remaining", remaining);

        let participating: Vec<(&str, &Shareholder)> = preferred
            .iter()
            .filter(|(_, h)| h.participation_ceiling().is_some())
            .copied()
            .collect();

        let common: Vec<(&str, &Shareholder)> = holders_of_class(snapshot, ShareClass::Common);

        if !participating.is_empty() && remaining > Decimal::ZERO {
            // Tier 2
            let participating_shares: Decimal = participating.iter().map(|(_, h)| h.shares).sum();
            let common_shares: Decimal = common.iter().map(|(_, h)| h.shares).sum();
            let pool = remaining;

            match pool.checked_div(participating_shares + common_shares) {
                Some(per_share) => {
                    for (name, holder) in &participating {
                        let pro_rata = holder.shares * per_share;
                        let ceiling = holder.participation_ceiling().unwrap_or(Decimal::ZERO);
                        let headroom = (ceiling - received[name]).max(Decimal::ZERO);
                        let paid = pro_rata.min(headroom).min(remaining);
                        if paid > Decimal::ZERO {
                            remaining -= paid;
                            credit(&mut received, name, paid);
                        }
                        payments.push(TierPayment {
                            tier: WaterfallTier::Participation,
                            holder: name.to_string(),
                            entitlement: pro_rata,
                            paid,
                        });
                    }
                    for (name, holder) in &common {
                        let pro_rata = holder.shares * per_share;
                        let paid = pro_rata.min(remaining);
                        remaining -= paid;
                        credit(&mut received, name, paid);
                        payments.push(TierPayment {
                            tier: WaterfallTier::Participation,
                            holder: name.to_string(),
                            entitlement: pro_rata,
                            paid,
                        });
                    }
                }
                None => debug!("participation tier skipped: no shares to share with"),
            }
        } else if remaining > Decimal::ZERO {
            // Tier 2'
            let mut residual: Vec<(&str, &Shareholder)> = common;
            residual.extend(holders_of_class(snapshot, ShareClass::Options));
            residual.retain(|(_, h)| h.shares > Decimal::ZERO);
            let residual_shares: Decimal = residual.iter().map(|(_, h)| h.shares).sum();

            if residual_shares > Decimal::ZERO {
                let pool = remaining;
                let last = residual.len() - 1;
                for (i, (name, holder)) in residual.iter().enumerate() {
                    let entitlement = holder.shares / residual_shares * pool;
                    // The last holder takes whatever rounding left behind.
                    let paid = if i == last { remaining } else { entitlement.min(remaining) };
                    remaining -= paid;
                    credit(&mut received, name, paid);
                    payments.push(TierPayment {
                        tier: WaterfallTier::CommonResidual,
                        holder: name.to_string(),
                        entitlement,
                        paid,
                    });
                }
            } else {
                debug!("common residual skipped: no common or option shares");
            }
        }

        if remaining > Decimal::ZERO {
            warn!("{} of {} exit proceeds left undistributed", remaining, exit_valuation);
        }

        let distributions = snapshot
            .shareholders
            .iter()
            .map(|(name, holder)| {
                let proceeds = received
                    .get(name.as_str())
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                (
                    name.clone(),
                    LiquidationDistribution {
                        proceeds,
                        invested: holder.invested,
                        multiple: ratio(proceeds, holder.invested),
                        percent_of_total: ratio(proceeds, exit_valuation) * Decimal::ONE_HUNDRED,
                    },
                )
            })
            .collect();

        Ok(WaterfallResult {
            exit_valuation,
            distributions,
            payments,
            undistributed: remaining,
        })
    }
}

/// Run an exit through the waterfall for the latest snapshot of a history.
///
/// Seniority comes from the issuance order stamped on each preferred
/// holder, so the round list is not needed here.
///
/// # Examples
///
/// ```
/// use cap_table_engine::prelude::*;
/// use rust_decimal_macros::dec;
///
/// let rounds = vec![RoundTerms::new("Seed", dec!(5_000_000), dec!(5_000_000))];
/// let history = compute_cap_table(dec!(1_000_000), &rounds).unwrap();
/// let result = compute_liquidation(&history[history.len() - 1], dec!(3_000_000)).unwrap();
///
/// assert_eq!(result.proceeds_of("Seed"), dec!(3_000_000));
/// assert_eq!(result.proceeds_of("Founders"), dec!(0));
/// ```
pub fn compute_liquidation(
    latest: &CapTableSnapshot,
    exit_valuation: Decimal,
) -> Result<WaterfallResult, ValidationError> {
    LiquidationWaterfallEngine::distribute(latest, exit_valuation)
}

fn holders_of_class(snapshot: &CapTableSnapshot, class: ShareClass) -> Vec<(&str, &Shareholder)> {
    snapshot
        .shareholders
        .iter()
        .filter(|(_, h)| h.class == class)
        .map(|(name, h)| (name.as_str(), h))
        .collect()
}

fn credit(received: &mut BTreeMap<&str, Decimal>, name: &str, amount: Decimal) {
    if let Some(total) = received.get_mut(name) {
        *total += amount;
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}
