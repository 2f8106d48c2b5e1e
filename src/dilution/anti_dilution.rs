use crate::core::error::DomainError;
use crate::core::round::AntiDilution;
use crate::core::shareholder::Shareholder;
use crate::core::snapshot::AntiDilutionAdjustment;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Down-round protection for existing preferred holders.
///
/// The round's own `anti_dilution` term picks the formula; a holder is
/// eligible only if its series was issued with some protection. Each
/// holder's new share count depends only on its own terms and on the
/// round's pre-adjustment figures, so the order holders are visited in
/// does not change the outcome.
pub struct AntiDilutionAdjuster;

impl AntiDilutionAdjuster {
    /// A round is a down round when it prices strictly below the previous
    /// priced round. Nothing is "down" from founding (price zero).
    pub fn is_down_round(new_price: Decimal, previous_price: Decimal) -> bool {
        previous_price > Decimal::ZERO && new_price < previous_price
    }

    /// Conversion price a holder's capital is re-converted at; `None` for
    /// an unprotected round or an unrepresentable result.
    ///
    /// * full ratchet: the new round's price.
    /// * weighted average (broad-based, simplified):
    ///   `(original × pre_money_shares + investment) / (pre_money_shares + new_round_shares)`.
    pub fn conversion_price(
        method: AntiDilution,
        original_price: Decimal,
        new_price: Decimal,
        round_investment: Decimal,
        pre_money_shares: Decimal,
        new_round_shares: Decimal,
    ) -> Option<Decimal> {
        match method {
            AntiDilution::None => None,
            AntiDilution::FullRatchet => Some(new_price),
            AntiDilution::WeightedAverage => {
                let numerator = original_price
                    .checked_mul(pre_money_shares)?
                    .checked_add(round_investment)?;
                numerator.checked_div(pre_money_shares.checked_add(new_round_shares)?)
            }
        }
    }

    /// Grant extra shares to every eligible holder and return what was granted.
    ///
    /// Share counts only ever grow: a holder whose re-converted count is
    /// not above its current count is left alone. The caller is
    /// responsible for adding the granted shares to its pre-money count.
    pub fn adjust(
        shareholders: &mut BTreeMap<String, Shareholder>,
        method: AntiDilution,
        new_price: Decimal,
        round_investment: Decimal,
        pre_money_shares: Decimal,
        new_round_shares: Decimal,
    ) -> Result<Vec<AntiDilutionAdjustment>, DomainError> {
        if !method.is_protected() {
            return Ok(Vec::new());
        }

        let mut eligible: Vec<(String, usize)> = shareholders
            .iter()
            .filter_map(|(name, holder)| {
                let prefs = holder.preferences.as_ref()?;
                (holder.is_preferred() && prefs.anti_dilution.is_protected())
                    .then(|| (name.clone(), prefs.seniority))
            })
            .collect();
        eligible.sort_by_key(|(_, seniority)| *seniority);

        let mut adjustments = Vec::new();
        for (name, _) in eligible {
            let Some(holder) = shareholders.get_mut(&name) else {
                continue;
            };
            let original_price = holder
                .preferences
                .as_ref()
                .map(|p| p.original_price)
                .unwrap_or(Decimal::ZERO);

            let price = Self::conversion_price(
                method,
                original_price,
                new_price,
                round_investment,
                pre_money_shares,
                new_round_shares,
            )
            .ok_or(DomainError::ArithmeticOverflow {
                step: "anti-dilution conversion price",
            })?;
            if price <= Decimal::ZERO {
                return Err(DomainError::NonPositiveConversionPrice {
                    holder: name,
                    price,
                });
            }

            let target = holder
                .invested
                .checked_div(price)
                .ok_or(DomainError::ArithmeticOverflow {
                    step: "anti-dilution share count",
                })?;
            let granted = target - holder.shares;
            debug!(
                "{}: {} re-converts {} at {} -> {} shares",
                method, name, holder.invested, price, target
            );
            if granted <= Decimal::ZERO {
                continue;
            }

            let shares_before = holder.shares;
            holder.shares = target;
            warn!(
                "down round: granting {} additional shares to {} ({})",
                granted, name, method
            );
            adjustments.push(AntiDilutionAdjustment {
                holder: name,
                method,
                shares_before,
                shares_after: target,
                shares_granted: granted,
                effective_price: price,
            });
        }
        Ok(adjustments)
    }

    /// Total shares handed out by a set of adjustments.
    pub fn total_granted(adjustments: &[AntiDilutionAdjustment]) -> Result<Decimal, DomainError> {
        adjustments
            .iter()
            .try_fold(Decimal::ZERO, |total, a| total.checked_add(a.shares_granted))
            .ok_or(DomainError::ArithmeticOverflow {
                step: "anti-dilution grants",
            })
    }
}
