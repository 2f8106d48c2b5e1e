use crate::core::error::DomainError;
use crate::core::round::{PoolTiming, RoundTerms};
use crate::core::shareholder::{PreferenceTerms, Shareholder, OPTION_POOL};
use crate::core::snapshot::{compute_ownership, CapTableSnapshot, RoundDetails};
use crate::dilution::anti_dilution::AntiDilutionAdjuster;
use crate::dilution::option_pool::OptionPoolAllocator;
use crate::dilution::pro_rata::ProRataCalculator;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Per-round state transition: `(previous snapshot, round) -> next snapshot`.
///
/// # Algorithm
///
/// 1. Start from the previous total share count; if the pool is
///    pre-money, issue it now.
/// 2. Price = pre-money valuation / pre-money shares.
/// 3. New investor shares = investment / price.
/// 4. In a down round, apply anti-dilution grants to existing preferred
///    holders. The price is already fixed, so the investor's share count
///    does not move; only the pre-money share count grows.
/// 5. Record pro-rata entitlements (reporting only).
/// 6. Issue the investor's preferred shares at the round price.
/// 7. If the pool is post-money, issue it on top of the post-money count.
/// 8. Recompute ownership over the final total.
///
/// The previous snapshot is never touched; the new snapshot starts from a
/// clone of its shareholder map.
pub struct RoundProcessor;

impl RoundProcessor {
    /// Apply `round` to `previous`. `seniority` is the round's index in the
    /// ledger and is stamped onto the investor's preference terms.
    pub fn process(
        previous: &CapTableSnapshot,
        round: &RoundTerms,
        seniority: usize,
    ) -> Result<CapTableSnapshot, DomainError> {
        let mut shareholders = previous.shareholders.clone();
        let mut pre_money_shares = previous.total_shares;
        if pre_money_shares <= Decimal::ZERO {
            return Err(DomainError::NonPositivePreMoneyShares(pre_money_shares));
        }

        let mut option_pool_shares = Decimal::ZERO;
        if round.option_pool_timing == PoolTiming::Pre {
            option_pool_shares =
                OptionPoolAllocator::allocate(round.option_pool_pct, PoolTiming::Pre, pre_money_shares)?;
            pre_money_shares = grow_option_pool(&mut shareholders, pre_money_shares, option_pool_shares)?;
        }

        let share_price = round
            .pre_money_valuation
            .checked_div(pre_money_shares)
            .ok_or(overflow("share price"))?;
        if share_price <= Decimal::ZERO {
            return Err(DomainError::NonPositiveSharePrice(share_price));
        }
        let new_investor_shares = round
            .investment
            .checked_div(share_price)
            .ok_or(overflow("new investor shares"))?;

        let down_round = AntiDilutionAdjuster::is_down_round(share_price, previous.share_price);
        let anti_dilution_adjustments = if down_round {
            warn!(
                "{} is a down round: {} < {}",
                round.name, share_price, previous.share_price
            );
            let adjustments = AntiDilutionAdjuster::adjust(
                &mut shareholders,
                round.anti_dilution,
                share_price,
                round.investment,
                pre_money_shares,
                new_investor_shares,
            )?;
            pre_money_shares = pre_money_shares
                .checked_add(AntiDilutionAdjuster::total_granted(&adjustments)?)
                .ok_or(overflow("pre-money share count"))?;
            adjustments
        } else {
            Vec::new()
        };

        let pro_rata_allocations = ProRataCalculator::allocate(
            &shareholders,
            pre_money_shares,
            new_investor_shares,
            share_price,
        );

        let investor = shareholders
            .entry(round.name.clone())
            .or_insert_with(|| {
                Shareholder::preferred(
                    Decimal::ZERO,
                    Decimal::ZERO,
                    PreferenceTerms::from_round(round, share_price, seniority),
                )
            });
        investor.shares = new_investor_shares;
        investor.invested = round.investment;

        let mut post_money_shares = pre_money_shares
            .checked_add(new_investor_shares)
            .ok_or(overflow("post-money share count"))?;
        if round.option_pool_timing == PoolTiming::Post {
            option_pool_shares =
                OptionPoolAllocator::allocate(round.option_pool_pct, PoolTiming::Post, post_money_shares)?;
            post_money_shares = grow_option_pool(&mut shareholders, post_money_shares, option_pool_shares)?;
        }

        let total_shares = post_money_shares;
        let ownership = compute_ownership(&shareholders, total_shares);

        debug!(
            "{}: price {} | {} new shares | pool {} ({}) | total {}",
            round.name,
            share_price,
            new_investor_shares,
            option_pool_shares,
            round.option_pool_timing,
            total_shares
        );

        Ok(CapTableSnapshot {
            stage: round.name.clone(),
            total_shares,
            share_price,
            post_money_valuation: round
                .pre_money_valuation
                .checked_add(round.investment)
                .ok_or(overflow("post-money valuation"))?,
            investment: round.investment,
            shareholders,
            ownership,
            round_details: Some(RoundDetails {
                option_pool_pct: round.option_pool_pct,
                option_pool_timing: round.option_pool_timing,
                option_pool_shares,
                new_investor_shares,
                liquidation_preference: round.liquidation_preference,
                participating: round.participating,
                participation_cap: round.participation_cap,
                anti_dilution: round.anti_dilution,
                pro_rata_rights: round.pro_rata_rights,
                down_round,
                anti_dilution_adjustments,
                pro_rata_allocations,
            }),
        })
    }
}

/// Issue `shares` to the option pool and return the new share count.
/// Pool issuances accumulate across rounds.
fn grow_option_pool(
    shareholders: &mut BTreeMap<String, Shareholder>,
    total_shares: Decimal,
    shares: Decimal,
) -> Result<Decimal, DomainError> {
    if shares <= Decimal::ZERO {
        return Ok(total_shares);
    }
    let total = total_shares
        .checked_add(shares)
        .ok_or(overflow("option pool issuance"))?;
    let pool = shareholders
        .entry(OPTION_POOL.to_string())
        .or_insert_with(|| Shareholder::options(Decimal::ZERO));
    pool.shares = pool
        .shares
        .checked_add(shares)
        .ok_or(overflow("option pool issuance"))?;
    Ok(total)
}

fn overflow(step: &'static str) -> DomainError {
    DomainError::ArithmeticOverflow { step }
}
