use crate::core::error::DomainError;
use crate::core::round::PoolTiming;
use rust_decimal::Decimal;

/// Sizes option-pool issuances.
///
/// A pre-money pool is carved out of the pre-money share count so that it
/// ends up at `pct` of the enlarged pre-money base; the round price is
/// then computed over the larger base, so only existing holders are
/// diluted. A post-money pool is `pct` of the post-money share count
/// (before the pool itself) and dilutes everyone, the new investor
/// included.
///
/// # Examples
///
/// ```
/// use cap_table_engine::dilution::option_pool::OptionPoolAllocator;
/// use rust_decimal_macros::dec;
///
/// // 20% of the enlarged base: 1_000_000 * 0.2 / 0.8
/// let pool = OptionPoolAllocator::pre_money_pool(dec!(20), dec!(1_000_000)).unwrap();
/// assert_eq!(pool, dec!(250_000));
///
/// let pool = OptionPoolAllocator::post_money_pool(dec!(10), dec!(1_250_000)).unwrap();
/// assert_eq!(pool, dec!(125_000));
/// ```
pub struct OptionPoolAllocator;

impl OptionPoolAllocator {
    /// Pool shares for a pre-money pool: `f × pre / (1 − f)` with `f = pct / 100`.
    ///
    /// Fails at `pct = 100`, where the formula has no finite answer.
    pub fn pre_money_pool(pool_pct: Decimal, pre_money_shares: Decimal) -> Result<Decimal, DomainError> {
        if pool_pct <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let fraction = pool_pct / Decimal::ONE_HUNDRED;
        if fraction >= Decimal::ONE {
            return Err(DomainError::OptionPoolSingularity(pool_pct));
        }
        fraction
            .checked_mul(pre_money_shares)
            .and_then(|shares| shares.checked_div(Decimal::ONE - fraction))
            .ok_or(DomainError::ArithmeticOverflow {
                step: "pre-money option pool",
            })
    }

    /// Pool shares for a post-money pool: `pct`% of the post-money share
    /// count, pool excluded.
    pub fn post_money_pool(pool_pct: Decimal, post_money_shares: Decimal) -> Result<Decimal, DomainError> {
        if pool_pct <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        (pool_pct / Decimal::ONE_HUNDRED)
            .checked_mul(post_money_shares)
            .ok_or(DomainError::ArithmeticOverflow {
                step: "post-money option pool",
            })
    }

    /// Pool shares for `timing`, given the share count that timing sizes against.
    pub fn allocate(
        pool_pct: Decimal,
        timing: PoolTiming,
        base_shares: Decimal,
    ) -> Result<Decimal, DomainError> {
        match timing {
            PoolTiming::Pre => Self::pre_money_pool(pool_pct, base_shares),
            PoolTiming::Post => Self::post_money_pool(pool_pct, base_shares),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pre_money_pool_reaches_target_fraction() {
        let pre = dec!(1_000_000);
        let pool = OptionPoolAllocator::pre_money_pool(dec!(10), pre).unwrap();
        // pool / (pre + pool) == 10%
        let fraction = pool / (pre + pool);
        assert!((fraction - dec!(0.1)).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_pre_money_singularity() {
        let result = OptionPoolAllocator::pre_money_pool(dec!(100), dec!(1_000));
        assert_eq!(result, Err(DomainError::OptionPoolSingularity(dec!(100))));
    }

    #[test]
    fn test_post_money_pool() {
        assert_eq!(
            OptionPoolAllocator::post_money_pool(dec!(10), dec!(1_250_000)),
            Ok(dec!(125_000))
        );
    }

    #[test]
    fn test_oversized_pool_overflows_cleanly() {
        // 99.9999% pre-money on a huge base cannot be represented.
        let result = OptionPoolAllocator::pre_money_pool(dec!(99.9999), Decimal::MAX / dec!(2));
        assert_eq!(
            result,
            Err(DomainError::ArithmeticOverflow {
                step: "pre-money option pool"
            })
        );
    }

    #[test]
    fn test_zero_pool() {
        assert_eq!(
            OptionPoolAllocator::allocate(Decimal::ZERO, PoolTiming::Pre, dec!(100)).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            OptionPoolAllocator::allocate(Decimal::ZERO, PoolTiming::Post, dec!(100)).unwrap(),
            Decimal::ZERO
        );
    }
}
