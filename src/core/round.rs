use crate::core::error::ValidationError;
use crate::core::shareholder::{FOUNDERS, OPTION_POOL};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// When a round's option pool is carved out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolTiming {
    /// Sized before the new money comes in; dilutes existing holders only.
    Pre,
    /// Sized after the investor's shares are issued; dilutes everyone.
    #[default]
    Post,
}

impl fmt::Display for PoolTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolTiming::Pre => write!(f, "pre-money"),
            PoolTiming::Post => write!(f, "post-money"),
        }
    }
}

/// Anti-dilution protection attached to a preferred series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AntiDilution {
    #[default]
    None,
    FullRatchet,
    WeightedAverage,
}

impl AntiDilution {
    pub fn is_protected(&self) -> bool {
        !matches!(self, AntiDilution::None)
    }
}

impl fmt::Display for AntiDilution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AntiDilution::None => write!(f, "none"),
            AntiDilution::FullRatchet => write!(f, "full-ratchet"),
            AntiDilution::WeightedAverage => write!(f, "weighted-average"),
        }
    }
}

fn default_liquidation_preference() -> Decimal {
    Decimal::ONE
}

fn default_participation_cap() -> Decimal {
    dec!(3)
}

fn default_pro_rata_rights() -> bool {
    true
}

/// Terms of a single priced financing round.
///
/// The round name doubles as the investor's shareholder name, so it must
/// be unique within a ledger and must not collide with the built-in
/// `Founders` / `Option Pool` holders.
///
/// # Examples
///
/// ```
/// use cap_table_engine::core::round::{AntiDilution, PoolTiming, RoundTerms};
/// use rust_decimal_macros::dec;
///
/// let seed = RoundTerms::new("Seed", dec!(1_000_000), dec!(4_000_000))
///     .with_option_pool(dec!(10), PoolTiming::Post)
///     .with_anti_dilution(AntiDilution::WeightedAverage);
///
/// assert_eq!(seed.post_money_valuation(), dec!(5_000_000));
/// assert_eq!(seed.investor_ownership_pct(), dec!(20));
/// assert!(seed.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTerms {
    pub name: String,
    pub investment: Decimal,
    pub pre_money_valuation: Decimal,
    /// Pool size in percent (0-100).
    #[serde(default)]
    pub option_pool_pct: Decimal,
    #[serde(default)]
    pub option_pool_timing: PoolTiming,
    /// Multiple of invested capital paid ahead of common.
    #[serde(default = "default_liquidation_preference")]
    pub liquidation_preference: Decimal,
    #[serde(default)]
    pub participating: bool,
    /// Total-return ceiling as a multiple of invested capital; only read
    /// when `participating` is set.
    #[serde(default = "default_participation_cap")]
    pub participation_cap: Decimal,
    #[serde(default)]
    pub anti_dilution: AntiDilution,
    #[serde(default = "default_pro_rata_rights")]
    pub pro_rata_rights: bool,
}

impl RoundTerms {
    /// Create a round with default preference terms: 1x non-participating,
    /// no option pool, no anti-dilution, pro-rata rights.
    pub fn new(name: impl Into<String>, investment: Decimal, pre_money_valuation: Decimal) -> Self {
        Self {
            name: name.into(),
            investment,
            pre_money_valuation,
            option_pool_pct: Decimal::ZERO,
            option_pool_timing: PoolTiming::default(),
            liquidation_preference: default_liquidation_preference(),
            participating: false,
            participation_cap: default_participation_cap(),
            anti_dilution: AntiDilution::default(),
            pro_rata_rights: default_pro_rata_rights(),
        }
    }

    pub fn with_option_pool(mut self, pct: Decimal, timing: PoolTiming) -> Self {
        self.option_pool_pct = pct;
        self.option_pool_timing = timing;
        self
    }

    pub fn with_liquidation_preference(mut self, multiple: Decimal) -> Self {
        self.liquidation_preference = multiple;
        self
    }

    /// Make the series participating, capped at `cap` times invested capital.
    pub fn with_participation(mut self, cap: Decimal) -> Self {
        self.participating = true;
        self.participation_cap = cap;
        self
    }

    pub fn with_anti_dilution(mut self, anti_dilution: AntiDilution) -> Self {
        self.anti_dilution = anti_dilution;
        self
    }

    pub fn with_pro_rata_rights(mut self, pro_rata_rights: bool) -> Self {
        self.pro_rata_rights = pro_rata_rights;
        self
    }

    /// Saturates at `Decimal::MAX` for terms that fail validation.
    pub fn post_money_valuation(&self) -> Decimal {
        self.pre_money_valuation.saturating_add(self.investment)
    }

    /// Headline ownership the investor buys, before any option pool.
    pub fn investor_ownership_pct(&self) -> Decimal {
        self.investment
            .checked_div(self.post_money_valuation())
            .map(|f| f * Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO)
    }

    /// Check the terms in isolation. Name uniqueness is checked by the ledger.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name == FOUNDERS || name == OPTION_POOL {
            return Err(ValidationError::ReservedName(name.to_string()));
        }
        if self.investment <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveInvestment(self.investment));
        }
        if self.pre_money_valuation <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveValuation(self.pre_money_valuation));
        }
        if self.pre_money_valuation.checked_add(self.investment).is_none() {
            return Err(ValidationError::ValuationOverflow {
                pre_money: self.pre_money_valuation,
                investment: self.investment,
            });
        }
        if self.option_pool_pct < Decimal::ZERO || self.option_pool_pct > Decimal::ONE_HUNDRED {
            return Err(ValidationError::OptionPoolOutOfRange(self.option_pool_pct));
        }
        if self.option_pool_timing == PoolTiming::Pre && self.option_pool_pct == Decimal::ONE_HUNDRED {
            return Err(ValidationError::OptionPoolSingularity(self.option_pool_pct));
        }
        if self.liquidation_preference < Decimal::ONE {
            return Err(ValidationError::InvalidLiquidationPreference(
                self.liquidation_preference,
            ));
        }
        if self.participating && self.participation_cap < Decimal::ONE {
            return Err(ValidationError::InvalidParticipationCap(self.participation_cap));
        }
        Ok(())
    }

    /// Propose terms for the round that would follow `rounds`.
    ///
    /// Rounds are named by position (`Pre-Seed`, `Seed`, `Series A`, ...).
    /// The proposal raises half of the last post-money at twice the last
    /// post-money. With no prior rounds the last post-money is taken as
    /// half the founding share count.
    pub fn suggest_next(founding_shares: Decimal, rounds: &[RoundTerms]) -> Self {
        let last_post_money = rounds
            .last()
            .map(|r| r.post_money_valuation())
            .unwrap_or(founding_shares * dec!(0.5));

        Self::new(
            suggested_round_name(rounds.len()),
            round_whole(last_post_money * dec!(0.5)),
            round_whole(last_post_money.saturating_mul(dec!(2))),
        )
    }
}

fn round_whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn suggested_round_name(position: usize) -> String {
    match position {
        0 => "Pre-Seed".to_string(),
        1 => "Seed".to_string(),
        // Series A .. Series Z, then numbered
        n if n <= 27 => format!("Series {}", (b'A' + (n - 2) as u8) as char),
        n => format!("Series {}", n - 1),
    }
}

impl fmt::Display for RoundTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {} pre ({}x",
            self.name, self.investment, self.pre_money_valuation, self.liquidation_preference
        )?;
        if self.participating {
            write!(f, " participating, {}x cap", self.participation_cap)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> RoundTerms {
        RoundTerms::new("Seed", dec!(1_000_000), dec!(4_000_000))
    }

    #[test]
    fn test_defaults_match_form_defaults() {
        let round = seed();
        assert_eq!(round.option_pool_pct, Decimal::ZERO);
        assert_eq!(round.option_pool_timing, PoolTiming::Post);
        assert_eq!(round.liquidation_preference, dec!(1));
        assert!(!round.participating);
        assert_eq!(round.participation_cap, dec!(3));
        assert_eq!(round.anti_dilution, AntiDilution::None);
        assert!(round.pro_rata_rights);
    }

    #[test]
    fn test_investor_ownership() {
        assert_eq!(seed().investor_ownership_pct(), dec!(20));
    }

    #[test]
    fn test_validation_rejects_bad_terms() {
        let mut round = seed();
        round.name = "  ".into();
        assert_eq!(round.validate(), Err(ValidationError::EmptyName));

        let round = RoundTerms::new("Seed", Decimal::ZERO, dec!(1));
        assert!(matches!(
            round.validate(),
            Err(ValidationError::NonPositiveInvestment(_))
        ));

        let round = RoundTerms::new("Seed", dec!(1), dec!(-5));
        assert!(matches!(
            round.validate(),
            Err(ValidationError::NonPositiveValuation(_))
        ));

        let round = seed().with_option_pool(dec!(101), PoolTiming::Post);
        assert!(matches!(
            round.validate(),
            Err(ValidationError::OptionPoolOutOfRange(_))
        ));

        let round = seed().with_liquidation_preference(dec!(0.5));
        assert!(matches!(
            round.validate(),
            Err(ValidationError::InvalidLiquidationPreference(_))
        ));

        let round = seed().with_participation(dec!(0.5));
        assert!(matches!(
            round.validate(),
            Err(ValidationError::InvalidParticipationCap(_))
        ));
    }

    #[test]
    fn test_full_pre_money_pool_is_a_singularity() {
        let round = seed().with_option_pool(dec!(100), PoolTiming::Pre);
        assert_eq!(
            round.validate(),
            Err(ValidationError::OptionPoolSingularity(dec!(100)))
        );
        let round = seed().with_option_pool(dec!(100), PoolTiming::Post);
        assert!(round.validate().is_ok());
    }

    #[test]
    fn test_unrepresentable_post_money_is_rejected() {
        let round = RoundTerms::new("Seed", Decimal::MAX, dec!(1));
        assert!(matches!(
            round.validate(),
            Err(ValidationError::ValuationOverflow { .. })
        ));
        assert_eq!(round.post_money_valuation(), Decimal::MAX);
    }

    #[test]
    fn test_reserved_names() {
        let round = RoundTerms::new(FOUNDERS, dec!(1), dec!(1));
        assert!(matches!(round.validate(), Err(ValidationError::ReservedName(_))));
        let round = RoundTerms::new(OPTION_POOL, dec!(1), dec!(1));
        assert!(matches!(round.validate(), Err(ValidationError::ReservedName(_))));
    }

    #[test]
    fn test_suggest_first_round() {
        let next = RoundTerms::suggest_next(dec!(1_000_000), &[]);
        assert_eq!(next.name, "Pre-Seed");
        assert_eq!(next.investment, dec!(250_000));
        assert_eq!(next.pre_money_valuation, dec!(1_000_000));
    }

    #[test]
    fn test_suggest_follows_last_post_money() {
        let rounds = vec![
            RoundTerms::new("Pre-Seed", dec!(250_000), dec!(1_000_000)),
            RoundTerms::new("Seed", dec!(1_000_000), dec!(4_000_000)),
        ];
        let next = RoundTerms::suggest_next(dec!(1_000_000), &rounds);
        assert_eq!(next.name, "Series A");
        assert_eq!(next.investment, dec!(2_500_000));
        assert_eq!(next.pre_money_valuation, dec!(10_000_000));
    }

    #[test]
    fn test_suggested_names() {
        assert_eq!(suggested_round_name(3), "Series B");
        assert_eq!(suggested_round_name(27), "Series Z");
        assert_eq!(suggested_round_name(28), "Series 27");
    }

    #[test]
    fn test_enum_wire_names() {
        let json = serde_json::to_string(&AntiDilution::FullRatchet).unwrap();
        assert_eq!(json, "\"full-ratchet\"");
        let timing: PoolTiming = serde_json::from_str("\"pre\"").unwrap();
        assert_eq!(timing, PoolTiming::Pre);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let round: RoundTerms = serde_json::from_str(
            r#"{ "name": "Seed", "investment": "1000000", "pre_money_valuation": "4000000" }"#,
        )
        .unwrap();
        assert_eq!(round, seed());
    }
}
