use crate::core::round::{AntiDilution, RoundTerms};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the common-stock holder created at founding.
pub const FOUNDERS: &str = "Founders";

/// Name of the holder that accumulates every round's option pool.
pub const OPTION_POOL: &str = "Option Pool";

/// Class of stock a shareholder holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareClass {
    Common,
    Preferred,
    Options,
}

impl fmt::Display for ShareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareClass::Common => write!(f, "Common"),
            ShareClass::Preferred => write!(f, "Preferred"),
            ShareClass::Options => write!(f, "Options"),
        }
    }
}

/// Preference terms of a preferred series, fixed when the series is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceTerms {
    pub liquidation_preference: Decimal,
    pub participating: bool,
    pub participation_cap: Decimal,
    pub anti_dilution: AntiDilution,
    pub pro_rata_rights: bool,
    /// Price per share paid at issuance. Anti-dilution re-pricing adjusts
    /// the holder's share count, never this.
    pub original_price: Decimal,
    /// Zero-based index of the issuing round; higher is more senior.
    pub seniority: usize,
}

impl PreferenceTerms {
    pub fn from_round(round: &RoundTerms, original_price: Decimal, seniority: usize) -> Self {
        Self {
            liquidation_preference: round.liquidation_preference,
            participating: round.participating,
            participation_cap: round.participation_cap,
            anti_dilution: round.anti_dilution,
            pro_rata_rights: round.pro_rata_rights,
            original_price,
            seniority,
        }
    }
}

/// A single line of the cap table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shareholder {
    pub shares: Decimal,
    pub class: ShareClass,
    /// Total capital contributed.
    pub invested: Decimal,
    /// Present only for `Preferred`.
    pub preferences: Option<PreferenceTerms>,
}

impl Shareholder {
    pub fn common(shares: Decimal) -> Self {
        Self {
            shares,
            class: ShareClass::Common,
            invested: Decimal::ZERO,
            preferences: None,
        }
    }

    pub fn options(shares: Decimal) -> Self {
        Self {
            shares,
            class: ShareClass::Options,
            invested: Decimal::ZERO,
            preferences: None,
        }
    }

    pub fn preferred(shares: Decimal, invested: Decimal, preferences: PreferenceTerms) -> Self {
        Self {
            shares,
            class: ShareClass::Preferred,
            invested,
            preferences: Some(preferences),
        }
    }

    pub fn is_preferred(&self) -> bool {
        self.class == ShareClass::Preferred
    }

    /// Preference amount owed ahead of common: invested × liquidation preference.
    /// Saturates at `Decimal::MAX`.
    pub fn preference_amount(&self) -> Decimal {
        match &self.preferences {
            Some(prefs) => self.invested.saturating_mul(prefs.liquidation_preference),
            None => Decimal::ZERO,
        }
    }

    /// Total-return ceiling for a participating holder; `None` otherwise.
    pub fn participation_ceiling(&self) -> Option<Decimal> {
        self.preferences
            .as_ref()
            .filter(|p| p.participating)
            .map(|p| p.participation_cap.saturating_mul(self.invested))
    }

    pub fn seniority(&self) -> Option<usize> {
        self.preferences.as_ref().map(|p| p.seniority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series_a() -> Shareholder {
        let round = RoundTerms::new("Series A", dec!(2_000_000), dec!(8_000_000))
            .with_liquidation_preference(dec!(1.5))
            .with_participation(dec!(3));
        Shareholder::preferred(
            dec!(500_000),
            round.investment,
            PreferenceTerms::from_round(&round, dec!(4), 1),
        )
    }

    #[test]
    fn test_preference_amount() {
        assert_eq!(series_a().preference_amount(), dec!(3_000_000));
        assert_eq!(Shareholder::common(dec!(10)).preference_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_participation_ceiling() {
        assert_eq!(series_a().participation_ceiling(), Some(dec!(6_000_000)));

        let mut holder = series_a();
        if let Some(prefs) = holder.preferences.as_mut() {
            prefs.participating = false;
        }
        assert_eq!(holder.participation_ceiling(), None);
    }

    #[test]
    fn test_classes() {
        assert!(series_a().is_preferred());
        assert_eq!(Shareholder::options(dec!(1)).class, ShareClass::Options);
        assert_eq!(series_a().seniority(), Some(1));
        assert_eq!(Shareholder::common(dec!(1)).seniority(), None);
    }
}
