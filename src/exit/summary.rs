use crate::core::shareholder::FOUNDERS;
use crate::core::snapshot::CapTableSnapshot;
use crate::exit::waterfall::WaterfallResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Return of one preferred investor at a given exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorReturn {
    pub name: String,
    pub invested: Decimal,
    pub proceeds: Decimal,
    pub multiple: Decimal,
}

/// Exit-side figures of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOutcome {
    pub exit_valuation: Decimal,
    pub founder_proceeds: Decimal,
    /// Founders' share of the exit, in percent.
    pub founder_percent_of_total: Decimal,
    /// Exit valuation / total capital invested; `None` with no investment.
    pub exit_to_invested: Option<Decimal>,
    /// In issuance order.
    pub investor_returns: Vec<InvestorReturn>,
}

/// Headline figures for a financing history and, optionally, an exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapTableSummary {
    pub rounds: usize,
    pub founder_ownership: Decimal,
    /// Percentage points the founders have given up since founding.
    pub founder_dilution: Decimal,
    /// Latest round price / first round price; `None` before any round.
    pub share_price_appreciation: Option<Decimal>,
    pub post_money_valuation: Decimal,
    pub total_invested: Decimal,
    pub exit: Option<ExitOutcome>,
}

impl CapTableSummary {
    /// Summarise a history (founding snapshot first). Returns `None` for an
    /// empty history.
    pub fn build(history: &[CapTableSnapshot], waterfall: Option<&WaterfallResult>) -> Option<Self> {
        let latest = history.last()?;
        let founder_ownership = latest.ownership_of(FOUNDERS);

        let share_price_appreciation = history
            .get(1)
            .filter(|first| first.share_price > Decimal::ZERO)
            .and_then(|first| latest.share_price.checked_div(first.share_price));

        let total_invested = latest
            .shareholders
            .values()
            .fold(Decimal::ZERO, |total, h| total.saturating_add(h.invested));

        let exit = waterfall.map(|result| {
            let investor_returns = latest
                .preferred_by_seniority()
                .into_iter()
                .rev()
                .map(|(name, holder)| {
                    let dist = result.distribution(name);
                    InvestorReturn {
                        name: name.to_string(),
                        invested: holder.invested,
                        proceeds: dist.map(|d| d.proceeds).unwrap_or(Decimal::ZERO),
                        multiple: dist.map(|d| d.multiple).unwrap_or(Decimal::ZERO),
                    }
                })
                .collect();

            ExitOutcome {
                exit_valuation: result.exit_valuation(),
                founder_proceeds: result.proceeds_of(FOUNDERS),
                founder_percent_of_total: result
                    .distribution(FOUNDERS)
                    .map(|d| d.percent_of_total)
                    .unwrap_or(Decimal::ZERO),
                exit_to_invested: result
                    .exit_valuation()
                    .checked_div(total_invested)
                    .filter(|_| total_invested > Decimal::ZERO),
                investor_returns,
            }
        });

        Some(Self {
            rounds: history.len() - 1,
            founder_ownership,
            founder_dilution: Decimal::ONE_HUNDRED - founder_ownership,
            share_price_appreciation,
            post_money_valuation: latest.post_money_valuation,
            total_invested,
            exit,
        })
    }
}

impl fmt::Display for CapTableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Summary ===")?;
        writeln!(
            f,
            "Founders own {}% after {} round(s) ({} points of dilution)",
            self.founder_ownership.round_dp(1),
            self.rounds,
            self.founder_dilution.round_dp(1)
        )?;
        match self.share_price_appreciation {
            Some(x) => writeln!(f, "Share price appreciation: {}x since the first round", x.round_dp(1))?,
            None => writeln!(f, "Share price appreciation: N/A")?,
        }
        writeln!(f, "Post-money valuation: {}", self.post_money_valuation.round_dp(2))?;
        writeln!(f, "Total invested:       {}", self.total_invested.round_dp(2))?;

        if let Some(exit) = &self.exit {
            writeln!(
                f,
                "At a {} exit, founders receive {} ({}% of proceeds)",
                exit.exit_valuation.round_dp(2),
                exit.founder_proceeds.round_dp(2),
                exit.founder_percent_of_total.round_dp(1)
            )?;
            if let Some(multiple) = exit.exit_to_invested {
                writeln!(f, "Exit / invested:      {}x", multiple.round_dp(2))?;
            }
            let returns: Vec<String> = exit
                .investor_returns
                .iter()
                .map(|r| format!("{} {}x", r.name, r.multiple.round_dp(1)))
                .collect();
            if !returns.is_empty() {
                writeln!(f, "Investor returns:     {}", returns.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::compute_cap_table;
    use crate::core::round::RoundTerms;
    use crate::exit::waterfall::compute_liquidation;
    use rust_decimal_macros::dec;

    fn history() -> Vec<CapTableSnapshot> {
        compute_cap_table(
            dec!(1_000_000),
            &[
                RoundTerms::new("Seed", dec!(1_000_000), dec!(4_000_000)),
                RoundTerms::new("Series A", dec!(5_000_000), dec!(20_000_000)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_summary_without_exit() {
        let history = history();
        let summary = CapTableSummary::build(&history, None).unwrap();

        assert_eq!(summary.rounds, 2);
        assert_eq!(summary.total_invested, dec!(6_000_000));
        assert_eq!(summary.post_money_valuation, dec!(25_000_000));
        // Seed at $4.00, Series A at $16.00
        assert_eq!(summary.share_price_appreciation, Some(dec!(4)));
        // 80% after seed, then 80% of that
        assert_eq!(summary.founder_ownership, dec!(64));
        assert_eq!(summary.founder_dilution, dec!(36));
        assert!(summary.exit.is_none());
    }

    #[test]
    fn test_summary_with_exit() {
        let history = history();
        let waterfall = compute_liquidation(&history[2], dec!(60_000_000)).unwrap();
        let summary = CapTableSummary::build(&history, Some(&waterfall)).unwrap();

        let exit = summary.exit.unwrap();
        assert_eq!(exit.exit_to_invested, Some(dec!(10)));
        assert_eq!(exit.investor_returns.len(), 2);
        assert_eq!(exit.investor_returns[0].name, "Seed");
        assert_eq!(exit.investor_returns[1].name, "Series A");
        assert_eq!(exit.founder_proceeds, waterfall.proceeds_of(FOUNDERS));
    }

    #[test]
    fn test_founding_only_summary() {
        let history = compute_cap_table(dec!(1_000_000), &[]).unwrap();
        let summary = CapTableSummary::build(&history, None).unwrap();
        assert_eq!(summary.rounds, 0);
        assert_eq!(summary.founder_dilution, Decimal::ZERO);
        assert_eq!(summary.share_price_appreciation, None);
        assert!(CapTableSummary::build(&[], None).is_none());
    }
}
