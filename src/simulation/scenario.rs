//! Random financing histories for stress testing and benchmarks.
//!
//! Each generated round starts from the next-round suggestion and then
//! perturbs valuation, size and preference terms. Every history produced
//! here passes ledger validation.

use crate::core::round::{AntiDilution, PoolTiming, RoundTerms};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for generating a random financing history.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Number of rounds after founding.
    pub round_count: usize,
    pub founding_shares: Decimal,
    /// Chance that a round is priced below the previous post-money.
    pub down_round_probability: f64,
    /// Fixed seed for reproducible histories; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            round_count: 5,
            founding_shares: Decimal::from(10_000_000),
            down_round_probability: 0.2,
            seed: None,
        }
    }
}

/// A founding share count and the rounds that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingHistory {
    pub founding_shares: Decimal,
    pub rounds: Vec<RoundTerms>,
}

/// Generate a random, valid financing history.
pub fn generate_financing_history(config: &ScenarioConfig) -> FinancingHistory {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let founding_shares = config.founding_shares.max(Decimal::ONE);
    let down_probability = config.down_round_probability.clamp(0.0, 1.0);

    let mut rounds: Vec<RoundTerms> = Vec::with_capacity(config.round_count);
    for _ in 0..config.round_count {
        let suggestion = RoundTerms::suggest_next(founding_shares, &rounds);
        let last_post_money = suggestion.pre_money_valuation / Decimal::TWO;

        // Valuation step in percent of the last post-money.
        let step = if !rounds.is_empty() && rng.gen_bool(down_probability) {
            rng.gen_range(30..=90)
        } else {
            rng.gen_range(120..=300)
        };
        let pre_money = whole_at_least_one(last_post_money * percent(step));
        let investment = whole_at_least_one(pre_money * percent(rng.gen_range(10..=40)));

        let mut round = RoundTerms::new(suggestion.name, investment, pre_money)
            .with_pro_rata_rights(rng.gen_bool(0.7));

        if rng.gen_bool(0.5) {
            let pct = Decimal::from(rng.gen_range(1..=4) * 5);
            let timing = if rng.gen_bool(0.5) {
                PoolTiming::Pre
            } else {
                PoolTiming::Post
            };
            round = round.with_option_pool(pct, timing);
        }
        if rng.gen_bool(0.2) {
            round = round.with_liquidation_preference(Decimal::from(rng.gen_range(2..=3)));
        }
        if rng.gen_bool(0.3) {
            round = round.with_participation(Decimal::from(rng.gen_range(2..=4)));
        }
        round = round.with_anti_dilution(match rng.gen_range(0..3) {
            0 => AntiDilution::None,
            1 => AntiDilution::FullRatchet,
            _ => AntiDilution::WeightedAverage,
        });

        debug!("generated {}", round);
        rounds.push(round);
    }

    FinancingHistory {
        founding_shares,
        rounds,
    }
}

fn percent(value: u32) -> Decimal {
    Decimal::from(value) / Decimal::ONE_HUNDRED
}

fn whole_at_least_one(amount: Decimal) -> Decimal {
    amount.round_dp(0).max(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::compute_cap_table;

    fn seeded(seed: u64) -> ScenarioConfig {
        ScenarioConfig {
            round_count: 8,
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_generated_history_is_valid() {
        for seed in 0..20 {
            let history = generate_financing_history(&seeded(seed));
            assert_eq!(history.rounds.len(), 8);
            for round in &history.rounds {
                assert!(round.validate().is_ok(), "invalid round {}", round);
            }
            let snapshots = compute_cap_table(history.founding_shares, &history.rounds).unwrap();
            assert_eq!(snapshots.len(), 9);
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        assert_eq!(
            generate_financing_history(&seeded(42)),
            generate_financing_history(&seeded(42))
        );
    }

    #[test]
    fn test_round_names_follow_sequence() {
        let history = generate_financing_history(&seeded(7));
        let names: Vec<&str> = history.rounds.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(&names[..4], &["Pre-Seed", "Seed", "Series A", "Series B"]);
    }

    #[test]
    fn test_certain_down_rounds() {
        let config = ScenarioConfig {
            round_count: 4,
            down_round_probability: 1.0,
            seed: Some(3),
            ..Default::default()
        };
        let history = generate_financing_history(&config);
        for pair in history.rounds.windows(2) {
            assert!(pair[1].pre_money_valuation < pair[0].post_money_valuation());
        }
    }
}
