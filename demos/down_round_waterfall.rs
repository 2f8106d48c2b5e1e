//! Down round and exit waterfall example.
//!
//! A protected Series A is repriced by a down Series B, then the company
//! exits at three different valuations to show how preferences and
//! participation caps split the proceeds.

use cap_table_engine::prelude::*;
use rust_decimal_macros::dec;

fn main() {
    println!("╔═══════════════════════════════════════════════╗");
    println!("║  cap-table-engine: Down Round Waterfall       ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    let rounds = vec![
        RoundTerms::new("Seed", dec!(1_000_000), dec!(4_000_000)),
        RoundTerms::new("Series A", dec!(6_000_000), dec!(24_000_000))
            .with_participation(dec!(3))
            .with_anti_dilution(AntiDilution::WeightedAverage),
        RoundTerms::new("Series B", dec!(5_000_000), dec!(10_000_000))
            .with_liquidation_preference(dec!(2))
            .with_anti_dilution(AntiDilution::WeightedAverage),
    ];

    let history = match compute_cap_table(dec!(10_000_000), &rounds) {
        Ok(history) => history,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    // --- Scenario 1: The down round ---
    println!("━━━ Scenario 1: Series B down round ━━━\n");

    let latest = &history[history.len() - 1];
    println!("{}", latest);
    if let Some(details) = &latest.round_details {
        for adj in &details.anti_dilution_adjustments {
            println!(
                "  {} re-converted at {}: {} → {} shares",
                adj.holder,
                adj.effective_price.round_dp(4),
                adj.shares_before.round_dp(0),
                adj.shares_after.round_dp(0)
            );
        }
        println!();
    }

    // --- Scenario 2: Exits ---
    for exit in [dec!(8_000_000), dec!(40_000_000), dec!(200_000_000)] {
        println!("━━━ Scenario 2: Exit at ${} ━━━\n", exit);
        match compute_liquidation(latest, exit) {
            Ok(result) => {
                println!("{}", result);
                if let Some(summary) = CapTableSummary::build(&history, Some(&result)) {
                    println!("{}", summary);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
}
