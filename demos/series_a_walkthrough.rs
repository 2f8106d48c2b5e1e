//! Seed to Series A walkthrough.
//!
//! Builds a cap table round by round through the ledger, showing how
//! option pool timing moves dilution between founders and investors.

use cap_table_engine::core::ledger::CapTableLedger;
use cap_table_engine::core::round::{PoolTiming, RoundTerms};
use cap_table_engine::core::shareholder::{FOUNDERS, OPTION_POOL};
use cap_table_engine::exit::summary::CapTableSummary;
use rust_decimal_macros::dec;

fn main() {
    println!("╔═══════════════════════════════════════════════╗");
    println!("║  cap-table-engine: Seed to Series A Example   ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    let mut ledger = match CapTableLedger::new(dec!(10_000_000)) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    // --- Scenario 1: Seed with a post-money pool ---
    println!("━━━ Scenario 1: Seed, 10% post-money pool ━━━\n");

    let seed = RoundTerms::new("Seed", dec!(2_000_000), dec!(8_000_000))
        .with_option_pool(dec!(10), PoolTiming::Post);
    match ledger.add_round(seed) {
        Ok(snapshot) => println!("{}", snapshot),
        Err(e) => eprintln!("Seed rejected: {}", e),
    }

    // --- Scenario 2: Series A with the pool carved out pre-money ---
    println!("━━━ Scenario 2: Series A, 15% pre-money pool ━━━\n");

    let suggested = RoundTerms::suggest_next(ledger.founding_shares(), ledger.rounds());
    println!("Suggested: {}\n", suggested);

    let series_a = RoundTerms::new("Series A", dec!(10_000_000), dec!(30_000_000))
        .with_option_pool(dec!(15), PoolTiming::Pre);
    match ledger.add_round(series_a) {
        Ok(snapshot) => println!("{}", snapshot),
        Err(e) => eprintln!("Series A rejected: {}", e),
    }

    // --- Scenario 3: Same Series A with a post-money pool ---
    println!("━━━ Scenario 3: Series A, pool moved post-money ━━━\n");

    let pre_money_founders = ledger.latest().ownership_of(FOUNDERS);
    let post_timing = RoundTerms::new("Series A", dec!(10_000_000), dec!(30_000_000))
        .with_option_pool(dec!(15), PoolTiming::Post);
    if let Err(e) = ledger.update_round(1, post_timing) {
        eprintln!("update rejected: {}", e);
    }
    let latest = ledger.latest();
    println!(
        "  Founders:    {:>6}% (pre-money pool) vs {:>6}% (post-money pool)",
        pre_money_founders.round_dp(2),
        latest.ownership_of(FOUNDERS).round_dp(2)
    );
    println!(
        "  Series A:    {:>6}%",
        latest.ownership_of("Series A").round_dp(2)
    );
    println!(
        "  Option Pool: {:>6}%\n",
        latest.ownership_of(OPTION_POOL).round_dp(2)
    );

    if let Some(summary) = CapTableSummary::build(ledger.snapshots(), None) {
        println!("{}", summary);
    }
}
