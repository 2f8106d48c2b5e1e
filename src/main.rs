//! cap-table CLI
//!
//! Evolve a cap table and run exit waterfalls from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show the cap table after every round
//! cap-table table --input scenario.json
//!
//! # Distribute a $50M exit over the final cap table
//! cap-table waterfall --input scenario.json --exit 50000000
//!
//! # Propose terms for the next round
//! cap-table suggest --input scenario.json
//!
//! # Generate a random financing history
//! cap-table generate --rounds 6 --seed 42
//! ```

use cap_table_engine::core::ledger::compute_cap_table;
use cap_table_engine::core::round::RoundTerms;
use cap_table_engine::core::snapshot::CapTableSnapshot;
use cap_table_engine::exit::summary::CapTableSummary;
use cap_table_engine::exit::waterfall::{compute_liquidation, WaterfallResult};
use cap_table_engine::simulation::scenario::{generate_financing_history, ScenarioConfig};
use rust_decimal::Decimal;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"cap-table — cap table evolution and liquidation waterfalls

USAGE:
    cap-table <COMMAND> [OPTIONS]

COMMANDS:
    table       Show the cap table after founding and every round
    waterfall   Distribute an exit valuation over the final cap table
    suggest     Propose terms for the next round
    generate    Generate a random financing history (for testing)
    help        Show this message

OPTIONS (table, waterfall, suggest):
    --input <FILE>      Path to JSON scenario file
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (waterfall):
    --exit <AMOUNT>     Exit valuation (default: scenario exit_valuation,
                        else the latest post-money valuation)

OPTIONS (generate):
    --rounds <N>        Number of rounds (default: 5)
    --seed <N>          Seed for a reproducible history
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    cap-table table --input scenario.json
    cap-table waterfall --input scenario.json --exit 50000000 --format json
    cap-table suggest --input scenario.json
    cap-table generate --rounds 6 --seed 42 --output scenario.json"#
    );
}

/// JSON schema for scenario files.
#[derive(serde::Deserialize, serde::Serialize)]
struct ScenarioFile {
    founding_shares: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exit_valuation: Option<Decimal>,
    #[serde(default)]
    rounds: Vec<RoundTerms>,
}

#[derive(serde::Serialize)]
struct WaterfallOutput<'a> {
    waterfall: &'a WaterfallResult,
    summary: Option<CapTableSummary>,
}

/// Options shared by the commands that read a scenario.
struct InputOptions {
    input: String,
    format: String,
    exit: Option<Decimal>,
}

fn parse_input_options(args: &[String], allow_exit: bool) -> InputOptions {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut exit = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            "--exit" if allow_exit => {
                i += 1;
                exit = Some(
                    args.get(i)
                        .and_then(|s| s.parse::<Decimal>().ok())
                        .unwrap_or_else(|| {
                            eprintln!("--exit requires an amount");
                            process::exit(1);
                        }),
                );
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    InputOptions {
        input,
        format,
        exit,
    }
}

fn load_scenario(path: &str) -> ScenarioFile {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "founding_shares": "10000000",
  "exit_valuation": "50000000",
  "rounds": [
    {{ "name": "Seed", "investment": "1000000", "pre_money_valuation": "4000000" }}
  ]
}}"#
        );
        process::exit(1);
    })
}

fn build_history(scenario: &ScenarioFile) -> Vec<CapTableSnapshot> {
    compute_cap_table(scenario.founding_shares, &scenario.rounds).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing output: {}", e);
        process::exit(1);
    })
}

fn cmd_table(args: &[String]) {
    let options = parse_input_options(args, false);
    let scenario = load_scenario(&options.input);
    let history = build_history(&scenario);

    if options.format == "json" {
        println!("{}", to_json(&history));
    } else {
        for snapshot in &history {
            println!("{}", snapshot);
        }
        if let Some(summary) = CapTableSummary::build(&history, None) {
            println!("{}", summary);
        }
    }
}

fn cmd_waterfall(args: &[String]) {
    let options = parse_input_options(args, true);
    let scenario = load_scenario(&options.input);
    let history = build_history(&scenario);
    let latest = match history.last() {
        Some(latest) => latest,
        None => {
            eprintln!("Error: empty cap table history");
            process::exit(1);
        }
    };

    let exit_valuation = options
        .exit
        .or(scenario.exit_valuation)
        .unwrap_or(latest.post_money_valuation);

    let result = compute_liquidation(latest, exit_valuation).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });
    let summary = CapTableSummary::build(&history, Some(&result));

    if options.format == "json" {
        let output = WaterfallOutput {
            waterfall: &result,
            summary,
        };
        println!("{}", to_json(&output));
    } else {
        println!("{}", result);
        if let Some(summary) = summary {
            println!("{}", summary);
        }
    }
}

fn cmd_suggest(args: &[String]) {
    let options = parse_input_options(args, false);
    let scenario = load_scenario(&options.input);
    let suggestion = RoundTerms::suggest_next(scenario.founding_shares, &scenario.rounds);

    if options.format == "json" {
        println!("{}", to_json(&suggestion));
    } else {
        println!("Suggested next round: {}", suggestion);
        println!(
            "Post-money {} | investor ownership {}%",
            suggestion.post_money_valuation(),
            suggestion.investor_ownership_pct().round_dp(2)
        );
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = ScenarioConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--rounds" => {
                i += 1;
                config.round_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--rounds requires a number");
                        process::exit(1);
                    });
            }
            "--seed" => {
                i += 1;
                config.seed = Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--seed requires a number");
                    process::exit(1);
                }));
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let history = generate_financing_history(&config);
    let round_count = history.rounds.len();
    let output = ScenarioFile {
        founding_shares: history.founding_shares,
        exit_valuation: None,
        rounds: history.rounds,
    };

    let json = to_json(&output);

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!("Generated {} rounds → {}", round_count, path);
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "table" => cmd_table(rest),
        "waterfall" => cmd_waterfall(rest),
        "suggest" => cmd_suggest(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
