//! fairseed command line
//!
//! Offline tools for players and auditors: hash a seed, recompute draws and
//! game outcomes, and verify saved game results.

use clap::{Args, Parser, Subcommand};
use fairseed::config::ConfigLoader;
use fairseed::games::blackjack::shuffled_deck;
use fairseed::games::dice::Direction;
use fairseed::games::plinko::Risk;
use fairseed::games::types::GameResult;
use fairseed::games::verify::{replay_dice, replay_plinko, verify_result};
use fairseed::{draw, draw_int, hash_server_seed, init_tracing, DrawInput, FairseedResult};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fairseed")]
#[command(about = "Provably fair outcome tools", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SeedArgs {
    #[arg(long)]
    server_seed: String,
    #[arg(long)]
    client_seed: String,
    #[arg(long)]
    nonce: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SHA-256 commitment of a server seed
    Hash { server_seed: String },
    /// Recompute a raw draw
    Draw {
        #[command(flatten)]
        seeds: SeedArgs,
        #[arg(long, default_value_t = 0)]
        sub_index: u32,
        /// Scale to an integer in [0, max)
        #[arg(long)]
        max: Option<u32>,
    },
    /// Recompute a dice roll
    Dice {
        #[command(flatten)]
        seeds: SeedArgs,
        #[arg(long)]
        target: u8,
        #[arg(long, default_value = "under")]
        direction: Direction,
    },
    /// Print the shuffled blackjack deck for a nonce
    Deck {
        #[command(flatten)]
        seeds: SeedArgs,
    },
    /// Recompute a plinko drop
    Plinko {
        #[command(flatten)]
        seeds: SeedArgs,
        #[arg(long)]
        rows: u8,
        #[arg(long, default_value = "medium")]
        risk: Risk,
    },
    /// Verify a saved game result against its revealed server seed
    Verify {
        #[arg(long)]
        server_seed: String,
        /// JSON file holding the game result
        #[arg(long)]
        result: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> FairseedResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> FairseedResult<bool> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Hash { server_seed } => {
            println!("{}", hash_server_seed(&server_seed));
        }
        Command::Draw {
            seeds,
            sub_index,
            max,
        } => {
            let input = DrawInput::new(&seeds.server_seed, &seeds.client_seed, seeds.nonce)?;
            let value = draw(&seeds.server_seed, &seeds.client_seed, seeds.nonce, sub_index)?;
            let scaled = match max {
                Some(max) => Some(draw_int(
                    &seeds.server_seed,
                    &seeds.client_seed,
                    seeds.nonce,
                    sub_index,
                    max,
                )?),
                None => None,
            };
            print_json(&json!({
                "digest": input.digest(sub_index),
                "draw": value,
                "int": scaled,
            }))?;
        }
        Command::Dice {
            seeds,
            target,
            direction,
        } => {
            let outcome = replay_dice(
                &seeds.server_seed,
                &seeds.client_seed,
                seeds.nonce,
                target,
                direction,
                config.games.house_edge_percent,
            )?;
            print_json(&outcome)?;
        }
        Command::Deck { seeds } => {
            let input = DrawInput::new(&seeds.server_seed, &seeds.client_seed, seeds.nonce)?;
            let deck = shuffled_deck(&input)?;
            for (position, card) in deck.iter().enumerate() {
                println!("{:>2}  {}", position, card);
            }
        }
        Command::Plinko { seeds, rows, risk } => {
            let (outcome, path) =
                replay_plinko(&seeds.server_seed, &seeds.client_seed, seeds.nonce, rows, risk)?;
            print_json(&json!({ "outcome": outcome, "path": path }))?;
        }
        Command::Verify { server_seed, result } => {
            let content = std::fs::read_to_string(&result)?;
            let game: GameResult = serde_json::from_str(&content)?;
            let report = verify_result(&server_seed, &game)?;
            print_json(&report)?;
            if report.is_valid() {
                eprintln!("✅ Game {} verified", report.game_id);
            } else {
                eprintln!("❌ Game {} failed verification", report.game_id);
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
