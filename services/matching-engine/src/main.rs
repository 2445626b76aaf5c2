//! Operator tool for a matching engine journal
//!
//! `replay` rebuilds the engine from the journal and prints the book, the
//! balances and the state digest. `verify` replays twice into fresh engines
//! and fails unless both digests agree.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use matching_engine::{load_seed, EngineConfig, MatchingEngine};
use std::path::PathBuf;
use types::account::SeedBalance;
use types::ids::TradingPair;

#[derive(Parser, Debug)]
#[command(name = "matching-engine")]
#[command(version, about = "Single-pair matching engine journal tools", long_about = None)]
struct Cli {
    /// Directory holding the transaction log
    #[arg(short = 'j', long, default_value = "./journal")]
    journal_dir: PathBuf,

    /// Trading pair served by the engine, as BASE/QUOTE
    #[arg(short, long, default_value = "X/USD")]
    pair: String,

    /// JSON file with starting balances
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Replay the journal and print the resulting state
    Replay,
    /// Replay the journal twice and compare state digests
    Verify,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let pair: TradingPair = cli
        .pair
        .parse()
        .with_context(|| format!("invalid trading pair {:?}", cli.pair))?;
    let seed = match &cli.seed {
        Some(path) => load_seed(path)?,
        None => Vec::new(),
    };
    let config = EngineConfig::new(pair, &cli.journal_dir);

    match cli.command {
        Command::Replay => replay(config, &seed),
        Command::Verify => verify(config, &seed),
    }
}

fn start(config: EngineConfig, seed: &[SeedBalance]) -> Result<MatchingEngine> {
    let engine = MatchingEngine::new(config);
    engine.init(seed)?;
    engine
        .replay_all()
        .context("journal replay failed; refusing to start")?;
    Ok(engine)
}

fn replay(config: EngineConfig, seed: &[SeedBalance]) -> Result<()> {
    let engine = start(config, seed)?;

    let book = engine.get_orders();
    println!("{}", serde_json::to_string_pretty(&book)?);
    for (asset, total) in engine.total_balances() {
        println!("total {:<8} {}", asset, total.normalize());
    }
    println!("digest {}", engine.state_digest());
    Ok(())
}

fn verify(config: EngineConfig, seed: &[SeedBalance]) -> Result<()> {
    let first = start(config.clone(), seed)?.state_digest();
    let second = start(config, seed)?.state_digest();

    if first != second {
        bail!("replay is not deterministic: {} != {}", first, second);
    }
    println!("ok {}", first);
    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["matching-engine", "replay"]);
        assert_eq!(cli.journal_dir, PathBuf::from("./journal"));
        assert_eq!(cli.pair, "X/USD");
        assert!(cli.seed.is_none());
        assert_eq!(cli.command, Command::Replay);
    }

    #[test]
    fn test_cli_custom() {
        let cli = Cli::parse_from([
            "matching-engine",
            "--journal-dir",
            "/var/lib/engine",
            "--pair",
            "BTC/USDT",
            "--seed",
            "seed.json",
            "verify",
        ]);
        assert_eq!(cli.journal_dir, PathBuf::from("/var/lib/engine"));
        assert_eq!(cli.pair, "BTC/USDT");
        assert_eq!(cli.seed, Some(PathBuf::from("seed.json")));
        assert_eq!(cli.command, Command::Verify);
    }
}
