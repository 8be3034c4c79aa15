use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use powledger_core::chain::Chain;
use powledger_core::constants::DEFAULT_DIFFICULTY;
use powledger_core::events::{ChainEvent, EventSink};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powledger")]
#[command(about = "Minimal proof-of-work ledger demo")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the canonical two-transfer demo and validate the chain
    Demo {
        /// Leading zero hex characters required per mined block
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: u32,
    },
    /// Append the given transactions and validate the chain
    Run {
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: u32,
        /// Transaction as FROM:TO:AMOUNT (repeatable)
        #[arg(long = "tx")]
        txs: Vec<String>,
    },
}

/// Forwards chain events to tracing. The core emits events through this
/// sink instead of owning any global logging state.
struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&self, event: &ChainEvent<'_>) {
        match event {
            ChainEvent::ChainCreated { difficulty } => {
                debug!(difficulty, "chain created");
            }
            ChainEvent::BlockMined { index, attempts, hash } => {
                debug!(index, attempts, hash, "block mined");
            }
            ChainEvent::BlockAppended { index } => {
                debug!(index, "block appended");
            }
            ChainEvent::Validated { valid } => {
                info!(valid, "chain validated");
            }
        }
    }
}

fn parse_tx(spec: &str) -> Result<(String, String, f64)> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        bail!("expected FROM:TO:AMOUNT, got {spec:?}");
    }
    let amount: f64 = parts[2]
        .parse()
        .with_context(|| format!("bad amount in {spec:?}"))?;
    Ok((parts[0].to_string(), parts[1].to_string(), amount))
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo { difficulty } => {
            let mut chain = Chain::with_sink(difficulty, Arc::new(TracingSink));
            chain.append("Alice", "Bob", 5.0)?;
            chain.append("John", "Bob", 2.0)?;
            println!("{}", chain.is_valid()?);
        }
        Command::Run { difficulty, txs } => {
            let mut chain = Chain::with_sink(difficulty, Arc::new(TracingSink));
            for spec in &txs {
                let (from, to, amount) = parse_tx(spec)?;
                chain.append(from, to, amount)?;
            }
            println!("{}", chain.is_valid()?);
        }
    }
    Ok(())
}
