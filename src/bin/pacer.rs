//! Binary entry point for the pacer operator CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pacer::{logging::init_logging, BatchPacer, RuntimeConfig};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "pacer",
    version,
    about = "Inspect graph-fetch batch pacing and connection pool configuration",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "PACER_CONFIG",
        value_name = "FILE",
        help = "Configuration file (TOML)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Tracing filter directive, e.g. `pacer=debug`"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay the batch controller against a synthetic workload.
    Simulate(SimulateCmd),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Args, Debug)]
struct SimulateCmd {
    #[arg(long, default_value_t = 20, help = "Number of batches to replay")]
    rounds: u32,

    #[arg(
        long,
        default_value_t = 1024,
        help = "Memory each fetched object occupies, in bytes"
    )]
    bytes_per_object: i64,

    #[arg(long, help = "Enable adaptive batching regardless of configuration")]
    adaptive: bool,

    #[arg(long, help = "Override the hard memory limit (bytes)")]
    hard_limit_bytes: Option<i64>,

    #[arg(long, help = "Override the soft limit percentage")]
    soft_limit_percent: Option<i64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Round {
    round: u32,
    batch_size: i64,
    memory_bytes: i64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let config = RuntimeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Simulate(cmd) => simulate(config, &cmd)?,
        Command::Config => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

fn simulate(mut config: RuntimeConfig, cmd: &SimulateCmd) -> Result<(), Box<dyn Error>> {
    if cmd.adaptive {
        config.batching.adaptive_enabled = true;
    }
    if let Some(hard) = cmd.hard_limit_bytes {
        config.batching.hard_memory_limit_bytes = hard;
    }
    if let Some(percent) = cmd.soft_limit_percent {
        config.batching.soft_limit_percent = percent;
    }
    config.validate()?;

    let mut pacer = BatchPacer::new(config.batching);
    let mut size = pacer.first_batch_size();
    let mut rounds = Vec::with_capacity(cmd.rounds as usize);
    for round in 1..=cmd.rounds {
        let memory_bytes = size.saturating_mul(cmd.bytes_per_object);
        rounds.push(Round {
            round,
            batch_size: size,
            memory_bytes,
        });
        size = pacer.record_batch(memory_bytes);
    }

    match cmd.format {
        OutputFormat::Text => {
            println!("round\tbatch_size\tmemory_bytes");
            for round in &rounds {
                println!(
                    "{}\t{}\t{}",
                    round.round, round.batch_size, round.memory_bytes
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rounds)?),
    }
    Ok(())
}
