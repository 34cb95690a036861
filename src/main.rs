use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use nexus_client::session::{
    AbortOutcome, StartParams, ABORT_ANNOUNCEMENT, ABORT_CONFIRMATION_PROMPT, ABORT_REFUSAL,
};
use nexus_client::simulator::{self, Scenario, SimulatorOptions};

#[derive(Parser)]
#[command(
    name = "nexus-client",
    about = "Desktop compliance client for the Nexus session controller",
    version
)]
struct Cli {
    /// Path to the local settings file (created with defaults on first run)
    #[arg(long, global = true, default_value = "nexus-client.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full client: status polling, head tracking, media delivery.
    /// Orientation samples are read as JSON lines from stdin.
    Run,
    /// Start a session on the controller (durations in minutes)
    Start {
        #[arg(long, default_value_t = 0)]
        pre_wait_min: u64,
        #[arg(long, default_value_t = 0)]
        decision_hold_min: u64,
        #[arg(long, default_value_t = 0)]
        punishment_delay_min: u64,
        /// Lower bound for the main phase
        #[arg(long, default_value_t = 30)]
        main_min: u64,
        /// Upper bound for the main phase
        #[arg(long, default_value_t = 120)]
        main_max: u64,
    },
    /// Abort the running session (refused in strict/hardcore mode)
    Abort {
        /// Confirm the abort instead of being prompted
        #[arg(long)]
        yes: bool,
    },
    /// Emit a synthetic orientation feed on stdout, for piping into `run`
    Simulate {
        #[arg(long, value_enum, default_value = "attentive")]
        scenario: Scenario,
        /// Milliseconds between samples
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
        /// Seed for a reproducible stream
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run => nexus_client::run(cli.settings).await,
        Command::Start {
            pre_wait_min,
            decision_hold_min,
            punishment_delay_min,
            main_min,
            main_max,
        } => {
            let params = StartParams {
                pre_wait_min,
                decision_hold_min,
                punishment_delay_min,
                main_min_minutes: main_min,
                main_max_minutes: main_max,
            };
            nexus_client::run_start(cli.settings, params).await?;
            println!("Session started.");
            Ok(())
        }
        Command::Abort { yes } => {
            match nexus_client::run_abort(cli.settings, yes).await? {
                AbortOutcome::Refused => println!("{ABORT_REFUSAL}"),
                AbortOutcome::NeedsConfirmation => {
                    println!("{ABORT_CONFIRMATION_PROMPT} Re-run with --yes to confirm.")
                }
                AbortOutcome::Aborted => println!("{ABORT_ANNOUNCEMENT}"),
            }
            Ok(())
        }
        Command::Simulate {
            scenario,
            interval_ms,
            seed,
        } => {
            simulator::run(SimulatorOptions {
                scenario,
                interval_ms,
                seed,
            })
            .await
        }
    }
}
