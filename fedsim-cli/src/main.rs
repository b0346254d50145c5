//! fedsim CLI — run and inspect training-loop experiments.
//!
//! `fedsim run` drives the built-in synthetic task (centralized or
//! federated) against a run directory; re-running with the same directory
//! resumes from the latest checkpoint. `history` and `checkpoints`
//! inspect an existing run directory.

mod synthetic;

use clap::Parser;
use fedsim_loop::{
    CentralizedExecutor, CheckpointManager, FederatedExecutor, FederatedState, LrSchedule,
    MetricsManager, RunConfig, TrainingLoop,
};
use std::path::PathBuf;
use synthetic::{LinearState, SyntheticClients, SyntheticRegression};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// fedsim: resumable training-loop experiments
#[derive(Parser, Debug)]
#[command(name = "fedsim", version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the built-in synthetic experiment (resumes if the run
    /// directory already has checkpoints)
    Run {
        /// Run directory (created on first use)
        #[arg(long)]
        run_dir: PathBuf,

        /// Experiment flavor
        #[arg(long, value_enum, default_value = "centralized")]
        mode: Mode,

        /// TOML run configuration; flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        total_rounds: Option<u64>,

        #[arg(long)]
        rounds_per_checkpoint: Option<u64>,

        #[arg(long)]
        rounds_per_eval: Option<u64>,

        /// Checkpoint records to retain
        #[arg(long)]
        retention: Option<usize>,

        /// Simulated client population (federated mode)
        #[arg(long, default_value_t = 10)]
        clients: u64,

        /// Clients sampled per round (federated mode)
        #[arg(long, default_value_t = 4)]
        clients_per_round: usize,

        /// Seed for data generation and client sampling
        #[arg(long, default_value_t = 17)]
        seed: u64,
    },
    /// Print a run directory's metric history as a table
    History {
        run_dir: PathBuf,
    },
    /// List a run directory's retained checkpoints
    Checkpoints {
        run_dir: PathBuf,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Centralized,
    Federated,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Human-readable stderr plus JSON file logging, like any long-running
    // research job wants.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "fedsim", "fedsim")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "fedsim.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    match cli.command {
        Commands::Run {
            run_dir,
            mode,
            config,
            total_rounds,
            rounds_per_checkpoint,
            rounds_per_eval,
            retention,
            clients,
            clients_per_round,
            seed,
        } => {
            let mut run_config = match config {
                Some(path) => RunConfig::load(&path)?,
                None => RunConfig::new(&run_dir),
            };
            run_config.run_dir = run_dir;
            if let Some(v) = total_rounds {
                run_config.total_rounds = v;
            }
            if let Some(v) = rounds_per_checkpoint {
                run_config.rounds_per_checkpoint = v;
            }
            if let Some(v) = rounds_per_eval {
                run_config.rounds_per_eval = v;
            }
            if let Some(v) = retention {
                run_config.checkpoint_retention = v;
            }
            run(run_config, mode, clients, clients_per_round, seed)
        }
        Commands::History { run_dir } => history(&run_dir),
        Commands::Checkpoints { run_dir } => checkpoints(&run_dir),
    }
}

fn run(
    config: RunConfig,
    mode: Mode,
    clients: u64,
    clients_per_round: usize,
    seed: u64,
) -> anyhow::Result<()> {
    tracing::info!(?mode, run_dir = %config.run_dir.display(), "starting run");
    let mut training = TrainingLoop::new(config)?;

    let (rounds_completed, transient_failures, wall_clock) = match mode {
        Mode::Centralized => {
            let task = SyntheticRegression::new(seed, 400, 100);
            let schedule = LrSchedule::InvSqrtDecay {
                base: 0.3,
                decay_rate: 0.05,
            };
            let mut executor = CentralizedExecutor::new(task, schedule);
            let outcome = training.run(LinearState::zeros(), &mut executor)?;
            (
                outcome.rounds_completed,
                outcome.transient_failures,
                outcome.wall_clock,
            )
        }
        Mode::Federated => {
            let workload = SyntheticClients::new(seed, clients, 50);
            let mut executor =
                FederatedExecutor::new(workload, clients, clients_per_round, seed)?;
            let initial = FederatedState {
                params: LinearState::zeros().params,
            };
            let outcome = training.run(initial, &mut executor)?;
            (
                outcome.rounds_completed,
                outcome.transient_failures,
                outcome.wall_clock,
            )
        }
    };

    for failure in &transient_failures {
        eprintln!(
            "warning: {} write failed at round {}: {}",
            failure.what, failure.round, failure.message
        );
    }

    let history = training.metrics().history();
    let final_eval = history
        .values()
        .rev()
        .find_map(|row| row.get("eval/loss").copied());
    let final_test = history
        .values()
        .rev()
        .find_map(|row| row.get("test/loss").copied());

    println!(
        "completed {} round(s) in {:.2}s",
        rounds_completed,
        wall_clock.as_secs_f64()
    );
    if let Some(loss) = final_eval {
        println!("final eval/loss: {loss:.6}");
    }
    if let Some(loss) = final_test {
        println!("test/loss: {loss:.6}");
    }
    Ok(())
}

fn history(run_dir: &PathBuf) -> anyhow::Result<()> {
    let manager = MetricsManager::open(run_dir)?;
    let frame = manager.frame();
    if frame.rows.is_empty() {
        println!("no metrics logged in {}", run_dir.display());
        return Ok(());
    }

    let widths: Vec<usize> = frame
        .columns
        .iter()
        .map(|c| c.len().max(12))
        .collect();

    print!("{:>8}", "round");
    for (column, width) in frame.columns.iter().zip(widths.iter().copied()) {
        print!("  {column:>width$}");
    }
    println!();

    for (round, values) in &frame.rows {
        print!("{round:>8}");
        for (value, width) in values.iter().zip(widths.iter().copied()) {
            match value {
                Some(v) => print!("  {v:>width$.6}"),
                None => print!("  {:>width$}", "-"),
            }
        }
        println!();
    }
    Ok(())
}

fn checkpoints(run_dir: &PathBuf) -> anyhow::Result<()> {
    let manager = CheckpointManager::new(run_dir, usize::MAX);
    let records = manager.list()?;
    if records.is_empty() {
        println!("no checkpoints in {}", run_dir.display());
        return Ok(());
    }
    for record in records {
        println!(
            "round {:>8}  {}",
            record.round,
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}
