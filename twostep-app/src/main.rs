mod app;
mod participant;
mod presenter;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use twostep_timing::{HighPrecisionTimer, ManualTimer};

pub use app::App;

#[derive(Debug, Parser)]
#[command(name = "twostep")]
#[command(about = "Run a two-step task session with a simulated participant")]
pub struct Args {
    /// Session config (JSON); built-in defaults when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seed for the session design and the participant
    #[arg(long)]
    pub seed: Option<u64>,
    /// Where the session summary is written
    #[arg(long, default_value = "twostep_results.json")]
    pub output: PathBuf,
    /// Probability that the participant lets a choice time out
    #[arg(long, default_value_t = 0.0)]
    pub miss_rate: f64,
    /// Run on the wall clock instead of simulated time
    #[arg(long)]
    pub realtime: bool,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let summary = if args.realtime {
        App::new(&args, HighPrecisionTimer::new())?.run()?
    } else {
        App::new(&args, ManualTimer::new())?.run()?
    };
    app::write_summary(&args.output, &summary)?;

    Ok(())
}
