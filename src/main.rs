use std::io::{self, Write};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rust_pi::{Backend, RunRequest, Seeding, Session};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Threads,
    BlockingPool,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Threads => Backend::Threads,
            BackendArg::BlockingPool => Backend::BlockingPool,
        }
    }
}

/// Estimate π by Monte Carlo sampling and time single- vs multi-threaded runs
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run one round with this many points instead of prompting
    #[arg(short, long, requires = "threads")]
    points: Option<i64>,

    /// Worker threads for the one-shot round
    #[arg(short, long, requires = "points")]
    threads: Option<i64>,

    /// Seed the generators for repeatable runs
    #[arg(long)]
    seed: Option<u64>,

    /// Use the portable LCG generator instead of StdRng
    #[arg(long)]
    lcg: bool,

    /// How the parallel estimate is run
    #[arg(short, long, value_enum, default_value = "threads")]
    backend: BackendArg,
}

impl Cli {
    fn seeding(&self) -> anyhow::Result<Seeding> {
        Ok(match (self.lcg, self.seed) {
            (true, None) => Seeding::Lcg(12345),
            (true, Some(seed)) => match u32::try_from(seed) {
                Ok(seed) => Seeding::Lcg(seed),
                Err(_) => bail!("--seed {seed} does not fit the 32-bit LCG state"),
            },
            (false, Some(seed)) => Seeding::Seeded(seed),
            (false, None) => Seeding::Entropy,
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let session = Session::new(cli.seeding()?, cli.backend.into());
    info!(?session, "session configured");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match (cli.points, cli.threads) {
        (Some(points), Some(threads)) => {
            let request = RunRequest::new(points, threads)?;
            let comparison = session.compare(request)?;
            comparison.write_to(&mut out).context("writing results")?;
        }
        (None, None) => {
            session
                .run_interactive(io::stdin().lock(), &mut out)
                .context("interactive session")?;
        }
        _ => bail!("--points and --threads must be given together"),
    }

    out.flush()?;
    Ok(())
}
