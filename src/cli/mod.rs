mod report;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use report::ReportArgs;

/// Visit co-occurrence and upsell analytics for service bookings
#[derive(Parser)]
#[command(name = "visitlift")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service pairings, standalone rates and revenue lift for a date range
    Report(ReportArgs),
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        init_logging();
        match self.command {
            Commands::Report(args) => args.run(),
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable
fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visitlift=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
