mod compare;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(name = "charmtrack-cli")]
#[command(about = "CharmTrack command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the marketplace price comparison over a listings JSON snapshot.
    Compare {
        /// Path to a JSON array of raw listings as the scrape service emits them.
        #[arg(long)]
        listings: PathBuf,
        /// Official reference price to compare against.
        #[arg(long)]
        reference: Option<Decimal>,
        /// Let the reference price compete for the best-deal slot.
        #[arg(long)]
        include_reference: bool,
    },
    /// Fetch live listings for a query and run the comparison.
    Fetch {
        #[arg(long)]
        query: String,
        /// Scrape service base URL.
        #[arg(long, env = "CHARMTRACK_SOURCE_BASE_URL")]
        base_url: String,
        #[arg(long)]
        reference: Option<Decimal>,
    },
    /// Validate a charm seed catalog file.
    Validate {
        #[arg(long, default_value = "./config/charms.yaml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compare {
            listings,
            reference,
            include_reference,
        } => compare::run_from_file(&listings, reference, include_reference),
        Commands::Fetch {
            query,
            base_url,
            reference,
        } => compare::run_live(&query, &base_url, reference).await,
        Commands::Validate { path } => {
            let catalog = charmtrack_core::load_charms(&path)?;
            println!("ok: {} charms in {}", catalog.charms.len(), path.display());
            Ok(())
        }
    }
}
