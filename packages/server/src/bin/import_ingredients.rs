//! Replace the ingredient catalog with the contents of a CSV file.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use foodgram_server::database::init_db;
use foodgram_server::import::{import_ingredients, parse_ingredients_csv};

#[derive(Parser, Debug)]
#[command(name = "import-ingredients")]
#[command(about = "Replace all ingredients with rows from a `name,measurement_unit` CSV file")]
struct Args {
    /// CSV file without a header row
    #[arg(long, value_name = "PATH")]
    file: PathBuf,

    /// Postgres connection string
    #[arg(long, value_name = "URL", env = "FOODGRAM__DATABASE__URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let file = File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let rows = parse_ingredients_csv(file)?;

    let db = init_db(&args.database_url)
        .await
        .context("failed to connect to database")?;
    let count = import_ingredients(&db, rows).await?;

    println!("Imported {count} ingredients");
    Ok(())
}
