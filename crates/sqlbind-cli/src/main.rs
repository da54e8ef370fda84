//! sqlbind CLI
//!
//! Generates typed database-access bindings from migrations and query
//! files, and applies migrations to a PostgreSQL database.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sqlbind_cli::codegen;
use sqlbind_cli::executor::MigrationExecutor;
use sqlbind_cli::loader::{read_migrations_dir, read_queries_dir};
use sqlbind_core::model_from_migrations;

/// Typed database-access bindings from migrations and SQL queries.
#[derive(Parser)]
#[command(name = "sqlbind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the bindings source file from migrations and queries.
    Generate {
        /// Migrations directory.
        #[arg(short, long, default_value = "migrations")]
        migrations: PathBuf,

        /// Query files directory.
        #[arg(short, long, default_value = "queries")]
        queries: PathBuf,

        /// Output path for the generated Rust source.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Apply pending migrations to the database.
    Migrate {
        /// Migrations directory.
        #[arg(short, long, default_value = "migrations")]
        migrations: PathBuf,

        /// Database URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate {
            migrations,
            queries,
            out,
        } => {
            let migrations = read_migrations_dir(&migrations)?;
            info!(count = migrations.len(), "loaded migrations");

            let model = model_from_migrations(&migrations)?;
            let batches = read_queries_dir(&queries, &model)?;
            info!(count = batches.len(), "analyzed query files");

            let source = codegen::generate(&batches, &model)?;
            std::fs::write(&out, source)?;
            info!(out = %out.display(), "bindings generated");
        }
        Commands::Migrate {
            migrations,
            database,
        } => {
            let migrations = read_migrations_dir(&migrations)?;
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .connect(&database)
                .await?;
            let executor = MigrationExecutor::new(pool);
            let applied = executor.run(&migrations).await?;
            info!(applied, total = migrations.len(), "migrations complete");
        }
    }

    Ok(())
}
