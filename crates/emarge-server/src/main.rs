//! Emarge Server — operator entry point for the attendance service.

mod config;
mod error;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use emarge_db::repository::SurrealFeedbackStore;
use emarge_db::{DbManager, SurrealStore};
use emarge_service::ReminderScheduler;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "emarge")]
#[command(about = "Training attendance signatures", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending schema migrations
    Migrate,

    /// Print the feedback reminders due now as JSON
    Reminders {
        /// Evaluate at this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let config = match ServerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .json()
        .init();

    match run(cli.command, config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: ServerConfig) -> Result<(), ServerError> {
    let manager = DbManager::connect(&config.db).await?;
    let db = manager.client().clone();

    match command {
        Command::Migrate => {
            emarge_db::run_migrations(&db).await?;
            info!("Migrations applied");
        }
        Command::Reminders { at } => {
            let scheduler = ReminderScheduler::new(
                SurrealStore::new(db.clone()),
                SurrealFeedbackStore::new(db),
                config.service.reminder,
            );
            let due = scheduler
                .due_feedback_reminders(at.unwrap_or_else(Utc::now))
                .await?;
            println!("{}", serde_json::to_string_pretty(&due)?);
        }
    }
    Ok(())
}
