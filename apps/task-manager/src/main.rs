//! Task Manager
//!
//! Command-line front end for task items and their subtasks, stored in
//! PostgreSQL. Configuration comes from the environment (`DATABASE_URL`,
//! `APP_ENV`, `RUST_LOG`).

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::FromEnv;
use domain_tasks::{PgTaskStore, SubTaskService, TaskService};
use eyre::{Result, WrapErr};
use tracing::info;

mod commands;
mod config;
mod db;

use commands::{SubTaskCommand, TaskCommand};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "task-manager")]
#[command(about = "Manage task items and their subtasks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Migrate,

    /// Work with task items
    Tasks {
        #[command(subcommand)]
        action: TaskCommand,
    },

    /// Work with subtasks
    Subtasks {
        #[command(subcommand)]
        action: SubTaskCommand,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = AppConfig::from_env().wrap_err("Invalid configuration")?;
    init_tracing(&config.environment);

    info!("Connecting to database...");
    let db = db::connect(&config.database)
        .await
        .wrap_err("Database connection failed")?;

    let store = Arc::new(PgTaskStore::new(db));

    let output = match cli.command {
        Commands::Migrate => {
            db::run_migrations(store.connection())
                .await
                .wrap_err("Migration failed")?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Tasks { action } => {
            let service = TaskService::with_shared(store);
            commands::run_task_command(&service, action).await?
        }
        Commands::Subtasks { action } => {
            let service = SubTaskService::with_shared(store);
            commands::run_sub_task_command(&service, action).await?
        }
    };

    let rendered = output.render()?;
    if output.success {
        println!("{rendered}");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{rendered}");
        Ok(ExitCode::FAILURE)
    }
}
