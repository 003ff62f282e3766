//! Odoo Stack Operations Tool
//!
//! Backs up and restores the database and filestore of a dockerized Odoo
//! project, and provides a few database housekeeping commands.

// odootool/src/main.rs
mod archive;
mod backup;
mod catalog;
mod config;
mod container;
mod db;
mod errors;
mod restore;
mod utils;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Settings;
use container::Docker;

#[derive(Parser, Debug)]
#[command(version, about = "Odoo stack operations: backup, restore and database utilities")]
struct Cli {
    /// Log debug output of every step.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a backup of a database and its filestore.
    CreateBackup {
        /// Database name
        #[arg(short = 'd', long)]
        database: String,
    },
    /// Restore a database and filestore from a backup (.gz, .tar.gz or .zip).
    RestoreBackup {
        /// Backup file name or name prefix
        #[arg(short = 'd', long)]
        database: String,
        /// Database to restore into
        #[arg(long = "to")]
        target: String,
    },
    /// List the backups in the project's backups directory, newest first.
    ListBackups {
        /// Only backups whose file name starts with this prefix
        #[arg(short = 'd', long)]
        database: Option<String>,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the project settings the other commands run with.
    Config,
    /// Database utilities (list, drop).
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand, Debug)]
enum DbCommand {
    /// List all databases
    List,
    /// Drop a database
    Drop {
        database: String,
        /// Do not prompt for confirmation
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_app(cli.command) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn run_app(command: Command) -> Result<()> {
    let settings = Settings::discover().context("Failed to load project configuration")?;

    match command {
        Command::CreateBackup { database } => {
            let docker = Docker::locate()?;
            let archive = backup::run_backup_flow(&docker, &settings, &database)
                .context("Backup process failed")?;
            println!("✅ Backup completed successfully: {}", archive.display());
        }
        Command::RestoreBackup { database, target } => {
            let docker = Docker::locate()?;
            let summary = restore::run_restore_flow(&docker, &settings, &database, &target)
                .context("Restore process failed")?;
            println!(
                "✅ Restore completed successfully: {} ({:?}{}) -> {}",
                summary.archive.display(),
                summary.format,
                if summary.filestore_restored { ", with filestore" } else { "" },
                summary.target
            );
        }
        Command::ListBackups { database, json } => {
            let entries = catalog::list(&settings.backups_dir(), database.as_deref())
                .context("Failed to list backups")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No backups found in {}", settings.backups_dir().display());
            } else {
                for entry in entries {
                    println!(
                        "{}  {:>12}  {}",
                        entry.modified.format("%Y-%m-%d %H:%M:%S"),
                        entry.size,
                        entry.file_name
                    );
                }
            }
        }
        Command::Config => {
            println!("project root:     {}", settings.project_root.display());
            println!("project name:     {}", settings.project_name);
            println!("db container:     {}", settings.db_container());
            println!("app container:    {}", settings.app_container());
            println!("db user:          {}", settings.db_user);
            println!("backups dir:      {}", settings.backups_dir().display());
            println!("staging root:     {}", settings.tmp_root.display());
            println!("filestore root:   {}", settings.filestore_root);
            println!(
                "reset password:   {}",
                if settings.reset_password.is_empty() { "(empty)" } else { "(set)" }
            );
        }
        Command::Db(DbCommand::List) => {
            let docker = Docker::locate()?;
            for name in db::list_databases(&docker, &settings)? {
                println!("{}", name);
            }
        }
        Command::Db(DbCommand::Drop { database, force }) => {
            if !force && !confirm(&format!(
                "Are you sure you want to permanently DROP the database '{}'?",
                database
            ))? {
                println!("❎ Operation cancelled.");
                return Ok(());
            }
            let docker = Docker::locate()?;
            db::drop_database(&docker, &settings, &database)
                .with_context(|| format!("Failed to drop database '{}'", database))?;
            println!("✅ Database '{}' dropped successfully.", database);
        }
    }
    Ok(())
}

/// Asks a yes/no question on the terminal; anything but `y`/`yes` is a no.
fn confirm(question: &str) -> Result<bool> {
    use std::io::{Write, stdin, stdout};

    print!("{} [y/N]: ", question);
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin().read_line(&mut input).context("Failed to read user input")?;
    Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
