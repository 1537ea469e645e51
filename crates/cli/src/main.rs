//! Stockroom CLI - Session, access and backend setup tools.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and persist the session
//! stockroom session login -e owner@example.com
//!
//! # Check what the signed-in user may do
//! stockroom access check products edit
//! stockroom access role admin
//!
//! # Check the backend bootstrap, marking the manual seed step done
//! stockroom setup status --done seed
//!
//! # Print the SQL for one step
//! stockroom setup sql tables
//! ```
//!
//! # Commands
//!
//! - `session` - Sign in, show the stored session, sign out
//! - `access` - Resolve permissions and roles for the stored session
//! - `setup` - Setup checklist status, SQL and instructions

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use stockroom_app::{AppConfig, AppError, telemetry};

mod commands;

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(author, version, about = "Stockroom operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the signed-in session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Check permissions of the signed-in user
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },
    /// Backend setup checklist
    Setup {
        #[command(subcommand)]
        action: SetupAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Sign in with an existing profile
    Login {
        /// Profile email address
        #[arg(short, long)]
        email: String,
    },
    /// Show the stored session
    Show,
    /// Sign out and remove the stored session
    Logout,
}

#[derive(Subcommand)]
enum AccessAction {
    /// Check whether an action on a module is allowed
    Check {
        /// Module name (e.g. `products`)
        module: String,

        /// Action name (`view`, `add`, `edit`, `delete`)
        #[arg(default_value = stockroom_core::access::DEFAULT_ACTION)]
        action: String,
    },
    /// Check whether the signed-in user has a role
    Role {
        /// Role name (`super_admin`, `admin`, `sales_manager`, `investor`)
        role: String,
    },
}

#[derive(Subcommand)]
enum SetupAction {
    /// Run the setup probes and show progress
    Status {
        /// Skip the database probes
        #[arg(long)]
        offline: bool,

        /// Mark a manual step completed before checking (repeatable)
        #[arg(long = "done", value_name = "STEP")]
        done: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the SQL for a step
    Sql {
        /// Step id
        step: String,
    },
    /// Print the manual instructions for a step
    Instructions {
        /// Step id
        step: String,
    },
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let sentry_guard = telemetry::init(&config);

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        match e.downcast_ref::<AppError>() {
            Some(err) => err.report(),
            None => tracing::error!("Command failed: {e}"),
        }
        // Flush Sentry before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Session { action } => match action {
            SessionAction::Login { email } => commands::session::login(config, &email).await?,
            SessionAction::Show => commands::session::show(config).await?,
            SessionAction::Logout => commands::session::logout(config).await?,
        },
        Commands::Access { action } => match action {
            AccessAction::Check { module, action } => {
                commands::access::check(config, &module, &action).await?;
            }
            AccessAction::Role { role } => commands::access::role(config, &role).await?,
        },
        Commands::Setup { action } => match action {
            SetupAction::Status {
                offline,
                done,
                json,
            } => commands::setup::status(config, offline, &done, json).await?,
            SetupAction::Sql { step } => commands::setup::sql(&step)?,
            SetupAction::Instructions { step } => commands::setup::instructions(&step)?,
        },
    }
    Ok(())
}
