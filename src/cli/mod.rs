//! CLI module for the users directory
//!
//! Provides subcommands for working with the directory:
//! - `login`: exchange credentials for a session token
//! - `users`: account operations performed as the token's holder

pub mod login;
pub mod users;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::config::{AppConfig, StorageBackend};
use crate::domain::user::UserRepository;
use crate::domain::{DomainError, ErrorKind};
use crate::infrastructure::logging;
use crate::AppState;

/// Users Directory - accounts, access control and session tokens
#[derive(Parser)]
#[command(name = "users-directory")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Authenticate and print a session token
    Login(login::LoginArgs),

    /// Manage accounts
    Users(users::UsersArgs),
}

/// Load configuration, build the state for the configured store and run the command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    let output = match config.storage.backend {
        StorageBackend::Memory => {
            let repository = crate::create_memory_repository();
            let state = crate::create_app_state_with_config(repository, &config).await?;
            execute(&state, cli.command).await?
        }
        StorageBackend::Postgres => {
            let repository = crate::create_postgres_repository(&config).await?;
            let state = crate::create_app_state_with_config(repository, &config).await?;
            execute(&state, cli.command).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Process exit status for a failed command.
///
/// 2 = bad input, unknown account or taken login, 3 = access denied,
/// 4 = authentication failed, 1 = anything else.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    let Some(domain) = error.downcast_ref::<DomainError>() else {
        return 1;
    };

    if domain.is_client_error() {
        return 2;
    }

    match domain.kind() {
        ErrorKind::AccessDenied => 3,
        ErrorKind::Authentication => 4,
        _ => 1,
    }
}

async fn execute<R: UserRepository + 'static>(
    state: &AppState<R>,
    command: Command,
) -> anyhow::Result<Value> {
    match command {
        Command::Login(args) => login::run(state, args).await,
        Command::Users(args) => users::run(state, args).await,
    }
}
