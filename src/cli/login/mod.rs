//! Login command - exchanges credentials for a session token

use clap::Args;
use serde_json::Value;

use crate::domain::user::UserRepository;
use crate::AppState;

/// Arguments for the login command
#[derive(Args, Clone)]
pub struct LoginArgs {
    pub login: String,

    #[arg(long)]
    pub password: String,
}

pub async fn run<R: UserRepository + 'static>(
    state: &AppState<R>,
    args: LoginArgs,
) -> anyhow::Result<Value> {
    let issued = state.auth.authenticate(&args.login, &args.password).await?;
    Ok(serde_json::to_value(issued)?)
}
