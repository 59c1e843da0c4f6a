//! Users command - account operations on behalf of a token holder

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::{json, Value};

use crate::domain::user::{Gender, UserRepository};
use crate::infrastructure::user::{CreateUserRequest, UpdatePersonalInfoRequest};
use crate::AppState;

/// Arguments for the users command
#[derive(Args, Clone)]
pub struct UsersArgs {
    /// Session token from `login`; its subject is the acting account
    #[arg(long)]
    pub token: String,

    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Subcommand, Clone)]
pub enum UsersCommand {
    /// Create an account (administrators only)
    Create {
        login: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
        /// 0 = female, 1 = male, 2 = unspecified
        #[arg(long, default_value_t = Gender::Unspecified.code())]
        gender: i32,
        /// YYYY-MM-DD
        #[arg(long)]
        birthday: Option<NaiveDate>,
        #[arg(long)]
        admin: bool,
    },

    /// Show an account's profile
    Get { login: String },

    /// Show an account after checking its password
    Verify {
        login: String,
        #[arg(long)]
        password: String,
    },

    /// Replace name, gender and birthday
    UpdateInfo {
        login: String,
        #[arg(long)]
        name: String,
        /// 0 = female, 1 = male, 2 = unspecified
        #[arg(long)]
        gender: i32,
        #[arg(long)]
        birthday: Option<NaiveDate>,
    },

    /// Rename an account
    UpdateLogin { login: String, new_login: String },

    /// Replace an account's password
    UpdatePassword {
        login: String,
        #[arg(long)]
        password: String,
    },

    /// List active accounts (administrators only)
    ListActive,

    /// List active accounts at least AGE years old (administrators only)
    OlderThan {
        #[arg(allow_negative_numbers = true)]
        age: i32,
    },

    /// Revoke an account, or remove it with --force (administrators only)
    Delete {
        login: String,
        #[arg(long)]
        force: bool,
    },

    /// Clear an account's revocation (administrators only)
    Restore { login: String },
}

pub async fn run<R: UserRepository + 'static>(
    state: &AppState<R>,
    args: UsersArgs,
) -> anyhow::Result<Value> {
    let claims = state.auth.authorize_token(&args.token)?;
    let actor = claims.login();
    let users = &state.users;

    let output = match args.command {
        UsersCommand::Create {
            login,
            password,
            name,
            gender,
            birthday,
            admin,
        } => {
            let request = CreateUserRequest {
                login,
                password,
                name,
                gender,
                birthday,
                admin,
            };
            json!({ "id": users.create_user(request, actor).await? })
        }
        UsersCommand::Get { login } => serde_json::to_value(users.get_user_by_login(&login, actor).await?)?,
        UsersCommand::Verify { login, password } => serde_json::to_value(
            users
                .get_by_login_and_password(&login, &password, actor)
                .await?,
        )?,
        UsersCommand::UpdateInfo {
            login,
            name,
            gender,
            birthday,
        } => {
            let request = UpdatePersonalInfoRequest {
                name,
                gender,
                birthday,
            };
            json!({ "id": users.update_personal_info(&login, request, actor).await? })
        }
        UsersCommand::UpdateLogin { login, new_login } => {
            json!({ "id": users.update_login(&login, &new_login, actor).await? })
        }
        UsersCommand::UpdatePassword { login, password } => {
            json!({ "id": users.update_password(&login, &password, actor).await? })
        }
        UsersCommand::ListActive => serde_json::to_value(users.get_active_users(actor).await?)?,
        UsersCommand::OlderThan { age } => {
            serde_json::to_value(users.get_users_older_than(age, actor).await?)?
        }
        UsersCommand::Delete { login, force: true } => {
            json!({ "id": users.delete_user_force(&login, actor).await? })
        }
        UsersCommand::Delete { login, force: false } => {
            json!({ "id": users.delete_user(&login, actor).await? })
        }
        UsersCommand::Restore { login } => {
            json!({ "id": users.restore_user(&login, actor).await? })
        }
    };

    Ok(output)
}
