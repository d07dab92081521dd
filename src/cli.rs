use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;

use crate::model::{role::Role, user::User};

#[derive(Parser, Debug)]
#[command(name = "timeclock", version, about = "Attendance, leave and QR check-in backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Promote an existing user to admin
    SetAdmin { username: String },
    /// Print every registered user
    ListUsers,
}

pub async fn set_admin(pool: &SqlitePool, username: &str) -> Result<User> {
    if !User::set_role(pool, username, Role::Admin).await? {
        bail!("user '{username}' not found");
    }

    match User::find_by_username(pool, username).await? {
        Some(user) => Ok(user),
        None => bail!("user '{username}' not found"),
    }
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<String>> {
    let users = User::list(pool).await?;

    Ok(users
        .iter()
        .map(|u| {
            format!(
                "Username: {:15} | Role: {:10} | Name: {}",
                u.username,
                u.role.as_ref(),
                u.full_name()
            )
        })
        .collect())
}
