// Gazette - A content backend for online publications
// Copyright (C) 2025 Gazette Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.


use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use gazette_core::{Role, User};
use gazette_db::{EmailVerificationRepository, SessionRepository, UserRepository};
use gazette_web::Configuration;
use sqlx::SqlitePool;
use std::io::Write;

#[derive(Parser)]
#[command(name = "gazette")]
#[command(about = "Gazette CLI tool for database and user management")]
struct Cli {
    /// Database URL, overriding the configuration
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the database
    Init,

    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Purge expired sessions and verification tokens
    Cleanup,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a new user
    Create {
        /// Email address
        email: String,
        /// Username
        username: String,
        /// Role (reader, writer, admin)
        #[arg(long, default_value = "reader")]
        role: String,
        /// Password (will prompt if not provided)
        #[arg(long)]
        password: Option<String>,
    },

    /// Change a user's role
    Role {
        /// Username or email
        user: String,
        /// Role (reader, writer, admin)
        role: String,
    },

    /// Change user password
    Password {
        /// Username or email
        user: String,
        /// New password (will prompt if not provided)
        #[arg(long)]
        password: Option<String>,
    },

    /// Set the public display name, or clear it with an empty string
    DisplayName {
        /// Username or email
        user: String,
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = match cli.database_url {
        Some(url) => url,
        None => Configuration::load()?.database_url,
    };

    println!("Using database: {}", database_url);
    let pool = gazette_db::init_database(&database_url).await?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized successfully!");
            Ok(())
        }
        Commands::User { command } => handle_user_command(command, pool).await,
        Commands::Cleanup => {
            let (sessions, tokens) = cleanup(&pool).await?;
            println!(
                "Removed {} expired sessions and {} expired verification tokens",
                sessions, tokens
            );
            Ok(())
        }
    }
}

fn prompt_password(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    rpassword::read_password().context("Failed to read password")
}

fn parse_role(role: &str) -> Result<Role> {
    role.parse::<Role>()
        .map_err(|e| anyhow!("{}. Must be: reader, writer, or admin", e))
}

async fn find_user(repo: &UserRepository, login: &str) -> Result<User> {
    repo.find_by_login(login)
        .await?
        .ok_or_else(|| anyhow!("User not found: {}", login))
}

fn user_id(user: &User) -> Result<i64> {
    user.id.ok_or_else(|| anyhow!("User has no ID"))
}

/// Accounts made by an operator skip email verification
async fn create_user(
    pool: &SqlitePool,
    email: &str,
    username: &str,
    password: &str,
    role: Role,
) -> Result<i64> {
    User::validate_password(password).map_err(|e| anyhow!("Invalid user data: {}", e))?;

    let user = User::new(email.to_string(), username.to_string(), password, role)?;
    if let Err(e) = user.is_valid() {
        anyhow::bail!("Invalid user data: {}", e);
    }

    let repo = UserRepository::new(pool.clone());
    let id = repo.create(&user).await.context("Failed to create user")?;
    repo.mark_email_verified(id).await?;
    Ok(id)
}

async fn cleanup(pool: &SqlitePool) -> Result<(u64, u64)> {
    let sessions = SessionRepository::new(pool.clone()).delete_expired().await?;
    let tokens = EmailVerificationRepository::new(pool.clone())
        .delete_expired()
        .await?;
    Ok((sessions, tokens))
}

async fn handle_user_command(command: UserCommands, pool: SqlitePool) -> Result<()> {
    let user_repo = UserRepository::new(pool.clone());

    match command {
        UserCommands::Create {
            email,
            username,
            role,
            password,
        } => {
            let role = parse_role(&role)?;
            println!("Creating {} user: {} ({})", role, username, email);

            let password = match password {
                Some(pwd) => pwd,
                None => prompt_password("Password")?,
            };

            let id = create_user(&pool, &email, &username, &password, role).await?;
            println!("User created successfully with ID: {}", id);
            Ok(())
        }

        UserCommands::Role { user, role } => {
            let role = parse_role(&role)?;
            let found = find_user(&user_repo, &user).await?;

            user_repo.set_role(user_id(&found)?, role).await?;
            println!("{} is now a {}", found.username, role);
            Ok(())
        }

        UserCommands::Password { user, password } => {
            println!("Changing password for {}", user);
            let found = find_user(&user_repo, &user).await?;

            let password = match password {
                Some(p) => p,
                None => prompt_password("New password")?,
            };
            User::validate_password(&password).map_err(|e| anyhow!(e))?;

            let id = user_id(&found)?;
            user_repo.set_password(id, &password).await?;
            // Existing sessions must not outlive the old password
            let dropped = SessionRepository::new(pool).delete_for_user(id).await?;

            println!("Password changed successfully! {} sessions closed.", dropped);
            Ok(())
        }

        UserCommands::DisplayName { user, name } => {
            let found = find_user(&user_repo, &user).await?;
            let name = Some(name.as_str()).filter(|n| !n.trim().is_empty());

            user_repo.set_display_name(user_id(&found)?, name).await?;
            match name {
                Some(name) => println!("Display name of {} set to {}", found.username, name),
                None => println!("Display name of {} cleared", found.username),
            }
            Ok(())
        }
    }
}
