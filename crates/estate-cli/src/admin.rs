//! # Admin Subcommand
//!
//! Bootstraps an admin account without going through public registration.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use zeroize::Zeroizing;

use estate_api::db::{Store, StoreError};
use estate_core::{validate_email, validate_name, NewAccount, Role};
use estate_crypto::{Argon2Hasher, PasswordCost, PasswordHasher};

const MIN_PASSWORD_LEN: usize = 8;

/// Arguments for the `estate admin` subcommand.
#[derive(Args, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Insert an account with the admin role.
    Create {
        /// Display name.
        #[arg(long)]
        name: String,

        /// Login email; must not be registered yet.
        #[arg(long)]
        email: String,

        /// Password, at least 8 characters.
        #[arg(long, env = "ESTATE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Execute the admin subcommand. Returns the process exit code.
pub async fn run_admin(args: AdminArgs, store: Arc<dyn Store>) -> Result<u8> {
    match args.command {
        AdminCommand::Create {
            name,
            email,
            password,
        } => {
            let password = Zeroizing::new(password);
            let hasher = Argon2Hasher::new(PasswordCost::default())?;
            create_admin(store.as_ref(), &hasher, &name, &email, &password).await?;
            Ok(0)
        }
    }
}

/// Validate, hash and insert. Returns the new account id.
pub async fn create_admin(
    store: &dyn Store,
    hasher: &dyn PasswordHasher,
    name: &str,
    email: &str,
    password: &str,
) -> Result<i64> {
    validate_name("name", name)?;
    validate_email("email", email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {MIN_PASSWORD_LEN} characters");
    }

    let password_hash = hasher.hash(password).context("failed to hash password")?;
    let id = store
        .insert_account(&NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                anyhow::anyhow!("email {email} is already registered")
            }
            other => anyhow::Error::new(other).context("failed to insert account"),
        })?;

    tracing::info!(account_id = %id, "admin account created");
    println!("created admin account {id} <{email}>");
    Ok(id.get())
}
