//! # estate-cli: Operator CLI for the Listing Service
//!
//! Provides the `estate` command-line interface for tasks that must not be
//! reachable over HTTP.
//!
//! ## Subcommands
//!
//! - `estate admin create`: insert an admin account directly.
//! - `estate counts audit`: report sellers whose `listingCount` drifted.
//! - `estate counts repair`: recompute drifted counters in one transaction.
//!
//! ```bash
//! DATABASE_URL=postgres://... estate admin create --name Root --email root@example.com
//! DATABASE_URL=postgres://... estate counts audit
//! ```
//!
//! Exit codes: 0 success, 1 operational error, 2 drift found by `audit`.

pub mod admin;
pub mod counts;

use std::sync::Arc;

use anyhow::{Context, Result};
use estate_api::db::{PgStore, Store};

/// Connect to PostgreSQL (running pending migrations) and wrap the pool.
pub async fn connect(database_url: &str) -> Result<Arc<dyn Store>> {
    let pool = estate_api::db::init_pool(database_url)
        .await
        .context("failed to connect to the database")?;
    Ok(Arc::new(PgStore::new(pool)))
}
