//! # Counts Subcommand
//!
//! Offline audit and repair of `sellers.listing_count`. The request path
//! only ever moves counters by one inside a listing transaction; these
//! commands exist for data imported or edited outside the service.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};

use estate_api::db::{CountDrift, Store};
use estate_api::services::ListingService;

/// Exit code when `audit` finds drift.
pub const DRIFT_EXIT_CODE: u8 = 2;

/// Arguments for the `estate counts` subcommand.
#[derive(Args, Debug)]
pub struct CountsArgs {
    #[command(subcommand)]
    pub command: CountsCommand,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountsCommand {
    /// Report sellers whose counter differs from their real listing count.
    Audit,
    /// Recompute every drifted counter inside one transaction.
    Repair,
}

/// Execute the counts subcommand. Returns the process exit code.
pub async fn run_counts(args: &CountsArgs, store: Arc<dyn Store>) -> Result<u8> {
    let listings = ListingService::new(store);
    match args.command {
        CountsCommand::Audit => {
            let drift = listings.audit_counts().await?;
            print_drift(&drift);
            if drift.is_empty() {
                println!("all listing counters are consistent");
                Ok(0)
            } else {
                tracing::warn!(sellers = drift.len(), "listing counter drift detected");
                Ok(DRIFT_EXIT_CODE)
            }
        }
        CountsCommand::Repair => {
            let repaired = listings.repair_counts().await?;
            print_drift(&repaired);
            println!("repaired {} seller(s)", repaired.len());
            Ok(0)
        }
    }
}

fn print_drift(drift: &[CountDrift]) {
    for d in drift {
        println!(
            "seller {:>8}  recorded {:>6}  actual {:>6}",
            d.seller_id, d.recorded, d.actual
        );
    }
}
