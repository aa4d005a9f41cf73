//! # Persistence Layer
//!
//! Two traits describe everything the services need from storage:
//!
//! - [`Store`]: pooled reads and single-statement writes.
//! - [`StoreTx`]: one exclusively owned transaction. Dropping it without
//!   calling [`StoreTx::commit`] rolls it back, so the underlying connection
//!   (or lock) is released on every exit path.
//!
//! [`PgStore`] backs both with PostgreSQL via SQLx. [`MemoryStore`] keeps
//! the three tables in process; it is used when `DATABASE_URL` is not set
//! and by the test suites.
//!
//! ## Counter invariant
//!
//! `sellers.listing_count` is only ever written through
//! [`StoreTx::adjust_listing_count`] (relative `+1`/`-1`) on the request
//! path. [`StoreTx::recount_listings`] exists for offline repair.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use estate_core::{
    Account, AccountId, DomainError, Listing, ListingId, ListingPatch, ListingQuery,
    ListingWithSeller, NewAccount, NewListing, NewSeller, Page, Seller, SellerId, SellerPatch,
    SellerQuery,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

pub use memory::{FaultPoint, MemoryStore};
pub use postgres::PgStore;

/// Storage failures, classified by the constraint that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A foreign key rejected the write.
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// A check constraint rejected the write.
    #[error("check constraint violated: {0}")]
    CheckViolation(String),

    /// The database aborted the transaction (deadlock or serialization
    /// failure) to let a concurrent writer through.
    #[error("transaction aborted by a concurrent writer: {0}")]
    TransactionAborted(String),

    /// Connection, protocol, decoding or any other failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => DomainError::Conflict(msg),
            StoreError::ForeignKeyViolation(msg) => DomainError::NotFound(msg),
            StoreError::CheckViolation(msg) => DomainError::Invalid(msg),
            StoreError::TransactionAborted(msg) => DomainError::Invalid(msg),
            StoreError::Backend(msg) => DomainError::Internal(msg),
        }
    }
}

/// A seller whose stored counter disagrees with its real listing count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountDrift {
    /// The seller.
    pub seller_id: SellerId,
    /// Value of `listing_count`.
    pub recorded: i64,
    /// Number of listings that reference the seller.
    pub actual: i64,
}

/// Pooled access to accounts, sellers and listings.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    // -- Accounts --

    /// Insert an account. Duplicate email is a unique violation.
    async fn insert_account(&self, new: &NewAccount) -> Result<AccountId, StoreError>;

    /// Exact, case-sensitive email lookup.
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Lookup by id.
    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    // -- Sellers --

    /// Insert a seller with `listing_count = 0`.
    async fn insert_seller(&self, new: &NewSeller) -> Result<SellerId, StoreError>;

    /// Lookup by id.
    async fn seller_by_id(&self, id: SellerId) -> Result<Option<Seller>, StoreError>;

    /// The seller linked to `account`, if any.
    async fn seller_by_account(&self, account: AccountId) -> Result<Option<Seller>, StoreError>;

    /// One page of sellers ordered by name.
    async fn list_sellers(&self, query: &SellerQuery) -> Result<Page<Seller>, StoreError>;

    /// Apply `patch`; returns affected rows.
    async fn update_seller(&self, id: SellerId, patch: &SellerPatch) -> Result<u64, StoreError>;

    /// Delete; returns affected rows. Fails with a foreign key violation
    /// while listings still reference the seller.
    async fn delete_seller(&self, id: SellerId) -> Result<u64, StoreError>;

    // -- Listings (reads) --

    /// Lookup by id.
    async fn listing_by_id(&self, id: ListingId) -> Result<Option<Listing>, StoreError>;

    /// Filtered, sorted page of listings.
    async fn list_listings(&self, query: &ListingQuery) -> Result<Page<Listing>, StoreError>;

    /// Case-insensitive substring match on title or description.
    async fn search_listings(&self, term: &str) -> Result<Vec<Listing>, StoreError>;

    /// Every listing with its seller's name and email.
    async fn listings_with_sellers(&self) -> Result<Vec<ListingWithSeller>, StoreError>;

    // -- Maintenance --

    /// Sellers whose counter differs from the real count.
    async fn count_drift(&self) -> Result<Vec<CountDrift>, StoreError>;
}

/// An open transaction. Rolls back when dropped uncommitted.
#[async_trait]
pub trait StoreTx: Send {
    /// Whether the seller exists, holding a key-share lock on its row so it
    /// cannot be deleted before commit.
    async fn seller_exists(&mut self, id: SellerId) -> Result<bool, StoreError>;

    /// Lock seller rows ahead of counter updates, in ascending id order so
    /// two transactions touching the same pair cannot wait on each other.
    /// Returns the ids that exist, ascending.
    async fn lock_sellers(&mut self, ids: &[SellerId]) -> Result<Vec<SellerId>, StoreError>;

    /// Load a listing and lock it for the rest of the transaction.
    async fn listing_for_update(&mut self, id: ListingId) -> Result<Option<Listing>, StoreError>;

    /// Insert a listing.
    async fn insert_listing(&mut self, new: &NewListing) -> Result<ListingId, StoreError>;

    /// Apply the set fields of `changes`; returns affected rows.
    async fn update_listing(
        &mut self,
        id: ListingId,
        changes: &ListingPatch,
    ) -> Result<u64, StoreError>;

    /// Delete a listing; returns affected rows.
    async fn delete_listing(&mut self, id: ListingId) -> Result<u64, StoreError>;

    /// `listing_count = listing_count + delta`; returns affected rows.
    async fn adjust_listing_count(&mut self, seller: SellerId, delta: i64)
        -> Result<u64, StoreError>;

    /// Recompute `listing_count` from the listing table. Maintenance only.
    async fn recount_listings(&mut self, seller: SellerId) -> Result<u64, StoreError>;

    /// Make every write visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every write.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Connect to PostgreSQL and run the embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_kinds_map_to_domain_errors() {
        assert!(matches!(
            DomainError::from(StoreError::UniqueViolation("email".into())),
            DomainError::Conflict(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::ForeignKeyViolation("seller".into())),
            DomainError::NotFound(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::CheckViolation("listing_count".into())),
            DomainError::Invalid(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::TransactionAborted("40P01".into())),
            DomainError::Invalid(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::Backend("io".into())),
            DomainError::Internal(_)
        ));
    }
}
