//! # Listing–Seller Consistency Engine
//!
//! Creates, reassigns and deletes listings while keeping every seller's
//! `listing_count` equal to the number of listings that reference it.
//!
//! Each mutation runs inside one [`UnitOfWork`]:
//!
//! ```text
//! Started ──(referential checks pass)──▶ Validated ──▶ Committed
//!    │                                      │
//!    └──────────────(any failure)───────────┴────────▶ RolledBack
//! ```
//!
//! A failure at any step rolls the transaction back before the error is
//! returned. If the future is dropped mid-flight the boxed transaction is
//! dropped with it, which also rolls back. Counters move only by `+1`/`-1`.

use std::sync::Arc;

use estate_core::{
    DomainError, Listing, ListingId, ListingPatch, ListingQuery, ListingWithSeller, NewListing,
    Page, SellerId, SessionClaim,
};

use crate::db::{CountDrift, Store, StoreError, StoreTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Started,
    Validated,
    Committed,
    RolledBack,
}

/// One transaction plus its lifecycle phase.
struct UnitOfWork {
    op: &'static str,
    phase: Phase,
    tx: Box<dyn StoreTx>,
}

impl UnitOfWork {
    async fn begin(store: &dyn Store, op: &'static str) -> Result<Self, DomainError> {
        let tx = store.begin().await?;
        tracing::debug!(op, "transaction started");
        Ok(Self {
            op,
            phase: Phase::Started,
            tx,
        })
    }

    fn validated(&mut self) {
        debug_assert_eq!(self.phase, Phase::Started);
        self.phase = Phase::Validated;
    }

    async fn commit(mut self) -> Result<(), DomainError> {
        debug_assert_eq!(self.phase, Phase::Validated);
        let op = self.op;
        match self.tx.commit().await {
            Ok(()) => {
                self.phase = Phase::Committed;
                tracing::debug!(op, phase = ?self.phase, "transaction committed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(op, error = %e, "commit failed; transaction rolled back");
                Err(e.into())
            }
        }
    }

    async fn rollback(self, cause: &DomainError) {
        let op = self.op;
        let from = self.phase;
        if let Err(e) = self.tx.rollback().await {
            tracing::error!(op, error = %e, "rollback failed");
        }
        tracing::warn!(op, from = ?from, to = ?Phase::RolledBack, cause = %cause, "transaction rolled back");
    }

    /// Run the steps, then commit on success or roll back on failure.
    async fn finish<T>(self, outcome: Result<T, DomainError>) -> Result<T, DomainError> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                self.rollback(&err).await;
                Err(err)
            }
        }
    }
}

/// Transactional listing writes and plain listing reads.
#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn Store>,
}

impl ListingService {
    /// Build on top of `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Insert a listing and increment its seller's counter.
    pub async fn create(&self, new: NewListing) -> Result<ListingId, DomainError> {
        new.validate()?;
        let mut uow = UnitOfWork::begin(self.store.as_ref(), "create_listing").await?;
        let outcome = create_steps(&mut uow, &new).await;
        let id = uow.finish(outcome).await?;
        tracing::info!(listing_id = %id, seller_id = %new.seller_id, "listing created");
        Ok(id)
    }

    /// Apply the fields of `patch` that differ from the stored row. A
    /// changed `seller_id` moves one count from the old seller to the new.
    pub async fn update(&self, id: ListingId, patch: ListingPatch) -> Result<(), DomainError> {
        self.update_inner(id, patch, None).await
    }

    /// [`update`](Self::update) on behalf of `actor`. A non-admin must still
    /// own the listing once its row is locked.
    pub async fn update_as(
        &self,
        actor: &SessionClaim,
        id: ListingId,
        patch: ListingPatch,
    ) -> Result<(), DomainError> {
        self.update_inner(id, patch, Some(actor)).await
    }

    async fn update_inner(
        &self,
        id: ListingId,
        patch: ListingPatch,
        actor: Option<&SessionClaim>,
    ) -> Result<(), DomainError> {
        patch.validate()?;
        let mut uow = UnitOfWork::begin(self.store.as_ref(), "update_listing").await?;
        let outcome = update_steps(&mut uow, id, &patch, actor).await;
        uow.finish(outcome).await?;
        tracing::info!(listing_id = %id, "listing updated");
        Ok(())
    }

    /// Delete a listing and decrement its seller's counter.
    pub async fn remove(&self, id: ListingId) -> Result<(), DomainError> {
        self.remove_inner(id, None).await
    }

    /// [`remove`](Self::remove) on behalf of `actor`, re-checking ownership
    /// under the row lock.
    pub async fn remove_as(&self, actor: &SessionClaim, id: ListingId) -> Result<(), DomainError> {
        self.remove_inner(id, Some(actor)).await
    }

    async fn remove_inner(
        &self,
        id: ListingId,
        actor: Option<&SessionClaim>,
    ) -> Result<(), DomainError> {
        let mut uow = UnitOfWork::begin(self.store.as_ref(), "remove_listing").await?;
        let outcome = remove_steps(&mut uow, id, actor).await;
        let seller = uow.finish(outcome).await?;
        tracing::info!(listing_id = %id, seller_id = %seller, "listing removed");
        Ok(())
    }

    /// Lookup by id.
    pub async fn find_by_id(&self, id: ListingId) -> Result<Listing, DomainError> {
        self.store
            .listing_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("listing {id}")))
    }

    /// Filtered, sorted, paginated listings.
    pub async fn list(&self, query: &ListingQuery) -> Result<Page<Listing>, DomainError> {
        Ok(self.store.list_listings(query).await?)
    }

    /// Case-insensitive substring search over title and description.
    pub async fn search(&self, term: &str) -> Result<Vec<Listing>, DomainError> {
        Ok(self.store.search_listings(term.trim()).await?)
    }

    /// Listings joined with seller name and email.
    pub async fn list_with_sellers(&self) -> Result<Vec<ListingWithSeller>, DomainError> {
        Ok(self.store.listings_with_sellers().await?)
    }

    /// Sellers whose counter disagrees with their real listing count.
    pub async fn audit_counts(&self) -> Result<Vec<CountDrift>, DomainError> {
        Ok(self.store.count_drift().await?)
    }

    /// Recompute every drifted counter in one transaction. Offline
    /// maintenance; returns the drift that was corrected.
    pub async fn repair_counts(&self) -> Result<Vec<CountDrift>, DomainError> {
        let drift = self.store.count_drift().await?;
        if drift.is_empty() {
            return Ok(drift);
        }
        let mut uow = UnitOfWork::begin(self.store.as_ref(), "repair_counts").await?;
        uow.validated();
        let outcome = repair_steps(&mut uow, &drift).await;
        uow.finish(outcome).await?;
        tracing::info!(sellers = drift.len(), "listing counters repaired");
        Ok(drift)
    }
}

async fn repair_steps(uow: &mut UnitOfWork, drift: &[CountDrift]) -> Result<(), DomainError> {
    for d in drift {
        if uow.tx.recount_listings(d.seller_id).await? != 1 {
            return Err(DomainError::Invalid(format!(
                "seller {} disappeared during repair",
                d.seller_id
            )));
        }
    }
    Ok(())
}

async fn create_steps(uow: &mut UnitOfWork, new: &NewListing) -> Result<ListingId, DomainError> {
    if !uow.tx.seller_exists(new.seller_id).await? {
        return Err(DomainError::not_found(format!("seller {}", new.seller_id)));
    }
    uow.validated();

    let id = uow.tx.insert_listing(new).await.map_err(reference_error)?;
    bump(uow.tx.as_mut(), new.seller_id, 1).await?;
    Ok(id)
}

/// Ownership as of the locked row. `None` is an unrestricted caller.
fn check_owner(actor: Option<&SessionClaim>, current: &Listing) -> Result<(), DomainError> {
    match actor {
        Some(claim) if !claim.is_admin() && !claim.owns_seller(current.seller_id) => {
            Err(DomainError::forbidden(format!(
                "listing {} belongs to another seller",
                current.id
            )))
        }
        _ => Ok(()),
    }
}

async fn update_steps(
    uow: &mut UnitOfWork,
    id: ListingId,
    patch: &ListingPatch,
    actor: Option<&SessionClaim>,
) -> Result<(), DomainError> {
    let current = uow
        .tx
        .listing_for_update(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("listing {id}")))?;
    check_owner(actor, &current)?;

    match patch.seller_id {
        Some(new_seller) if new_seller != current.seller_id => {
            let locked = uow.tx.lock_sellers(&[current.seller_id, new_seller]).await?;
            if !locked.contains(&new_seller) {
                return Err(DomainError::not_found(format!("new seller {new_seller}")));
            }
        }
        Some(same) => {
            if !uow.tx.seller_exists(same).await? {
                return Err(DomainError::not_found(format!("new seller {same}")));
            }
        }
        None => {}
    }
    uow.validated();

    let changes = patch.changes_against(&current);
    if changes.is_empty() {
        return Ok(());
    }

    let affected = uow.tx.update_listing(id, &changes).await.map_err(reference_error)?;
    if affected == 0 {
        return Err(DomainError::Invalid(format!(
            "listing {id} was not updated; it may have been deleted concurrently"
        )));
    }

    if let Some(new_seller) = changes.seller_id {
        bump(uow.tx.as_mut(), current.seller_id, -1).await?;
        bump(uow.tx.as_mut(), new_seller, 1).await?;
        tracing::debug!(listing_id = %id, from = %current.seller_id, to = %new_seller, "listing reassigned");
    }
    Ok(())
}

async fn remove_steps(
    uow: &mut UnitOfWork,
    id: ListingId,
    actor: Option<&SessionClaim>,
) -> Result<SellerId, DomainError> {
    let current = uow
        .tx
        .listing_for_update(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("listing {id}")))?;
    check_owner(actor, &current)?;
    uow.validated();

    if uow.tx.delete_listing(id).await? == 0 {
        return Err(DomainError::not_found(format!("listing {id}")));
    }
    bump(uow.tx.as_mut(), current.seller_id, -1).await?;
    Ok(current.seller_id)
}

async fn bump(tx: &mut dyn StoreTx, seller: SellerId, delta: i64) -> Result<(), DomainError> {
    if tx.adjust_listing_count(seller, delta).await? != 1 {
        return Err(DomainError::Invalid(format!(
            "listing count of seller {seller} was not adjusted"
        )));
    }
    Ok(())
}

/// A foreign key failure on a listing write means the seller vanished
/// between the existence check and the write.
fn reference_error(err: StoreError) -> DomainError {
    match err {
        StoreError::ForeignKeyViolation(msg) => DomainError::not_found(format!("seller ({msg})")),
        other => other.into(),
    }
}
