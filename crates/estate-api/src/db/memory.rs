//! In-process [`Store`] over three ordered maps.
//!
//! A transaction takes the table lock as an owned guard and keeps it until
//! commit or drop, so transactions are fully serialized. Writes go to a
//! private copy of the tables that replaces the shared one only on commit.
//!
//! Constraints mirror the Postgres schema: unique account email, unique
//! seller email and account link, listing → seller and seller → account
//! foreign keys, and `listing_count >= 0`.
//!
//! [`MemoryStore::inject_fault`] arms a one-shot failure at a named step so
//! tests can abort a transaction midway.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use estate_core::{
    Account, AccountId, Listing, ListingId, ListingPatch, ListingQuery, ListingSortField,
    ListingWithSeller, NewAccount, NewListing, NewSeller, Page, Seller, SellerId, SellerPatch,
    SellerQuery, SortOrder,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{CountDrift, Store, StoreError, StoreTx};

/// Transaction steps at which a fault can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// [`StoreTx::insert_listing`]
    InsertListing,
    /// [`StoreTx::update_listing`]
    UpdateListing,
    /// [`StoreTx::delete_listing`]
    DeleteListing,
    /// [`StoreTx::adjust_listing_count`]
    AdjustListingCount,
    /// [`StoreTx::commit`]
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    sellers: BTreeMap<i64, Seller>,
    listings: BTreeMap<i64, Listing>,
    last_account: i64,
    last_seller: i64,
    last_listing: i64,
}

impl Tables {
    fn seller_email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.sellers
            .values()
            .any(|s| s.email == email && Some(s.id.get()) != except)
    }

    fn account_linked(&self, account: AccountId, except: Option<i64>) -> bool {
        self.sellers
            .values()
            .any(|s| s.account_id == Some(account) && Some(s.id.get()) != except)
    }

    fn check_account_fk(&self, account: Option<AccountId>) -> Result<(), StoreError> {
        match account {
            Some(a) if !self.accounts.contains_key(&a.get()) => Err(
                StoreError::ForeignKeyViolation(format!("account {a} does not exist")),
            ),
            _ => Ok(()),
        }
    }

    fn check_seller_fk(&self, seller: SellerId) -> Result<(), StoreError> {
        if self.sellers.contains_key(&seller.get()) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!(
                "seller {seller} does not exist"
            )))
        }
    }
}

/// Process-local store. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<parking_lot::Mutex<Vec<FaultPoint>>>,
}

impl MemoryStore {
    /// Empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next transaction step matching `point`, once.
    pub fn inject_fault(&self, point: FaultPoint) {
        self.faults.lock().push(point);
    }

    /// Disarm every pending fault.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Overwrite a seller's counter, bypassing the engine. Test setup for
    /// drift detection.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn force_listing_count(&self, seller: SellerId, value: i64) {
        if let Some(s) = self.tables.lock().await.sellers.get_mut(&seller.get()) {
            s.listing_count = value;
        }
    }
}

fn new_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

fn to_id<T: TryFrom<i64>>(raw: i64) -> Result<T, StoreError> {
    T::try_from(raw).map_err(|_| StoreError::Backend(format!("generated id {raw} is invalid")))
}

fn paginate<T: Clone>(rows: &[T], page: u32, limit: u32, offset: u64) -> Page<T> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let data = rows
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();
    Page {
        data,
        page,
        limit,
        total: rows.len() as u64,
    }
}

fn apply_order(ordering: std::cmp::Ordering, order: SortOrder) -> std::cmp::Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_account(&self, new: &NewAccount) -> Result<AccountId, StoreError> {
        let mut t = self.tables.lock().await;
        if t.accounts.values().any(|a| a.email == new.email) {
            return Err(StoreError::UniqueViolation(format!(
                "account email {} already registered",
                new.email
            )));
        }
        let id: AccountId = to_id(new_id(&mut t.last_account))?;
        let now = Utc::now();
        t.accounts.insert(
            id.get(),
            Account {
                id,
                name: new.name.clone(),
                email: new.email.clone(),
                password_hash: new.password_hash.clone(),
                role: new.role,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.tables.lock().await.accounts.get(&id.get()).cloned())
    }

    async fn insert_seller(&self, new: &NewSeller) -> Result<SellerId, StoreError> {
        let mut t = self.tables.lock().await;
        t.check_account_fk(new.account_id)?;
        if t.seller_email_taken(&new.email, None) {
            return Err(StoreError::UniqueViolation(format!(
                "seller email {} already in use",
                new.email
            )));
        }
        if let Some(account) = new.account_id {
            if t.account_linked(account, None) {
                return Err(StoreError::UniqueViolation(format!(
                    "account {account} already has a seller profile"
                )));
            }
        }
        let id: SellerId = to_id(new_id(&mut t.last_seller))?;
        let now = Utc::now();
        t.sellers.insert(
            id.get(),
            Seller {
                id,
                name: new.name.clone(),
                email: new.email.clone(),
                account_id: new.account_id,
                listing_count: 0,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn seller_by_id(&self, id: SellerId) -> Result<Option<Seller>, StoreError> {
        Ok(self.tables.lock().await.sellers.get(&id.get()).cloned())
    }

    async fn seller_by_account(&self, account: AccountId) -> Result<Option<Seller>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t
            .sellers
            .values()
            .find(|s| s.account_id == Some(account))
            .cloned())
    }

    async fn list_sellers(&self, query: &SellerQuery) -> Result<Page<Seller>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Seller> = t.sellers.values().cloned().collect();
        rows.sort_by(|a, b| {
            apply_order(a.name.cmp(&b.name), query.order).then(a.id.cmp(&b.id))
        });
        Ok(paginate(&rows, query.page, query.limit, query.offset()))
    }

    async fn update_seller(&self, id: SellerId, patch: &SellerPatch) -> Result<u64, StoreError> {
        let mut t = self.tables.lock().await;
        if !t.sellers.contains_key(&id.get()) {
            return Ok(0);
        }
        t.check_account_fk(patch.account_id)?;
        if let Some(email) = &patch.email {
            if t.seller_email_taken(email, Some(id.get())) {
                return Err(StoreError::UniqueViolation(format!(
                    "seller email {email} already in use"
                )));
            }
        }
        if let Some(account) = patch.account_id {
            if t.account_linked(account, Some(id.get())) {
                return Err(StoreError::UniqueViolation(format!(
                    "account {account} already has a seller profile"
                )));
            }
        }
        match t.sellers.get_mut(&id.get()) {
            Some(seller) => {
                patch.apply_to(seller);
                seller.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_seller(&self, id: SellerId) -> Result<u64, StoreError> {
        let mut t = self.tables.lock().await;
        if t.listings.values().any(|l| l.seller_id == id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "seller {id} is still referenced by listings"
            )));
        }
        Ok(u64::from(t.sellers.remove(&id.get()).is_some()))
    }

    async fn listing_by_id(&self, id: ListingId) -> Result<Option<Listing>, StoreError> {
        Ok(self.tables.lock().await.listings.get(&id.get()).cloned())
    }

    async fn list_listings(&self, query: &ListingQuery) -> Result<Page<Listing>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Listing> = t
            .listings
            .values()
            .filter(|l| query.matches(l.price, l.seller_id))
            .cloned()
            .collect();
        if let Some(sort) = query.sort {
            rows.sort_by(|a, b| {
                let primary = match sort.field {
                    ListingSortField::Price => a.price.cmp(&b.price),
                    ListingSortField::Title => a.title.cmp(&b.title),
                    ListingSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                };
                apply_order(primary, sort.order).then(a.id.cmp(&b.id))
            });
        }
        Ok(paginate(&rows, query.page, query.limit, query.offset()))
    }

    async fn search_listings(&self, term: &str) -> Result<Vec<Listing>, StoreError> {
        let needle = term.to_lowercase();
        let t = self.tables.lock().await;
        Ok(t.listings
            .values()
            .filter(|l| {
                l.title.to_lowercase().contains(&needle)
                    || l.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn listings_with_sellers(&self) -> Result<Vec<ListingWithSeller>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.listings
            .values()
            .filter_map(|l| {
                t.sellers.get(&l.seller_id.get()).map(|s| ListingWithSeller {
                    listing: l.clone(),
                    seller_name: s.name.clone(),
                    seller_email: s.email.clone(),
                })
            })
            .collect())
    }

    async fn count_drift(&self) -> Result<Vec<CountDrift>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.sellers
            .values()
            .filter_map(|s| {
                let actual = t.listings.values().filter(|l| l.seller_id == s.id).count() as i64;
                (actual != s.listing_count).then_some(CountDrift {
                    seller_id: s.id,
                    recorded: s.listing_count,
                    actual,
                })
            })
            .collect())
    }
}

/// Transaction over a private copy of the tables.
struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Arc<parking_lot::Mutex<Vec<FaultPoint>>>,
}

impl MemoryTx {
    fn trip(&self, point: FaultPoint) -> Result<(), StoreError> {
        let mut faults = self.faults.lock();
        match faults.iter().position(|p| *p == point) {
            Some(idx) => {
                faults.remove(idx);
                Err(StoreError::Backend(format!("injected fault at {point:?}")))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn seller_exists(&mut self, id: SellerId) -> Result<bool, StoreError> {
        Ok(self.working.sellers.contains_key(&id.get()))
    }

    async fn lock_sellers(&mut self, ids: &[SellerId]) -> Result<Vec<SellerId>, StoreError> {
        let mut found: Vec<SellerId> = ids
            .iter()
            .copied()
            .filter(|id| self.working.sellers.contains_key(&id.get()))
            .collect();
        found.sort_unstable();
        found.dedup();
        Ok(found)
    }

    async fn listing_for_update(&mut self, id: ListingId) -> Result<Option<Listing>, StoreError> {
        Ok(self.working.listings.get(&id.get()).cloned())
    }

    async fn insert_listing(&mut self, new: &NewListing) -> Result<ListingId, StoreError> {
        self.trip(FaultPoint::InsertListing)?;
        self.working.check_seller_fk(new.seller_id)?;
        let id: ListingId = to_id(new_id(&mut self.working.last_listing))?;
        let now = Utc::now();
        self.working.listings.insert(
            id.get(),
            Listing {
                id,
                title: new.title.clone(),
                price: new.price,
                description: new.description.clone(),
                rooms: new.rooms,
                bathrooms: new.bathrooms,
                parking: new.parking,
                seller_id: new.seller_id,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_listing(
        &mut self,
        id: ListingId,
        changes: &ListingPatch,
    ) -> Result<u64, StoreError> {
        self.trip(FaultPoint::UpdateListing)?;
        if let Some(seller) = changes.seller_id {
            self.working.check_seller_fk(seller)?;
        }
        match self.working.listings.get_mut(&id.get()) {
            Some(listing) => {
                changes.apply_to(listing);
                listing.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_listing(&mut self, id: ListingId) -> Result<u64, StoreError> {
        self.trip(FaultPoint::DeleteListing)?;
        Ok(u64::from(self.working.listings.remove(&id.get()).is_some()))
    }

    async fn adjust_listing_count(
        &mut self,
        seller: SellerId,
        delta: i64,
    ) -> Result<u64, StoreError> {
        self.trip(FaultPoint::AdjustListingCount)?;
        match self.working.sellers.get_mut(&seller.get()) {
            Some(s) => {
                let next = s.listing_count + delta;
                if next < 0 {
                    return Err(StoreError::CheckViolation(format!(
                        "listing_count of seller {seller} would become {next}"
                    )));
                }
                s.listing_count = next;
                s.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn recount_listings(&mut self, seller: SellerId) -> Result<u64, StoreError> {
        let actual = self
            .working
            .listings
            .values()
            .filter(|l| l.seller_id == seller)
            .count() as i64;
        match self.working.sellers.get_mut(&seller.get()) {
            Some(s) => {
                s.listing_count = actual;
                s.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.trip(FaultPoint::Commit)?;
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
