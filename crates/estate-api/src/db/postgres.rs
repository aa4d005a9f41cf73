//! PostgreSQL [`Store`] via SQLx.
//!
//! Runs at the default READ COMMITTED isolation. Counter updates are
//! relative (`listing_count = listing_count + $1`) and take the seller row
//! lock; update and remove lock the listing row with `FOR UPDATE` before
//! reading its `seller_id`; the referenced seller is pinned with
//! `FOR KEY SHARE` so it cannot be deleted mid-transaction. A reassign locks
//! both sellers `FOR NO KEY UPDATE` in id order before moving the count.
//!
//! SQLSTATE `40P01` (deadlock) and `40001` (serialization failure) surface
//! as [`StoreError::TransactionAborted`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estate_core::{
    Account, AccountId, Listing, ListingId, ListingPatch, ListingQuery, ListingWithSeller,
    NewAccount, NewListing, NewSeller, Page, Seller, SellerId, SellerPatch, SellerQuery,
};
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{QueryBuilder, Transaction};

use super::{CountDrift, Store, StoreError, StoreTx};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let detail = db_err
                .constraint()
                .map(|c| format!("{} ({c})", db_err.message()))
                .unwrap_or_else(|| db_err.message().to_string());
            match db_err.kind() {
                ErrorKind::UniqueViolation => return Self::UniqueViolation(detail),
                ErrorKind::ForeignKeyViolation => return Self::ForeignKeyViolation(detail),
                ErrorKind::CheckViolation => return Self::CheckViolation(detail),
                _ => {}
            }
            if let Some(code) = db_err.code() {
                if is_aborted_by_concurrency(&code) {
                    return Self::TransactionAborted(format!("{detail} [{code}]"));
                }
            }
        }
        Self::Backend(err.to_string())
    }
}

fn is_aborted_by_concurrency(sqlstate: &str) -> bool {
    matches!(sqlstate, "40P01" | "40001")
}

fn decode_id<T: TryFrom<i64>>(raw: i64, column: &str) -> Result<T, StoreError> {
    T::try_from(raw).map_err(|_| StoreError::Backend(format!("{column} holds invalid id {raw}")))
}

// -- Row types ----------------------------------------------------------------

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";
const SELLER_COLUMNS: &str = "id, name, email, account_id, listing_count, created_at, updated_at";
const LISTING_COLUMNS: &str =
    "id, title, price, description, rooms, bathrooms, parking, seller_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_record(self) -> Result<Account, StoreError> {
        Ok(Account {
            id: decode_id(self.id, "accounts.id")?,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role: self
                .role
                .parse()
                .map_err(|e: estate_core::ValidationError| StoreError::Backend(e.to_string()))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SellerRow {
    id: i64,
    name: String,
    email: String,
    account_id: Option<i64>,
    listing_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SellerRow {
    fn into_record(self) -> Result<Seller, StoreError> {
        Ok(Seller {
            id: decode_id(self.id, "sellers.id")?,
            name: self.name,
            email: self.email,
            account_id: self
                .account_id
                .map(|a| decode_id(a, "sellers.account_id"))
                .transpose()?,
            listing_count: self.listing_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: i64,
    title: String,
    price: i64,
    description: String,
    rooms: i32,
    bathrooms: i32,
    parking: i32,
    seller_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ListingRow {
    fn into_record(self) -> Result<Listing, StoreError> {
        Ok(Listing {
            id: decode_id(self.id, "listings.id")?,
            title: self.title,
            price: self.price,
            description: self.description,
            rooms: self.rooms,
            bathrooms: self.bathrooms,
            parking: self.parking,
            seller_id: decode_id(self.seller_id, "listings.seller_id")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListingWithSellerRow {
    #[sqlx(flatten)]
    listing: ListingRow,
    seller_name: String,
    seller_email: String,
}

fn listings(rows: Vec<ListingRow>) -> Result<Vec<Listing>, StoreError> {
    rows.into_iter().map(ListingRow::into_record).collect()
}

fn push_listing_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ListingQuery) {
    qb.push(" WHERE TRUE");
    if let Some(seller) = query.seller_id {
        qb.push(" AND seller_id = ").push_bind(seller.get());
    }
    if let Some(min) = query.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn as_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// -- Store --------------------------------------------------------------------

/// Pool-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a pool whose schema is already migrated.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_account(&self, new: &NewAccount) -> Result<AccountId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (name, email, password_hash, role)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        decode_id(id, "accounts.id")
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AccountRow::into_record).transpose()
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(AccountRow::into_record).transpose()
    }

    async fn insert_seller(&self, new: &NewSeller) -> Result<SellerId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sellers (name, email, account_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.account_id.map(AccountId::get))
        .fetch_one(&self.pool)
        .await?;
        decode_id(id, "sellers.id")
    }

    async fn seller_by_id(&self, id: SellerId) -> Result<Option<Seller>, StoreError> {
        let row = sqlx::query_as::<_, SellerRow>(&format!(
            "SELECT {SELLER_COLUMNS} FROM sellers WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(SellerRow::into_record).transpose()
    }

    async fn seller_by_account(&self, account: AccountId) -> Result<Option<Seller>, StoreError> {
        let row = sqlx::query_as::<_, SellerRow>(&format!(
            "SELECT {SELLER_COLUMNS} FROM sellers WHERE account_id = $1"
        ))
        .bind(account.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(SellerRow::into_record).transpose()
    }

    async fn list_sellers(&self, query: &SellerQuery) -> Result<Page<Seller>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sellers")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, SellerRow>(&format!(
            "SELECT {SELLER_COLUMNS} FROM sellers ORDER BY name {}, id ASC LIMIT $1 OFFSET $2",
            query.order.as_sql()
        ))
        .bind(i64::from(query.limit))
        .bind(as_i64(query.offset()))
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            data: rows
                .into_iter()
                .map(SellerRow::into_record)
                .collect::<Result<_, _>>()?,
            page: query.page,
            limit: query.limit,
            total: total.max(0) as u64,
        })
    }

    async fn update_seller(&self, id: SellerId, patch: &SellerPatch) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE sellers SET ");
        let mut set = qb.separated(", ");
        if let Some(name) = &patch.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(email) = &patch.email {
            set.push("email = ").push_bind_unseparated(email.clone());
        }
        if let Some(account) = patch.account_id {
            set.push("account_id = ").push_bind_unseparated(account.get());
        }
        set.push("updated_at = NOW()");
        qb.push(" WHERE id = ").push_bind(id.get());

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_seller(&self, id: SellerId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sellers WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn listing_by_id(&self, id: ListingId) -> Result<Option<Listing>, StoreError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ListingRow::into_record).transpose()
    }

    async fn list_listings(&self, query: &ListingQuery) -> Result<Page<Listing>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM listings");
        push_listing_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {LISTING_COLUMNS} FROM listings"));
        push_listing_filters(&mut qb, query);
        match query.sort {
            Some(sort) => {
                qb.push(format!(
                    " ORDER BY {} {}, id ASC",
                    sort.field.column(),
                    sort.order.as_sql()
                ));
            }
            None => {
                qb.push(" ORDER BY id ASC");
            }
        }
        qb.push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(as_i64(query.offset()));

        let rows = qb.build_query_as::<ListingRow>().fetch_all(&self.pool).await?;
        Ok(Page {
            data: listings(rows)?,
            page: query.page,
            limit: query.limit,
            total: total.max(0) as u64,
        })
    }

    async fn search_listings(&self, term: &str) -> Result<Vec<Listing>, StoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings
             WHERE title ILIKE $1 OR description ILIKE $1
             ORDER BY id ASC"
        ))
        .bind(like_pattern(term))
        .fetch_all(&self.pool)
        .await?;
        listings(rows)
    }

    async fn listings_with_sellers(&self) -> Result<Vec<ListingWithSeller>, StoreError> {
        let rows = sqlx::query_as::<_, ListingWithSellerRow>(
            "SELECT l.id, l.title, l.price, l.description, l.rooms, l.bathrooms, l.parking,
                    l.seller_id, l.created_at, l.updated_at,
                    s.name AS seller_name, s.email AS seller_email
             FROM listings l
             JOIN sellers s ON s.id = l.seller_id
             ORDER BY l.id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| {
                Ok(ListingWithSeller {
                    listing: r.listing.into_record()?,
                    seller_name: r.seller_name,
                    seller_email: r.seller_email,
                })
            })
            .collect()
    }

    async fn count_drift(&self) -> Result<Vec<CountDrift>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT s.id, s.listing_count, COUNT(l.id)
             FROM sellers s
             LEFT JOIN listings l ON l.seller_id = s.id
             GROUP BY s.id, s.listing_count
             HAVING s.listing_count <> COUNT(l.id)
             ORDER BY s.id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(id, recorded, actual)| {
                Ok(CountDrift {
                    seller_id: decode_id(id, "sellers.id")?,
                    recorded,
                    actual,
                })
            })
            .collect()
    }
}

// -- Transaction --------------------------------------------------------------

/// SQLx transaction; SQLx rolls it back when dropped uncommitted.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn seller_exists(&mut self, id: SellerId) -> Result<bool, StoreError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM sellers WHERE id = $1 FOR KEY SHARE")
                .bind(id.get())
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(found.is_some())
    }

    async fn lock_sellers(&mut self, ids: &[SellerId]) -> Result<Vec<SellerId>, StoreError> {
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let locked: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM sellers WHERE id = ANY($1) ORDER BY id FOR NO KEY UPDATE",
        )
        .bind(raw)
        .fetch_all(&mut *self.tx)
        .await?;
        locked
            .into_iter()
            .map(|id| decode_id(id, "sellers.id"))
            .collect()
    }

    async fn listing_for_update(&mut self, id: ListingId) -> Result<Option<Listing>, StoreError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(ListingRow::into_record).transpose()
    }

    async fn insert_listing(&mut self, new: &NewListing) -> Result<ListingId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO listings (title, price, description, rooms, bathrooms, parking, seller_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&new.title)
        .bind(new.price)
        .bind(&new.description)
        .bind(new.rooms)
        .bind(new.bathrooms)
        .bind(new.parking)
        .bind(new.seller_id.get())
        .fetch_one(&mut *self.tx)
        .await?;
        decode_id(id, "listings.id")
    }

    async fn update_listing(
        &mut self,
        id: ListingId,
        changes: &ListingPatch,
    ) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE listings SET ");
        let mut set = qb.separated(", ");
        if let Some(title) = &changes.title {
            set.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(price) = changes.price {
            set.push("price = ").push_bind_unseparated(price);
        }
        if let Some(description) = &changes.description {
            set.push("description = ").push_bind_unseparated(description.clone());
        }
        if let Some(rooms) = changes.rooms {
            set.push("rooms = ").push_bind_unseparated(rooms);
        }
        if let Some(bathrooms) = changes.bathrooms {
            set.push("bathrooms = ").push_bind_unseparated(bathrooms);
        }
        if let Some(parking) = changes.parking {
            set.push("parking = ").push_bind_unseparated(parking);
        }
        if let Some(seller) = changes.seller_id {
            set.push("seller_id = ").push_bind_unseparated(seller.get());
        }
        set.push("updated_at = NOW()");
        qb.push(" WHERE id = ").push_bind(id.get());

        let result = qb.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn delete_listing(&mut self, id: ListingId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn adjust_listing_count(
        &mut self,
        seller: SellerId,
        delta: i64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE sellers SET listing_count = listing_count + $1, updated_at = NOW()
             WHERE id = $2",
        )
        .bind(delta)
        .bind(seller.get())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn recount_listings(&mut self, seller: SellerId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE sellers
             SET listing_count = (SELECT COUNT(*) FROM listings WHERE seller_id = $1),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(seller.get())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
