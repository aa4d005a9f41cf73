//! # Records
//!
//! Persisted rows (accounts, sellers, listings), their insert shapes, and
//! the partial-update patches.
//!
//! `listing_count` on [`Seller`] is a denormalized aggregate: it must always
//! equal the number of listings whose `seller_id` is that seller. Only the
//! listing service writes it, and only through relative `+1`/`-1` updates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{AccountId, ListingId, SellerId};
use crate::role::Role;

// -- Accounts -----------------------------------------------------------------

/// A login identity. Immutable after registration.
///
/// Deliberately not `Serialize`: the password hash must never reach a
/// response body. Custom `Debug` redacts it from logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Primary key.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Unique login email, matched exactly (case-sensitive).
    pub email: String,
    /// One-way hash of the password in PHC string format.
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Insert shape for [`Account`]. The password is already hashed.
#[derive(Clone)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Unique login email.
    pub email: String,
    /// PHC-format password hash.
    pub password_hash: String,
    /// Account role.
    pub role: Role,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

// -- Sellers ------------------------------------------------------------------

/// A selling profile, optionally linked back to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    /// Primary key.
    pub id: SellerId,
    /// Display name.
    pub name: String,
    /// Unique contact email.
    pub email: String,
    /// Linked account. A profile may stay unlinked indefinitely.
    pub account_id: Option<AccountId>,
    /// Number of listings whose `seller_id` is this seller.
    pub listing_count: i64,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for [`Seller`]. New profiles start with zero listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeller {
    /// Display name.
    pub name: String,
    /// Unique contact email.
    pub email: String,
    /// Account to link, if any.
    pub account_id: Option<AccountId>,
}

impl NewSeller {
    /// Check field constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)?;
        validate_email("email", &self.email)
    }
}

/// Partial update of a [`Seller`]. `listing_count` is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellerPatch {
    /// New display name.
    pub name: Option<String>,
    /// New contact email.
    pub email: Option<String>,
    /// New account back-reference (admin only).
    pub account_id: Option<AccountId>,
}

impl SellerPatch {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.account_id.is_none()
    }

    /// Check constraints on the fields that are set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(email) = &self.email {
            validate_email("email", email)?;
        }
        Ok(())
    }

    /// Apply the set fields to `seller`.
    pub fn apply_to(&self, seller: &mut Seller) {
        if let Some(name) = &self.name {
            seller.name = name.clone();
        }
        if let Some(email) = &self.email {
            seller.email = email.clone();
        }
        if let Some(account_id) = self.account_id {
            seller.account_id = Some(account_id);
        }
    }
}

// -- Listings -----------------------------------------------------------------

/// A property listing owned by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Primary key.
    pub id: ListingId,
    /// Headline.
    pub title: String,
    /// Asking price in whole currency units; always positive.
    pub price: i64,
    /// Free-form description.
    pub description: String,
    /// Number of rooms.
    pub rooms: i32,
    /// Number of bathrooms.
    pub bathrooms: i32,
    /// Number of parking spaces.
    pub parking: i32,
    /// Owning seller.
    pub seller_id: SellerId,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for [`Listing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    /// Headline.
    pub title: String,
    /// Asking price; must be positive.
    pub price: i64,
    /// Free-form description.
    pub description: String,
    /// Number of rooms.
    pub rooms: i32,
    /// Number of bathrooms.
    pub bathrooms: i32,
    /// Number of parking spaces.
    pub parking: i32,
    /// Owning seller; must exist.
    pub seller_id: SellerId,
}

impl NewListing {
    /// Check field constraints. Referential checks happen in the service.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_price(self.price)?;
        validate_description(&self.description)?;
        validate_count("rooms", self.rooms)?;
        validate_count("bathrooms", self.bathrooms)?;
        validate_count("parking", self.parking)
    }
}

/// Partial update of a [`Listing`], one optional slot per updatable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPatch {
    /// New headline.
    pub title: Option<String>,
    /// New price.
    pub price: Option<i64>,
    /// New description.
    pub description: Option<String>,
    /// New room count.
    pub rooms: Option<i32>,
    /// New bathroom count.
    pub bathrooms: Option<i32>,
    /// New parking count.
    pub parking: Option<i32>,
    /// Reassign to another seller.
    pub seller_id: Option<SellerId>,
}

impl ListingPatch {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.rooms.is_none()
            && self.bathrooms.is_none()
            && self.parking.is_none()
            && self.seller_id.is_none()
    }

    /// Check constraints on the fields that are set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(rooms) = self.rooms {
            validate_count("rooms", rooms)?;
        }
        if let Some(bathrooms) = self.bathrooms {
            validate_count("bathrooms", bathrooms)?;
        }
        if let Some(parking) = self.parking {
            validate_count("parking", parking)?;
        }
        Ok(())
    }

    /// Keep only the set fields whose value differs from `current`.
    pub fn changes_against(&self, current: &Listing) -> ListingPatch {
        fn differing<T: PartialEq + Clone>(new: &Option<T>, old: &T) -> Option<T> {
            new.as_ref().filter(|v| *v != old).cloned()
        }

        ListingPatch {
            title: differing(&self.title, &current.title),
            price: differing(&self.price, &current.price),
            description: differing(&self.description, &current.description),
            rooms: differing(&self.rooms, &current.rooms),
            bathrooms: differing(&self.bathrooms, &current.bathrooms),
            parking: differing(&self.parking, &current.parking),
            seller_id: differing(&self.seller_id, &current.seller_id),
        }
    }

    /// Apply the set fields to `listing`.
    pub fn apply_to(&self, listing: &mut Listing) {
        if let Some(title) = &self.title {
            listing.title = title.clone();
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(description) = &self.description {
            listing.description = description.clone();
        }
        if let Some(rooms) = self.rooms {
            listing.rooms = rooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            listing.bathrooms = bathrooms;
        }
        if let Some(parking) = self.parking {
            listing.parking = parking;
        }
        if let Some(seller_id) = self.seller_id {
            listing.seller_id = seller_id;
        }
    }
}

/// A listing joined with its seller's public details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ListingWithSeller {
    /// The listing row.
    #[serde(flatten)]
    pub listing: Listing,
    /// Seller display name.
    pub seller_name: String,
    /// Seller contact email.
    pub seller_email: String,
}

// -- Field rules ----------------------------------------------------------------

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().chars().count() < 2 {
        return Err(ValidationError::field("title", "must be at least 2 characters"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.trim().chars().count() < 3 {
        return Err(ValidationError::field(
            "description",
            "must be at least 3 characters",
        ));
    }
    Ok(())
}

fn validate_price(price: i64) -> Result<(), ValidationError> {
    if price <= 0 {
        return Err(ValidationError::field("price", "must be greater than 0"));
    }
    Ok(())
}

fn validate_count(field: &'static str, value: i32) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::field(field, "must not be negative"));
    }
    Ok(())
}

/// Names are at least two visible characters.
pub fn validate_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() < 2 {
        return Err(ValidationError::field(field, "must be at least 2 characters"));
    }
    Ok(())
}

/// Accepts `local@domain.tld` with no whitespace and exactly one `@`.
pub fn validate_email(field: &'static str, email: &str) -> Result<(), ValidationError> {
    let well_formed = !email.chars().any(char::is_whitespace)
        && email.matches('@').count() == 1
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if !well_formed {
        return Err(ValidationError::field(field, "must be a valid email address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Listing {
        let now = Utc::now();
        Listing {
            id: ListingId::new(1).unwrap(),
            title: "Casa Parque".to_string(),
            price: 150_000,
            description: "Casa con patio".to_string(),
            rooms: 3,
            bathrooms: 2,
            parking: 1,
            seller_id: SellerId::new(7).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn changes_against_drops_unchanged_fields() {
        let patch = ListingPatch {
            price: Some(150_000),
            rooms: Some(4),
            seller_id: Some(SellerId::new(7).unwrap()),
            ..Default::default()
        };
        let changes = patch.changes_against(&listing());
        assert_eq!(
            changes,
            ListingPatch {
                rooms: Some(4),
                ..Default::default()
            }
        );
    }

    #[test]
    fn changes_against_keeps_reassignment() {
        let patch = ListingPatch {
            seller_id: Some(SellerId::new(8).unwrap()),
            ..Default::default()
        };
        let changes = patch.changes_against(&listing());
        assert_eq!(changes.seller_id, Some(SellerId::new(8).unwrap()));
    }

    #[test]
    fn apply_to_touches_only_set_fields() {
        let mut l = listing();
        ListingPatch {
            title: Some("Casa Lago".to_string()),
            ..Default::default()
        }
        .apply_to(&mut l);
        assert_eq!(l.title, "Casa Lago");
        assert_eq!(l.price, 150_000);
    }

    #[test]
    fn new_listing_rules() {
        let mut new = NewListing {
            title: "Loft".to_string(),
            price: 1,
            description: "Nice".to_string(),
            rooms: 0,
            bathrooms: 0,
            parking: 0,
            seller_id: SellerId::new(1).unwrap(),
        };
        assert!(new.validate().is_ok());

        new.price = 0;
        assert!(new.validate().is_err());
        new.price = 10;
        new.rooms = -1;
        assert!(new.validate().is_err());
        new.rooms = 1;
        new.title = " x ".to_string();
        assert!(new.validate().is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(validate_email("email", "a@b.co").is_ok());
        assert!(validate_email("email", "seller1.props+1@test.com").is_ok());
        assert!(validate_email("email", "a@b").is_err());
        assert!(validate_email("email", "a b@c.d").is_err());
        assert!(validate_email("email", "@c.d").is_err());
        assert!(validate_email("email", "a@@c.d").is_err());
    }

    #[test]
    fn seller_patch_empty_and_apply() {
        assert!(SellerPatch::default().is_empty());
        let now = Utc::now();
        let mut seller = Seller {
            id: SellerId::new(3).unwrap(),
            name: "Old".to_string(),
            email: "old@x.io".to_string(),
            account_id: None,
            listing_count: 2,
            created_at: now,
            updated_at: now,
        };
        SellerPatch {
            account_id: Some(AccountId::new(5).unwrap()),
            ..Default::default()
        }
        .apply_to(&mut seller);
        assert_eq!(seller.account_id, Some(AccountId::new(5).unwrap()));
        assert_eq!(seller.listing_count, 2);
    }

    #[test]
    fn account_debug_redacts_hash() {
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(1).unwrap(),
            name: "Admin".to_string(),
            email: "admin@test.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        };
        let rendered = format!("{account:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn patch_strategy() -> impl Strategy<Value = ListingPatch> {
            (
                proptest::option::of(1i64..300_000),
                proptest::option::of(0i32..6),
                proptest::option::of(0i32..6),
                proptest::option::of(1i64..10),
            )
                .prop_map(|(price, rooms, parking, seller)| ListingPatch {
                    price,
                    rooms,
                    parking,
                    seller_id: seller.map(|s| SellerId::new(s).unwrap()),
                    ..Default::default()
                })
        }

        proptest! {
            #[test]
            fn applying_only_changes_is_equivalent(patch in patch_strategy()) {
                let base = listing();

                let mut full = base.clone();
                patch.apply_to(&mut full);

                let mut minimal = base.clone();
                let changes = patch.changes_against(&base);
                changes.apply_to(&mut minimal);

                prop_assert_eq!(full, minimal);
                prop_assert!(changes.changes_against(&base) == changes);
            }
        }
    }
}
