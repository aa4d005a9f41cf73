#![deny(missing_docs)]

//! # estate-core: Foundational Types for the Estate Listing Service
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies and no I/O: only `serde`, `thiserror` and `chrono`
//! from the external ecosystem (plus `utoipa` behind the `openapi` feature).
//!
//! ## Design Principles
//!
//! 1. **Newtype identifiers.** [`AccountId`], [`SellerId`] and [`ListingId`]
//!    are distinct types that reject non-positive values at construction.
//!    You cannot pass a seller id where a listing id is expected.
//!
//! 2. **Fixed-shape claims.** A verified session token decodes into a
//!    [`SessionClaim`] with an explicit `Option<SellerId>`, never an untyped
//!    map.
//!
//! 3. **Structured patches.** Partial updates are [`ListingPatch`] and
//!    [`SellerPatch`], one `Option<T>` per known field. Consumers iterate the
//!    fixed field list rather than arbitrary input keys.
//!
//! 4. **Closed error taxonomy.** [`DomainError`] is the single set of failure
//!    kinds the transport layer matches exhaustively.

pub mod claim;
pub mod error;
pub mod identity;
pub mod query;
pub mod record;
pub mod role;

pub use claim::SessionClaim;
pub use error::{DomainError, ValidationError};
pub use identity::{AccountId, ListingId, SellerId};
pub use query::{
    ListingQuery, ListingSort, ListingSortField, Page, SellerQuery, SortOrder, DEFAULT_LIMIT,
    DEFAULT_PAGE, MAX_LIMIT,
};
pub use record::{
    Account, Listing, ListingPatch, ListingWithSeller, NewAccount, NewListing, NewSeller, Seller,
    SellerPatch,
};
pub use record::{validate_email, validate_name};
pub use role::Role;
