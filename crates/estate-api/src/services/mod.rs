//! # Services
//!
//! Domain operations behind the HTTP routes. Each service holds an
//! `Arc<dyn Store>` and returns [`estate_core::DomainError`]; the transport
//! layer never talks to the store for writes.
//!
//! - [`sessions`]: registration, login, token resolution.
//! - [`listings`]: the transactional listing/seller consistency engine.
//! - [`sellers`]: seller profile CRUD.

pub mod listings;
pub mod sellers;
pub mod sessions;

pub use listings::ListingService;
pub use sellers::SellerService;
pub use sessions::{Profile, Registration, SessionManager};
