//! # API Route Modules
//!
//! - `users`: registration, login and the caller's own profile.
//! - `sellers`: seller profile CRUD.
//! - `listings`: listing reads, search, and the gated writes that go
//!   through the consistency engine.
//!
//! Shared response DTOs live here.

pub mod listings;
pub mod sellers;
pub mod users;

use estate_core::{Listing, Page, Seller};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every 201 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    /// Id of the new resource.
    pub id: i64,
}

/// One page of listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingPage {
    pub data: Vec<Listing>,
    pub page: u32,
    pub limit: u32,
    /// Matching listings across all pages.
    pub total: u64,
}

impl From<Page<Listing>> for ListingPage {
    fn from(p: Page<Listing>) -> Self {
        Self {
            data: p.data,
            page: p.page,
            limit: p.limit,
            total: p.total,
        }
    }
}

/// One page of sellers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SellerPage {
    pub data: Vec<Seller>,
    pub page: u32,
    pub limit: u32,
    /// Sellers across all pages.
    pub total: u64,
}

impl From<Page<Seller>> for SellerPage {
    fn from(p: Page<Seller>) -> Self {
        Self {
            data: p.data,
            page: p.page,
            limit: p.limit,
            total: p.total,
        }
    }
}

/// Shared page/limit rule: page ≥ 1, 1 ≤ limit ≤ 100.
pub(crate) fn validate_paging(page: Option<u32>, limit: Option<u32>) -> Result<(), String> {
    if page == Some(0) {
        return Err("page must be a positive integer".to_string());
    }
    match limit {
        Some(0) => Err("limit must be a positive integer".to_string()),
        Some(l) if l > estate_core::MAX_LIMIT => Err(format!(
            "limit must be at most {}",
            estate_core::MAX_LIMIT
        )),
        _ => Ok(()),
    }
}
