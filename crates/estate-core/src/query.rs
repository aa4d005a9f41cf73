//! # Read Queries
//!
//! Filter, sort and pagination parameters for the listing and seller
//! read paths, and the [`Page`] envelope they return.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::SellerId;

/// Default 1-based page number.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size.
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 100;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::InvalidSort {
                input: s.to_string(),
                expected: "asc or desc",
            }),
        }
    }
}

/// Sortable listing columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSortField {
    /// `price`
    Price,
    /// `title`
    Title,
    /// `created_at`
    CreatedAt,
}

impl ListingSortField {
    /// Column name.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Title => "title",
            Self::CreatedAt => "created_at",
        }
    }
}

/// A `field:order` listing sort, e.g. `price:desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSort {
    /// Column to sort on.
    pub field: ListingSortField,
    /// Direction.
    pub order: SortOrder,
}

const LISTING_SORT_GRAMMAR: &str = "price|title|created_at[:asc|desc]";

impl FromStr for ListingSort {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidSort {
            input: s.to_string(),
            expected: LISTING_SORT_GRAMMAR,
        };
        let (field, order) = match s.trim().split_once(':') {
            Some((field, order)) => (field, order.parse().map_err(|_| invalid())?),
            None => (s.trim(), SortOrder::Asc),
        };
        let field = match field.to_ascii_lowercase().as_str() {
            "price" => ListingSortField::Price,
            "title" => ListingSortField::Title,
            "created_at" | "createdat" => ListingSortField::CreatedAt,
            _ => return Err(invalid()),
        };
        Ok(Self { field, order })
    }
}

impl fmt::Display for ListingSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        write!(f, "{}:{}", self.field.column(), order)
    }
}

/// Listing filters and pagination. Without a sort, rows come back by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Only listings of this seller.
    pub seller_id: Option<SellerId>,
    /// Inclusive lower price bound.
    pub min_price: Option<i64>,
    /// Inclusive upper price bound.
    pub max_price: Option<i64>,
    /// Ordering.
    pub sort: Option<ListingSort>,
    /// 1-based page number.
    pub page: u32,
    /// Page size, at most [`MAX_LIMIT`].
    pub limit: u32,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            seller_id: None,
            min_price: None,
            max_price: None,
            sort: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListingQuery {
    /// Row offset of the requested page.
    pub fn offset(&self) -> u64 {
        offset(self.page, self.limit)
    }

    /// Whether `price` and `seller` pass the filters.
    pub fn matches(&self, price: i64, seller: SellerId) -> bool {
        self.seller_id.map_or(true, |s| s == seller)
            && self.min_price.map_or(true, |min| price >= min)
            && self.max_price.map_or(true, |max| price <= max)
    }
}

/// Seller pagination; always sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerQuery {
    /// Name ordering.
    pub order: SortOrder,
    /// 1-based page number.
    pub page: u32,
    /// Page size, at most [`MAX_LIMIT`].
    pub limit: u32,
}

impl Default for SellerQuery {
    fn default() -> Self {
        Self {
            order: SortOrder::Asc,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SellerQuery {
    /// Row offset of the requested page.
    pub fn offset(&self) -> u64 {
        offset(self.page, self.limit)
    }
}

fn offset(page: u32, limit: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(limit)
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub data: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub limit: u32,
    /// Total matching rows across all pages.
    pub total: u64,
}
