//! # Identifier Newtypes
//!
//! Numeric identifiers for the three persisted resource kinds. Each is a
//! distinct type over a positive `i64` (a `BIGSERIAL` key in Postgres).
//! Construction through [`AccountId::new`] and friends, `TryFrom<i64>`,
//! `FromStr` or serde rejects zero and negative values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            #[doc = concat!("Create a ", $kind, ", rejecting non-positive values.")]
            pub fn new(value: i64) -> Result<Self, ValidationError> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(ValidationError::NonPositiveId { kind: $kind, value })
                }
            }

            /// The raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ValidationError::UnparseableId {
                        kind: $kind,
                        input: s.to_string(),
                    })?;
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of an [`Account`](crate::Account) (login identity).
    AccountId,
    "account id"
);

numeric_id!(
    /// Identifier of a [`Seller`](crate::Seller) profile.
    SellerId,
    "seller id"
);

numeric_id!(
    /// Identifier of a [`Listing`](crate::Listing).
    ListingId,
    "listing id"
);
