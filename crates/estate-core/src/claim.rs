//! # Session Claim
//!
//! The decoded, verified contents of a session token. Not persisted.
//!
//! `seller_id` is present either because it was embedded when the token was
//! issued, or because it was hydrated from the seller table while resolving
//! the token. When neither happened the claim still resolves; ownership
//! checks then deny every non-admin mutation for that identity.

use serde::{Deserialize, Serialize};

use crate::identity::{AccountId, SellerId};
use crate::role::Role;

/// Identity of the caller attached to every downstream call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaim {
    /// The authenticated account.
    pub account_id: AccountId,
    /// The account's role at issuance time.
    pub role: Role,
    /// The account's email at issuance time.
    pub email: String,
    /// Seller profile linked to the account, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<SellerId>,
}

impl SessionClaim {
    /// Whether the caller is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the caller is a seller whose linked profile is `seller`.
    ///
    /// Always `false` for non-seller roles and for sellers without a known
    /// profile.
    pub fn owns_seller(&self, seller: SellerId) -> bool {
        self.role == Role::Seller && self.seller_id == Some(seller)
    }

    /// Whether a seller-role claim still needs its `seller_id` looked up.
    pub fn needs_seller_hydration(&self) -> bool {
        self.role == Role::Seller && self.seller_id.is_none()
    }
}
