//! # Access Control Gate
//!
//! Role membership and resource-ownership checks. Everything here is a
//! pure predicate over a [`SessionClaim`] except
//! [`require_ownership_or_admin`], which reads the listing's seller id.
//!
//! Roles are disjoint capabilities rather than a ladder, so checks take an
//! explicit allow-list.

use estate_core::{DomainError, ListingId, Role, SellerId, SessionClaim};

use crate::db::Store;

/// Admin or seller: the roles that may write listings and seller profiles.
pub const WRITERS: &[Role] = &[Role::Admin, Role::Seller];

/// `Unauthenticated` without a claim, `Forbidden` when the role is not in
/// `allowed`.
pub fn require_role<'a>(
    claim: Option<&'a SessionClaim>,
    allowed: &[Role],
) -> Result<&'a SessionClaim, DomainError> {
    let claim = claim.ok_or(DomainError::Unauthenticated)?;
    if allowed.contains(&claim.role) {
        Ok(claim)
    } else {
        Err(DomainError::forbidden(format!(
            "role '{}' may not perform this action",
            claim.role
        )))
    }
}

/// Admin passes. Anyone else must be the seller that owns the listing.
pub async fn require_ownership_or_admin(
    store: &dyn Store,
    claim: &SessionClaim,
    listing: ListingId,
) -> Result<(), DomainError> {
    if claim.is_admin() {
        return Ok(());
    }
    let owner = store
        .listing_by_id(listing)
        .await?
        .map(|l| l.seller_id)
        .ok_or_else(|| DomainError::not_found(format!("listing {listing}")))?;
    if claim.owns_seller(owner) {
        Ok(())
    } else {
        tracing::debug!(account_id = %claim.account_id, listing_id = %listing, "ownership denied");
        Err(DomainError::forbidden(format!(
            "listing {listing} belongs to another seller"
        )))
    }
}

/// Admin acts on any seller profile; a seller only on its own.
pub fn require_seller_scope(claim: &SessionClaim, seller: SellerId) -> Result<(), DomainError> {
    if claim.is_admin() || claim.owns_seller(seller) {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!(
            "seller {seller} is not linked to this account"
        )))
    }
}

/// Fields such as a listing's `sellerId` or a seller's `accountId` may only
/// be set by an admin.
pub fn require_admin_for(claim: &SessionClaim, field: &str) -> Result<(), DomainError> {
    if claim.is_admin() {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!("only an admin may change {field}")))
    }
}
