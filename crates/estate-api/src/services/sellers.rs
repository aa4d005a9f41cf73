//! Seller profiles. Single-statement writes; the listing counter is never
//! touched here.

use std::sync::Arc;

use estate_core::{
    AccountId, DomainError, NewSeller, Page, Seller, SellerId, SellerPatch, SellerQuery,
};

use crate::db::{Store, StoreError};

/// CRUD over seller profiles.
#[derive(Clone)]
pub struct SellerService {
    store: Arc<dyn Store>,
}

impl SellerService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Insert a profile with `listing_count = 0`.
    pub async fn create(&self, new: NewSeller) -> Result<SellerId, DomainError> {
        new.validate()?;
        let id = self.store.insert_seller(&new).await.map_err(|e| match e {
            StoreError::ForeignKeyViolation(_) => match new.account_id {
                Some(a) => DomainError::not_found(format!("account {a}")),
                None => DomainError::Internal(e.to_string()),
            },
            other => other.into(),
        })?;
        tracing::info!(seller_id = %id, linked = new.account_id.is_some(), "seller created");
        Ok(id)
    }

    pub async fn get(&self, id: SellerId) -> Result<Seller, DomainError> {
        self.store
            .seller_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("seller {id}")))
    }

    pub async fn list(&self, query: &SellerQuery) -> Result<Page<Seller>, DomainError> {
        Ok(self.store.list_sellers(query).await?)
    }

    /// The profile linked to `account`, if any.
    pub async fn by_account(&self, account: AccountId) -> Result<Option<Seller>, DomainError> {
        Ok(self.store.seller_by_account(account).await?)
    }

    pub async fn update(&self, id: SellerId, patch: SellerPatch) -> Result<(), DomainError> {
        patch.validate()?;
        if patch.is_empty() {
            return Err(DomainError::Invalid("no fields to update".into()));
        }
        let affected = self.store.update_seller(id, &patch).await.map_err(|e| match e {
            StoreError::ForeignKeyViolation(_) => match patch.account_id {
                Some(a) => DomainError::not_found(format!("account {a}")),
                None => DomainError::Internal(e.to_string()),
            },
            other => other.into(),
        })?;
        if affected == 0 {
            return Err(DomainError::not_found(format!("seller {id}")));
        }
        tracing::info!(seller_id = %id, "seller updated");
        Ok(())
    }

    /// Delete a profile that no longer has listings.
    pub async fn delete(&self, id: SellerId) -> Result<(), DomainError> {
        let seller = self.get(id).await?;
        if seller.listing_count > 0 {
            return Err(DomainError::Conflict(format!(
                "seller {id} still has {} listings",
                seller.listing_count
            )));
        }
        let affected = self.store.delete_seller(id).await.map_err(|e| match e {
            StoreError::ForeignKeyViolation(_) => {
                DomainError::Conflict(format!("seller {id} still has listings"))
            }
            other => other.into(),
        })?;
        if affected == 0 {
            return Err(DomainError::not_found(format!("seller {id}")));
        }
        tracing::info!(seller_id = %id, "seller deleted");
        Ok(())
    }
}
