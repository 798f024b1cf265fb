//! Users and the books they own

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{TradeError, TradeResult},
    models::{Identity, ProfileUpdate, User},
    store::{OwnershipTransfer, Store},
};

/// User records and the user-book ownership association
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn Store>,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Find or create the user behind a provider identity
    pub async fn ensure(&self, identity: &Identity) -> TradeResult<User> {
        if identity.provider_id.trim().is_empty() {
            return Err(TradeError::Validation("Provider id is required".to_string()));
        }

        Ok(self.store.upsert_user(identity).await?)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> TradeResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| TradeError::NotFound(format!("User {} not found", id)))
    }

    /// Replace the user's city and state
    pub async fn update_profile(&self, id: Uuid, profile: &ProfileUpdate) -> TradeResult<User> {
        let profile = profile.normalized();
        let user = self
            .store
            .update_profile(id, &profile)
            .await?
            .ok_or_else(|| TradeError::NotFound(format!("User {} not found", id)))?;

        info!(user_id = %id, "Updated user profile");
        Ok(user)
    }

    /// Add a book to the user's collection, making them its owner.
    ///
    /// Adding a book the user already owns is a no-op.
    pub async fn add_book(&self, user: Uuid, book_id: &str) -> TradeResult<()> {
        self.find_by_id(user).await?;
        let book = self
            .store
            .get_book(book_id)
            .await?
            .ok_or_else(|| TradeError::NotFound(format!("Book {} not found", book_id)))?;

        if self.store.claim_book(user, book_id).await? {
            info!(user_id = %user, book_id = %book_id, "Added book to collection");
            return Ok(());
        }

        // Lost to a concurrent claim, or already someone else's.
        let owner = self.store.get_book(book_id).await?.and_then(|b| b.owner);
        match owner {
            Some(owner) if owner != user => Err(TradeError::Conflict(format!(
                "Book {} is owned by another user",
                book.id
            ))),
            _ => Err(TradeError::Conflict(format!(
                "Book {} changed while it was being claimed",
                book.id
            ))),
        }
    }

    /// Remove a book from the user's collection; absent books are ignored
    pub async fn remove_book(&self, user: Uuid, book_id: &str) -> TradeResult<()> {
        self.find_by_id(user).await?;
        self.store.release_book(user, book_id).await?;
        info!(user_id = %user, book_id = %book_id, "Removed book from collection");
        Ok(())
    }

    /// Ids of the books the user owns
    pub async fn list_books_owned_by(&self, user: Uuid) -> TradeResult<Vec<String>> {
        self.find_by_id(user).await?;
        Ok(self.store.owned_book_ids(user).await?)
    }

    /// Move a book from one user's collection to another's in one step.
    ///
    /// `expected_request` guards the book's request field; the transfer clears
    /// it. Fails with `Conflict` when the book changed since it was read.
    pub async fn transfer_ownership(
        &self,
        from: Uuid,
        to: Uuid,
        book_id: &str,
        expected_request: Option<Uuid>,
    ) -> TradeResult<()> {
        self.find_by_id(from).await?;
        self.find_by_id(to).await?;

        let transfer = OwnershipTransfer {
            book_id,
            from,
            to,
            expected_request,
        };

        if !self.store.transfer_book(&transfer).await? {
            return Err(TradeError::Conflict(format!(
                "Book {} changed before the transfer could be applied",
                book_id
            )));
        }

        info!(book_id = %book_id, from = %from, to = %to, "Transferred book ownership");
        Ok(())
    }

    /// Rebuild every user's collection from the book owners
    pub async fn repair_ownership(&self) -> TradeResult<u64> {
        Ok(self.store.repair_ownership().await?)
    }
}
