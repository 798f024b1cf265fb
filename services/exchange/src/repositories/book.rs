//! Book repository

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{TradeError, TradeResult},
    models::{CatalogBook, StoredBook},
    store::Store,
};

/// Book records: catalog upserts, lookups, listings and removal
#[derive(Clone)]
pub struct BookRepository {
    store: Arc<dyn Store>,
}

impl BookRepository {
    /// Create a new book repository
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Insert a book, or refresh the catalog fields of an existing one.
    ///
    /// Owner and request are never touched, so repeating an upsert is a no-op.
    pub async fn upsert_from_catalog(&self, book: &CatalogBook) -> TradeResult<StoredBook> {
        book.validate()?;
        let stored = self.store.upsert_book(book).await?;
        info!(book_id = %stored.id, "Upserted book");
        Ok(stored)
    }

    /// Get a book by ID
    pub async fn find_by_id(&self, id: &str) -> TradeResult<StoredBook> {
        self.store
            .get_book(id)
            .await?
            .ok_or_else(|| TradeError::NotFound(format!("Book {} not found", id)))
    }

    /// All books, by title ascending with ties ordered by id
    pub async fn list(&self) -> TradeResult<Vec<StoredBook>> {
        Ok(self.store.list_books().await?)
    }

    /// Delete a book.
    ///
    /// The owner's collection is not touched here; release the book first.
    /// A book that still has an owner is refused with `Conflict`.
    pub async fn remove(&self, id: &str) -> TradeResult<()> {
        if self.store.delete_unowned_book(id).await? {
            info!(book_id = %id, "Removed book");
            return Ok(());
        }

        let book = self.find_by_id(id).await?;
        Err(TradeError::Conflict(format!(
            "Book {} is still owned and cannot be removed",
            book.id
        )))
    }

    /// Books with an active request from `user`
    pub async fn requested_by(&self, user: Uuid) -> TradeResult<Vec<StoredBook>> {
        Ok(self.store.books_requested_by(user).await?)
    }

    /// Books owned by `user` that someone has requested
    pub async fn pending_for_owner(&self, user: Uuid) -> TradeResult<Vec<StoredBook>> {
        Ok(self.store.books_pending_for_owner(user).await?)
    }
}
