//! Storage seam for books, users and ownership
//!
//! Every method that changes a book's `owner` or `request` is conditional:
//! it applies only when the stored values still match what the caller read,
//! and reports `false` otherwise. Ownership writes touch both the book and the
//! owner's collection in one atomic step.

use async_trait::async_trait;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{CatalogBook, Identity, ProfileUpdate, StoredBook, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Guarded write of a book's `request` field
#[derive(Debug, Clone, Copy)]
pub struct RequestSwap<'a> {
    pub book_id: &'a str,
    /// Owner the caller saw
    pub owner: Option<Uuid>,
    /// Request the caller saw
    pub expected: Option<Uuid>,
    pub next: Option<Uuid>,
}

/// Guarded hand-over of a book from one owner to another
#[derive(Debug, Clone, Copy)]
pub struct OwnershipTransfer<'a> {
    pub book_id: &'a str,
    pub from: Uuid,
    pub to: Uuid,
    /// Request the caller saw; cleared by the transfer
    pub expected_request: Option<Uuid>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a book or overwrite its catalog fields
    async fn upsert_book(&self, book: &CatalogBook) -> DatabaseResult<StoredBook>;

    async fn get_book(&self, id: &str) -> DatabaseResult<Option<StoredBook>>;

    /// All books, ordered by title then id
    async fn list_books(&self) -> DatabaseResult<Vec<StoredBook>>;

    /// Delete a book nobody owns; `false` when it is missing or owned
    async fn delete_unowned_book(&self, id: &str) -> DatabaseResult<bool>;

    async fn swap_request(&self, swap: &RequestSwap<'_>) -> DatabaseResult<bool>;

    async fn transfer_book(&self, transfer: &OwnershipTransfer<'_>) -> DatabaseResult<bool>;

    /// Make `user` the owner of an unowned (or already theirs) book
    async fn claim_book(&self, user: Uuid, book_id: &str) -> DatabaseResult<bool>;

    /// Drop the book from the user's collection and clear its owner and request
    async fn release_book(&self, user: Uuid, book_id: &str) -> DatabaseResult<()>;

    /// Create a user by provider id, or refresh the names of an existing one
    async fn upsert_user(&self, identity: &Identity) -> DatabaseResult<User>;

    async fn get_user(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn update_profile(
        &self,
        id: Uuid,
        profile: &ProfileUpdate,
    ) -> DatabaseResult<Option<User>>;

    async fn owned_book_ids(&self, user: Uuid) -> DatabaseResult<Vec<String>>;

    /// Books the user has an active request on
    async fn books_requested_by(&self, user: Uuid) -> DatabaseResult<Vec<StoredBook>>;

    /// The user's books that carry an active request
    async fn books_pending_for_owner(&self, user: Uuid) -> DatabaseResult<Vec<StoredBook>>;

    /// Rebuild user collections from book owners; returns the number of fixes
    async fn repair_ownership(&self) -> DatabaseResult<u64>;

    async fn ping(&self) -> DatabaseResult<bool>;
}

/// Order used by every book listing
pub(crate) fn sort_books(books: &mut [StoredBook]) {
    books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
}
