//! In-process store
//!
//! One mutex guards books and users together, so every conditional write and
//! every ownership transfer is applied atomically.

use async_trait::async_trait;
use chrono::Utc;
use common::error::DatabaseResult;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use super::{OwnershipTransfer, RequestSwap, Store, sort_books};
use crate::models::{CatalogBook, Identity, ProfileUpdate, StoredBook, User};

struct UserRecord {
    user: User,
    books: BTreeSet<String>,
}

impl UserRecord {
    fn snapshot(&self) -> User {
        User {
            books: self.books.iter().cloned().collect(),
            ..self.user.clone()
        }
    }
}

#[derive(Default)]
struct Inner {
    books: HashMap<String, StoredBook>,
    users: HashMap<Uuid, UserRecord>,
    providers: HashMap<String, Uuid>,
}

impl Inner {
    fn filtered_books(&self, keep: impl Fn(&StoredBook) -> bool) -> Vec<StoredBook> {
        let mut books: Vec<StoredBook> = self.books.values().filter(|b| keep(b)).cloned().collect();
        sort_books(&mut books);
        books
    }
}

/// Store kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_book(&self, book: &CatalogBook) -> DatabaseResult<StoredBook> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .books
            .entry(book.id.clone())
            .and_modify(|existing| existing.apply_catalog(book))
            .or_insert_with(|| StoredBook::new(book));
        Ok(stored.clone())
    }

    async fn get_book(&self, id: &str) -> DatabaseResult<Option<StoredBook>> {
        let inner = self.inner.lock().await;
        Ok(inner.books.get(id).cloned())
    }

    async fn list_books(&self) -> DatabaseResult<Vec<StoredBook>> {
        let inner = self.inner.lock().await;
        Ok(inner.filtered_books(|_| true))
    }

    async fn delete_unowned_book(&self, id: &str) -> DatabaseResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.books.get(id) {
            Some(book) if book.owner.is_none() => {
                inner.books.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn swap_request(&self, swap: &RequestSwap<'_>) -> DatabaseResult<bool> {
        let mut inner = self.inner.lock().await;
        let Some(book) = inner.books.get_mut(swap.book_id) else {
            return Ok(false);
        };

        if book.owner != swap.owner || book.request != swap.expected {
            return Ok(false);
        }

        book.request = swap.next;
        Ok(true)
    }

    async fn transfer_book(&self, transfer: &OwnershipTransfer<'_>) -> DatabaseResult<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&transfer.to) {
            return Ok(false);
        }

        let Some(book) = inner.books.get_mut(transfer.book_id) else {
            return Ok(false);
        };

        if book.owner != Some(transfer.from) || book.request != transfer.expected_request {
            return Ok(false);
        }

        book.owner = Some(transfer.to);
        book.request = None;

        if let Some(from) = inner.users.get_mut(&transfer.from) {
            from.books.remove(transfer.book_id);
        }
        if let Some(to) = inner.users.get_mut(&transfer.to) {
            to.books.insert(transfer.book_id.to_string());
        }

        Ok(true)
    }

    async fn claim_book(&self, user: Uuid, book_id: &str) -> DatabaseResult<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user) {
            return Ok(false);
        }

        let Some(book) = inner.books.get_mut(book_id) else {
            return Ok(false);
        };

        match book.owner {
            None => book.owner = Some(user),
            Some(owner) if owner == user => {}
            Some(_) => return Ok(false),
        }

        if let Some(record) = inner.users.get_mut(&user) {
            record.books.insert(book_id.to_string());
        }

        Ok(true)
    }

    async fn release_book(&self, user: Uuid, book_id: &str) -> DatabaseResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.users.get_mut(&user) {
            record.books.remove(book_id);
        }

        if let Some(book) = inner.books.get_mut(book_id) {
            if book.owner == Some(user) {
                book.owner = None;
                book.request = None;
            }
        }

        Ok(())
    }

    async fn upsert_user(&self, identity: &Identity) -> DatabaseResult<User> {
        let mut inner = self.inner.lock().await;

        if let Some(id) = inner.providers.get(&identity.provider_id).copied() {
            if let Some(record) = inner.users.get_mut(&id) {
                record.user.username = identity.username.clone();
                record.user.display_name = identity.display_name.clone();
                return Ok(record.snapshot());
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            provider_id: identity.provider_id.clone(),
            username: identity.username.clone(),
            display_name: identity.display_name.clone(),
            city: None,
            state: None,
            books: Vec::new(),
            created_at: Utc::now(),
        };

        inner.providers.insert(user.provider_id.clone(), user.id);
        inner.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                books: BTreeSet::new(),
            },
        );

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&id).map(UserRecord::snapshot))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        profile: &ProfileUpdate,
    ) -> DatabaseResult<Option<User>> {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.users.get_mut(&id) else {
            return Ok(None);
        };

        record.user.city = profile.city.clone();
        record.user.state = profile.state.clone();
        Ok(Some(record.snapshot()))
    }

    async fn owned_book_ids(&self, user: Uuid) -> DatabaseResult<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .get(&user)
            .map(|record| record.books.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn books_requested_by(&self, user: Uuid) -> DatabaseResult<Vec<StoredBook>> {
        let inner = self.inner.lock().await;
        Ok(inner.filtered_books(|b| b.request == Some(user)))
    }

    async fn books_pending_for_owner(&self, user: Uuid) -> DatabaseResult<Vec<StoredBook>> {
        let inner = self.inner.lock().await;
        Ok(inner.filtered_books(|b| b.owner == Some(user) && b.request.is_some()))
    }

    async fn repair_ownership(&self) -> DatabaseResult<u64> {
        let mut inner = self.inner.lock().await;

        let mut expected: HashMap<Uuid, BTreeSet<String>> = HashMap::new();
        for book in inner.books.values() {
            if let Some(owner) = book.owner {
                expected.entry(owner).or_default().insert(book.id.clone());
            }
        }

        let mut fixes = 0u64;
        for (id, record) in inner.users.iter_mut() {
            let wanted = expected.remove(id).unwrap_or_default();
            let stale = record.books.difference(&wanted).count();
            let missing = wanted.difference(&record.books).count();
            if stale + missing > 0 {
                warn!(user_id = %id, stale, missing, "Repairing owned book collection");
                fixes += (stale + missing) as u64;
                record.books = wanted;
            }
        }

        Ok(fixes)
    }

    async fn ping(&self) -> DatabaseResult<bool> {
        Ok(true)
    }
}
