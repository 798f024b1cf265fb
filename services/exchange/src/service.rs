//! Exchange service: the operations behind the HTTP API

use catalog::CatalogClient;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::{TradeError, TradeResult},
    models::{CatalogBook, Identity, ProfileUpdate, StoredBook, Trades, User},
    repositories::{BookRepository, UserRepository},
    store::Store,
    trades::{RequestAction, RequestStateMachine},
};

/// Composes the catalog, the repositories and the request state machine
#[derive(Clone)]
pub struct Exchange {
    catalog: CatalogClient,
    store: Arc<dyn Store>,
    books: BookRepository,
    users: UserRepository,
    requests: RequestStateMachine,
}

impl Exchange {
    /// Create a new exchange over `store`
    pub fn new(store: Arc<dyn Store>, catalog: CatalogClient) -> Self {
        Self {
            catalog,
            books: BookRepository::new(store.clone()),
            users: UserRepository::new(store.clone()),
            requests: RequestStateMachine::new(store.clone()),
            store,
        }
    }

    /// Whether the store answers
    pub async fn health(&self) -> TradeResult<bool> {
        Ok(self.store.ping().await?)
    }

    /// Rebuild user collections from book owners
    pub async fn repair_ownership(&self) -> TradeResult<u64> {
        let fixes = self.users.repair_ownership().await?;
        info!("Ownership repair finished with {} fixes", fixes);
        Ok(fixes)
    }

    /// Search the catalog with the configured defaults and upsert every result
    pub async fn perform_search(&self, query: &str) -> TradeResult<Vec<StoredBook>> {
        let results = self.catalog.search_with_defaults(query).await.map_err(|e| {
            error!("Catalog search failed: {}", e);
            TradeError::from(e)
        })?;

        let mut stored = Vec::with_capacity(results.volumes.len());
        for volume in &results.volumes {
            let book = CatalogBook::from(volume);
            stored.push(self.books.upsert_from_catalog(&book).await?);
        }

        info!(query = query, count = stored.len(), "Stored search results");
        Ok(stored)
    }

    pub async fn get_book(&self, id: &str) -> TradeResult<StoredBook> {
        self.books.find_by_id(id).await
    }

    pub async fn list_books(&self) -> TradeResult<Vec<StoredBook>> {
        self.books.list().await
    }

    /// Upsert a book described by an external payload
    pub async fn create_or_update_from_payload(
        &self,
        payload: &CatalogBook,
    ) -> TradeResult<StoredBook> {
        self.books.upsert_from_catalog(payload).await
    }

    /// Add a stored book to the actor's collection
    pub async fn claim_book(&self, id: &str, actor: Uuid) -> TradeResult<StoredBook> {
        self.users.add_book(actor, id).await?;
        self.books.find_by_id(id).await
    }

    /// Delete one of the actor's books.
    ///
    /// A book the actor does not own is `NotFound`.
    pub async fn delete_book(&self, id: &str, actor: Uuid) -> TradeResult<()> {
        let book = self.books.find_by_id(id).await?;
        if book.owner != Some(actor) {
            return Err(TradeError::NotFound(format!(
                "Book {} not found in your collection",
                id
            )));
        }

        self.users.remove_book(actor, id).await?;
        self.books.remove(id).await
    }

    pub async fn request_book(&self, id: &str, actor: Uuid) -> TradeResult<StoredBook> {
        self.requests.apply(RequestAction::Request, id, actor).await
    }

    pub async fn accept_request(&self, id: &str, actor: Uuid) -> TradeResult<StoredBook> {
        self.requests.apply(RequestAction::Accept, id, actor).await
    }

    pub async fn deny_request(&self, id: &str, actor: Uuid) -> TradeResult<StoredBook> {
        self.requests.apply(RequestAction::Deny, id, actor).await
    }

    pub async fn cancel_request(&self, id: &str, actor: Uuid) -> TradeResult<StoredBook> {
        self.requests.apply(RequestAction::Cancel, id, actor).await
    }

    /// Full records of the books a user owns, in collection order
    pub async fn books_owned_by(&self, user: Uuid) -> TradeResult<Vec<StoredBook>> {
        let ids = self.users.list_books_owned_by(user).await?;
        let mut books = Vec::with_capacity(ids.len());
        for id in ids {
            books.push(self.books.find_by_id(&id).await?);
        }
        Ok(books)
    }

    pub async fn update_user_profile(
        &self,
        user: Uuid,
        profile: &ProfileUpdate,
    ) -> TradeResult<User> {
        self.users.update_profile(user, profile).await
    }

    /// Find or provision the user behind an identity
    pub async fn ensure_user(&self, identity: &Identity) -> TradeResult<User> {
        self.users.ensure(identity).await
    }

    pub async fn get_user(&self, id: Uuid) -> TradeResult<User> {
        self.users.find_by_id(id).await
    }

    /// Books the user asked for and the user's books others asked for
    pub async fn trades_for(&self, user: Uuid) -> TradeResult<Trades> {
        self.users.find_by_id(user).await?;
        Ok(Trades {
            requested_by_me: self.books.requested_by(user).await?,
            requested_from_me: self.books.pending_for_owner(user).await?,
        })
    }
}
