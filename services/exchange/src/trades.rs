//! Book request state machine
//!
//! A book is either free of requests or pending on exactly one requester.
//!
//! | From       | Action  | Actor       | To   |
//! |------------|---------|-------------|------|
//! | none       | request | not owner   | r    |
//! | pending(r) | accept  | owner       | none, book moves to r |
//! | pending(r) | deny    | owner       | none |
//! | pending(r) | cancel  | r           | none |
//!
//! Resolving a book with no pending request is `NotFound`. Any other
//! combination is `InvalidTransition`. Writes are compare-and-swap on the
//! values read, so a lost race surfaces as `Conflict`.

use std::{fmt, sync::Arc};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{TradeError, TradeResult},
    models::StoredBook,
    repositories::{BookRepository, UserRepository},
    store::{RequestSwap, Store},
};

/// Something a user can do to a book's request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Request,
    Accept,
    Deny,
    Cancel,
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestAction::Request => "request",
            RequestAction::Accept => "accept",
            RequestAction::Deny => "deny",
            RequestAction::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

/// Write to apply once a transition is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open a request for the actor
    Open { owner: Uuid, requester: Uuid },
    /// Drop the pending request, ownership unchanged
    Close { owner: Uuid, requester: Uuid },
    /// Hand the book to the requester
    Transfer { owner: Uuid, requester: Uuid },
}

/// Decide what `action` by `actor` does to `book`.
///
/// Pure: reads nothing but its arguments and writes nothing.
pub fn plan(action: RequestAction, book: &StoredBook, actor: Uuid) -> TradeResult<Effect> {
    match action {
        RequestAction::Request => {
            if book.request.is_some() {
                return Err(TradeError::InvalidTransition(format!(
                    "Book {} already has a pending request",
                    book.id
                )));
            }
            let Some(owner) = book.owner else {
                return Err(TradeError::InvalidTransition(format!(
                    "Book {} has no owner to request it from",
                    book.id
                )));
            };
            if owner == actor {
                return Err(TradeError::InvalidTransition(format!(
                    "Book {} is already yours",
                    book.id
                )));
            }
            Ok(Effect::Open {
                owner,
                requester: actor,
            })
        }
        RequestAction::Accept | RequestAction::Deny => {
            let (owner, requester) = pending(book)?;
            if owner != actor {
                return Err(TradeError::InvalidTransition(format!(
                    "Only the owner can {} the request for book {}",
                    action, book.id
                )));
            }
            if action == RequestAction::Accept {
                Ok(Effect::Transfer { owner, requester })
            } else {
                Ok(Effect::Close { owner, requester })
            }
        }
        RequestAction::Cancel => {
            let (owner, requester) = pending(book)?;
            if requester != actor {
                return Err(TradeError::InvalidTransition(format!(
                    "Only the requester can cancel the request for book {}",
                    book.id
                )));
            }
            Ok(Effect::Close { owner, requester })
        }
    }
}

fn pending(book: &StoredBook) -> TradeResult<(Uuid, Uuid)> {
    match (book.owner, book.request) {
        (Some(owner), Some(requester)) => Ok((owner, requester)),
        _ => Err(TradeError::NotFound(format!(
            "Book {} has no pending request",
            book.id
        ))),
    }
}

/// Applies request transitions against the store
#[derive(Clone)]
pub struct RequestStateMachine {
    store: Arc<dyn Store>,
    books: BookRepository,
    users: UserRepository,
}

impl RequestStateMachine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            books: BookRepository::new(store.clone()),
            users: UserRepository::new(store.clone()),
            store,
        }
    }

    /// Run one transition and return the book as it stands afterwards
    pub async fn apply(
        &self,
        action: RequestAction,
        book_id: &str,
        actor: Uuid,
    ) -> TradeResult<StoredBook> {
        let book = self.books.find_by_id(book_id).await?;
        let effect = plan(action, &book, actor)?;

        match effect {
            Effect::Open { owner, requester } => {
                self.users.find_by_id(requester).await?;
                self.swap(book_id, owner, None, Some(requester)).await?;
            }
            Effect::Close { owner, requester } => {
                self.swap(book_id, owner, Some(requester), None).await?;
            }
            Effect::Transfer { owner, requester } => {
                self.users
                    .transfer_ownership(owner, requester, book_id, Some(requester))
                    .await?;
            }
        }

        info!(
            book_id = %book_id,
            actor = %actor,
            action = %action,
            "Applied book request transition"
        );
        self.books.find_by_id(book_id).await
    }

    async fn swap(
        &self,
        book_id: &str,
        owner: Uuid,
        expected: Option<Uuid>,
        next: Option<Uuid>,
    ) -> TradeResult<()> {
        let swap = RequestSwap {
            book_id,
            owner: Some(owner),
            expected,
            next,
        };

        if self.store.swap_request(&swap).await? {
            Ok(())
        } else {
            Err(TradeError::Conflict(format!(
                "Book {} changed while its request was being updated",
                book_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn book(owner: Option<Uuid>, request: Option<Uuid>) -> StoredBook {
        StoredBook {
            id: "b1".to_string(),
            title: "Middlemarch".to_string(),
            authors: vec!["George Eliot".to_string()],
            publisher: None,
            thumbnail: None,
            link: None,
            owner,
            request,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn request_opens_on_a_free_owned_book() {
        let (owner, actor) = (Uuid::new_v4(), Uuid::new_v4());
        let effect = plan(RequestAction::Request, &book(Some(owner), None), actor).unwrap();
        assert_eq!(
            effect,
            Effect::Open {
                owner,
                requester: actor
            }
        );
    }

    #[test]
    fn request_is_refused_when_pending_unowned_or_own() {
        let (owner, first, second) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let pending = book(Some(owner), Some(first));
        assert!(matches!(
            plan(RequestAction::Request, &pending, second),
            Err(TradeError::InvalidTransition(_))
        ));
        assert!(matches!(
            plan(RequestAction::Request, &book(None, None), first),
            Err(TradeError::InvalidTransition(_))
        ));
        assert!(matches!(
            plan(RequestAction::Request, &book(Some(owner), None), owner),
            Err(TradeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn owner_resolves_pending_request() {
        let (owner, requester) = (Uuid::new_v4(), Uuid::new_v4());
        let pending = book(Some(owner), Some(requester));

        assert_eq!(
            plan(RequestAction::Accept, &pending, owner).unwrap(),
            Effect::Transfer { owner, requester }
        );
        assert_eq!(
            plan(RequestAction::Deny, &pending, owner).unwrap(),
            Effect::Close { owner, requester }
        );
        assert_eq!(
            plan(RequestAction::Cancel, &pending, requester).unwrap(),
            Effect::Close { owner, requester }
        );
    }

    #[test]
    fn third_party_cannot_resolve() {
        let (owner, requester, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let pending = book(Some(owner), Some(requester));

        for action in [RequestAction::Accept, RequestAction::Deny, RequestAction::Cancel] {
            assert!(matches!(
                plan(action, &pending, stranger),
                Err(TradeError::InvalidTransition(_))
            ));
        }

        // Requester cannot accept their own request, owner cannot cancel it.
        assert!(plan(RequestAction::Accept, &pending, requester).is_err());
        assert!(plan(RequestAction::Cancel, &pending, owner).is_err());
    }

    #[test]
    fn resolving_without_pending_request_is_not_found() {
        let owner = Uuid::new_v4();
        for action in [RequestAction::Accept, RequestAction::Deny, RequestAction::Cancel] {
            assert!(matches!(
                plan(action, &book(Some(owner), None), owner),
                Err(TradeError::NotFound(_))
            ));
        }
    }
}
