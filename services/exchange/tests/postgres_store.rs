//! PostgreSQL store tests
//!
//! These only run when `DATABASE_URL` points at a live server.

use common::database::{DatabaseConfig, init_pool};
use exchange::{
    models::{CatalogBook, Identity},
    store::{OwnershipTransfer, PgStore, RequestSwap, Store},
};
use uuid::Uuid;

async fn store() -> Option<PgStore> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL store test");
        return None;
    }

    let config = DatabaseConfig::from_env().unwrap();
    let pool = init_pool(&config).await.unwrap();
    let store = PgStore::new(pool);
    store.migrate().await.unwrap();
    Some(store)
}

fn identity() -> Identity {
    let suffix = Uuid::new_v4();
    Identity {
        provider_id: format!("test|{}", suffix),
        username: format!("user-{}", suffix),
        display_name: None,
    }
}

fn book() -> CatalogBook {
    CatalogBook {
        id: format!("book-{}", Uuid::new_v4()),
        title: "Northanger Abbey".to_string(),
        authors: vec!["Jane Austen".to_string()],
        publisher: None,
        thumbnail: None,
        link: None,
    }
}

#[tokio::test]
async fn test_upsert_keeps_owner_and_request() {
    let Some(store) = store().await else {
        return;
    };

    let owner = store.upsert_user(&identity()).await.unwrap();
    let requester = store.upsert_user(&identity()).await.unwrap();
    let payload = book();

    let first = store.upsert_book(&payload).await.unwrap();
    assert!(store.claim_book(owner.id, &payload.id).await.unwrap());
    let swap = RequestSwap {
        book_id: &payload.id,
        owner: Some(owner.id),
        expected: None,
        next: Some(requester.id),
    };
    assert!(store.swap_request(&swap).await.unwrap());

    let second = store.upsert_book(&payload).await.unwrap();
    assert_eq!(second.owner, Some(owner.id));
    assert_eq!(second.request, Some(requester.id));
    assert_eq!(second.created_at, first.created_at);

    // Same guard again loses: the request is no longer empty.
    assert!(!store.swap_request(&swap).await.unwrap());
}

#[tokio::test]
async fn test_transfer_moves_collection_entry() {
    let Some(store) = store().await else {
        return;
    };

    let owner = store.upsert_user(&identity()).await.unwrap();
    let requester = store.upsert_user(&identity()).await.unwrap();
    let payload = book();
    store.upsert_book(&payload).await.unwrap();
    assert!(store.claim_book(owner.id, &payload.id).await.unwrap());
    assert!(!store.claim_book(requester.id, &payload.id).await.unwrap());

    let transfer = OwnershipTransfer {
        book_id: &payload.id,
        from: owner.id,
        to: requester.id,
        expected_request: Some(requester.id),
    };
    // No pending request yet, so the guard fails.
    assert!(!store.transfer_book(&transfer).await.unwrap());

    let swap = RequestSwap {
        book_id: &payload.id,
        owner: Some(owner.id),
        expected: None,
        next: Some(requester.id),
    };
    assert!(store.swap_request(&swap).await.unwrap());
    assert!(store.transfer_book(&transfer).await.unwrap());
    assert!(!store.transfer_book(&transfer).await.unwrap());

    let book = store.get_book(&payload.id).await.unwrap().unwrap();
    assert_eq!(book.owner, Some(requester.id));
    assert_eq!(book.request, None);
    assert!(store.owned_book_ids(owner.id).await.unwrap().is_empty());
    assert_eq!(
        store.owned_book_ids(requester.id).await.unwrap(),
        vec![payload.id.clone()]
    );

    let user = store.get_user(requester.id).await.unwrap().unwrap();
    assert_eq!(user.books, vec![payload.id.clone()]);
}

#[tokio::test]
async fn test_release_then_delete() {
    let Some(store) = store().await else {
        return;
    };

    let owner = store.upsert_user(&identity()).await.unwrap();
    let payload = book();
    store.upsert_book(&payload).await.unwrap();
    assert!(store.claim_book(owner.id, &payload.id).await.unwrap());

    assert!(!store.delete_unowned_book(&payload.id).await.unwrap());
    store.release_book(owner.id, &payload.id).await.unwrap();
    assert!(store.delete_unowned_book(&payload.id).await.unwrap());
    assert!(store.get_book(&payload.id).await.unwrap().is_none());

    store.repair_ownership().await.unwrap();
}
