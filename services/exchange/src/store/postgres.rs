//! PostgreSQL store
//!
//! Conditional writes are single `UPDATE ... WHERE` statements; ownership
//! changes run in a transaction that also rewrites `user_books`.

use async_trait::async_trait;
use common::{
    database::{health_check, run_migrations},
    error::{DatabaseError, DatabaseResult},
};
use sqlx::{PgPool, Row, migrate::Migrator, postgres::PgRow};
use tracing::{info, warn};
use uuid::Uuid;

use super::{OwnershipTransfer, RequestSwap, Store};
use crate::models::{CatalogBook, Identity, ProfileUpdate, StoredBook, User};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> DatabaseResult<()> {
        run_migrations(&self.pool, &MIGRATOR).await
    }
}

fn book_from_row(row: &PgRow) -> StoredBook {
    StoredBook {
        id: row.get("id"),
        title: row.get("title"),
        authors: row.get("authors"),
        publisher: row.get("publisher"),
        thumbnail: row.get("thumbnail"),
        link: row.get("link"),
        owner: row.get("owner_id"),
        request: row.get("request_id"),
        created_at: row.get("created_at"),
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        provider_id: row.get("provider_id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        city: row.get("city"),
        state: row.get("state"),
        books: row.get("books"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_book(&self, book: &CatalogBook) -> DatabaseResult<StoredBook> {
        let row = sqlx::query(
            r#"
            INSERT INTO books (id, title, authors, publisher, thumbnail, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title,
                authors = EXCLUDED.authors,
                publisher = EXCLUDED.publisher,
                thumbnail = EXCLUDED.thumbnail,
                link = EXCLUDED.link
            RETURNING id, title, authors, publisher, thumbnail, link,
                      owner_id, request_id, created_at
            "#,
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.authors)
        .bind(&book.publisher)
        .bind(&book.thumbnail)
        .bind(&book.link)
        .fetch_one(&self.pool)
        .await?;

        Ok(book_from_row(&row))
    }

    async fn get_book(&self, id: &str) -> DatabaseResult<Option<StoredBook>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, authors, publisher, thumbnail, link,
                   owner_id, request_id, created_at
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(book_from_row))
    }

    async fn list_books(&self) -> DatabaseResult<Vec<StoredBook>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, authors, publisher, thumbnail, link,
                   owner_id, request_id, created_at
            FROM books
            ORDER BY title COLLATE "C", id COLLATE "C"
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(book_from_row).collect())
    }

    async fn delete_unowned_book(&self, id: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND owner_id IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn swap_request(&self, swap: &RequestSwap<'_>) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET request_id = $4
            WHERE id = $1
              AND owner_id IS NOT DISTINCT FROM $2
              AND request_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(swap.book_id)
        .bind(swap.owner)
        .bind(swap.expected)
        .bind(swap.next)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn transfer_book(&self, transfer: &OwnershipTransfer<'_>) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE books
            SET owner_id = $3, request_id = NULL
            WHERE id = $1
              AND owner_id = $2
              AND request_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(transfer.book_id)
        .bind(transfer.from)
        .bind(transfer.to)
        .bind(transfer.expected_request)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM user_books WHERE book_id = $1")
            .bind(transfer.book_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_books (user_id, book_id) VALUES ($1, $2)")
            .bind(transfer.to)
            .bind(transfer.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn claim_book(&self, user: Uuid, book_id: &str) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE books
            SET owner_id = $1
            WHERE id = $2 AND (owner_id IS NULL OR owner_id = $1)
            "#,
        )
        .bind(user)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO user_books (user_id, book_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn release_book(&self, user: Uuid, book_id: &str) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_books WHERE user_id = $1 AND book_id = $2")
            .bind(user)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE books
            SET owner_id = NULL, request_id = NULL
            WHERE id = $2 AND owner_id = $1
            "#,
        )
        .bind(user)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn upsert_user(&self, identity: &Identity) -> DatabaseResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, provider_id, username, display_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider_id) DO UPDATE
            SET username = EXCLUDED.username,
                display_name = EXCLUDED.display_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.provider_id)
        .bind(&identity.username)
        .bind(&identity.display_name)
        .fetch_one(&self.pool)
        .await?;

        let id: Uuid = row.get("id");
        self.get_user(id)
            .await?
            .ok_or(DatabaseError::Query(sqlx::Error::RowNotFound))
    }

    async fn get_user(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.provider_id, u.username, u.display_name, u.city, u.state,
                   u.created_at,
                   ARRAY(
                       SELECT ub.book_id FROM user_books ub
                       WHERE ub.user_id = u.id
                       ORDER BY ub.book_id COLLATE "C"
                   ) AS books
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        profile: &ProfileUpdate,
    ) -> DatabaseResult<Option<User>> {
        let result = sqlx::query("UPDATE users SET city = $2, state = $3 WHERE id = $1")
            .bind(id)
            .bind(&profile.city)
            .bind(&profile.state)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_user(id).await
    }

    async fn owned_book_ids(&self, user: Uuid) -> DatabaseResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT book_id
            FROM user_books
            WHERE user_id = $1
            ORDER BY book_id COLLATE "C"
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("book_id")).collect())
    }

    async fn books_requested_by(&self, user: Uuid) -> DatabaseResult<Vec<StoredBook>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, authors, publisher, thumbnail, link,
                   owner_id, request_id, created_at
            FROM books
            WHERE request_id = $1
            ORDER BY title COLLATE "C", id COLLATE "C"
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(book_from_row).collect())
    }

    async fn books_pending_for_owner(&self, user: Uuid) -> DatabaseResult<Vec<StoredBook>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, authors, publisher, thumbnail, link,
                   owner_id, request_id, created_at
            FROM books
            WHERE owner_id = $1 AND request_id IS NOT NULL
            ORDER BY title COLLATE "C", id COLLATE "C"
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(book_from_row).collect())
    }

    async fn repair_ownership(&self) -> DatabaseResult<u64> {
        let mut tx = self.pool.begin().await?;

        let stale = sqlx::query(
            r#"
            DELETE FROM user_books ub
            USING books b
            WHERE ub.book_id = b.id
              AND b.owner_id IS DISTINCT FROM ub.user_id
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let missing = sqlx::query(
            r#"
            INSERT INTO user_books (user_id, book_id)
            SELECT owner_id, id FROM books
            WHERE owner_id IS NOT NULL
            ON CONFLICT DO NOTHING
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if stale + missing > 0 {
            warn!(stale, missing, "Repaired owned book collections");
        } else {
            info!("Owned book collections are consistent");
        }

        Ok(stale + missing)
    }

    async fn ping(&self) -> DatabaseResult<bool> {
        health_check(&self.pool).await
    }
}
