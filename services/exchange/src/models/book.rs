//! Book records

use catalog::Volume;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TradeError, TradeResult};

/// Catalog-derived fields of a book, as written by an upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogBook {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub thumbnail: Option<String>,
    pub link: Option<String>,
}

impl CatalogBook {
    /// Reject payloads without a catalog id or a title
    pub fn validate(&self) -> TradeResult<()> {
        if self.id.trim().is_empty() {
            return Err(TradeError::Validation("Book id is required".to_string()));
        }

        if self.title.trim().is_empty() {
            return Err(TradeError::Validation("Book title is required".to_string()));
        }

        Ok(())
    }
}

impl From<&Volume> for CatalogBook {
    fn from(volume: &Volume) -> Self {
        Self {
            id: volume.id.clone(),
            title: volume.title.clone(),
            authors: volume.authors.clone().unwrap_or_default(),
            publisher: volume.publisher.clone(),
            thumbnail: volume.thumbnail.clone(),
            link: volume.link.clone(),
        }
    }
}

/// A persisted book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBook {
    /// Catalog-assigned identifier
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub thumbnail: Option<String>,
    pub link: Option<String>,
    /// Current holder, unset until someone claims the book
    pub owner: Option<Uuid>,
    /// User with the active request, if any
    pub request: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StoredBook {
    /// A fresh record for a book seen for the first time
    pub fn new(book: &CatalogBook) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            authors: book.authors.clone(),
            publisher: book.publisher.clone(),
            thumbnail: book.thumbnail.clone(),
            link: book.link.clone(),
            owner: None,
            request: None,
            created_at: Utc::now(),
        }
    }

    /// Overwrite the catalog-derived fields, leaving owner and request alone
    pub fn apply_catalog(&mut self, book: &CatalogBook) {
        self.title = book.title.clone();
        self.authors = book.authors.clone();
        self.publisher = book.publisher.clone();
        self.thumbnail = book.thumbnail.clone();
        self.link = book.link.clone();
    }
}

/// Books a user is trading, from both sides
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trades {
    /// Books the user has requested from others
    pub requested_by_me: Vec<StoredBook>,
    /// The user's own books that someone else has requested
    pub requested_from_me: Vec<StoredBook>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CatalogBook {
        CatalogBook {
            id: "dune".to_string(),
            title: "Dune".to_string(),
            authors: vec!["Frank Herbert".to_string()],
            publisher: None,
            thumbnail: None,
            link: None,
        }
    }

    #[test]
    fn catalog_update_keeps_trade_fields() {
        let mut book = StoredBook::new(&payload());
        let owner = Uuid::new_v4();
        let requester = Uuid::new_v4();
        book.owner = Some(owner);
        book.request = Some(requester);

        let mut updated = payload();
        updated.title = "Dune Messiah".to_string();
        book.apply_catalog(&updated);

        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.owner, Some(owner));
        assert_eq!(book.request, Some(requester));
    }

    #[test]
    fn payload_requires_id_and_title() {
        assert!(payload().validate().is_ok());

        let mut missing_id = payload();
        missing_id.id = " ".to_string();
        assert!(matches!(missing_id.validate(), Err(TradeError::Validation(_))));

        let mut missing_title = payload();
        missing_title.title = String::new();
        assert!(matches!(missing_title.validate(), Err(TradeError::Validation(_))));
    }

    #[test]
    fn volume_without_authors_becomes_empty_list() {
        let volume = Volume::from_item(&serde_json::json!({
            "id": "abc",
            "volumeInfo": {"title": "Anonymous", "publisher": "Self"}
        }))
        .unwrap();

        let book = CatalogBook::from(&volume);
        assert!(book.authors.is_empty());
        assert_eq!(book.publisher.as_deref(), Some("Self"));
    }
}
