//! Domain records and HTTP payloads

use serde::Deserialize;

pub mod book;
pub mod user;

pub use book::{CatalogBook, StoredBook, Trades};
pub use user::{Identity, ProfileUpdate, User};

/// Request body for a catalog search
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}
