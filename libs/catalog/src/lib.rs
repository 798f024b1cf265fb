//! Book catalog client
//!
//! Searches the Google Books volumes API and normalizes its items into
//! [`Volume`] records.

pub mod client;
pub mod error;
pub mod options;
pub mod volume;

pub use client::{CatalogClient, SearchResults};
pub use error::{CatalogError, CatalogResult};
pub use options::{CatalogConfig, OrderBy, PrintType, SearchField, SearchOptions};
pub use volume::{ImageVariants, IndustryIdentifier, Volume};
