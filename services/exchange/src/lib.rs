//! Book exchange service
//!
//! Users search the catalog, claim books and trade them through requests that
//! the owner accepts or denies.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod trades;

pub use service::Exchange;
pub use state::AppState;
