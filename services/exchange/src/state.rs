//! Application state shared across handlers

use std::sync::Arc;

use crate::{middleware::JwtVerifier, service::Exchange};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub exchange: Exchange,
    pub verifier: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(exchange: Exchange, verifier: JwtVerifier) -> Self {
        Self {
            exchange,
            verifier: Arc::new(verifier),
        }
    }
}
