//! HTTP client for the external book catalog

use serde_json::Value;
use tracing::{debug, error, info};

use crate::{
    error::{CatalogError, CatalogResult},
    options::{CatalogConfig, SearchOptions},
    volume::Volume,
};

/// Outcome of a successful search
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Normalized volumes, malformed items already dropped
    pub volumes: Vec<Volume>,
    /// The decoded response body as received
    pub raw: Value,
}

/// Catalog client wrapper
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
}

impl CatalogClient {
    /// Create a new catalog client
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, config })
    }

    /// Search with the configured default options
    pub async fn search_with_defaults(&self, query: &str) -> CatalogResult<SearchResults> {
        let options = self.config.defaults.clone();
        self.search(query, &options).await
    }

    /// Search the catalog.
    ///
    /// Validates before sending, then performs exactly one GET. No retries.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> CatalogResult<SearchResults> {
        options.validate(query)?;

        let url = format!("{}/volumes", self.config.base_url);
        let params = options.query_params(query, self.config.api_key.as_deref());

        info!(
            query = query,
            offset = options.offset,
            limit = options.limit,
            "Searching catalog"
        );

        let response = self.http.get(&url).query(&params).send().await.map_err(|e| {
            error!("Catalog request failed: {}", e);
            CatalogError::Network(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown status")
                        .to_string()
                });
            error!(status = status.as_u16(), "Catalog returned an error: {}", message);
            return Err(CatalogError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        let raw: Value =
            serde_json::from_str(&body).map_err(|_| CatalogError::invalid_response())?;
        if !raw.is_object() {
            return Err(CatalogError::invalid_response());
        }

        if let Some(message) = error_message(&raw) {
            error!("Catalog reported an error: {}", message);
            return Err(CatalogError::Upstream {
                status: None,
                message,
            });
        }

        let volumes = parse_volumes(&raw);
        info!("Catalog returned {} volumes", volumes.len());

        Ok(SearchResults { volumes, raw })
    }
}

/// Normalize the `items` of a response body, dropping malformed entries
pub fn parse_volumes(raw: &Value) -> Vec<Volume> {
    let Some(items) = raw.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let volume = Volume::from_item(item);
            if volume.is_none() {
                debug!("Dropping malformed catalog item");
            }
            volume
        })
        .collect()
}

fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown catalog error");
    Some(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_well_formed_items_only() {
        let body = json!({
            "kind": "books#volumes",
            "items": [
                {"id": "one", "volumeInfo": {"title": "Cujo", "authors": ["Stephen King"]}},
                {}
            ]
        });

        let volumes = parse_volumes(&body);
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].title, "Cujo");
    }

    #[test]
    fn missing_items_is_an_empty_result() {
        assert!(parse_volumes(&json!({"kind": "books#volumes", "totalItems": 0})).is_empty());
        assert!(parse_volumes(&json!({"items": "nope"})).is_empty());
    }

    #[test]
    fn extracts_error_messages() {
        assert_eq!(
            error_message(&json!({"error": {"code": 400, "message": "API key not valid"}})),
            Some("API key not valid".to_string())
        );
        assert_eq!(error_message(&json!({"items": []})), None);
    }
}
