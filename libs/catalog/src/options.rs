//! Search options and catalog configuration

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, sync::OnceLock, time::Duration};

use crate::error::{CatalogError, CatalogResult};

/// Largest page the catalog will return for a single query
pub const MAX_LIMIT: u32 = 40;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// Field a query can be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Author,
    Publisher,
    Subject,
    Isbn,
}

impl SearchField {
    /// Keyword operator prepended to the query
    pub fn operator(&self) -> &'static str {
        match self {
            SearchField::Title => "intitle:",
            SearchField::Author => "inauthor:",
            SearchField::Publisher => "inpublisher:",
            SearchField::Subject => "subject:",
            SearchField::Isbn => "isbn:",
        }
    }
}

impl FromStr for SearchField {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SearchField::Title),
            "author" => Ok(SearchField::Author),
            "publisher" => Ok(SearchField::Publisher),
            "subject" => Ok(SearchField::Subject),
            "isbn" => Ok(SearchField::Isbn),
            other => Err(CatalogError::Validation(format!(
                "Unknown search field '{}'",
                other
            ))),
        }
    }
}

/// Restrict results to books, magazines, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintType {
    Books,
    Magazines,
    #[default]
    All,
}

impl PrintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrintType::Books => "books",
            PrintType::Magazines => "magazines",
            PrintType::All => "all",
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    #[default]
    Relevance,
    Newest,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Relevance => "relevance",
            OrderBy::Newest => "newest",
        }
    }
}

/// Options for a single search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Provider credential, overrides the configured key
    pub key: Option<String>,
    /// Scope the query to a single field
    pub field: Option<SearchField>,
    /// Start index into the result collection
    pub offset: i64,
    /// Maximum number of results (1 to 40)
    pub limit: u32,
    pub print_type: PrintType,
    pub order: OrderBy,
    /// Two-letter ISO-639-1 language code
    pub lang: String,
    /// Two-letter ISO 3166-1 country code
    pub country: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            key: None,
            field: None,
            offset: 0,
            limit: 10,
            print_type: PrintType::All,
            order: OrderBy::Relevance,
            lang: "en".to_string(),
            country: "US".to_string(),
        }
    }
}

impl SearchOptions {
    /// Check a query and these options before anything is sent
    pub fn validate(&self, query: &str) -> CatalogResult<()> {
        if query.trim().is_empty() {
            return Err(CatalogError::Validation("Query is required".to_string()));
        }

        if self.offset < 0 {
            return Err(CatalogError::Validation(
                "Offset cannot be below 0".to_string(),
            ));
        }

        if self.limit < 1 || self.limit > MAX_LIMIT {
            return Err(CatalogError::Validation(format!(
                "Limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = CODE_REGEX
            .get_or_init(|| Regex::new(r"^[A-Za-z]{2}$").expect("Failed to compile code regex"));

        if !regex.is_match(&self.lang) {
            return Err(CatalogError::Validation(format!(
                "Language must be a two-letter ISO-639-1 code, got '{}'",
                self.lang
            )));
        }

        if !regex.is_match(&self.country) {
            return Err(CatalogError::Validation(format!(
                "Country must be a two-letter ISO code, got '{}'",
                self.country
            )));
        }

        Ok(())
    }

    /// The `q` parameter: field operator followed by the quoted query
    pub fn query_text(&self, query: &str) -> String {
        let operator = self.field.map(|f| f.operator()).unwrap_or_default();
        format!("{}\"{}\"", operator, query.trim())
    }

    /// Query string parameters for the volumes endpoint
    pub fn query_params(
        &self,
        query: &str,
        fallback_key: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.query_text(query)),
            ("startIndex", self.offset.to_string()),
            ("maxResults", self.limit.to_string()),
            ("printType", self.print_type.as_str().to_string()),
            ("orderBy", self.order.as_str().to_string()),
            ("langRestrict", self.lang.clone()),
            ("country", self.country.clone()),
        ];

        if let Some(key) = self.key.as_deref().or(fallback_key) {
            params.push(("key", key.to_string()));
        }

        params
    }
}

/// Catalog client configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog API, without trailing slash
    pub base_url: String,
    /// Credential used when the search options carry none
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Options applied by `search_with_defaults`
    pub defaults: SearchOptions,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            defaults: SearchOptions::default(),
        }
    }
}

impl CatalogConfig {
    /// Create a new CatalogConfig from environment variables
    ///
    /// # Environment Variables
    /// - `GOOGLE_BOOKS_URL`: Catalog base URL (default: "https://www.googleapis.com/books/v1")
    /// - `GOOGLE_BOOKS_KEY`: API key (default: none)
    /// - `GOOGLE_BOOKS_TIMEOUT`: Request timeout in seconds (default: 10)
    /// - `GOOGLE_BOOKS_LIMIT`: Results per search (default: 10)
    /// - `GOOGLE_BOOKS_LANG`: Language restriction (default: "en")
    /// - `GOOGLE_BOOKS_COUNTRY`: Country code (default: "US")
    pub fn from_env() -> CatalogResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("GOOGLE_BOOKS_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }

        config.api_key = env::var("GOOGLE_BOOKS_KEY").ok().filter(|k| !k.is_empty());

        if let Some(timeout) = env::var("GOOGLE_BOOKS_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(timeout);
        }

        if let Some(limit) = env::var("GOOGLE_BOOKS_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.defaults.limit = limit;
        }

        if let Ok(lang) = env::var("GOOGLE_BOOKS_LANG") {
            config.defaults.lang = lang;
        }

        if let Ok(country) = env::var("GOOGLE_BOOKS_COUNTRY") {
            config.defaults.country = country;
        }

        // Bad defaults fail here, not on the first search.
        config.defaults.validate("startup")?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn accepts_every_limit_in_range() {
        for limit in 1..=MAX_LIMIT {
            let options = SearchOptions {
                limit,
                ..SearchOptions::default()
            };
            assert!(options.validate("dune").is_ok(), "limit {} rejected", limit);
        }
    }

    #[test]
    fn rejects_out_of_range_limit_and_offset() {
        for options in [
            SearchOptions {
                limit: 0,
                ..SearchOptions::default()
            },
            SearchOptions {
                limit: 41,
                ..SearchOptions::default()
            },
            SearchOptions {
                offset: -1,
                ..SearchOptions::default()
            },
        ] {
            assert!(matches!(
                options.validate("dune"),
                Err(CatalogError::Validation(_))
            ));
        }
    }

    #[test]
    fn rejects_blank_query() {
        let options = SearchOptions::default();
        assert!(matches!(
            options.validate("   "),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn rejects_malformed_language() {
        let options = SearchOptions {
            lang: "english".to_string(),
            ..SearchOptions::default()
        };
        assert!(matches!(
            options.validate("dune"),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn field_operator_prefixes_quoted_query() {
        let options = SearchOptions {
            field: Some(SearchField::Author),
            ..SearchOptions::default()
        };
        assert_eq!(options.query_text("Albert Camus"), "inauthor:\"Albert Camus\"");
        assert_eq!(
            SearchOptions::default().query_text("The Plague"),
            "\"The Plague\""
        );
    }

    #[test]
    fn query_params_prefer_explicit_key() {
        let options = SearchOptions {
            key: Some("explicit".to_string()),
            ..SearchOptions::default()
        };
        let params = options.query_params("dune", Some("configured"));
        assert!(params.contains(&("key", "explicit".to_string())));

        let params = SearchOptions::default().query_params("dune", None);
        assert!(params.iter().all(|(name, _)| *name != "key"));
        assert!(params.contains(&("maxResults", "10".to_string())));
        assert!(params.contains(&("printType", "all".to_string())));
    }

    #[test]
    fn parses_search_field_names() {
        assert_eq!("isbn".parse::<SearchField>().unwrap(), SearchField::Isbn);
        assert!("genre".parse::<SearchField>().is_err());
    }

    #[test]
    #[serial]
    fn config_from_env_overrides_defaults() {
        unsafe {
            std::env::set_var("GOOGLE_BOOKS_URL", "http://localhost:9999/books/v1/");
            std::env::set_var("GOOGLE_BOOKS_KEY", "secret");
            std::env::set_var("GOOGLE_BOOKS_LIMIT", "1");
        }

        let config = CatalogConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:9999/books/v1");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.defaults.limit, 1);
        assert_eq!(config.defaults.lang, "en");

        unsafe {
            std::env::remove_var("GOOGLE_BOOKS_URL");
            std::env::remove_var("GOOGLE_BOOKS_KEY");
            std::env::remove_var("GOOGLE_BOOKS_LIMIT");
        }
    }

    #[test]
    #[serial]
    fn config_from_env_rejects_bad_limit() {
        unsafe {
            std::env::set_var("GOOGLE_BOOKS_LIMIT", "99");
        }

        assert!(CatalogConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("GOOGLE_BOOKS_LIMIT");
        }
    }
}
