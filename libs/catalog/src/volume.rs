//! Normalized catalog volumes
//!
//! Upstream items are decoded through a fixed projection: every field the
//! catalog may omit is an `Option`, and an omitted or mistyped field stays
//! `None` so that "unknown" is never confused with "empty".

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Industry identifier such as an ISBN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

/// Named cover image variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageVariants {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_large: Option<String>,
}

impl ImageVariants {
    fn is_empty(&self) -> bool {
        self.small.is_none()
            && self.medium.is_none()
            && self.large.is_none()
            && self.extra_large.is_none()
    }
}

/// A catalog volume in canonical shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Catalog-assigned identifier, stable across searches
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_identifiers: Option<Vec<IndustryIdentifier>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maturity_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Canonical volume link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageVariants>,
}

/// Decode one optional field, treating a mistyped value as absent.
fn field<T: DeserializeOwned>(object: &Value, key: &str) -> Option<T> {
    object
        .get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

impl Volume {
    /// Normalize one upstream item.
    ///
    /// Returns `None` for items that carry no id or title. Any other field
    /// that is missing or does not have the expected type is left out.
    pub fn from_item(item: &Value) -> Option<Self> {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())?
            .to_string();
        let info = item.get("volumeInfo").filter(|info| info.is_object())?;
        let title = info
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())?
            .to_string();

        let (thumbnail, images) = match info.get("imageLinks").filter(|l| l.is_object()) {
            Some(links) => {
                let variants = ImageVariants {
                    small: field(links, "small"),
                    medium: field(links, "medium"),
                    large: field(links, "large"),
                    extra_large: field(links, "extraLarge"),
                };
                (
                    field(links, "thumbnail"),
                    (!variants.is_empty()).then_some(variants),
                )
            }
            None => (None, None),
        };

        Some(Self {
            id,
            title,
            subtitle: field(info, "subtitle"),
            authors: field(info, "authors"),
            publisher: field(info, "publisher"),
            published_date: field(info, "publishedDate"),
            description: field(info, "description"),
            industry_identifiers: field(info, "industryIdentifiers"),
            page_count: field(info, "pageCount"),
            print_type: field(info, "printType"),
            categories: field(info, "categories"),
            average_rating: field(info, "averageRating"),
            ratings_count: field(info, "ratingsCount"),
            maturity_rating: field(info, "maturityRating"),
            language: field(info, "language"),
            link: field(info, "canonicalVolumeLink"),
            thumbnail,
            images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_a_full_item() {
        let item = json!({
            "id": "zyTCAlFPjgYC",
            "volumeInfo": {
                "title": "The Google Story",
                "authors": ["David A. Vise", "Mark Malseed"],
                "publisher": "Random House Digital, Inc.",
                "publishedDate": "2005-11-15",
                "industryIdentifiers": [{"type": "ISBN_10", "identifier": "055380457X"}],
                "pageCount": 207,
                "averageRating": 3.5,
                "ratingsCount": 136,
                "canonicalVolumeLink": "https://books.google.com/books/about/The_Google_Story.html",
                "imageLinks": {
                    "smallThumbnail": "http://books.google.com/small-thumb",
                    "thumbnail": "http://books.google.com/thumb",
                    "large": "http://books.google.com/large"
                }
            }
        });

        let volume = Volume::from_item(&item).unwrap();
        assert_eq!(volume.id, "zyTCAlFPjgYC");
        assert_eq!(volume.title, "The Google Story");
        assert_eq!(
            volume.authors,
            Some(vec!["David A. Vise".to_string(), "Mark Malseed".to_string()])
        );
        assert_eq!(volume.page_count, Some(207));
        assert_eq!(volume.industry_identifiers.unwrap()[0].kind, "ISBN_10");
        assert_eq!(
            volume.link.as_deref(),
            Some("https://books.google.com/books/about/The_Google_Story.html")
        );
        assert_eq!(volume.thumbnail.as_deref(), Some("http://books.google.com/thumb"));
        let images = volume.images.unwrap();
        assert_eq!(images.large.as_deref(), Some("http://books.google.com/large"));
        assert_eq!(images.small, None);
    }

    #[test]
    fn absent_fields_stay_unknown() {
        let item = json!({"id": "abc", "volumeInfo": {"title": "Untitled Draft"}});

        let volume = Volume::from_item(&item).unwrap();
        assert_eq!(volume.authors, None);
        assert_eq!(volume.publisher, None);
        assert_eq!(volume.images, None);

        let serialized = serde_json::to_value(&volume).unwrap();
        assert_eq!(serialized, json!({"id": "abc", "title": "Untitled Draft"}));
    }

    #[test]
    fn empty_author_list_is_kept() {
        let item = json!({"id": "abc", "volumeInfo": {"title": "Anonymous", "authors": []}});

        let volume = Volume::from_item(&item).unwrap();
        assert_eq!(volume.authors, Some(vec![]));
    }

    #[test]
    fn drops_items_without_metadata() {
        assert!(Volume::from_item(&json!({})).is_none());
        assert!(Volume::from_item(&json!({"id": "abc"})).is_none());
        assert!(Volume::from_item(&json!({"id": "abc", "volumeInfo": {}})).is_none());
        assert!(Volume::from_item(&json!({"volumeInfo": {"title": "No Id"}})).is_none());
        assert!(Volume::from_item(&json!("not an object")).is_none());
        assert!(Volume::from_item(&json!({"id": 7, "volumeInfo": {"title": "x"}})).is_none());
        assert!(Volume::from_item(&json!({"id": "abc", "volumeInfo": {"title": 7}})).is_none());
    }

    #[test]
    fn mistyped_fields_are_left_out() {
        let item = json!({
            "id": "x1",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert", null],
                "publisher": "Chilton Books",
                "pageCount": "many",
                "ratingsCount": -1,
                "imageLinks": {"thumbnail": 42, "small": "http://books.google.com/small"}
            }
        });

        let volume = Volume::from_item(&item).unwrap();
        assert_eq!(volume.title, "Dune");
        assert_eq!(volume.authors, None);
        assert_eq!(volume.page_count, None);
        assert_eq!(volume.ratings_count, None);
        assert_eq!(volume.publisher.as_deref(), Some("Chilton Books"));
        assert_eq!(volume.thumbnail, None);
        assert_eq!(
            volume.images.unwrap().small.as_deref(),
            Some("http://books.google.com/small")
        );
    }
}
