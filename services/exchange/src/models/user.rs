//! User records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user and the ids of the books they own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Subject issued by the identity provider
    pub provider_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Owned book ids, sorted, no duplicates
    pub books: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity asserted by the identity provider
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub provider_id: String,
    pub username: String,
    pub display_name: Option<String>,
}

/// Profile fields a user may change
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileUpdate {
    pub city: Option<String>,
    pub state: Option<String>,
}

impl ProfileUpdate {
    /// Trim both fields, treating blanks as cleared
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            city: clean(&self.city),
            state: clean(&self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_profile_fields_are_cleared() {
        let update = ProfileUpdate {
            city: Some("  Lisbon ".to_string()),
            state: Some("   ".to_string()),
        };

        let normalized = update.normalized();
        assert_eq!(normalized.city.as_deref(), Some("Lisbon"));
        assert_eq!(normalized.state, None);
    }
}
