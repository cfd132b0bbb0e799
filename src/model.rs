//! Shared data model types used by the catalog engine and the UI.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Display name used when the upstream item carries no usable name.
pub const UNKNOWN_GAME_NAME: &str = "Unknown Game";

/// A game tile after normalization.
///
/// Immutable once built by the normalizer. `thumbnail` is either empty or a
/// string starting with `http` or `/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    /// Identity, unique within one fetch result.
    pub id: String,
    /// Display name (falls back to [`UNKNOWN_GAME_NAME`]).
    pub name: String,
    /// Resolved absolute or root-relative URL, empty if unresolvable.
    pub thumbnail: String,
    /// Provider display name, if the upstream reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Every other upstream field, in upstream order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameRecord {
    /// Character shown in place of a missing thumbnail.
    pub fn placeholder_initial(&self) -> char {
        self.name
            .chars()
            .find(|c| c.is_alphanumeric())
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('?')
    }

    pub fn has_thumbnail(&self) -> bool {
        !self.thumbnail.is_empty()
    }

    /// Flat JSON view of the record, as shown in the details pane.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A named filter bucket of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Opaque page reference: a path, a full URL or a bare slug.
    #[serde(rename = "getPage")]
    pub get_page: String,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, get_page: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            get_page: get_page.into(),
        }
    }
}

/// Idempotency key of one catalog fetch: `(category, search, page, size)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CatalogQuery {
    /// The selected category's page reference.
    pub category_ref: String,
    /// Trimmed search text, empty when no search is active.
    pub search: String,
    /// 1-based page number.
    pub page_number: u32,
    /// Logical page size (never the inflated wire size).
    pub page_size: u32,
}

impl CatalogQuery {
    pub fn has_search(&self) -> bool {
        !self.search.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str) -> GameRecord {
        GameRecord {
            id: "1".to_string(),
            name: name.to_string(),
            thumbnail: String::new(),
            provider: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn placeholder_initial_uses_first_alphanumeric() {
        assert_eq!(record("wolf gold").placeholder_initial(), 'W');
        assert_eq!(record("  9 masks").placeholder_initial(), '9');
        assert_eq!(record("").placeholder_initial(), '?');
    }

    #[test]
    fn record_serializes_flat() {
        let mut extra = Map::new();
        extra.insert("rtp".to_string(), json!(96.5));
        let game = GameRecord {
            id: "wolf".to_string(),
            name: "Wolf Gold".to_string(),
            thumbnail: "/img/wolf.png".to_string(),
            provider: None,
            extra,
        };
        assert_eq!(
            game.to_value(),
            json!({"id": "wolf", "name": "Wolf Gold", "thumbnail": "/img/wolf.png", "rtp": 96.5})
        );
    }

    #[test]
    fn category_uses_wire_name_for_page_reference() {
        let category: Category =
            serde_json::from_value(json!({"id": "slots", "name": "Slots", "getPage": "/slots"}))
                .unwrap();
        assert_eq!(category, Category::new("slots", "Slots", "/slots"));
    }
}
