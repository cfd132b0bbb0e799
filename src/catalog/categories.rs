//! Extraction of [`Category`] entries from the lobby configuration payload.

use foldhash::HashSet;
use serde_json::{Map, Value};
use tracing::debug;

use crate::model::Category;

/// Walks the (arbitrarily nested) configuration payload depth-first and
/// collects every object carrying a non-empty `getPage` reference.
///
/// Categories keep payload order; later entries with an already seen id are
/// dropped.
pub fn parse_categories(config: &Value) -> Vec<Category> {
    let mut categories = Vec::new();
    let mut seen = HashSet::default();
    collect(config, &mut categories, &mut seen);
    categories
}

fn collect(value: &Value, out: &mut Vec<Category>, seen: &mut HashSet<String>) {
    match value {
        Value::Array(entries) => {
            for entry in entries {
                collect(entry, out, seen);
            }
        }
        Value::Object(obj) => {
            if let Some(category) = category_from(obj) {
                if seen.insert(category.id.clone()) {
                    out.push(category);
                } else {
                    debug!(id = %category.id, "duplicate category in config");
                }
            }
            for child in obj.values() {
                if child.is_array() || child.is_object() {
                    collect(child, out, seen);
                }
            }
        }
        _ => {}
    }
}

fn category_from(obj: &Map<String, Value>) -> Option<Category> {
    let get_page = obj.get("getPage")?.as_str()?.trim();
    if get_page.is_empty() {
        return None;
    }

    let name = ["name", "title", "gameText"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(get_page);

    let id = ["id", "slug"]
        .iter()
        .find_map(|key| match obj.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| get_page.to_string());

    Some(Category::new(id, name, get_page))
}
