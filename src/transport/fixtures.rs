//! Offline transport serving catalog responses from a directory of JSON files.
//!
//! A request path maps to `<root>/<path>.json` (`/lobby/config` to
//! `lobby/config.json`). Tiles-style fixtures holding the full game list are
//! paged and searched the way the upstream endpoint would.

use std::fs;
use std::path::{Path, PathBuf};

use foldhash::HashMap;
use serde_json::{Value, json};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{CatalogRequest, Transport};
use crate::catalog::{CatalogError, resolve_path};

pub struct FixtureTransport {
    root: PathBuf,
    files: HashMap<String, PathBuf>,
}

impl FixtureTransport {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(CatalogError::Fixture(format!(
                "fixture directory {} does not exist",
                root.display()
            )));
        }

        let mut files = HashMap::default();
        for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|s| s.to_str()) != Some("json")
            {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            let key = relative
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(resolve_path(&key), path.to_path_buf());
        }

        info!(root = %root.display(), count = files.len(), "fixtures indexed");
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load(&self, request: &CatalogRequest) -> Result<Value, CatalogError> {
        let key = resolve_path(&request.target);
        let path = self
            .files
            .get(&key)
            .ok_or_else(|| CatalogError::Fixture(format!("no fixture for {key}")))?;
        debug!(%key, path = %path.display(), "serving fixture");
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| CatalogError::Fixture(format!("{}: {e}", path.display())))
    }
}

impl Transport for FixtureTransport {
    fn get_json(&self, request: &CatalogRequest) -> Result<Value, CatalogError> {
        let body = self.load(request)?;
        Ok(apply_listing_params(body, request))
    }
}

/// Applies `search`, `pageNumber` and `pageSize` to a `{ games: [...] }` body.
fn apply_listing_params(body: Value, request: &CatalogRequest) -> Value {
    let Value::Object(mut root) = body else {
        return body;
    };
    let Some(Value::Array(games)) = root.remove("games") else {
        return Value::Object(root);
    };

    let needle = request
        .get_param("search")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();
    let games: Vec<Value> = if needle.is_empty() {
        games
    } else {
        games
            .into_iter()
            .filter(|game| {
                ["name", "gameText", "title"].iter().any(|key| {
                    game.get(*key)
                        .and_then(Value::as_str)
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                })
            })
            .collect()
    };

    let page_size: Option<usize> = request.get_param("pageSize").and_then(|s| s.parse().ok());
    let page_number: usize = request
        .get_param("pageNumber")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
        .max(1);

    root.insert("totalCount".to_string(), json!(games.len()));
    let games = match page_size {
        Some(size) if size > 0 => {
            root.insert("pageNumber".to_string(), json!(page_number));
            root.insert("pageSize".to_string(), json!(size));
            games
                .into_iter()
                .skip((page_number - 1).saturating_mul(size))
                .take(size)
                .collect()
        }
        _ => games,
    };
    root.insert("games".to_string(), Value::Array(games));
    Value::Object(root)
}
