//! Endpoint capability classification.
//!
//! Only the canonical all-games listing (and its lobby aliases) paginates and
//! searches server-side. Every other category reference points at a curated
//! page that returns its whole list in one response.

use reqwest::Url;
use serde::Serialize;

/// What an upstream listing endpoint does on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EndpointCapabilities {
    pub supports_search: bool,
    pub supports_pagination: bool,
}

impl EndpointCapabilities {
    pub const FULL: Self = Self {
        supports_search: true,
        supports_pagination: true,
    };
    pub const CURATED: Self = Self {
        supports_search: false,
        supports_pagination: false,
    };
}

/// Reduces a page reference (path, full URL or bare slug) to a comparable path.
///
/// Query strings and fragments are dropped, a leading `/` is ensured, trailing
/// slashes are removed (except for the root) and the result is lowercased.
pub fn resolve_path(reference: &str) -> String {
    let trimmed = reference.trim();
    let raw_path = match Url::parse(trimmed) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let mut path = raw_path.to_lowercase();
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

/// Classifies category references against the known listing paths.
#[derive(Debug, Clone)]
pub struct EndpointClassifier {
    tiles_path: String,
    listing_paths: Vec<String>,
    server_search: bool,
}

impl EndpointClassifier {
    /// `tiles_path` is the canonical listing endpoint; the lobby root `/` and
    /// `/<locale>` are accepted as aliases of it.
    pub fn new(tiles_path: &str, locale: &str) -> Self {
        let mut listing_paths = vec![resolve_path(tiles_path), "/".to_string()];
        if !locale.trim().is_empty() {
            listing_paths.push(resolve_path(locale));
        }
        listing_paths.dedup();
        Self {
            tiles_path: tiles_path.trim().to_string(),
            listing_paths,
            server_search: true,
        }
    }

    /// Some deployments ignore `search` on the tiles endpoint; searches are
    /// then filtered locally over an inflated first page.
    pub fn with_server_search(mut self, enabled: bool) -> Self {
        self.server_search = enabled;
        self
    }

    /// Path requests for paginating endpoints are sent to.
    pub fn tiles_path(&self) -> &str {
        &self.tiles_path
    }

    pub fn is_listing_endpoint(&self, reference: &str) -> bool {
        let path = resolve_path(reference);
        self.listing_paths.iter().any(|known| *known == path)
    }

    pub fn classify(&self, reference: &str) -> EndpointCapabilities {
        if self.is_listing_endpoint(reference) {
            EndpointCapabilities {
                supports_search: self.server_search,
                supports_pagination: true,
            }
        } else {
            EndpointCapabilities::CURATED
        }
    }
}

impl Default for EndpointClassifier {
    fn default() -> Self {
        Self::new("/games/tiles", "en")
    }
}
