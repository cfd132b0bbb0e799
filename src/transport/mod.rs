//! Ways of reaching the upstream catalog API.
//!
//! Everything the catalog engine sends goes through [`Transport`], so the
//! HTTP client, the offline fixture reader and the caching proxy are
//! interchangeable.

use serde_json::Value;

use crate::catalog::CatalogError;

mod fixtures;
mod http;
mod proxy;

pub use fixtures::FixtureTransport;
pub use http::HttpTransport;
pub use proxy::{ProxyTransport, RateLimiter, ResponseCache, TokenBucket};

/// One GET against the catalog API.
///
/// `target` is either a path relative to the API base URL or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogRequest {
    pub target: String,
    pub params: Vec<(String, String)>,
}

impl CatalogRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_absolute(&self) -> bool {
        self.target.starts_with("http://") || self.target.starts_with("https://")
    }

    /// Stable key identifying the request, used by the response cache.
    pub fn cache_key(&self) -> String {
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort();
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        if query.is_empty() {
            self.target.clone()
        } else {
            format!("{}?{query}", self.target)
        }
    }
}

/// A blocking source of catalog JSON.
pub trait Transport: Send + Sync {
    fn get_json(&self, request: &CatalogRequest) -> Result<Value, CatalogError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn get_json(&self, request: &CatalogRequest) -> Result<Value, CatalogError> {
        (**self).get_json(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = CatalogRequest::new("/games/tiles")
            .param("pageNumber", 2)
            .param("pageSize", 24);
        let b = CatalogRequest::new("/games/tiles")
            .param("pageSize", 24)
            .param("pageNumber", 2);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "/games/tiles?pageNumber=2&pageSize=24");
        assert_eq!(CatalogRequest::new("/slots").cache_key(), "/slots");
    }

    #[test]
    fn test_absolute_targets() {
        assert!(CatalogRequest::new("https://x.test/a").is_absolute());
        assert!(!CatalogRequest::new("/a").is_absolute());
        assert_eq!(
            CatalogRequest::new("/a").param("search", "wolf").get_param("search"),
            Some("wolf")
        );
    }
}
