use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use serde_json::Value;
use tracing::{debug, warn};

use super::{CatalogRequest, Transport};
use crate::catalog::CatalogError;

/// Fallback wait when a 429 response carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Blocking HTTP client for the catalog API.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    /// Resolves `request` against the base URL. Relative targets are appended
    /// to the base path rather than replacing it.
    pub fn url_for(&self, request: &CatalogRequest) -> Result<Url, CatalogError> {
        let raw = if request.is_absolute() {
            request.target.clone()
        } else if request.target.starts_with('/') {
            format!("{}{}", self.base_url, request.target)
        } else {
            format!("{}/{}", self.base_url, request.target)
        };
        let mut url =
            Url::parse(&raw).map_err(|e| CatalogError::Network(format!("invalid URL {raw}: {e}")))?;
        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request.params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }
        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, request: &CatalogRequest) -> Result<Value, CatalogError> {
        let url = self.url_for(request)?;
        debug!(%url, "GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(CatalogError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .text()
            .map_err(|e| CatalogError::Network(e.to_string()))?;
        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(%url, error = %e, "response body is not JSON");
                Ok(Value::Null)
            }
        }
    }
}

/// Parses a delta-seconds `Retry-After` value.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_relative_targets_keep_base_path() {
        let http = transport("http://localhost:3000/api/");
        let request = CatalogRequest::new("/games/tiles")
            .param("pageNumber", 1)
            .param("search", "wolf gold");
        let url = http.url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/games/tiles?pageNumber=1&search=wolf+gold"
        );

        let slug = http.url_for(&CatalogRequest::new("hot")).unwrap();
        assert_eq!(slug.as_str(), "http://localhost:3000/api/hot");
    }

    #[test]
    fn test_absolute_targets_bypass_base() {
        let http = transport("http://localhost:3000/api");
        let url = http
            .url_for(&CatalogRequest::new("https://cms.test/en/hot"))
            .unwrap();
        assert_eq!(url.as_str(), "https://cms.test/en/hot");
    }

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(parse_retry_after(" 7 "), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
