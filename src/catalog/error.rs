//! Error types for catalog fetching.

use std::time::Duration;

/// Errors produced while fetching from the upstream catalog.
///
/// Malformed payloads are not represented here: the normalizer degrades them
/// to placeholder values instead.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("upstream error {status}: {status_text}")]
    Upstream { status: u16, status_text: String },

    #[error("rate limited, retry in {}s", retry_after_secs(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upper bound on the advertised retry hint; a bucket that never refills
/// reports `Duration::MAX`.
const MAX_RETRY_HINT_SECS: u64 = 3600;

fn retry_after_secs(retry_after: &Duration) -> u64 {
    retry_after.as_secs().clamp(1, MAX_RETRY_HINT_SECS)
}

impl CatalogError {
    /// Whether the fetch backoff loop may try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Network(_) => true,
            CatalogError::Upstream { status, .. } => *status >= 500,
            CatalogError::RateLimited { .. } | CatalogError::Fixture(_) | CatalogError::Io(_) => {
                false
            }
        }
    }

    /// Text shown to the user in the error state or status bar.
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::RateLimited { retry_after } => format!(
                "Too many requests. Try again in {}s (press r).",
                retry_after_secs(retry_after)
            ),
            CatalogError::Upstream {
                status,
                status_text,
            } => format!("Catalog unavailable ({status} {status_text})"),
            CatalogError::Network(msg) => format!("Network error: {msg}"),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let server = CatalogError::Upstream {
            status: 503,
            status_text: "Service Unavailable".into(),
        };
        let client = CatalogError::Upstream {
            status: 404,
            status_text: "Not Found".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(CatalogError::Network("reset".into()).is_retryable());
    }

    #[test]
    fn rate_limited_message_carries_retry_hint() {
        let err = CatalogError::RateLimited {
            retry_after: Duration::from_millis(200),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "rate limited, retry in 1s");
        assert!(err.user_message().contains("Try again in 1s"));

        let never_refills = CatalogError::RateLimited {
            retry_after: Duration::MAX,
        };
        assert!(never_refills.user_message().contains("Try again in 3600s"));
    }

    #[test]
    fn upstream_message_embeds_status_text() {
        let err = CatalogError::Upstream {
            status: 502,
            status_text: "Bad Gateway".into(),
        };
        assert_eq!(err.to_string(), "upstream error 502: Bad Gateway");
    }
}
