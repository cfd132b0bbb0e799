//! Fetch orchestration: turning a [`CatalogQuery`] into an upstream request,
//! executing it with retry and normalizing the result.
//!
//! Planning ([`FetchOrchestrator`]) is cheap and runs on the UI thread against
//! the current state; execution ([`FetchExecutor`]) blocks and runs on the
//! fetch worker.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::categories::parse_categories;
use super::classify::{EndpointCapabilities, EndpointClassifier};
use super::error::CatalogError;
use super::normalize::normalize_listing;
use super::store::CatalogState;
use crate::model::{CatalogQuery, Category, GameRecord};
use crate::transport::{CatalogRequest, Transport};

/// Page size requested from page 1 when a search must be filtered locally.
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 200;

/// Exponential backoff settings for catalog requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy without sleeping between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !delay.is_finite() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay.max(0.0)).min(self.max_delay)
    }
}

/// A request ready for execution, tagged with the query it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub query: CatalogQuery,
    pub request: CatalogRequest,
    pub capabilities: EndpointCapabilities,
    /// The wire page size was inflated for local filtering, so the envelope's
    /// paging fields do not describe the logical page.
    pub inflated: bool,
}

/// Normalized result of one executed [`FetchPlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub query: CatalogQuery,
    pub items: Vec<GameRecord>,
    pub total_count: Option<usize>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
    pub capabilities: EndpointCapabilities,
}

/// Builds requests from queries and suppresses repeats of the last one.
#[derive(Debug, Clone)]
pub struct FetchOrchestrator {
    classifier: EndpointClassifier,
    config_path: String,
    search_page_size: u32,
}

impl FetchOrchestrator {
    pub fn new(classifier: EndpointClassifier, config_path: &str, search_page_size: u32) -> Self {
        Self {
            classifier,
            config_path: config_path.to_string(),
            search_page_size: search_page_size.max(1),
        }
    }

    pub fn classifier(&self) -> &EndpointClassifier {
        &self.classifier
    }

    pub fn categories_request(&self) -> CatalogRequest {
        CatalogRequest::new(self.config_path.as_str())
    }

    /// Plans a fetch for `query`, or returns `None` when `query` is the one
    /// the store last dispatched.
    pub fn prepare(&self, query: &CatalogQuery, state: &CatalogState) -> Option<FetchPlan> {
        if state.last_query.as_ref() == Some(query) {
            debug!(category = %query.category_ref, page = query.page_number, "query unchanged, skipping fetch");
            return None;
        }
        Some(self.plan(query))
    }

    /// Plans a fetch for `query` unconditionally.
    pub fn plan(&self, query: &CatalogQuery) -> FetchPlan {
        let capabilities = self.classifier.classify(&query.category_ref);
        let mut inflated = false;

        let request = if capabilities.supports_pagination {
            let mut request = CatalogRequest::new(self.classifier.tiles_path());
            if query.has_search() && !capabilities.supports_search {
                inflated = true;
                request = request
                    .param("pageNumber", 1)
                    .param("pageSize", self.search_page_size.max(query.page_size));
            } else {
                request = request
                    .param("pageNumber", query.page_number)
                    .param("pageSize", query.page_size);
            }
            if query.has_search() && capabilities.supports_search {
                request = request.param("search", &query.search);
            }
            request
        } else {
            CatalogRequest::new(curated_target(&query.category_ref))
        };

        FetchPlan {
            query: query.clone(),
            request,
            capabilities,
            inflated,
        }
    }
}

fn curated_target(reference: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with('/')
    {
        reference.to_string()
    } else {
        format!("/{reference}")
    }
}

/// Runs planned requests against a [`Transport`] with retry.
#[derive(Clone)]
pub struct FetchExecutor {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl FetchExecutor {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn execute(&self, plan: &FetchPlan) -> Result<FetchOutcome, CatalogError> {
        let body = self.get_with_retry(&plan.request)?;
        let listing = normalize_listing(body);

        let (page_number, page_size) = if plan.inflated {
            (None, None)
        } else {
            (listing.page_number, listing.page_size)
        };

        info!(
            category = %plan.query.category_ref,
            page = plan.query.page_number,
            items = listing.items.len(),
            total = ?listing.total_count,
            "catalog fetch completed"
        );

        Ok(FetchOutcome {
            query: plan.query.clone(),
            items: listing.items,
            total_count: listing.total_count,
            page_number,
            page_size,
            capabilities: plan.capabilities,
        })
    }

    pub fn fetch_categories(&self, request: &CatalogRequest) -> Result<Vec<Category>, CatalogError> {
        let body = self.get_with_retry(request)?;
        let categories = parse_categories(&body);
        info!(count = categories.len(), "categories loaded");
        Ok(categories)
    }

    fn get_with_retry(&self, request: &CatalogRequest) -> Result<Value, CatalogError> {
        let mut retry = 0;
        loop {
            match self.transport.get_json(request) {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && retry < self.retry.max_retries => {
                    retry += 1;
                    let delay = self.retry.delay_for_retry(retry);
                    warn!(
                        url = %request.cache_key(),
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "catalog request failed, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(err) => {
                    warn!(url = %request.cache_key(), error = %err, "catalog request failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted responses and counts calls.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<Value, CatalogError>>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<CatalogRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<Value, CatalogError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        fn get_json(&self, request: &CatalogRequest) -> Result<Value, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"games": []})))
        }
    }

    fn network_error() -> Result<Value, CatalogError> {
        Err(CatalogError::Network("connection reset".into()))
    }

    fn query(category: &str, search: &str, page: u32, size: u32) -> CatalogQuery {
        CatalogQuery {
            category_ref: category.to_string(),
            search: search.to_string(),
            page_number: page,
            page_size: size,
        }
    }

    fn orchestrator() -> FetchOrchestrator {
        FetchOrchestrator::new(
            EndpointClassifier::default(),
            "/lobby/config",
            DEFAULT_SEARCH_PAGE_SIZE,
        )
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
        };
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(10), Duration::from_secs(2));
    }

    #[test]
    fn test_paginating_request_carries_search_and_paging() {
        let plan = orchestrator().plan(&query("/games/tiles", "wolf", 2, 24));
        assert_eq!(plan.request.target, "/games/tiles");
        assert_eq!(plan.request.get_param("pageNumber"), Some("2"));
        assert_eq!(plan.request.get_param("pageSize"), Some("24"));
        assert_eq!(plan.request.get_param("search"), Some("wolf"));
        assert!(!plan.inflated);
    }

    #[test]
    fn test_lobby_alias_is_sent_to_tiles_endpoint() {
        let plan = orchestrator().plan(&query("/en", "", 1, 24));
        assert_eq!(plan.request.target, "/games/tiles");
        assert_eq!(plan.request.get_param("search"), None);
    }

    #[test]
    fn test_local_search_inflates_first_page() {
        let orchestrator = FetchOrchestrator::new(
            EndpointClassifier::default().with_server_search(false),
            "/lobby/config",
            DEFAULT_SEARCH_PAGE_SIZE,
        );
        let plan = orchestrator.plan(&query("/games/tiles", "wolf", 3, 24));
        assert!(plan.inflated);
        assert_eq!(plan.request.get_param("pageNumber"), Some("1"));
        assert_eq!(plan.request.get_param("pageSize"), Some("200"));
        assert_eq!(plan.request.get_param("search"), None);
    }

    #[test]
    fn test_inflated_outcome_drops_envelope_paging() {
        let transport = ScriptedTransport::new(vec![Ok(json!({
            "games": [{"id": "a", "name": "Wolf Gold"}],
            "totalCount": 900,
            "pageNumber": 1,
            "pageSize": 200
        }))]);
        let orchestrator = FetchOrchestrator::new(
            EndpointClassifier::default().with_server_search(false),
            "/lobby/config",
            DEFAULT_SEARCH_PAGE_SIZE,
        );
        let executor = FetchExecutor::new(transport, RetryPolicy::immediate(0));
        let outcome = executor
            .execute(&orchestrator.plan(&query("/games/tiles", "wolf", 1, 24)))
            .unwrap();
        assert_eq!(outcome.page_size, None);
        assert_eq!(outcome.page_number, None);
        assert!(!outcome.capabilities.supports_search);
    }

    #[test]
    fn test_curated_request_omits_paging() {
        let plan = orchestrator().plan(&query("new-games", "wolf", 3, 24));
        assert_eq!(plan.request.target, "/new-games");
        assert!(plan.request.params.is_empty());
        assert_eq!(plan.capabilities, EndpointCapabilities::CURATED);

        let absolute = orchestrator().plan(&query("https://cms.test/en/hot", "", 1, 24));
        assert_eq!(absolute.request.target, "https://cms.test/en/hot");
    }

    #[test]
    fn test_prepare_skips_last_dispatched_query() {
        let transport = ScriptedTransport::new(vec![]);
        let executor = FetchExecutor::new(transport.clone(), RetryPolicy::immediate(3));
        let orchestrator = orchestrator();
        let mut state = CatalogState::new(24);
        let q = query("/games/tiles", "", 1, 24);

        for _ in 0..2 {
            if let Some(plan) = orchestrator.prepare(&q, &state) {
                state.last_query = Some(plan.query.clone());
                executor.execute(&plan).unwrap();
            }
        }
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_three_failures_then_success() {
        let transport = ScriptedTransport::new(vec![
            network_error(),
            network_error(),
            Err(CatalogError::Upstream {
                status: 503,
                status_text: "Service Unavailable".into(),
            }),
            Ok(json!({"games": [{"id": "a", "name": "A"}], "totalCount": 1})),
        ]);
        let executor = FetchExecutor::new(transport.clone(), RetryPolicy::immediate(3));
        let plan = orchestrator().plan(&query("/games/tiles", "", 1, 24));

        let outcome = executor.execute(&plan).unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.total_count, Some(1));
        assert_eq!(transport.calls(), 4);
    }

    #[test]
    fn test_four_failures_surface_last_error() {
        let transport = ScriptedTransport::new(vec![
            network_error(),
            network_error(),
            network_error(),
            Err(CatalogError::Network("final".into())),
            Ok(json!({"games": []})),
        ]);
        let executor = FetchExecutor::new(transport.clone(), RetryPolicy::immediate(3));
        let plan = orchestrator().plan(&query("/games/tiles", "", 1, 24));

        let err = executor.execute(&plan).unwrap_err();
        assert_eq!(err.to_string(), "network failure: final");
        assert_eq!(transport.calls(), 4);
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(CatalogError::Upstream {
            status: 404,
            status_text: "Not Found".into(),
        })]);
        let executor = FetchExecutor::new(transport.clone(), RetryPolicy::immediate(3));
        let plan = orchestrator().plan(&query("/missing", "", 1, 24));

        assert!(executor.execute(&plan).is_err());
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_curated_outcome_has_no_paging_fields() {
        let transport = ScriptedTransport::new(vec![Ok(json!({
            "components": [{"type": "game-list", "games": [{"id": "a"}, {"id": "b"}], "total": 2}]
        }))]);
        let executor = FetchExecutor::new(transport.clone(), RetryPolicy::immediate(0));
        let plan = orchestrator().plan(&query("/en/new", "", 1, 24));

        let outcome = executor.execute(&plan).unwrap();
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.total_count, Some(2));
        assert_eq!(outcome.page_size, None);
        assert_eq!(outcome.capabilities, EndpointCapabilities::CURATED);
    }

    #[test]
    fn test_fetch_categories_parses_menu() {
        let transport = ScriptedTransport::new(vec![Ok(json!({
            "menu": {"lobby": {"items": [
                {"id": "all", "name": "All", "getPage": "/en"},
                {"id": "new", "name": "New", "getPage": "/en/new"}
            ]}}
        }))]);
        let orchestrator = orchestrator();
        let executor = FetchExecutor::new(transport.clone(), RetryPolicy::immediate(0));

        let categories = executor
            .fetch_categories(&orchestrator.categories_request())
            .unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(
            transport.seen.lock().unwrap()[0].target,
            "/lobby/config"
        );
    }
}
