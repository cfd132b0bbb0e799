//! Synchronous catalog driver for headless use.
//!
//! The TUI splits planning and execution across threads; a
//! [`CatalogSession`] runs both inline, which is what the `--dump` and
//! `--list-categories` modes need.

use super::error::CatalogError;
use super::fetch::{FetchExecutor, FetchOrchestrator};
use super::projector::{self, CatalogView};
use super::store::{CatalogAction, CatalogState, reduce};

pub struct CatalogSession {
    pub state: CatalogState,
    orchestrator: FetchOrchestrator,
    executor: FetchExecutor,
}

impl CatalogSession {
    pub fn new(state: CatalogState, orchestrator: FetchOrchestrator, executor: FetchExecutor) -> Self {
        Self {
            state,
            orchestrator,
            executor,
        }
    }

    pub fn dispatch(&mut self, action: CatalogAction) -> bool {
        reduce(&mut self.state, action)
    }

    pub fn view(&self) -> CatalogView {
        projector::project(&self.state)
    }

    pub fn load_categories(&mut self) -> Result<(), CatalogError> {
        self.dispatch(CatalogAction::CategoriesRequested);
        match self
            .executor
            .fetch_categories(&self.orchestrator.categories_request())
        {
            Ok(categories) => {
                self.dispatch(CatalogAction::CategoriesLoaded(categories));
                Ok(())
            }
            Err(err) => {
                self.dispatch(CatalogAction::CategoriesFailed(err.user_message()));
                Err(err)
            }
        }
    }

    /// Fetches the active query unless it was already dispatched.
    /// Returns whether a request went out.
    pub fn sync(&mut self) -> Result<bool, CatalogError> {
        let Some(query) = self.state.active_query() else {
            return Ok(false);
        };
        let Some(plan) = self.orchestrator.prepare(&query, &self.state) else {
            return Ok(false);
        };

        self.dispatch(CatalogAction::FetchStarted(plan.query.clone()));
        match self.executor.execute(&plan) {
            Ok(outcome) => {
                self.dispatch(CatalogAction::FetchSucceeded(outcome));
                Ok(true)
            }
            Err(err) => {
                self.dispatch(CatalogAction::FetchFailed {
                    query: plan.query,
                    message: err.user_message(),
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DEFAULT_SEARCH_PAGE_SIZE, EndpointClassifier, RetryPolicy};
    use crate::model::Category;
    use crate::transport::{CatalogRequest, Transport};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Serves a fixed catalog of 30 tiles and a curated page; records requests.
    #[derive(Default)]
    struct FakeApi {
        calls: AtomicUsize,
        requests: Mutex<Vec<CatalogRequest>>,
        fail_next: AtomicUsize,
    }

    impl Transport for FakeApi {
        fn get_json(&self, request: &CatalogRequest) -> Result<Value, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_next.load(Ordering::SeqCst) > 0 {
                self.fail_next.fetch_sub(1, Ordering::SeqCst);
                return Err(CatalogError::Upstream {
                    status: 404,
                    status_text: "Not Found".into(),
                });
            }
            match request.target.as_str() {
                "/lobby/config" => Ok(json!({"items": [
                    {"id": "all", "name": "All", "getPage": "/en"},
                    {"id": "hot", "name": "Hot", "getPage": "/en/hot"}
                ]})),
                "/games/tiles" => {
                    let page: usize = request.get_param("pageNumber").unwrap().parse().unwrap();
                    let size: usize = request.get_param("pageSize").unwrap().parse().unwrap();
                    let games: Vec<Value> = ((page - 1) * size..(page * size).min(30))
                        .map(|i| json!({"id": i, "name": format!("Tile {i}")}))
                        .collect();
                    Ok(json!({"games": games, "totalCount": 30, "pageNumber": page, "pageSize": size}))
                }
                _ => Ok(json!({"components": [{
                    "type": "game-list",
                    "games": (0..5).map(|i| json!({"id": format!("h{i}"), "name": format!("Hot {i}")})).collect::<Vec<_>>(),
                    "total": 5
                }]})),
            }
        }
    }

    fn session(api: Arc<FakeApi>, page_size: u32) -> CatalogSession {
        crate::logging::init_test_logging();
        CatalogSession::new(
            CatalogState::new(page_size),
            FetchOrchestrator::new(
                EndpointClassifier::default(),
                "/lobby/config",
                DEFAULT_SEARCH_PAGE_SIZE,
            ),
            FetchExecutor::new(api, RetryPolicy::immediate(0)),
        )
    }

    #[test]
    fn test_repeated_sync_hits_network_once() {
        let api = Arc::new(FakeApi::default());
        let mut session = session(api.clone(), 10);
        session.load_categories().unwrap();

        assert!(session.sync().unwrap());
        assert!(!session.sync().unwrap());
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.view().visible_items.len(), 10);
        assert_eq!(session.view().total_pages, 3);
    }

    #[test]
    fn test_page_change_and_load_more() {
        let api = Arc::new(FakeApi::default());
        let mut session = session(api.clone(), 10);
        session.load_categories().unwrap();
        session.sync().unwrap();

        session.dispatch(CatalogAction::RequestPageNumber(2));
        session.sync().unwrap();
        assert_eq!(session.view().visible_items[0].id, "10");

        session.dispatch(CatalogAction::RequestLoadMore);
        session.sync().unwrap();
        let view = session.view();
        assert_eq!(view.visible_items.len(), 30);
        assert_eq!(view.page_number, 1);
        assert!(!view.has_more);
        assert_eq!(
            api.requests.lock().unwrap().last().unwrap().get_param("pageSize"),
            Some("30")
        );
    }

    #[test]
    fn test_curated_category_paginates_locally() {
        let api = Arc::new(FakeApi::default());
        let mut session = session(api.clone(), 2);
        session.load_categories().unwrap();
        session.dispatch(CatalogAction::RequestCategory(Category::new(
            "hot", "Hot", "/en/hot",
        )));
        session.sync().unwrap();

        let view = session.view();
        assert!(view.client_paginated);
        assert_eq!(view.visible_items.len(), 2);
        assert_eq!(view.total_pages, 3);

        session.dispatch(CatalogAction::RequestPageNumber(3));
        session.sync().unwrap();
        assert_eq!(session.view().visible_items.len(), 1);
    }

    #[test]
    fn test_failure_then_retry() {
        let api = Arc::new(FakeApi::default());
        let mut session = session(api.clone(), 10);
        session.load_categories().unwrap();

        api.fail_next.store(1, Ordering::SeqCst);
        assert!(session.sync().is_err());
        assert!(session.state.is_blocking_error());
        assert!(!session.sync().unwrap());

        session.dispatch(CatalogAction::Retry);
        assert!(session.sync().unwrap());
        assert_eq!(session.state.error, None);
        assert_eq!(session.state.items.len(), 10);
    }

    #[test]
    fn test_categories_failure_is_recorded() {
        let api = Arc::new(FakeApi::default());
        api.fail_next.store(1, Ordering::SeqCst);
        let mut session = session(api, 10);

        assert!(session.load_categories().is_err());
        assert!(session.state.categories_error.is_some());
        assert!(!session.sync().unwrap());
    }
}
