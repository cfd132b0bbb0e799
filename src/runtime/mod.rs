//! Glue between the UI state and the fetch worker.

pub mod worker;

pub use worker::{FetchWorker, Job};

use tracing::warn;

use crate::app_core::state::AppState;
use crate::catalog::{CatalogAction, FetchOrchestrator};

/// Plans fetches on the UI thread and hands them to the worker.
pub struct CatalogDriver {
    orchestrator: FetchOrchestrator,
    worker: FetchWorker,
}

impl CatalogDriver {
    pub fn new(orchestrator: FetchOrchestrator, worker: FetchWorker) -> Self {
        Self {
            orchestrator,
            worker,
        }
    }

    pub fn load_categories(&self, app: &mut AppState) {
        app.dispatch(CatalogAction::CategoriesRequested);
        if !self
            .worker
            .submit(Job::Categories(self.orchestrator.categories_request()))
        {
            warn!("fetch worker is gone, categories not requested");
            app.dispatch(CatalogAction::CategoriesFailed(
                "Fetch worker stopped".to_string(),
            ));
        }
    }

    /// Dispatches a fetch for the active query unless it is already in
    /// flight or answered. Returns whether a job was submitted.
    pub fn sync(&self, app: &mut AppState) -> bool {
        let Some(query) = app.catalog.active_query() else {
            return false;
        };
        let Some(plan) = self.orchestrator.prepare(&query, &app.catalog) else {
            return false;
        };
        app.dispatch(CatalogAction::FetchStarted(plan.query.clone()));
        if self.worker.submit(Job::Listing(plan)) {
            return true;
        }
        warn!("fetch worker is gone, listing not requested");
        app.dispatch(CatalogAction::FetchFailed {
            query,
            message: "Fetch worker stopped".to_string(),
        });
        false
    }

    /// Applies completed fetches. Returns whether anything changed.
    pub fn drain(&self, app: &mut AppState) -> bool {
        let mut changed = false;
        for action in self.worker.drain() {
            changed |= app.dispatch(action);
        }
        changed
    }
}
