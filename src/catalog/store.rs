//! Catalog state store.
//!
//! [`CatalogState`] is the single mutable container of the catalog engine and
//! [`reduce`] is the only way it changes. The lifecycle is encoded in fields
//! rather than an enum: `loading` flips on at `FetchStarted` and off when the
//! matching completion arrives.

use foldhash::HashSet;
use tracing::debug;

use super::classify::EndpointCapabilities;
use super::fetch::FetchOutcome;
use super::projector;
use crate::model::{CatalogQuery, Category, GameRecord};

/// Everything the store reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogAction {
    CategoriesRequested,
    CategoriesLoaded(Vec<Category>),
    CategoriesFailed(String),
    /// New search text; the store keeps the trimmed form.
    RequestSearch(String),
    RequestCategory(Category),
    /// 1-based target page, ignored when out of range.
    RequestPageNumber(u32),
    RequestLoadMore,
    /// Clears the error and forgets the last dispatched query so the next
    /// sync fetches again.
    Retry,
    FetchStarted(CatalogQuery),
    FetchSucceeded(FetchOutcome),
    FetchFailed { query: CatalogQuery, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogState {
    pub categories: Vec<Category>,
    pub selected_category: Option<Category>,
    pub categories_loading: bool,
    pub categories_error: Option<String>,
    /// Raw (unfiltered) records on hand.
    pub items: Vec<GameRecord>,
    pub loading: bool,
    pub error: Option<String>,
    /// Trimmed search text of the active query.
    pub search_text: String,
    pub page_number: u32,
    pub page_size: u32,
    /// Configured page size, restored whenever the query is reset.
    pub base_page_size: u32,
    /// Requested "load more" size not yet confirmed by a fetch.
    pub pending_page_size: Option<u32>,
    /// Best known upstream total.
    pub total_count: usize,
    /// Capabilities of the endpoint that produced `items`.
    pub capabilities: EndpointCapabilities,
    /// Idempotency key of the last dispatched fetch.
    pub last_query: Option<CatalogQuery>,
}

impl CatalogState {
    pub fn new(page_size: u32) -> Self {
        let page_size = page_size.max(1);
        Self {
            categories: Vec::new(),
            selected_category: None,
            categories_loading: false,
            categories_error: None,
            items: Vec::new(),
            loading: false,
            error: None,
            search_text: String::new(),
            page_number: 1,
            page_size,
            base_page_size: page_size,
            pending_page_size: None,
            total_count: 0,
            capabilities: EndpointCapabilities::default(),
            last_query: None,
        }
    }

    /// State with categories pre-seeded before the config endpoint answers.
    pub fn with_categories(page_size: u32, categories: Vec<Category>) -> Self {
        let mut state = Self::new(page_size);
        if !categories.is_empty() {
            reduce(&mut state, CatalogAction::CategoriesLoaded(categories));
        }
        state
    }

    /// The query the store currently wants answered.
    pub fn active_query(&self) -> Option<CatalogQuery> {
        let category = self.selected_category.as_ref()?;
        Some(CatalogQuery {
            category_ref: category.get_page.clone(),
            search: self.search_text.clone(),
            page_number: self.page_number,
            page_size: self.pending_page_size.unwrap_or(self.page_size),
        })
    }

    pub fn selected_category_index(&self) -> Option<usize> {
        let selected = self.selected_category.as_ref()?;
        self.categories.iter().position(|c| c.id == selected.id)
    }

    /// Whether a failed fetch left nothing to show.
    pub fn is_blocking_error(&self) -> bool {
        self.error.is_some() && self.items.is_empty()
    }

    fn reset_query(&mut self) {
        self.items.clear();
        self.error = None;
        self.loading = false;
        self.page_number = 1;
        self.page_size = self.base_page_size;
        self.pending_page_size = None;
        self.total_count = 0;
        self.last_query = None;
    }

    fn select_category(&mut self, category: Category) {
        self.selected_category = Some(category);
        self.reset_query();
    }

    /// Merges a "load more" result into `items`: the response order wins and
    /// previously held records the response did not repeat are kept after it.
    fn merge_items(&mut self, incoming: Vec<GameRecord>) {
        let mut seen = HashSet::default();
        let mut merged = Vec::with_capacity(incoming.len() + self.items.len());
        for item in incoming.into_iter().chain(std::mem::take(&mut self.items)) {
            if seen.insert(item.id.clone()) {
                merged.push(item);
            }
        }
        self.items = merged;
    }
}

/// Applies `action` to `state`. Returns whether anything changed.
pub fn reduce(state: &mut CatalogState, action: CatalogAction) -> bool {
    match action {
        CatalogAction::CategoriesRequested => {
            state.categories_loading = true;
            state.categories_error = None;
            true
        }
        CatalogAction::CategoriesLoaded(categories) => {
            state.categories_loading = false;
            state.categories_error = None;
            state.categories = categories
                .into_iter()
                .filter(|c| !c.get_page.trim().is_empty())
                .collect();

            let kept = state.selected_category.as_ref().and_then(|selected| {
                state
                    .categories
                    .iter()
                    .find(|c| c.id == selected.id)
                    .cloned()
            });
            match kept {
                Some(category) => {
                    if state.selected_category.as_ref() != Some(&category) {
                        state.select_category(category);
                    }
                }
                None => match state.categories.first().cloned() {
                    Some(first) => state.select_category(first),
                    None => {
                        state.selected_category = None;
                        state.reset_query();
                    }
                },
            }
            true
        }
        CatalogAction::CategoriesFailed(message) => {
            state.categories_loading = false;
            state.categories_error = Some(message);
            true
        }
        CatalogAction::RequestSearch(text) => {
            let text = text.trim();
            if text == state.search_text {
                let changed = state.page_number != 1;
                state.page_number = 1;
                return changed;
            }
            state.search_text = text.to_string();
            state.reset_query();
            true
        }
        CatalogAction::RequestCategory(category) => {
            let same = state
                .selected_category
                .as_ref()
                .is_some_and(|selected| selected.id == category.id);
            if same {
                return false;
            }
            state.select_category(category);
            true
        }
        CatalogAction::RequestPageNumber(page) => {
            let total_pages = projector::project(state).total_pages;
            if page < 1 || page > total_pages || page == state.page_number {
                return false;
            }
            state.page_number = page;
            state.pending_page_size = None;
            true
        }
        CatalogAction::RequestLoadMore => {
            if !projector::project(state).has_more {
                return false;
            }
            // Grow the window to cover everything up to the next page.
            let shown = state.page_number.saturating_mul(state.page_size);
            state.pending_page_size = Some(shown.saturating_add(state.base_page_size));
            state.page_number = 1;
            true
        }
        CatalogAction::Retry => {
            let changed = state.error.is_some() || state.last_query.is_some();
            state.error = None;
            state.last_query = None;
            changed
        }
        CatalogAction::FetchStarted(query) => {
            state.loading = true;
            state.error = None;
            state.last_query = Some(query);
            true
        }
        CatalogAction::FetchSucceeded(outcome) => {
            if state.active_query().as_ref() != Some(&outcome.query) {
                debug!(category = %outcome.query.category_ref, page = outcome.query.page_number, "discarding stale fetch result");
                return false;
            }

            let load_more = outcome.query.page_size > state.page_size;
            if load_more {
                state.merge_items(outcome.items);
            } else {
                state.items = outcome.items;
            }
            state.total_count = outcome.total_count.unwrap_or(state.items.len());
            if let Some(page) = outcome.page_number {
                state.page_number = page.max(1);
            }
            state.page_size = outcome.page_size.unwrap_or(outcome.query.page_size).max(1);
            state.pending_page_size = None;
            state.capabilities = outcome.capabilities;
            state.loading = false;
            state.error = None;
            // Upstream may have adjusted paging; the data on hand answers it.
            state.last_query = state.active_query();
            true
        }
        CatalogAction::FetchFailed { query, message } => {
            if state.active_query().as_ref() != Some(&query) {
                debug!(category = %query.category_ref, error = %message, "discarding stale fetch failure");
                return false;
            }
            state.loading = false;
            state.error = Some(message);
            true
        }
    }
}
