//! Pagination/filter projection: the visible page derived from a state
//! snapshot. Pure and deterministic.

use serde::Serialize;

use super::store::CatalogState;
use crate::model::GameRecord;

/// What the UI renders for the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogView {
    pub visible_items: Vec<GameRecord>,
    pub total_count: usize,
    pub has_more: bool,
    pub total_pages: u32,
    pub page_number: u32,
    /// Items on hand exceeded one page, so the slice was cut locally.
    pub client_paginated: bool,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self {
            visible_items: Vec::new(),
            total_count: 0,
            has_more: false,
            total_pages: 1,
            page_number: 1,
            client_paginated: false,
        }
    }
}

/// Case-insensitive match of `needle` (already lowercased) against name or provider.
pub fn matches_search(game: &GameRecord, needle: &str) -> bool {
    game.name.to_lowercase().contains(needle)
        || game
            .provider
            .as_deref()
            .is_some_and(|p| p.to_lowercase().contains(needle))
}

pub fn project(state: &CatalogState) -> CatalogView {
    let needle = state.search_text.trim().to_lowercase();
    let searching = !needle.is_empty();

    let filtered: Vec<&GameRecord> = if searching {
        state
            .items
            .iter()
            .filter(|game| matches_search(game, &needle))
            .collect()
    } else {
        state.items.iter().collect()
    };

    let page_size = state.page_size.max(1) as usize;
    let page_number = state.page_number.max(1);
    let start = (page_number as usize - 1).saturating_mul(page_size);

    let client_paginated = filtered.len() > page_size;
    let visible_items: Vec<GameRecord> = if client_paginated {
        filtered
            .iter()
            .skip(start)
            .take(page_size)
            .map(|game| (*game).clone())
            .collect()
    } else {
        filtered.iter().map(|game| (*game).clone()).collect()
    };

    // A locally sliced list is the whole result on hand, so its length wins
    // over an upstream total that may disagree with it; page count and
    // `has_more` then stay consistent with the slices actually served.
    let total_count = if client_paginated || (searching && !state.capabilities.supports_search) {
        filtered.len()
    } else {
        state.total_count
    };

    let total_pages = total_count.div_ceil(page_size).max(1);
    let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
    let has_more = start.saturating_add(page_size) < total_count;

    CatalogView {
        visible_items,
        total_count,
        has_more,
        total_pages,
        page_number,
        client_paginated,
    }
}
