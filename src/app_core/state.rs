//! UI state of the lobby browser and the methods that mutate it.
//!
//! Catalog data lives in [`CatalogState`] and only changes through
//! [`AppState::dispatch`]; everything else here is view bookkeeping
//! (selection, focus, the search box, the details cache).

use std::time::Instant;

use ratatui::{layout::Rect, text::Line, widgets::ListState};
use tui_scrollview::ScrollViewState;

use crate::app_core::debounce::Debounce;
use crate::catalog::{CatalogAction, CatalogState, CatalogView, project};
use crate::model::{Category, GameRecord};
use crate::theme::ThemeConfig;
use crate::ui;

/// Current input mode for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Keystrokes edit the search box
    Searching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Categories,
    Games,
    Details,
    Search,
}

/// Work the runtime performs after input handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    ReloadCategories,
}

pub struct AppState {
    /// Catalog store; mutate only through [`AppState::dispatch`]
    pub catalog: CatalogState,
    /// Projection of `catalog`, recomputed after every accepted action
    pub view: CatalogView,
    pub category_list_state: ListState,
    /// Selection within `view.visible_items`
    pub game_list_state: ListState,
    /// Search box contents, committed to the catalog after the debounce
    pub search_text: String,
    /// Cursor position in the search box, in chars
    pub search_cursor: usize,
    pub search_debounce: Debounce,
    pub input_mode: InputMode,
    pub focused_pane: FocusPane,
    pub theme: ThemeConfig,
    pub app_version: String,
    /// Where the catalog comes from (API base URL or fixture directory)
    pub source_label: String,
    pub details_scroll_state: ScrollViewState,
    /// Highlighted JSON of the selected game
    pub details_lines: Vec<Line<'static>>,
    /// `details_lines` wrapped to `details_wrapped_width`
    pub details_wrapped: Vec<Line<'static>>,
    pub details_wrapped_width: u16,
    /// Id of the game currently rendered in the details pane
    cached_details_id: Option<String>,
    /// Screen regions recorded during render, used for mouse hit-testing
    pub categories_area: Option<Rect>,
    pub categories_content_area: Option<Rect>,
    pub games_area: Option<Rect>,
    pub games_content_area: Option<Rect>,
    pub details_area: Option<Rect>,
    pub search_area: Option<Rect>,
    pub search_input_area: Option<Rect>,
    pub should_quit: bool,
    pub show_help: bool,
    pub pending_action: Option<AppAction>,
}

impl AppState {
    pub fn new(
        catalog: CatalogState,
        theme: ThemeConfig,
        search_debounce: Debounce,
        app_version: String,
        source_label: String,
    ) -> Self {
        let search_text = catalog.search_text.clone();
        let mut app = Self {
            view: CatalogView::default(),
            catalog,
            category_list_state: ListState::default(),
            game_list_state: ListState::default(),
            search_cursor: search_text.chars().count(),
            search_text,
            search_debounce,
            input_mode: InputMode::Normal,
            focused_pane: FocusPane::Games,
            theme,
            app_version,
            source_label,
            details_scroll_state: ScrollViewState::default(),
            details_lines: Vec::new(),
            details_wrapped: Vec::new(),
            details_wrapped_width: 0,
            cached_details_id: None,
            categories_area: None,
            categories_content_area: None,
            games_area: None,
            games_content_area: None,
            details_area: None,
            search_area: None,
            search_input_area: None,
            should_quit: false,
            show_help: false,
            pending_action: None,
        };
        app.category_list_state
            .select(app.catalog.selected_category_index());
        app.refresh_view();
        app
    }

    /// Feeds `action` to the catalog store and refreshes derived state when
    /// the store accepted it.
    pub fn dispatch(&mut self, action: CatalogAction) -> bool {
        let previous = self.catalog.selected_category_index();
        let changed = crate::catalog::reduce(&mut self.catalog, action);
        if changed {
            let current = self.catalog.selected_category_index();
            if current != previous || self.category_list_state.selected().is_none() {
                self.category_list_state.select(current);
            }
            self.refresh_view();
        }
        changed
    }

    pub fn refresh_view(&mut self) {
        self.view = project(&self.catalog);
        self.clamp_selection();
        self.refresh_details();
    }

    /// Keeps the game selection inside the visible page.
    pub fn clamp_selection(&mut self) {
        let len = self.view.visible_items.len();
        match self.game_list_state.selected() {
            _ if len == 0 => self.game_list_state.select(None),
            None => self.game_list_state.select(Some(0)),
            Some(selected) if selected >= len => self.game_list_state.select(Some(len - 1)),
            Some(_) => {}
        }
    }

    pub fn selected_game(&self) -> Option<&GameRecord> {
        self.game_list_state
            .selected()
            .and_then(|idx| self.view.visible_items.get(idx))
    }

    pub fn category_at(&self, index: usize) -> Option<&Category> {
        self.catalog.categories.get(index)
    }

    pub fn refresh_details(&mut self) {
        let selected_id = self.selected_game().map(|game| game.id.clone());
        if selected_id.is_some() && selected_id == self.cached_details_id {
            return;
        }
        self.details_scroll_state = ScrollViewState::default();
        self.cached_details_id = selected_id;

        self.details_lines = match self.selected_game() {
            Some(game) => match serde_json::to_string_pretty(&game.to_value()) {
                Ok(json) => ui::highlight_json(&json, &self.theme.json_style),
                Err(_) => vec![Line::raw("Error formatting JSON")],
            },
            None => vec![Line::raw("Select a game to view details")],
        };
        self.details_wrapped_width = 0;
        self.details_wrapped.clear();
    }

    /// Moves the game selection by `direction` (+1 or -1).
    pub fn move_selection(&mut self, direction: i32) {
        if direction < 0 {
            self.game_list_state.select_previous();
        } else {
            self.game_list_state.select_next();
        }
        self.clamp_selection();
        self.refresh_details();
    }

    pub fn select_game(&mut self, index: usize) {
        if self.view.visible_items.is_empty() {
            return;
        }
        self.game_list_state
            .select(Some(index.min(self.view.visible_items.len() - 1)));
        self.refresh_details();
    }

    /// Moves the highlighted category without loading it.
    pub fn move_category_cursor(&mut self, direction: i32) {
        if self.catalog.categories.is_empty() {
            return;
        }
        if direction < 0 {
            self.category_list_state.select_previous();
        } else {
            self.category_list_state.select_next();
        }
        let last = self.catalog.categories.len() - 1;
        if let Some(selected) = self.category_list_state.selected()
            && selected > last
        {
            self.category_list_state.select(Some(last));
        }
    }

    /// Loads the category under the cursor.
    pub fn activate_category(&mut self, index: usize) -> bool {
        let Some(category) = self.category_at(index).cloned() else {
            return false;
        };
        self.category_list_state.select(Some(index));
        let changed = self.dispatch(CatalogAction::RequestCategory(category));
        if changed {
            self.game_list_state.select(Some(0));
            self.clamp_selection();
            self.refresh_details();
        }
        changed
    }

    pub fn request_page(&mut self, page: u32) -> bool {
        let changed = self.dispatch(CatalogAction::RequestPageNumber(page));
        if changed {
            self.game_list_state.select(Some(0));
            self.clamp_selection();
            self.refresh_details();
        }
        changed
    }

    /// Commits the search box to the catalog right away.
    pub fn commit_search(&mut self) -> bool {
        self.search_debounce.cancel();
        self.dispatch(CatalogAction::RequestSearch(self.search_text.clone()))
    }

    /// Commits the search box if the debounce deadline has passed.
    pub fn fire_search_debounce(&mut self, now: Instant) -> bool {
        if self.search_debounce.fire_if_due(now) {
            return self.dispatch(CatalogAction::RequestSearch(self.search_text.clone()));
        }
        false
    }

    pub fn scroll_details_by_lines(&mut self, lines: u16, down: bool) {
        for _ in 0..lines {
            if down {
                self.details_scroll_state.scroll_down();
            } else {
                self.details_scroll_state.scroll_up();
            }
        }
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.search_text
            .char_indices()
            .nth(char_idx)
            .map(|(idx, _)| idx)
            .unwrap_or(self.search_text.len())
    }

    pub fn search_add_char(&mut self, c: char) {
        let byte_idx = self.byte_index(self.search_cursor);
        self.search_text.insert(byte_idx, c);
        self.search_cursor += 1;
    }

    pub fn search_backspace(&mut self) {
        if self.search_cursor > 0 {
            self.search_cursor -= 1;
            let byte_idx = self.byte_index(self.search_cursor);
            if byte_idx < self.search_text.len() {
                self.search_text.remove(byte_idx);
            }
        }
    }

    pub fn search_delete(&mut self) {
        let byte_idx = self.byte_index(self.search_cursor);
        if byte_idx < self.search_text.len() {
            self.search_text.remove(byte_idx);
        }
    }

    pub fn search_move_cursor_left(&mut self) {
        self.search_cursor = self.search_cursor.saturating_sub(1);
    }

    pub fn search_move_cursor_right(&mut self) {
        if self.search_cursor < self.search_text.chars().count() {
            self.search_cursor += 1;
        }
    }

    pub fn search_move_to_start(&mut self) {
        self.search_cursor = 0;
    }

    pub fn search_move_to_end(&mut self) {
        self.search_cursor = self.search_text.chars().count();
    }

    pub fn search_clear(&mut self) {
        self.search_text.clear();
        self.search_cursor = 0;
    }

    pub fn search_delete_word(&mut self) {
        let chars: Vec<char> = self.search_text.chars().collect();
        let mut start = self.search_cursor.min(chars.len());
        while start > 0 && chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }

        let byte_start = self.byte_index(start);
        let byte_end = self.byte_index(self.search_cursor);
        self.search_text.replace_range(byte_start..byte_end, "");
        self.search_cursor = start;
    }

    pub fn focus_pane(&mut self, pane: FocusPane) {
        self.focused_pane = pane;
        self.input_mode = if pane == FocusPane::Search {
            InputMode::Searching
        } else {
            InputMode::Normal
        };
    }

    pub fn focus_next_pane(&mut self) {
        let next = match self.focused_pane {
            FocusPane::Categories => FocusPane::Games,
            FocusPane::Games => FocusPane::Details,
            FocusPane::Details => FocusPane::Search,
            FocusPane::Search => FocusPane::Categories,
        };
        self.focus_pane(next);
    }

    pub fn focus_prev_pane(&mut self) {
        let prev = match self.focused_pane {
            FocusPane::Categories => FocusPane::Search,
            FocusPane::Games => FocusPane::Categories,
            FocusPane::Details => FocusPane::Games,
            FocusPane::Search => FocusPane::Details,
        };
        self.focus_pane(prev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;
    use std::time::Duration;

    fn make_app() -> AppState {
        let catalog = CatalogState::with_categories(
            10,
            vec![
                Category::new("all", "All", "/en"),
                Category::new("new", "New", "/en/new"),
            ],
        );
        AppState::new(
            catalog,
            Theme::Dracula.config(),
            Debounce::new(Duration::from_millis(300)),
            "v0".to_string(),
            "test".to_string(),
        )
    }

    #[test]
    fn test_search_editing_with_multibyte_chars() {
        let mut app = make_app();
        for c in "héllo wörld".chars() {
            app.search_add_char(c);
        }
        app.search_move_cursor_left();
        app.search_backspace();
        assert_eq!(app.search_text, "héllo wörd");

        app.search_move_to_end();
        app.search_delete_word();
        assert_eq!(app.search_text, "héllo ");
        assert_eq!(app.search_cursor, 6);

        app.search_move_to_start();
        app.search_delete();
        assert_eq!(app.search_text, "éllo ");
    }

    #[test]
    fn test_debounced_commit_reaches_catalog() {
        let mut app = make_app();
        let start = Instant::now();
        app.search_text = "  wolf ".to_string();
        app.search_debounce.schedule(start);

        assert!(!app.fire_search_debounce(start));
        assert_eq!(app.catalog.search_text, "");
        assert!(app.fire_search_debounce(start + Duration::from_millis(300)));
        assert_eq!(app.catalog.search_text, "wolf");
    }

    #[test]
    fn test_focus_cycle_sets_input_mode() {
        let mut app = make_app();
        assert_eq!(app.focused_pane, FocusPane::Games);
        app.focus_next_pane();
        app.focus_next_pane();
        assert_eq!(app.focused_pane, FocusPane::Search);
        assert_eq!(app.input_mode, InputMode::Searching);
        app.focus_next_pane();
        assert_eq!(app.focused_pane, FocusPane::Categories);
        assert_eq!(app.input_mode, InputMode::Normal);
        app.focus_prev_pane();
        assert_eq!(app.focused_pane, FocusPane::Search);
    }

    #[test]
    fn test_activate_category_switches_query() {
        let mut app = make_app();
        assert_eq!(app.category_list_state.selected(), Some(0));
        assert!(app.activate_category(1));
        assert_eq!(
            app.catalog.active_query().unwrap().category_ref,
            "/en/new"
        );
        assert!(!app.activate_category(1));
        assert!(!app.activate_category(9));
    }
}
