//! Key and mouse handling for the lobby browser.
//!
//! The runtime converts crossterm events to [`AppKeyEvent`] / [`AppMouseEvent`]
//! and calls these functions; catalog changes go through
//! [`AppState::dispatch`], network work is left to the runtime.

use std::time::Instant;

use crate::app_core::input::{AppKeyCode, AppKeyEvent, AppMouseEvent, AppMouseKind};
use crate::app_core::state::{AppAction, AppState, FocusPane, InputMode};
use crate::catalog::CatalogAction;
use crate::ui;

pub const SCROLL_LINES: u16 = 1;

/// Returns the pane that contains the given cell coordinates, if any.
pub fn pane_at(app: &AppState, column: u16, row: u16) -> Option<FocusPane> {
    let panes = [
        (app.search_area, FocusPane::Search),
        (app.categories_area, FocusPane::Categories),
        (app.games_area, FocusPane::Games),
        (app.details_area, FocusPane::Details),
    ];
    panes.into_iter().find_map(|(area, pane)| {
        area.filter(|area| area.contains((column, row).into()))
            .map(|_| pane)
    })
}

/// Retries the failed fetch, or reloads the menu when categories are missing.
pub fn request_retry(app: &mut AppState) {
    if app.catalog.categories.is_empty() || app.catalog.categories_error.is_some() {
        app.pending_action = Some(AppAction::ReloadCategories);
    } else {
        app.dispatch(CatalogAction::Retry);
    }
}

fn page_step(app: &mut AppState, forward: bool) {
    let current = app.view.page_number;
    let target = if forward {
        current.saturating_add(1)
    } else {
        current.saturating_sub(1)
    };
    app.request_page(target);
}

fn list_page_height(app: &AppState) -> usize {
    app.games_content_area
        .map(|area| area.height as usize)
        .unwrap_or(10)
        .max(1)
}

/// Handle a key event, mutating `app` in place.
///
/// May set `app.pending_action`; the runtime acts on it afterwards.
pub fn handle_key_event(app: &mut AppState, event: AppKeyEvent) {
    fn apply_search_edit(app: &mut AppState, edit: impl FnOnce(&mut AppState)) {
        edit(app);
        app.search_debounce.schedule(Instant::now());
    }

    if event.is_release {
        return;
    }

    let code = event.code;
    let ctrl = event.ctrl;

    if ctrl && code == AppKeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if code == AppKeyCode::Tab || code == AppKeyCode::BackTab {
        if code == AppKeyCode::BackTab || event.shift {
            app.focus_prev_pane();
        } else {
            app.focus_next_pane();
        }
        return;
    }

    if app.show_help {
        if matches!(code, AppKeyCode::Char('?') | AppKeyCode::Esc) {
            app.show_help = false;
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => match code {
            AppKeyCode::Char('q') => app.should_quit = true,
            AppKeyCode::Char('/') => {
                app.focus_pane(FocusPane::Search);
                app.search_move_to_end();
            }
            AppKeyCode::Char('?') => app.show_help = true,
            AppKeyCode::Char('r') if !ctrl => request_retry(app),
            AppKeyCode::Char('m') if !ctrl => {
                app.dispatch(CatalogAction::RequestLoadMore);
            }
            AppKeyCode::Left | AppKeyCode::Char('[') => page_step(app, false),
            AppKeyCode::Right | AppKeyCode::Char(']') => page_step(app, true),
            AppKeyCode::Enter => match app.focused_pane {
                FocusPane::Categories => {
                    if let Some(idx) = app.category_list_state.selected() {
                        app.activate_category(idx);
                    }
                    app.focus_pane(FocusPane::Games);
                }
                FocusPane::Games => app.focus_pane(FocusPane::Details),
                _ => {}
            },
            AppKeyCode::Esc => {
                if app.focused_pane == FocusPane::Details {
                    app.focus_pane(FocusPane::Games);
                }
            }
            AppKeyCode::Up | AppKeyCode::Down => {
                let down = code == AppKeyCode::Down;
                match app.focused_pane {
                    FocusPane::Categories => app.move_category_cursor(if down { 1 } else { -1 }),
                    FocusPane::Details => app.scroll_details_by_lines(SCROLL_LINES, down),
                    _ => app.move_selection(if down { 1 } else { -1 }),
                }
            }
            AppKeyCode::Home => {
                if app.focused_pane == FocusPane::Details {
                    app.details_scroll_state.scroll_to_top();
                } else {
                    app.select_game(0);
                }
            }
            AppKeyCode::End => {
                if app.focused_pane == FocusPane::Details {
                    app.details_scroll_state.scroll_to_bottom();
                } else {
                    app.select_game(usize::MAX);
                }
            }
            AppKeyCode::PageUp => {
                if app.focused_pane == FocusPane::Details {
                    app.details_scroll_state.scroll_page_up();
                } else {
                    let current = app.game_list_state.selected().unwrap_or(0);
                    app.select_game(current.saturating_sub(list_page_height(app)));
                }
            }
            AppKeyCode::PageDown => {
                if app.focused_pane == FocusPane::Details {
                    app.details_scroll_state.scroll_page_down();
                } else {
                    let current = app.game_list_state.selected().unwrap_or(0);
                    app.select_game(current.saturating_add(list_page_height(app)));
                }
            }
            AppKeyCode::Char(c) if c.is_alphanumeric() && !ctrl && !event.alt => {
                app.focus_pane(FocusPane::Search);
                app.search_move_to_end();
                apply_search_edit(app, |app| app.search_add_char(c));
            }
            _ => {}
        },
        InputMode::Searching => match code {
            AppKeyCode::Enter => {
                app.commit_search();
                app.focus_pane(FocusPane::Games);
            }
            AppKeyCode::Esc => app.focus_pane(FocusPane::Games),
            AppKeyCode::Char('u') if ctrl => apply_search_edit(app, AppState::search_clear),
            AppKeyCode::Char('w') if ctrl => apply_search_edit(app, AppState::search_delete_word),
            AppKeyCode::Char('a') if ctrl => app.search_move_to_start(),
            AppKeyCode::Char('e') if ctrl => app.search_move_to_end(),
            AppKeyCode::Char(c) if !ctrl => apply_search_edit(app, |app| app.search_add_char(c)),
            AppKeyCode::Backspace => apply_search_edit(app, AppState::search_backspace),
            AppKeyCode::Delete => apply_search_edit(app, AppState::search_delete),
            AppKeyCode::Left => app.search_move_cursor_left(),
            AppKeyCode::Right => app.search_move_cursor_right(),
            AppKeyCode::Home => app.search_move_to_start(),
            AppKeyCode::End => app.search_move_to_end(),
            AppKeyCode::Up | AppKeyCode::Down => {
                app.focus_pane(FocusPane::Games);
                app.move_selection(if code == AppKeyCode::Down { 1 } else { -1 });
            }
            _ => {}
        },
    }
}

/// Handle a mouse event in terminal cell coordinates.
/// Returns `true` if the UI needs to be redrawn.
pub fn handle_mouse_event(app: &mut AppState, event: AppMouseEvent) -> bool {
    let column = event.column;
    let row = event.row;
    let hovered_pane = pane_at(app, column, row);
    let mut transitioned = false;

    if matches!(event.kind, AppMouseKind::ScrollUp | AppMouseKind::ScrollDown) {
        let down = event.kind == AppMouseKind::ScrollDown;
        let direction = if down { 1 } else { -1 };
        match hovered_pane {
            Some(FocusPane::Categories) => {
                app.move_category_cursor(direction);
                transitioned = true;
            }
            Some(FocusPane::Games) if !app.view.visible_items.is_empty() => {
                for _ in 0..SCROLL_LINES {
                    app.move_selection(direction);
                }
                transitioned = true;
            }
            Some(FocusPane::Details) => {
                app.scroll_details_by_lines(SCROLL_LINES, down);
                transitioned = true;
            }
            _ => {}
        }
    }

    if event.kind == AppMouseKind::LeftDown {
        if let Some(pane) = hovered_pane {
            let previous_focus = app.focused_pane;
            app.focus_pane(pane);
            transitioned |= app.focused_pane != previous_focus;
        }

        if hovered_pane == Some(FocusPane::Categories)
            && let Some(content_area) = app.categories_content_area
            && content_area.contains((column, row).into())
        {
            let clicked = app.category_list_state.offset() + row.saturating_sub(content_area.y) as usize;
            transitioned |= app.activate_category(clicked);
        }

        if hovered_pane == Some(FocusPane::Games)
            && let Some(content_area) = app.games_content_area
            && content_area.contains((column, row).into())
            && !app.view.visible_items.is_empty()
        {
            let clicked = app.game_list_state.offset() + row.saturating_sub(content_area.y) as usize;
            if clicked < app.view.visible_items.len()
                && app.game_list_state.selected() != Some(clicked)
            {
                app.select_game(clicked);
                transitioned = true;
            }
        }

        if hovered_pane == Some(FocusPane::Search)
            && let Some(input_area) = app.search_input_area
            && input_area.contains((column, row).into())
        {
            let horizontal_scroll =
                ui::filter_horizontal_scroll(&app.search_text, app.search_cursor, input_area.width);
            let target_column = horizontal_scroll + column.saturating_sub(input_area.x);
            let new_cursor = ui::filter_cursor_for_column(&app.search_text, target_column);
            if new_cursor != app.search_cursor {
                app.search_cursor = new_cursor;
                transitioned = true;
            }
        }
    }

    transitioned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_core::debounce::Debounce;
    use crate::catalog::{CatalogState, EndpointCapabilities, FetchOutcome};
    use crate::model::{Category, GameRecord};
    use crate::theme;
    use ratatui::layout::Rect;
    use serde_json::Map;
    use std::time::Duration;

    fn make_key(code: AppKeyCode) -> AppKeyEvent {
        AppKeyEvent::new(code)
    }

    fn make_mouse(kind: AppMouseKind, column: u16, row: u16) -> AppMouseEvent {
        AppMouseEvent::new(kind, column, row)
    }

    fn game(i: usize) -> GameRecord {
        GameRecord {
            id: format!("g{i}"),
            name: format!("Game {i}"),
            thumbnail: String::new(),
            provider: Some("Pragmatic".to_string()),
            extra: Map::new(),
        }
    }

    /// App on the first of two categories with `items` games loaded, 5 per page.
    fn make_test_app(items: usize) -> AppState {
        let catalog = CatalogState::with_categories(
            5,
            vec![
                Category::new("all", "All", "/en"),
                Category::new("new", "New", "/en/new"),
            ],
        );
        let mut app = AppState::new(
            catalog,
            theme::Theme::Dracula.config(),
            Debounce::new(Duration::from_millis(300)),
            "v0".to_string(),
            "test".to_string(),
        );
        let query = app.catalog.active_query().unwrap();
        app.dispatch(CatalogAction::FetchStarted(query.clone()));
        app.dispatch(CatalogAction::FetchSucceeded(FetchOutcome {
            query,
            items: (0..items).map(game).collect(),
            total_count: None,
            page_number: None,
            page_size: None,
            capabilities: EndpointCapabilities::CURATED,
        }));
        app
    }

    #[test]
    fn test_handle_key_event_navigation() {
        let mut app = make_test_app(3);
        assert_eq!(app.game_list_state.selected(), Some(0));
        handle_key_event(&mut app, make_key(AppKeyCode::Down));
        assert_eq!(app.game_list_state.selected(), Some(1));
        assert_eq!(app.selected_game().unwrap().id, "g1");
        handle_key_event(&mut app, make_key(AppKeyCode::End));
        assert_eq!(app.game_list_state.selected(), Some(2));
        handle_key_event(&mut app, make_key(AppKeyCode::Up));
        assert_eq!(app.game_list_state.selected(), Some(1));
    }

    #[test]
    fn test_typing_autofocuses_search_and_debounces() {
        let mut app = make_test_app(3);
        handle_key_event(&mut app, make_key(AppKeyCode::Char('w')));
        handle_key_event(&mut app, make_key(AppKeyCode::Char('o')));
        assert_eq!(app.input_mode, InputMode::Searching);
        assert_eq!(app.search_text, "wo");
        assert!(app.search_debounce.is_pending());
        assert_eq!(app.catalog.search_text, "");

        handle_key_event(&mut app, make_key(AppKeyCode::Enter));
        assert_eq!(app.catalog.search_text, "wo");
        assert!(!app.search_debounce.is_pending());
        assert_eq!(app.focused_pane, FocusPane::Games);
    }

    #[test]
    fn test_search_ctrl_shortcuts() {
        let mut app = make_test_app(0);
        handle_key_event(&mut app, make_key(AppKeyCode::Char('/')));
        for c in "book of dead".chars() {
            handle_key_event(&mut app, make_key(AppKeyCode::Char(c)));
        }
        handle_key_event(&mut app, AppKeyEvent::ctrl(AppKeyCode::Char('w')));
        assert_eq!(app.search_text, "book of ");
        handle_key_event(&mut app, AppKeyEvent::ctrl(AppKeyCode::Char('a')));
        assert_eq!(app.search_cursor, 0);
        handle_key_event(&mut app, AppKeyEvent::ctrl(AppKeyCode::Char('u')));
        assert!(app.search_text.is_empty());
        handle_key_event(&mut app, make_key(AppKeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_page_keys_move_between_local_pages() {
        let mut app = make_test_app(12);
        assert!(app.view.client_paginated);
        assert_eq!(app.view.total_pages, 3);

        handle_key_event(&mut app, make_key(AppKeyCode::Right));
        assert_eq!(app.view.page_number, 2);
        assert_eq!(app.selected_game().unwrap().id, "g5");
        handle_key_event(&mut app, make_key(AppKeyCode::Char(']')));
        handle_key_event(&mut app, make_key(AppKeyCode::Char(']')));
        assert_eq!(app.view.page_number, 3);
        assert_eq!(app.view.visible_items.len(), 2);
        handle_key_event(&mut app, make_key(AppKeyCode::Left));
        assert_eq!(app.view.page_number, 2);
    }

    #[test]
    fn test_retry_key() {
        let mut app = make_test_app(0);
        let query = app.catalog.active_query().unwrap();
        app.dispatch(CatalogAction::FetchFailed {
            query,
            message: "Network error".to_string(),
        });
        assert!(app.catalog.is_blocking_error());

        handle_key_event(&mut app, make_key(AppKeyCode::Char('r')));
        assert_eq!(app.catalog.error, None);
        assert_eq!(app.catalog.last_query, None);
        assert_eq!(app.pending_action, None);

        app.dispatch(CatalogAction::CategoriesFailed("down".to_string()));
        handle_key_event(&mut app, make_key(AppKeyCode::Char('r')));
        assert_eq!(app.pending_action, Some(AppAction::ReloadCategories));
    }

    #[test]
    fn test_enter_on_categories_loads_category() {
        let mut app = make_test_app(3);
        app.focus_pane(FocusPane::Categories);
        handle_key_event(&mut app, make_key(AppKeyCode::Down));
        assert_eq!(app.catalog.selected_category.as_ref().unwrap().id, "all");
        handle_key_event(&mut app, make_key(AppKeyCode::Enter));
        assert_eq!(app.catalog.selected_category.as_ref().unwrap().id, "new");
        assert!(app.view.visible_items.is_empty());
        assert_eq!(app.focused_pane, FocusPane::Games);
    }

    #[test]
    fn test_help_overlay_swallows_keys() {
        let mut app = make_test_app(3);
        handle_key_event(&mut app, make_key(AppKeyCode::Char('?')));
        assert!(app.show_help);
        handle_key_event(&mut app, make_key(AppKeyCode::Char('q')));
        assert!(!app.should_quit);
        handle_key_event(&mut app, make_key(AppKeyCode::Esc));
        assert!(!app.show_help);
        handle_key_event(&mut app, make_key(AppKeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_mouse_click_selects_game_and_category() {
        let mut app = make_test_app(4);
        app.categories_area = Some(Rect::new(0, 0, 20, 10));
        app.categories_content_area = Some(Rect::new(1, 1, 18, 8));
        app.games_area = Some(Rect::new(20, 0, 30, 10));
        app.games_content_area = Some(Rect::new(21, 1, 28, 8));

        assert!(handle_mouse_event(
            &mut app,
            make_mouse(AppMouseKind::LeftDown, 25, 3)
        ));
        assert_eq!(app.game_list_state.selected(), Some(2));

        assert!(handle_mouse_event(
            &mut app,
            make_mouse(AppMouseKind::ScrollDown, 25, 3)
        ));
        assert_eq!(app.game_list_state.selected(), Some(3));

        assert!(handle_mouse_event(
            &mut app,
            make_mouse(AppMouseKind::LeftDown, 5, 2)
        ));
        assert_eq!(app.focused_pane, FocusPane::Categories);
        assert_eq!(app.catalog.selected_category.as_ref().unwrap().id, "new");

        assert!(!handle_mouse_event(
            &mut app,
            make_mouse(AppMouseKind::LeftDown, 70, 30)
        ));
    }

    #[test]
    fn test_mouse_click_moves_search_cursor() {
        let mut app = make_test_app(0);
        app.search_text = "roulette".to_string();
        app.search_cursor = 8;
        app.search_area = Some(Rect::new(0, 20, 40, 3));
        app.search_input_area = Some(Rect::new(1, 21, 38, 1));

        assert!(handle_mouse_event(
            &mut app,
            make_mouse(AppMouseKind::LeftDown, 4, 21)
        ));
        assert_eq!(app.input_mode, InputMode::Searching);
        assert_eq!(app.search_cursor, 3);
    }
}
