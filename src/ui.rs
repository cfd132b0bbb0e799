use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect, Size},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{
        Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Wrap,
    },
};
use tui_scrollview::{ScrollView, ScrollbarVisibility};
use unicode_width::UnicodeWidthChar;

use crate::model::GameRecord;
use crate::theme::{JsonStyle, ThemeConfig};
use crate::{AppState, FocusPane, InputMode};

const LOADING_MARKER: &str = "⟳";

/// Main UI entry point that renders the entire application layout.
pub fn ui(f: &mut Frame, app: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Main area
            Constraint::Length(3), // Search input
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Percentage(45),
        ])
        .split(chunks[0]);

    app.categories_area = Some(main_chunks[0]);
    app.search_area = Some(chunks[1]);
    render_categories(f, app, main_chunks[0]);

    if has_blocking_error(app) {
        let error_area = Rect::new(
            main_chunks[1].x,
            main_chunks[1].y,
            main_chunks[1].width + main_chunks[2].width,
            main_chunks[1].height,
        );
        app.games_area = None;
        app.games_content_area = None;
        app.details_area = None;
        render_blocking_error(f, app, error_area);
    } else {
        app.games_area = Some(main_chunks[1]);
        app.details_area = Some(main_chunks[2]);
        render_games(f, app, main_chunks[1]);
        render_details(f, app, main_chunks[2]);
    }

    render_search(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    if app.show_help {
        render_help_overlay(f, app);
    }
}

/// A failed load with nothing on screen to fall back to.
fn has_blocking_error(app: &AppState) -> bool {
    app.catalog.is_blocking_error()
        || (app.catalog.categories.is_empty() && app.catalog.categories_error.is_some())
}

fn pane_block<'a>(app: &AppState, pane: FocusPane, title: String, hint: &'a str) -> Block<'a> {
    let is_focused = app.focused_pane == pane;
    Block::default()
        .borders(Borders::ALL)
        .border_style(if is_focused {
            app.theme.border_selected
        } else {
            app.theme.border
        })
        .title(title)
        .title_style(app.theme.title)
        .title_alignment(Alignment::Left)
        .title_bottom(if is_focused {
            Line::from(hint).right_aligned()
        } else {
            Line::from("").right_aligned()
        })
}

fn render_categories(f: &mut Frame, app: &mut AppState, area: Rect) {
    let title = if app.catalog.categories_loading {
        format!(" Categories {LOADING_MARKER} ")
    } else {
        format!(" Categories ({}) ", app.catalog.categories.len())
    };
    let block = pane_block(app, FocusPane::Categories, title, " ↑/↓ move • Enter open ")
        .style(app.theme.list_normal);
    app.categories_content_area = Some(block.inner(area));

    let active = app.catalog.selected_category_index();
    let items: Vec<ListItem> = app
        .catalog
        .categories
        .iter()
        .enumerate()
        .map(|(idx, category)| {
            let marker = if Some(idx) == active { "● " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, app.theme.title),
                Span::raw(category.name.as_str()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .style(app.theme.list_normal)
        .highlight_style(app.theme.list_selected);
    f.render_stateful_widget(list, area, &mut app.category_list_state);
}

/// One games list row: thumbnail marker (or the placeholder initial), name
/// and provider.
pub fn game_row<'a>(game: &'a GameRecord, theme: &ThemeConfig) -> Line<'a> {
    let marker = if game.has_thumbnail() {
        Span::styled("[■] ", theme.title)
    } else {
        Span::styled(format!("[{}] ", game.placeholder_initial()), theme.muted)
    };
    let mut spans = vec![marker, Span::raw(game.name.as_str())];
    if let Some(provider) = &game.provider {
        spans.push(Span::styled(format!("  {provider}"), theme.muted));
    }
    Line::from(spans)
}

pub fn games_title(app: &AppState) -> String {
    let view = &app.view;
    let mut title = format!(
        " Games · page {}/{} · {} total ",
        view.page_number, view.total_pages, view.total_count
    );
    if app.catalog.loading {
        title.push_str(LOADING_MARKER);
        title.push(' ');
    }
    title
}

fn render_games(f: &mut Frame, app: &mut AppState, area: Rect) {
    let hint = if app.view.has_more {
        " ←/→ page • m more • Tab cycle "
    } else {
        " ←/→ page • Tab cycle "
    };
    let block = pane_block(app, FocusPane::Games, games_title(app), hint)
        .style(app.theme.list_normal);
    let content_area = block.inner(area);
    app.games_content_area = Some(content_area);

    if app.view.visible_items.is_empty() {
        let message = if app.catalog.loading {
            "Loading games…".to_string()
        } else if app.catalog.search_text.is_empty() {
            "No games in this category".to_string()
        } else {
            format!("No games match \"{}\"", app.catalog.search_text)
        };
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(message, app.theme.muted)))
                .block(block)
                .alignment(Alignment::Center),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .view
        .visible_items
        .iter()
        .map(|game| ListItem::new(game_row(game, &app.theme)))
        .collect();

    let list = List::new(items)
        .block(block)
        .style(app.theme.list_normal)
        .scroll_padding(2)
        .highlight_style(app.theme.list_selected);
    f.render_stateful_widget(list, area, &mut app.game_list_state);

    let mut scrollbar_state = ScrollbarState::new(app.view.visible_items.len())
        .position(app.game_list_state.selected().unwrap_or(0));
    f.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

/// Renders the details pane: a short header and the game's JSON.
fn render_details(f: &mut Frame, app: &mut AppState, area: Rect) {
    let block = pane_block(
        app,
        FocusPane::Details,
        " Details ".to_string(),
        " ↑/↓ scroll • Esc back ",
    )
    .style(app.theme.text);
    let inner_area = block.inner(area);
    f.render_widget(block, area);
    if inner_area.width == 0 || inner_area.height == 0 {
        return;
    }

    let horizontal_padding = 1;
    let mut content_area = inner_area;

    let header_height = render_details_header(f, app, inner_area);
    if header_height > 0 {
        let separator_y = inner_area.y + header_height;
        if separator_y < area.y + area.height - 1 {
            let separator = format!("├{}┤", "─".repeat(inner_area.width as usize));
            f.render_widget(
                Paragraph::new(separator).style(app.theme.border),
                Rect::new(area.x, separator_y, area.width, 1),
            );
            content_area = Rect::new(
                inner_area.x,
                separator_y + 1,
                inner_area.width,
                inner_area.height.saturating_sub(header_height + 1),
            );
        }
    }

    let content_width = content_area.width.saturating_sub(horizontal_padding * 2);
    if content_width == 0 || content_area.height == 0 {
        return;
    }
    if app.details_wrapped_width != content_width {
        app.details_wrapped = wrap_lines(&app.details_lines, content_width);
        app.details_wrapped_width = content_width;
    }

    let content_height = app.details_wrapped.len() as u16;
    let mut scroll_view = ScrollView::new(Size::new(content_width, content_height))
        .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
        .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);
    let scroll_area = scroll_view.area();
    scroll_view.buf_mut().set_style(scroll_area, app.theme.text);
    scroll_view.render_widget(
        Paragraph::new(Text::from(app.details_wrapped.clone())).style(app.theme.text),
        Rect::new(0, 0, content_width, content_height),
    );

    let scroll_view_area = Rect::new(
        content_area.x + horizontal_padding,
        content_area.y,
        content_width,
        content_area.height,
    );
    f.render_stateful_widget(scroll_view, scroll_view_area, &mut app.details_scroll_state);
}

/// Name and provider on the first row, id and thumbnail on the second.
/// Returns the height used (0 without a selection).
fn render_details_header(f: &mut Frame, app: &AppState, area: Rect) -> u16 {
    let Some(game) = app.selected_game() else {
        return 0;
    };
    let header_area = Rect::new(area.x + 1, area.y, area.width.saturating_sub(2), 2);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(header_area);

    let provider = game.provider.as_deref().unwrap_or("unknown provider");
    let thumbnail = if game.has_thumbnail() {
        game.thumbnail.clone()
    } else {
        format!("no thumbnail [{}]", game.placeholder_initial())
    };

    let cells = [
        [(game.name.as_str(), app.theme.title), (provider, app.theme.muted)],
        [(game.id.as_str(), app.theme.text), (thumbnail.as_str(), app.theme.muted)],
    ];
    for (row_area, row) in rows.iter().zip(cells) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(*row_area);
        for (col_area, (value, style)) in cols.iter().zip(row) {
            f.render_widget(Paragraph::new(value).style(style), *col_area);
        }
    }
    2
}

fn render_blocking_error(f: &mut Frame, app: &AppState, area: Rect) {
    let message = app
        .catalog
        .error
        .as_deref()
        .or(app.catalog.categories_error.as_deref())
        .unwrap_or("Something went wrong");

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(app.theme.error)
        .title(" Error ")
        .title_style(app.theme.error)
        .style(app.theme.text);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let top_padding = inner.height.saturating_sub(3) / 2;
    let mut lines = vec![Line::from(""); top_padding as usize];
    lines.push(Line::from(Span::styled(message.to_string(), app.theme.error)));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("Press "),
        Span::styled("r", app.theme.title),
        Span::raw(" to retry"),
    ]));
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

/// Renders the search input box.
fn render_search(f: &mut Frame, app: &mut AppState, area: Rect) {
    let title = if app.search_debounce.is_pending() {
        format!(" Search (/) {LOADING_MARKER} ")
    } else {
        " Search (/) ".to_string()
    };
    let block = pane_block(app, FocusPane::Search, title, " Enter apply • Esc back ");

    let inner = block.inner(area);
    app.search_input_area = Some(inner);
    let horizontal_scroll =
        filter_horizontal_scroll(&app.search_text, app.search_cursor, inner.width);

    let content = if app.search_text.is_empty() && app.input_mode != InputMode::Searching {
        Text::from(Line::from(Span::styled(
            "game or provider name",
            app.theme.text.add_modifier(Modifier::DIM | Modifier::ITALIC),
        )))
    } else {
        Text::from(app.search_text.as_str())
    };

    f.render_widget(
        Paragraph::new(content)
            .block(block)
            .style(app.theme.text)
            .scroll((0, horizontal_scroll)),
        area,
    );

    if app.input_mode == InputMode::Searching && inner.width > 0 && inner.height > 0 {
        let cursor_offset = filter_cursor_offset(&app.search_text, app.search_cursor);
        let visible_cursor_offset = cursor_offset.saturating_sub(horizontal_scroll);
        let cursor_x = inner.x + visible_cursor_offset.min(inner.width.saturating_sub(1));
        f.set_cursor_position((cursor_x, inner.y));
    }
}

/// Renders the three-part status bar at the bottom.
fn render_status_bar(f: &mut Frame, app: &AppState, area: Rect) {
    let area = Rect::new(
        area.x + 1,
        area.y,
        area.width.saturating_sub(2),
        area.height,
    );
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(area);
    let bar_style = app.theme.text.add_modifier(Modifier::DIM);
    let key_style = app.theme.title;

    let shortcuts = Line::from(vec![
        Span::styled("? ", key_style),
        Span::raw("help  "),
        Span::styled("r ", key_style),
        Span::raw("retry  "),
        Span::styled("q ", key_style),
        Span::raw("quit"),
    ]);
    f.render_widget(Paragraph::new(shortcuts).style(bar_style), chunks[0]);

    f.render_widget(
        Paragraph::new(status_line(app))
            .style(bar_style)
            .alignment(Alignment::Center),
        chunks[1],
    );

    f.render_widget(
        Paragraph::new(format!("{} {}", app.source_label, app.app_version))
            .style(bar_style)
            .alignment(Alignment::Right),
        chunks[2],
    );
}

/// Middle status bar section. A failed refresh over visible data shows as a
/// non-blocking indicator with the message.
pub fn status_line(app: &AppState) -> Line<'static> {
    let mut spans = vec![Span::raw(format!("Games: {}", app.view.total_count))];
    if app.catalog.loading {
        spans.push(Span::raw(format!(" {LOADING_MARKER}")));
    }
    if let Some(error) = &app.catalog.error
        && !app.catalog.items.is_empty()
    {
        spans.push(Span::raw(" |"));
        spans.push(Span::styled(format!(" * {error}"), app.theme.error));
    } else if let Some(error) = &app.catalog.categories_error
        && !app.catalog.categories.is_empty()
    {
        spans.push(Span::raw(" |"));
        spans.push(Span::styled(format!(" * {error}"), app.theme.error));
    }
    Line::from(spans)
}

fn render_help_overlay(f: &mut Frame, app: &AppState) {
    let area = f.area();
    let popup_width = area.width.min(60).saturating_sub(4);
    let popup_height = 22.min(area.height.saturating_sub(2));
    if popup_width == 0 || popup_height == 0 {
        return;
    }
    let popup_rect = Rect::new(
        area.x + (area.width.saturating_sub(popup_width)) / 2,
        area.y + (area.height.saturating_sub(popup_height)) / 2,
        popup_width,
        popup_height,
    );
    f.render_widget(Clear, popup_rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_selected)
        .style(app.theme.text)
        .title(" Help ")
        .border_type(BorderType::Double)
        .title_style(app.theme.title);
    let inner_area = block.inner(popup_rect);
    f.render_widget(block, popup_rect);

    let key_style = app.theme.title;
    let desc_style = app.theme.text;
    let header_style = key_style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);

    let format_section = |title: &str, items: Vec<(&str, &str)>| -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(title.to_string(), header_style))];
        for (key, desc) in items {
            lines.push(Line::from(vec![
                Span::styled(format!("{: <14}", key), key_style),
                Span::styled(desc.to_string(), desc_style),
            ]));
        }
        lines
    };

    let mut lines = format_section(
        "Navigation",
        vec![
            ("Tab | S-Tab", "cycle panes"),
            ("Enter", "open category"),
            ("← → | [ ]", "previous | next page"),
            ("m", "load more"),
            ("r", "retry / reload categories"),
            ("q", "quit"),
        ],
    );
    lines.push(Line::from(""));
    lines.extend(format_section(
        "Search",
        vec![
            ("/", "focus search"),
            ("Enter", "apply now"),
            ("Ctrl+U", "clear"),
            ("Ctrl+W", "delete word"),
            ("Ctrl+A | E", "start | end of line"),
        ],
    ));

    f.render_widget(Paragraph::new(lines), inner_area.inner(Margin::new(1, 1)));
}

/// Syntax-highlights pretty-printed JSON, one [`Line`] per input line.
pub fn highlight_json(json: &str, style: &JsonStyle) -> Vec<Line<'static>> {
    json.lines()
        .map(|line| Line::from(highlight_json_line(line, style)))
        .collect()
}

fn highlight_json_line(line: &str, style: &JsonStyle) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        if rest.starts_with('"') {
            let end = closing_quote(rest).unwrap_or(rest.len());
            let (quoted, tail) = rest.split_at(end);
            let token_style = if tail.trim_start().starts_with(':') {
                Style::default().fg(style.key).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(style.string)
            };
            spans.push(Span::styled(quoted.to_string(), token_style));
            rest = tail;
        } else {
            let end = rest.find('"').unwrap_or(rest.len());
            push_bare_tokens(&rest[..end], style, &mut spans);
            rest = &rest[end..];
        }
    }
    spans
}

/// Byte index just past the quote closing the string that opens `s`.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in s.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(idx + 1),
            _ => {}
        }
    }
    None
}

#[derive(PartialEq)]
enum TokenClass {
    Space,
    Punct,
    Word,
}

fn token_class(c: char) -> TokenClass {
    match c {
        c if c.is_whitespace() => TokenClass::Space,
        '{' | '}' | '[' | ']' | ':' | ',' => TokenClass::Punct,
        _ => TokenClass::Word,
    }
}

fn push_bare_tokens(segment: &str, style: &JsonStyle, spans: &mut Vec<Span<'static>>) {
    let mut chars = segment.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let class = token_class(c);
        let mut end = start + c.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if token_class(next) != class {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }
        let token = &segment[start..end];
        let span = match token {
            "true" | "false" | "null" => {
                Span::styled(token.to_string(), Style::default().fg(style.boolean))
            }
            _ if class == TokenClass::Word && token.parse::<f64>().is_ok() => {
                Span::styled(token.to_string(), Style::default().fg(style.number))
            }
            _ => Span::raw(token.to_string()),
        };
        spans.push(span);
    }
}

/// Wraps styled lines at `width` terminal cells, character by character.
pub fn wrap_lines(lines: &[Line<'static>], width: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    if width == 0 {
        return Vec::new();
    }

    let mut wrapped = Vec::new();
    for line in lines {
        if line.spans.is_empty() {
            wrapped.push(Line::default());
            continue;
        }
        let mut current: Vec<Span<'static>> = Vec::new();
        let mut current_width = 0;

        for span in &line.spans {
            let mut part = String::new();
            for c in span.content.chars() {
                let w = c.width().unwrap_or(0);
                if current_width + w > width && current_width > 0 {
                    if !part.is_empty() {
                        current.push(Span::styled(std::mem::take(&mut part), span.style));
                    }
                    wrapped.push(Line::from(std::mem::take(&mut current)));
                    current_width = 0;
                }
                part.push(c);
                current_width += w;
            }
            if !part.is_empty() {
                current.push(Span::styled(part, span.style));
            }
        }
        if !current.is_empty() {
            wrapped.push(Line::from(current));
        }
    }
    wrapped
}

/// Calculates the terminal cell width offset for a given character index.
pub fn filter_cursor_offset(text: &str, cursor: usize) -> u16 {
    text.chars()
        .take(cursor)
        .filter_map(|c| c.width())
        .map(|w| w as u16)
        .sum::<u16>()
}

/// Horizontal viewport offset that keeps the cursor visible in the input.
pub fn filter_horizontal_scroll(text: &str, cursor: usize, visible_width: u16) -> u16 {
    if visible_width == 0 {
        return 0;
    }
    filter_cursor_offset(text, cursor).saturating_sub(visible_width.saturating_sub(1))
}

pub fn filter_cursor_for_column(text: &str, target_column: u16) -> usize {
    let mut width = 0u16;
    for (idx, ch) in text.chars().enumerate() {
        let char_width = ch.width().unwrap_or(0) as u16;
        if width + char_width > target_column {
            return idx;
        }
        width += char_width;
    }
    text.chars().count()
}
