//! # lobby-tui
//!
//! A terminal user interface for browsing a casino game catalog API.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use lobby_tui::app_core::debounce::Debounce;
use lobby_tui::app_core::input::{AppKeyCode, AppKeyEvent, AppMouseEvent, AppMouseKind};
use lobby_tui::app_core::reducer;
use lobby_tui::app_core::state::{AppAction, AppState};
use lobby_tui::catalog::{CatalogAction, CatalogSession, CatalogState, FetchExecutor};
use lobby_tui::config::{self, LobbyConfig};
use lobby_tui::logging::{self, LOG_FILE_NAME};
use lobby_tui::runtime::{CatalogDriver, FetchWorker};
use lobby_tui::transport::{
    FixtureTransport, HttpTransport, ProxyTransport, RateLimiter, ResponseCache, Transport,
};
use lobby_tui::{theme, ui};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on how long the event loop waits for input before polling
/// the fetch worker again.
const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "lobby-tui: a terminal lobby for a casino game catalog API.\n\
                  Browse categories, search and page through games, and inspect the\n\
                  normalized record of each game."
)]
struct Args {
    /// Catalog API base URL (overrides `api_base_url` from the config file)
    #[arg(short, long)]
    api: Option<String>,

    /// Games per page
    #[arg(long)]
    page_size: Option<u32>,

    /// UI theme (dracula, solarized, gruvbox)
    #[arg(short, long)]
    theme: Option<String>,

    /// Path to a lobby.json config file
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Serve the catalog from a directory of JSON fixtures instead of the API
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Show all paths used by the application (config, data, log)
    #[arg(long)]
    paths: bool,

    /// Print the category menu as JSON and exit
    #[arg(long)]
    list_categories: bool,

    /// Print one projected page of a category (id, name or page reference) as JSON and exit
    #[arg(long, value_name = "CATEGORY")]
    dump: Option<String>,

    /// Search text for --dump
    #[arg(long, requires = "dump")]
    search: Option<String>,

    /// Page number for --dump
    #[arg(long, requires = "dump")]
    page: Option<u32>,

    /// Disable the response cache
    #[arg(long)]
    no_cache: bool,
}

// ---------------------------------------------------------------------------
// Crossterm → reducer adapters
// ---------------------------------------------------------------------------

fn crossterm_to_app_key_event(
    code: KeyCode,
    modifiers: KeyModifiers,
    kind: KeyEventKind,
) -> Option<AppKeyEvent> {
    if matches!(kind, KeyEventKind::Release) {
        return None;
    }

    let key_code = match code {
        KeyCode::Char(c) => AppKeyCode::Char(c),
        KeyCode::Backspace => AppKeyCode::Backspace,
        KeyCode::Delete => AppKeyCode::Delete,
        KeyCode::Enter => AppKeyCode::Enter,
        KeyCode::Esc => AppKeyCode::Esc,
        KeyCode::Up => AppKeyCode::Up,
        KeyCode::Down => AppKeyCode::Down,
        KeyCode::Left => AppKeyCode::Left,
        KeyCode::Right => AppKeyCode::Right,
        KeyCode::Home => AppKeyCode::Home,
        KeyCode::End => AppKeyCode::End,
        KeyCode::PageUp => AppKeyCode::PageUp,
        KeyCode::PageDown => AppKeyCode::PageDown,
        KeyCode::Tab => AppKeyCode::Tab,
        KeyCode::BackTab => AppKeyCode::BackTab,
        _ => return None,
    };

    Some(AppKeyEvent {
        code: key_code,
        ctrl: modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER),
        alt: modifiers.contains(KeyModifiers::ALT),
        shift: modifiers.contains(KeyModifiers::SHIFT),
        is_release: false,
    })
}

fn crossterm_to_app_mouse_event(mouse: &event::MouseEvent) -> Option<AppMouseEvent> {
    let kind = match mouse.kind {
        MouseEventKind::Down(event::MouseButton::Left) => AppMouseKind::LeftDown,
        MouseEventKind::ScrollUp => AppMouseKind::ScrollUp,
        MouseEventKind::ScrollDown => AppMouseKind::ScrollDown,
        _ => return None,
    };
    Some(AppMouseEvent::new(kind, mouse.column, mouse.row))
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn apply_overrides(config: &mut LobbyConfig, args: &Args) -> Result<()> {
    if let Some(api) = &args.api {
        config.api_base_url = api.clone();
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(theme) = &args.theme {
        config.theme = theme.clone();
    }
    config.validate()
}

/// Builds the transport stack and a label describing where data comes from.
fn build_transport(args: &Args, config: &LobbyConfig) -> Result<(Arc<dyn Transport>, String)> {
    let cache = if args.no_cache {
        None
    } else {
        config.cache_ttl().map(ResponseCache::new)
    };
    let limiter = RateLimiter::new(config.rate_limit.capacity, config.rate_limit.refill_per_sec);

    match &args.fixtures {
        Some(dir) => {
            let inner = FixtureTransport::open(dir)
                .with_context(|| format!("Failed to open fixtures in {}", dir.display()))?;
            let proxy: Arc<dyn Transport> =
                Arc::new(ProxyTransport::new(inner, cache, limiter, &config.client_id));
            Ok((proxy, format!("fixtures:{}", dir.display())))
        }
        None => {
            let inner = HttpTransport::new(&config.api_base_url, config.request_timeout())?;
            let proxy: Arc<dyn Transport> =
                Arc::new(ProxyTransport::new(inner, cache, limiter, &config.client_id));
            Ok((proxy, config.api_base_url.clone()))
        }
    }
}

fn print_paths() -> Result<()> {
    let data_dir = config::get_data_dir()?;
    let config_path = config::default_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "unavailable".to_string());
    println!("App Paths:");
    println!("  Config:  {config_path}");
    println!("  Data:    {}", data_dir.display());
    println!("  Log:     {}", data_dir.join(LOG_FILE_NAME).display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Headless commands
// ---------------------------------------------------------------------------

fn run_headless(args: &Args, config: &LobbyConfig, transport: Arc<dyn Transport>) -> Result<()> {
    let executor = FetchExecutor::new(transport, config.retry.policy());
    let mut session = CatalogSession::new(
        CatalogState::with_categories(config.page_size, config.categories.clone()),
        config.orchestrator(),
        executor,
    );

    if let Err(err) = session.load_categories() {
        if session.state.categories.is_empty() {
            return Err(err).context("Failed to load categories");
        }
        warn!(error = %err, "using configured categories");
    }

    if args.list_categories {
        println!("{}", serde_json::to_string_pretty(&session.state.categories)?);
        return Ok(());
    }

    let Some(wanted) = args.dump.as_deref() else {
        return Ok(());
    };
    let category = session
        .state
        .categories
        .iter()
        .find(|c| c.id == wanted || c.get_page == wanted || c.name.eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Unknown category: {wanted}"))?;

    session.dispatch(CatalogAction::RequestCategory(category));
    if let Some(search) = &args.search {
        session.dispatch(CatalogAction::RequestSearch(search.clone()));
    }
    session.sync()?;

    if let Some(page) = args.page
        && page != session.view().page_number
    {
        if !session.dispatch(CatalogAction::RequestPageNumber(page)) {
            anyhow::bail!(
                "Page {page} is out of range (1..={})",
                session.view().total_pages
            );
        }
        session.sync()?;
    }

    println!("{}", serde_json::to_string_pretty(&session.view())?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let args = Args::parse();
    let app_version = format!("v{}", env!("CARGO_PKG_VERSION"));

    if args.paths {
        return print_paths();
    }

    let mut config = LobbyConfig::load(args.config_file.as_deref())?;
    apply_overrides(&mut config, &args)?;
    let theme = theme::Theme::from_str(&config.theme)
        .map_err(anyhow::Error::msg)?
        .config();

    let (transport, source_label) = build_transport(&args, &config)?;

    if args.list_categories || args.dump.is_some() {
        logging::init_stderr_logging();
        return run_headless(&args, &config, transport);
    }

    let data_dir = config::get_data_dir()?;
    logging::init_file_logging(&data_dir.join(LOG_FILE_NAME))?;
    info!(source = %source_label, page_size = config.page_size, "starting lobby-tui");

    let executor = FetchExecutor::new(transport, config.retry.policy());
    let driver = CatalogDriver::new(config.orchestrator(), FetchWorker::spawn(executor)?);

    let mut app = AppState::new(
        CatalogState::with_categories(config.page_size, config.categories.clone()),
        theme,
        Debounce::new(config.search_debounce()),
        app_version,
        source_label,
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &driver);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.search_debounce.cancel();
    info!("lobby-tui exiting");
    res
}

fn handle_action(app: &mut AppState, driver: &CatalogDriver, action: AppAction) {
    match action {
        AppAction::ReloadCategories => driver.load_categories(app),
    }
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    driver: &CatalogDriver,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    driver.load_categories(app);
    let mut needs_redraw = true;

    loop {
        needs_redraw |= driver.drain(app);
        needs_redraw |= app.fire_search_debounce(Instant::now());
        if let Some(action) = app.pending_action.take() {
            handle_action(app, driver, action);
            needs_redraw = true;
        }
        needs_redraw |= driver.sync(app);

        if needs_redraw {
            terminal.draw(|f| ui::ui(f, app))?;
            needs_redraw = false;
        }
        if app.should_quit {
            break;
        }

        let timeout = app
            .search_debounce
            .time_until_due(Instant::now())
            .map_or(TICK_RATE, |due| due.min(TICK_RATE));
        if !event::poll(timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if let Some(event) = crossterm_to_app_key_event(key.code, key.modifiers, key.kind) {
                    reducer::handle_key_event(app, event);
                    needs_redraw = true;
                }
            }
            Event::Mouse(mouse) => {
                if let Some(event) = crossterm_to_app_mouse_event(&mouse) {
                    needs_redraw |= reducer::handle_mouse_event(app, event);
                }
            }
            Event::Resize(_, _) => needs_redraw = true,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_release_is_ignored() {
        assert!(
            crossterm_to_app_key_event(KeyCode::Char('q'), KeyModifiers::NONE, KeyEventKind::Release)
                .is_none()
        );
        let event =
            crossterm_to_app_key_event(KeyCode::Char('u'), KeyModifiers::SUPER, KeyEventKind::Press)
                .unwrap();
        assert_eq!(event.code, AppKeyCode::Char('u'));
        assert!(event.ctrl);
        assert!(crossterm_to_app_key_event(KeyCode::F(1), KeyModifiers::NONE, KeyEventKind::Press).is_none());
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from(["lobby-tui", "--api", "https://api.example.com", "--page-size", "12"]);
        let mut config = LobbyConfig::default();
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.page_size, 12);

        let bad = Args::parse_from(["lobby-tui", "--page-size", "0"]);
        assert!(apply_overrides(&mut LobbyConfig::default(), &bad).is_err());
        assert!(Args::try_parse_from(["lobby-tui", "--search", "wolf"]).is_err());
    }
}
