//! lobby-tui library: catalog engine, transports and the terminal UI core.

pub mod app_core;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod theme;
pub mod transport;
pub mod ui;

pub use app_core::state::{AppState, FocusPane, InputMode};
