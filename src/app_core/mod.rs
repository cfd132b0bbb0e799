//! Application core: input types, UI state, the key/mouse reducer and the
//! search debounce timer.

pub mod debounce;
pub mod input;
pub mod reducer;
pub mod state;
