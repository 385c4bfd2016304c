//! Platform bindings for running the core against a real terminal.

pub mod terminal;

pub use terminal::{DEFAULT_FRAME_MS, TerminalPlatform, TerminalRenderer, TerminalSession};
