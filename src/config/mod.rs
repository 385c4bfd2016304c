//! Read-only runtime configuration consulted by the run loop.
//!
//! Flags are plain data loaded from JSON; the logger is attached in code.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::logging::Logger;

/// World version at which the counter gates below start to apply (2.60).
pub const DEFAULT_GATE_VERSION: u32 = 0x023C;

/// Gate for a global hotkey while a live game is running: with a world at or
/// past `min_world_version`, the action is only reachable while the named
/// counter is nonzero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyGate {
    pub counter: String,
    pub min_world_version: u32,
}

impl HotkeyGate {
    pub fn new(counter: impl Into<String>, min_world_version: u32) -> Self {
        Self {
            counter: counter.into(),
            min_world_version,
        }
    }

    pub fn help() -> Self {
        Self::new("HELP_MENU", DEFAULT_GATE_VERSION)
    }

    pub fn settings() -> Self {
        Self::new("F2_MENU", DEFAULT_GATE_VERSION)
    }
}

impl Default for HotkeyGate {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_GATE_VERSION)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Running a single bundled game rather than the full application.
    pub standalone_mode: bool,
    /// F12 saves a screenshot.
    pub allow_screenshots: bool,
    /// Overlay and publish the smoothed frame rate.
    pub show_fps: bool,
    /// Alt+F12 prints the context stack outside debug builds.
    pub debug_hotkeys: bool,
    /// Attach the stack dump to fatal diagnostics outside debug builds.
    pub dump_stack_on_fatal: bool,
    pub help: HotkeyGate,
    pub settings: HotkeyGate,
    #[serde(skip)]
    pub logger: Option<Logger>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            standalone_mode: false,
            allow_screenshots: true,
            show_fps: false,
            debug_hotkeys: false,
            dump_stack_on_fatal: false,
            help: HotkeyGate::help(),
            settings: HotkeyGate::settings(),
            logger: None,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Stack dumps accompany fatal diagnostics in debug builds or on request.
    pub fn dumps_stack_on_fatal(&self) -> bool {
        cfg!(debug_assertions) || self.dump_stack_on_fatal
    }

    pub fn stack_hotkey_enabled(&self) -> bool {
        cfg!(debug_assertions) || self.debug_hotkeys
    }
}
