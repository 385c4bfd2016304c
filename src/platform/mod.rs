//! Fixed interfaces into the systems the core drives but does not own:
//! the layer compositor, timing and input polling, the world state, and
//! the global menus.

use crossterm::event::{KeyCode, KeyModifiers};

use crate::context::{ContextId, MouseButton};
use crate::error::Result;
use crate::runtime::Core;

/// Composition layers known to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Game,
    Ui,
}

pub trait Renderer {
    fn select_layer(&mut self, layer: Layer);

    /// Push the composed frame to the output.
    fn update_screen(&mut self);

    fn write_string(&mut self, text: &str, x: u32, y: u32, color: u8);

    fn dump_screen(&mut self) {}

    fn set_caption_fps(&mut self, _fps: f64) {}
}

/// Clock plus input polling. Accessors report the state captured by the most
/// recent `update_event_status*` call.
pub trait Platform {
    /// Monotonic milliseconds.
    fn ticks(&self) -> u64;

    fn delay(&mut self, ms: u64);

    /// Poll pending events without waiting.
    fn update_event_status(&mut self) -> Result<()>;

    /// Poll events for a fixed UI frame duration.
    fn update_event_status_delay(&mut self) -> Result<()>;

    /// Poll until input arrives or the UI frame timeout elapses.
    fn update_event_status_intake(&mut self) -> Result<()>;

    fn force_release_all_keys(&mut self);

    fn exit_status(&self) -> bool;

    fn key(&self) -> Option<KeyCode>;

    fn modifiers(&self) -> KeyModifiers;

    fn mouse_press(&self) -> Option<MouseButton>;

    fn mouse_drag(&self) -> bool;

    fn mouse_position(&self) -> (i32, i32);
}

/// Read-only view of externally owned world/game state.
pub trait WorldState {
    /// A game is loaded and running.
    fn is_active(&self) -> bool;

    fn version(&self) -> u32;

    fn counter(&self, name: &str) -> i32;

    /// Gameplay speed multiplier, 1 being the fastest.
    fn speed(&self) -> u32;
}

/// World used when the caller has none; nothing is active.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWorld;

impl WorldState for NoWorld {
    fn is_active(&self) -> bool {
        false
    }

    fn version(&self) -> u32 {
        0
    }

    fn counter(&self, _name: &str) -> i32 {
        0
    }

    fn speed(&self) -> u32 {
        1
    }
}

/// Menus opened by the global hotkeys. Both usually push a context of their
/// own onto the stack.
pub trait GlobalActions {
    fn help_system(&self, core: &mut Core, active: ContextId) -> Result<()>;

    fn settings_menu(&self, core: &mut Core, active: ContextId) -> Result<()>;
}
