use std::fmt;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyModifiers};

use crate::error::Result;
use crate::runtime::Core;

/// Handle to a live context or subcontext node. Ids are never reused, so a
/// handle kept past destruction is detected rather than aliased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub(crate) u64);

impl ContextId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a new node is attached. Subcontext parents are resolved to their
/// owning context before anything is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Root,
    Context(ContextId),
}

impl From<ContextId> for Parent {
    fn from(id: ContextId) -> Self {
        Parent::Context(id)
    }
}

/// Screen kinds. Positive discriminants double as help page ids; the rest
/// have no page of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ContextType {
    // Core contexts.
    TitleScreen = -1,
    Main = 72,
    PlayGame = 91,
    Configure = 92,
    DialogBox = -2,
    HelpSystem = -3,
    MainMenu = -4,
    GameMenu = -5,
    Intake = -6,
    IntakeNum = -7,

    // Network contexts.
    Updater = -8,

    // Editor contexts.
    Editor = -9,
    EditorViewBoard = -10,
    BlockCmd = 73,
    BlockType = 74,
    ChooseCharset = 75,
    ImportExportType = 77,
    CharEdit = 79,
    StatusCounters = 82,
    BoardExits = 83,
    BoardSizes = 84,
    BoardInfo = 85,
    ChangeCharIds = 86,
    ChangeDamage = 87,
    GlobalSettings = 88,
    GlobalSettings2 = 89,
    RoboEd = 90,
    PaletteEditor = 93,
    SensorEditor = 94,
    SuperMegazeux = 95,
    SfxEditor = 97,
    CounterDebug = 98,
    RobotDebug = 99,
    BreakpointEditor = 100,
    VlayerSizes = 101,
}

impl ContextType {
    pub fn help_id(self) -> i32 {
        self as i32
    }

    pub fn has_help_page(self) -> bool {
        self.help_id() > 0
    }

    pub fn name(self) -> &'static str {
        match self {
            ContextType::TitleScreen => "Title screen",
            ContextType::Main => "(help main page)",
            ContextType::PlayGame => "Gameplay",
            ContextType::Configure => "Settings ed.",
            ContextType::DialogBox => "Dialog",
            ContextType::HelpSystem => "Help system",
            ContextType::MainMenu => "Main menu",
            ContextType::GameMenu => "Game menu",
            ContextType::Intake => "(intake string)",
            ContextType::IntakeNum => "(intake number)",
            ContextType::Updater => "Updater",
            ContextType::Editor => "Editor",
            ContextType::EditorViewBoard => "(view board)",
            ContextType::BlockCmd => "Block command",
            ContextType::BlockType => "Block type",
            ContextType::ChooseCharset => "Select charset",
            ContextType::ImportExportType => "Import/export",
            ContextType::CharEdit => "Char editor",
            ContextType::StatusCounters => "Status counters",
            ContextType::BoardExits => "Board exits",
            ContextType::BoardSizes => "Board sizes",
            ContextType::BoardInfo => "Board info",
            ContextType::ChangeCharIds => "Char ID table",
            ContextType::ChangeDamage => "Damage table",
            ContextType::GlobalSettings => "Global settings1",
            ContextType::GlobalSettings2 => "Global settings2",
            ContextType::RoboEd => "Robot editor",
            ContextType::PaletteEditor => "Palette editor",
            ContextType::SensorEditor => "Sensor param",
            ContextType::SuperMegazeux => "Select SMZX mode",
            ContextType::SfxEditor => "SFX editor",
            ContextType::CounterDebug => "Counter debugger",
            ContextType::RobotDebug => "Robot debugger",
            ContextType::BreakpointEditor => "Robot dbg. conf.",
            ContextType::VlayerSizes => "Vlayer sizes",
        }
    }
}

/// Inter-frame delay rule applied by the run loop for the active context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramerateMode {
    /// Fixed delay each cycle.
    #[default]
    Ui,
    /// Delay until input arrives or the fixed timeout elapses.
    UiInterrupt,
    /// Delay `16 * (speed - 1)` ms since the last update started.
    Speed,
}

impl FramerateMode {
    pub(crate) fn label(self) -> &'static str {
        match self {
            FramerateMode::Ui => "UI ",
            FramerateMode::UiInterrupt => "Int",
            FramerateMode::Speed => "MZX",
        }
    }
}

/// Result of an input handler; `Consumed` stops the event at this level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Consumed,
}

impl EventFlow {
    pub fn is_consumed(self) -> bool {
        matches!(self, EventFlow::Consumed)
    }
}

impl From<bool> for EventFlow {
    fn from(consumed: bool) -> Self {
        if consumed {
            EventFlow::Consumed
        } else {
            EventFlow::Continue
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    WheelUp,
    WheelDown,
}

/// Key state handed to key, click and drag handlers. Handlers may rewrite
/// `code` for the levels after them and for the global hotkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub code: Option<KeyCode>,
    pub modifiers: KeyModifiers,
    pub exit_requested: bool,
}

impl KeyInput {
    pub fn new(code: Option<KeyCode>) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
            exit_requested: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.code.is_some() || self.exit_requested
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseInput {
    pub press: Option<MouseButton>,
    pub dragging: bool,
    pub x: i32,
    pub y: i32,
}

pub type ResumeFn = Rc<dyn Fn(&mut Core, ContextId) -> Result<()>>;
pub type DrawFn = Rc<dyn Fn(&mut Core, ContextId) -> Result<()>>;
pub type IdleFn = Rc<dyn Fn(&mut Core, ContextId) -> Result<EventFlow>>;
pub type KeyFn = Rc<dyn Fn(&mut Core, ContextId, &mut KeyInput) -> Result<EventFlow>>;
pub type MouseFn =
    Rc<dyn Fn(&mut Core, ContextId, &mut KeyInput, MouseInput) -> Result<EventFlow>>;
pub type DestroyFn = Rc<dyn Fn(&mut Core, ContextId) -> Result<()>>;

/// Handler table for a context or subcontext.
///
/// Every slot is optional. A root-level context must fill at least one of
/// idle, key, click or drag so it can retire itself. The table is cloned
/// into the node on creation; later edits to the `ContextSpec` do not reach it.
#[derive(Clone, Default)]
pub struct ContextSpec {
    pub(crate) resume: Option<ResumeFn>,
    pub(crate) draw: Option<DrawFn>,
    pub(crate) idle: Option<IdleFn>,
    pub(crate) key: Option<KeyFn>,
    pub(crate) click: Option<MouseFn>,
    pub(crate) drag: Option<MouseFn>,
    pub(crate) destroy: Option<DestroyFn>,
    pub(crate) framerate: FramerateMode,
}

impl ContextSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn framerate(mut self, mode: FramerateMode) -> Self {
        self.framerate = mode;
        self
    }

    pub fn on_resume<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Core, ContextId) -> Result<()> + 'static,
    {
        self.resume = Some(Rc::new(f));
        self
    }

    pub fn on_draw<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Core, ContextId) -> Result<()> + 'static,
    {
        self.draw = Some(Rc::new(f));
        self
    }

    pub fn on_idle<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Core, ContextId) -> Result<EventFlow> + 'static,
    {
        self.idle = Some(Rc::new(f));
        self
    }

    pub fn on_key<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Core, ContextId, &mut KeyInput) -> Result<EventFlow> + 'static,
    {
        self.key = Some(Rc::new(f));
        self
    }

    pub fn on_click<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Core, ContextId, &mut KeyInput, MouseInput) -> Result<EventFlow> + 'static,
    {
        self.click = Some(Rc::new(f));
        self
    }

    pub fn on_drag<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Core, ContextId, &mut KeyInput, MouseInput) -> Result<EventFlow> + 'static,
    {
        self.drag = Some(Rc::new(f));
        self
    }

    /// Install one callable as both the click and the drag handler.
    pub fn on_mouse<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Core, ContextId, &mut KeyInput, MouseInput) -> Result<EventFlow> + 'static,
    {
        let handler: MouseFn = Rc::new(f);
        self.click = Some(Rc::clone(&handler));
        self.drag = Some(handler);
        self
    }

    pub fn on_destroy<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Core, ContextId) -> Result<()> + 'static,
    {
        self.destroy = Some(Rc::new(f));
        self
    }

    pub fn has_input_handler(&self) -> bool {
        self.idle.is_some() || self.key.is_some() || self.click.is_some() || self.drag.is_some()
    }

    /// Whether click and drag are the same callable. Display only.
    pub fn click_drag_shared(&self) -> bool {
        match (&self.click, &self.drag) {
            (Some(click), Some(drag)) => Rc::ptr_eq(click, drag),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_without_input_handlers_is_detected() {
        let spec = ContextSpec::new()
            .on_resume(|_, _| Ok(()))
            .on_draw(|_, _| Ok(()))
            .on_destroy(|_, _| Ok(()));
        assert!(!spec.has_input_handler());
        assert!(ContextSpec::new().on_idle(|_, _| Ok(EventFlow::Continue)).has_input_handler());
    }

    #[test]
    fn shared_mouse_handler_is_reported() {
        let shared = ContextSpec::new().on_mouse(|_, _, _, _| Ok(EventFlow::Consumed));
        assert!(shared.click_drag_shared());

        let split = ContextSpec::new()
            .on_click(|_, _, _, _| Ok(EventFlow::Consumed))
            .on_drag(|_, _, _, _| Ok(EventFlow::Consumed));
        assert!(!split.click_drag_shared());
    }

    #[test]
    fn only_positive_types_have_help_pages() {
        assert!(ContextType::PlayGame.has_help_page());
        assert!(!ContextType::TitleScreen.has_help_page());
        assert!(!ContextType::Editor.has_help_page());
    }

    #[test]
    fn key_input_counts_exit_as_pending() {
        let mut input = KeyInput::new(None);
        assert!(!input.is_pending());
        input.exit_requested = true;
        assert!(input.is_pending());
    }
}
