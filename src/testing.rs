//! Fakes for the collaborator traits, shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyModifiers};

use crate::config::CoreConfig;
use crate::context::MouseButton;
use crate::error::Result;
use crate::platform::{Layer, Platform, Renderer, WorldState};
use crate::runtime::Core;

/// Polls allowed before a test is considered hung.
const POLL_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InputFrame {
    pub key: Option<KeyCode>,
    pub modifiers: KeyModifiers,
    pub press: Option<MouseButton>,
    pub drag: bool,
    pub position: (i32, i32),
    pub exit: bool,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self {
            key: None,
            modifiers: KeyModifiers::NONE,
            press: None,
            drag: false,
            position: (0, 0),
            exit: false,
        }
    }
}

impl InputFrame {
    pub fn exit() -> Self {
        Self {
            exit: true,
            ..Self::default()
        }
    }

    pub fn key(code: KeyCode) -> Self {
        Self {
            key: Some(code),
            ..Self::default()
        }
    }

    pub fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self {
            key: Some(code),
            modifiers,
            ..Self::default()
        }
    }

    pub fn click(x: i32, y: i32) -> Self {
        Self {
            press: Some(MouseButton::Left),
            position: (x, y),
            ..Self::default()
        }
    }

    pub fn drag(x: i32, y: i32) -> Self {
        Self {
            drag: true,
            ..Self::click(x, y)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Poll {
    Status,
    Delay,
    Intake,
}

#[derive(Debug, Default)]
pub(crate) struct PlatformState {
    pub ticks: u64,
    /// Added to the clock by every poll, standing in for time spent.
    pub poll_cost: u64,
    pub delays: Vec<u64>,
    pub polls: Vec<Poll>,
    pub script: VecDeque<InputFrame>,
    pub current: InputFrame,
    pub releases: usize,
}

pub(crate) struct FakePlatform {
    state: Rc<RefCell<PlatformState>>,
}

impl FakePlatform {
    fn poll(&mut self, kind: Poll) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        assert!(state.polls.len() < POLL_LIMIT, "run loop did not terminate");
        state.polls.push(kind);
        state.ticks += state.poll_cost;
        state.current = state.script.pop_front().unwrap_or_default();
        Ok(())
    }
}

impl Platform for FakePlatform {
    fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    fn delay(&mut self, ms: u64) {
        let state = &mut *self.state.borrow_mut();
        state.delays.push(ms);
        state.ticks += ms;
    }

    fn update_event_status(&mut self) -> Result<()> {
        self.poll(Poll::Status)
    }

    fn update_event_status_delay(&mut self) -> Result<()> {
        self.poll(Poll::Delay)
    }

    fn update_event_status_intake(&mut self) -> Result<()> {
        self.poll(Poll::Intake)
    }

    fn force_release_all_keys(&mut self) {
        self.state.borrow_mut().releases += 1;
    }

    fn exit_status(&self) -> bool {
        self.state.borrow().current.exit
    }

    fn key(&self) -> Option<KeyCode> {
        self.state.borrow().current.key
    }

    fn modifiers(&self) -> KeyModifiers {
        self.state.borrow().current.modifiers
    }

    fn mouse_press(&self) -> Option<MouseButton> {
        self.state.borrow().current.press
    }

    fn mouse_drag(&self) -> bool {
        self.state.borrow().current.drag
    }

    fn mouse_position(&self) -> (i32, i32) {
        self.state.borrow().current.position
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RenderCall {
    Layer(Layer),
    Flush,
    Text(String, u32, u32, u8),
    Screenshot,
    Caption(f64),
}

pub(crate) struct RecordingRenderer {
    calls: Rc<RefCell<Vec<RenderCall>>>,
}

impl Renderer for RecordingRenderer {
    fn select_layer(&mut self, layer: Layer) {
        self.calls.borrow_mut().push(RenderCall::Layer(layer));
    }

    fn update_screen(&mut self) {
        self.calls.borrow_mut().push(RenderCall::Flush);
    }

    fn write_string(&mut self, text: &str, x: u32, y: u32, color: u8) {
        self.calls
            .borrow_mut()
            .push(RenderCall::Text(text.to_string(), x, y, color));
    }

    fn dump_screen(&mut self) {
        self.calls.borrow_mut().push(RenderCall::Screenshot);
    }

    fn set_caption_fps(&mut self, fps: f64) {
        self.calls.borrow_mut().push(RenderCall::Caption(fps));
    }
}

#[derive(Debug)]
pub(crate) struct FakeWorld {
    pub active: Cell<bool>,
    pub version: Cell<u32>,
    pub speed: Cell<u32>,
    pub counters: RefCell<HashMap<String, i32>>,
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self {
            active: Cell::new(false),
            version: Cell::new(0),
            speed: Cell::new(1),
            counters: RefCell::new(HashMap::new()),
        }
    }
}

impl FakeWorld {
    pub fn set_counter(&self, name: &str, value: i32) {
        self.counters.borrow_mut().insert(name.to_string(), value);
    }
}

impl WorldState for FakeWorld {
    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn version(&self) -> u32 {
        self.version.get()
    }

    fn counter(&self, name: &str) -> i32 {
        self.counters.borrow().get(name).copied().unwrap_or(0)
    }

    fn speed(&self) -> u32 {
        self.speed.get()
    }
}

/// Handles onto the fakes installed in a [`Core`].
#[derive(Clone)]
pub(crate) struct Rig {
    pub platform: Rc<RefCell<PlatformState>>,
    pub renderer: Rc<RefCell<Vec<RenderCall>>>,
    pub world: Rc<FakeWorld>,
}

impl Rig {
    pub fn script(&self, frames: impl IntoIterator<Item = InputFrame>) {
        self.platform.borrow_mut().script.extend(frames);
    }

    pub fn flushes(&self) -> usize {
        self.renderer
            .borrow()
            .iter()
            .filter(|call| **call == RenderCall::Flush)
            .count()
    }

    pub fn render_calls(&self) -> Vec<RenderCall> {
        self.renderer.borrow().clone()
    }

    pub fn polls(&self) -> Vec<Poll> {
        self.platform.borrow().polls.clone()
    }

    pub fn delays(&self) -> Vec<u64> {
        self.platform.borrow().delays.clone()
    }
}

pub(crate) fn harness() -> (Core, Rig) {
    harness_with(CoreConfig::default())
}

pub(crate) fn harness_with(config: CoreConfig) -> (Core, Rig) {
    let rig = Rig {
        platform: Rc::new(RefCell::new(PlatformState::default())),
        renderer: Rc::new(RefCell::new(Vec::new())),
        world: Rc::new(FakeWorld::default()),
    };
    let core = Core::with_config(
        rig.world.clone(),
        RecordingRenderer {
            calls: Rc::clone(&rig.renderer),
        },
        FakePlatform {
            state: Rc::clone(&rig.platform),
        },
        config,
    );
    (core, rig)
}

/// Ordered record of handler invocations.
pub(crate) type Trace = Rc<RefCell<Vec<String>>>;

pub(crate) fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn note(trace: &Trace, entry: impl Into<String>) {
    trace.borrow_mut().push(entry.into());
}

pub(crate) fn entries(trace: &Trace) -> Vec<String> {
    trace.borrow().clone()
}
