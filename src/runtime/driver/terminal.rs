use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton as TermButton, MouseEvent, MouseEventKind,
};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::context::MouseButton;
use crate::error::Result;
use crate::platform::{Layer, Platform, Renderer};

/// Length of one UI frame when polling with a delay.
pub const DEFAULT_FRAME_MS: u64 = 30;

/// ANSI palette index for each of the sixteen text-mode colours.
const ANSI_PALETTE: [u8; 16] = [0, 4, 2, 6, 1, 5, 3, 7, 8, 12, 10, 14, 9, 13, 11, 15];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputSnapshot {
    key: Option<KeyCode>,
    modifiers: KeyModifiers,
    press: Option<MouseButton>,
    drag: bool,
    position: (i32, i32),
    exit: bool,
}

impl Default for InputSnapshot {
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

/// [`Platform`] over crossterm's event queue and the process clock.
///
/// Each `update_event_status*` call starts a fresh input frame: the pending
/// key and mouse press are cleared, while the drag state and the pointer
/// position carry over until the button is released.
pub struct TerminalPlatform {
    epoch: Instant,
    frame: Duration,
    input: InputSnapshot,
}

impl TerminalPlatform {
    pub fn new() -> Self {
        Self::with_frame_ms(DEFAULT_FRAME_MS)
    }

    pub fn with_frame_ms(frame_ms: u64) -> Self {
        Self {
            epoch: Instant::now(),
            frame: Duration::from_millis(frame_ms),
            input: InputSnapshot::default(),
        }
    }

    fn begin_frame(&mut self) {
        self.input.key = None;
        self.input.modifiers = KeyModifiers::NONE;
        self.input.press = None;
    }

    fn drain(&mut self) -> Result<()> {
        while event::poll(Duration::ZERO)? {
            self.apply_event(event::read()?);
        }
        Ok(())
    }

    fn apply_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.apply_key(key),
            Event::Mouse(mouse) => self.apply_mouse(mouse),
            _ => {}
        }
    }

    fn apply_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.input.exit = true;
            return;
        }
        self.input.key = Some(key.code);
        self.input.modifiers = key.modifiers;
    }

    fn apply_mouse(&mut self, mouse: MouseEvent) {
        self.input.position = (i32::from(mouse.column), i32::from(mouse.row));
        match mouse.kind {
            MouseEventKind::Down(button) => {
                let button = map_button(button);
                self.input.press = Some(button);
                self.input.drag = false;
            }
            MouseEventKind::Drag(button) => {
                let button = map_button(button);
                self.input.press = Some(button);
                self.input.drag = true;
            }
            MouseEventKind::Up(_) => {
                self.input.drag = false;
            }
            MouseEventKind::ScrollUp => self.input.press = Some(MouseButton::WheelUp),
            MouseEventKind::ScrollDown => self.input.press = Some(MouseButton::WheelDown),
            _ => {}
        }
    }
}

impl Default for TerminalPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn map_button(button: TermButton) -> MouseButton {
    match button {
        TermButton::Left => MouseButton::Left,
        TermButton::Right => MouseButton::Right,
        TermButton::Middle => MouseButton::Middle,
    }
}

impl Platform for TerminalPlatform {
    fn ticks(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn delay(&mut self, ms: u64) {
        if ms > 0 {
            thread::sleep(Duration::from_millis(ms));
        }
    }

    fn update_event_status(&mut self) -> Result<()> {
        self.begin_frame();
        self.drain()
    }

    fn update_event_status_delay(&mut self) -> Result<()> {
        self.begin_frame();
        let deadline = Instant::now() + self.frame;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            if event::poll(remaining)? {
                self.apply_event(event::read()?);
            }
        }
    }

    fn update_event_status_intake(&mut self) -> Result<()> {
        self.begin_frame();
        if event::poll(self.frame)? {
            self.apply_event(event::read()?);
            self.drain()?;
        }
        Ok(())
    }

    fn force_release_all_keys(&mut self) {
        self.input.key = None;
        self.input.modifiers = KeyModifiers::NONE;
        self.input.press = None;
        self.input.drag = false;
    }

    fn exit_status(&self) -> bool {
        self.input.exit
    }

    fn key(&self) -> Option<KeyCode> {
        self.input.key
    }

    fn modifiers(&self) -> KeyModifiers {
        self.input.modifiers
    }

    fn mouse_press(&self) -> Option<MouseButton> {
        self.input.press
    }

    fn mouse_drag(&self) -> bool {
        self.input.drag
    }

    fn mouse_position(&self) -> (i32, i32) {
        self.input.position
    }
}

/// [`Renderer`] that queues text into a buffer and writes it out on flush.
///
/// The terminal has a single surface, so both layers draw to the same
/// cells. Write failures are kept until [`TerminalRenderer::take_error`].
pub struct TerminalRenderer<W: Write> {
    out: W,
    buffer: Vec<u8>,
    layer: Layer,
    caption: Option<f64>,
    error: Option<io::Error>,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buffer: Vec::new(),
            layer: Layer::Game,
            caption: None,
            error: None,
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn caption_fps(&self) -> Option<f64> {
        self.caption
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn keep(&mut self, result: io::Result<()>) {
        if let Err(err) = result {
            self.error.get_or_insert(err);
        }
    }
}

fn ansi_color(index: u8) -> Color {
    Color::AnsiValue(ANSI_PALETTE[usize::from(index & 0x0f)])
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn select_layer(&mut self, layer: Layer) {
        self.layer = layer;
    }

    fn update_screen(&mut self) {
        let result = self
            .out
            .write_all(&self.buffer)
            .and_then(|()| self.out.flush());
        self.buffer.clear();
        self.keep(result);
    }

    fn write_string(&mut self, text: &str, x: u32, y: u32, color: u8) {
        let column = u16::try_from(x).unwrap_or(u16::MAX);
        let row = u16::try_from(y).unwrap_or(u16::MAX);
        let result = queue!(
            self.buffer,
            MoveTo(column, row),
            SetForegroundColor(ansi_color(color)),
            SetBackgroundColor(ansi_color(color >> 4)),
            Print(text),
            ResetColor
        );
        self.keep(result);
    }

    fn set_caption_fps(&mut self, fps: f64) {
        self.caption = Some(fps);
        let result = queue!(self.buffer, terminal::SetTitle(format!("{fps:.2} fps")));
        self.keep(result);
    }
}

/// Raw mode, alternate screen, and mouse capture for as long as it lives.
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        // From here on, Drop restores the terminal even if setup fails.
        let session = Self { _private: () };
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(session)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        execute!(io::stdout(), Show, DisableMouseCapture, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}
