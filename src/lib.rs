//! Stack-based cooperative run loop for a text-mode game engine and its
//! editors.
//!
//! Every screen is a *context* on a root stack; only the newest one is
//! active. A context may own an ordered stack of *subcontexts* that draw and
//! take input alongside it. Each frame runs a resume/draw/update cascade
//! through the active context, and handlers are free to create or destroy
//! nodes at any point.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod platform;
pub mod runtime;
pub mod stack;

#[cfg(test)]
mod testing;

pub use config::{CoreConfig, HotkeyGate};
pub use context::{
    ContextId, ContextSpec, ContextType, EventFlow, FramerateMode, KeyInput, MouseButton,
    MouseInput, Parent,
};
pub use error::{CoreError, FatalBug, Result};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{CoreMetrics, FpsCounter, MetricSnapshot};
pub use platform::{GlobalActions, Layer, NoWorld, Platform, Renderer, WorldState};
pub use runtime::Core;
pub use runtime::audit::{
    BufferedCoreAudit, CoreAudit, CoreAuditEvent, CoreAuditEventBuilder, CoreAuditStage,
    NullCoreAudit,
};
pub use runtime::diagnostics::format_stack;
pub use runtime::driver::{TerminalPlatform, TerminalRenderer, TerminalSession};
pub use stack::ContextStack;
