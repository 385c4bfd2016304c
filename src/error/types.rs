use thiserror::Error;

use crate::context::ContextId;

/// Unified result type for the context core.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Internal invariant violations. These are programmer errors, never the
/// product of user input, and the core makes no attempt to continue after one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalBug {
    #[error("context spec has no idle, key, click, or drag handler")]
    InvalidSpec,
    #[error("context {0} is not alive")]
    UnknownContext(ContextId),
    #[error("framerate mode can only be set on a root-level context")]
    FramerateOnSubcontext,
    #[error("context {0} is missing from the stack it was removed from")]
    StackMiss(ContextId),
    #[error("parent does not resolve to a context attached to the root")]
    MissingRoot,
    #[error("subcontext parent must be a live root-level context")]
    InvalidSubcontextParent,
}

impl FatalBug {
    /// Numeric code reported through the fatal diagnostic channel.
    pub fn code(&self) -> u16 {
        match self {
            FatalBug::InvalidSpec => 1,
            FatalBug::UnknownContext(_) => 2,
            FatalBug::FramerateOnSubcontext => 3,
            FatalBug::StackMiss(_) => 6,
            FatalBug::MissingRoot => 7,
            FatalBug::InvalidSubcontextParent => 8,
        }
    }
}

/// Errors surfaced by the context core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("fatal core bug {}: {0}", .0.code())]
    Fatal(FatalBug),
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn handler(message: impl Into<String>) -> Self {
        CoreError::Handler(message.into())
    }

    /// The fatal bug carried by this error, if it is one.
    pub fn fatal_bug(&self) -> Option<&FatalBug> {
        match self {
            CoreError::Fatal(bug) => Some(bug),
            _ => None,
        }
    }
}

impl From<FatalBug> for CoreError {
    fn from(bug: FatalBug) -> Self {
        CoreError::Fatal(bug)
    }
}
