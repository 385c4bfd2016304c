//! Error types shared across the core.

mod types;

pub use types::{CoreError, FatalBug, Result};
