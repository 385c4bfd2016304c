//! Ordered node stacks used for the root context stack and for each
//! context's private subcontext stack.

mod core;

pub use self::core::ContextStack;
