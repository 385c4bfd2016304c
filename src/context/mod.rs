//! Node identity and handler tables for contexts and subcontexts.

mod core;

pub use self::core::{
    ContextId, ContextSpec, ContextType, DestroyFn, DrawFn, EventFlow, FramerateMode, IdleFn,
    KeyFn, KeyInput, MouseButton, MouseFn, MouseInput, Parent, ResumeFn,
};
