//! Host library

pub mod builtins;

pub use builtins::Builtin;
