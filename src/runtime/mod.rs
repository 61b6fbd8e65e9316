//! Runtime evaluation

pub mod interpreter;

pub use interpreter::Interpreter;
