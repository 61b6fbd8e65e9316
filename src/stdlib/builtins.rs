//! Built-in Functions Registry
//!
//! Host functions seeded into the root scope of both passes.

use std::io::Write;

use crate::types::{Type, Value};
use crate::utils::Result;

/// A host function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `print(Any) -> Nil`, writes the textual form of its argument and a newline
    Print,
}

impl Builtin {
    pub const ALL: [Builtin; 1] = [Builtin::Print];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Print => "print",
        }
    }

    pub fn parameter_types(&self) -> Vec<Type> {
        match self {
            Self::Print => vec![Type::Any],
        }
    }

    pub fn return_type(&self) -> Type {
        match self {
            Self::Print => Type::Nil,
        }
    }

    /// Run the host function. Arity has already been resolved by lookup.
    pub fn invoke(&self, args: &[Value], out: &mut dyn Write) -> Result<Value> {
        match self {
            Self::Print => {
                for arg in args {
                    writeln!(out, "{}", arg)?;
                }
                Ok(Value::Nil)
            }
        }
    }
}
