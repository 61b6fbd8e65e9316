//! Type and value model

pub mod type_system;
pub mod value;

pub use type_system::{is_assignable, Type, TypeRegistry};
pub use value::{Decimal, Value};
