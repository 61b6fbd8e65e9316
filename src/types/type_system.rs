//! Type System for PLC

use std::collections::HashMap;
use std::fmt;

use crate::utils::{Error, Result, Span};

/// Static type of an expression or binding.
///
/// Types are compared by name: two types are the same type exactly when
/// they print the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Nil,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
    /// Supertype of every type
    Any,
    /// Supertype of Integer, Decimal, Character and String
    Comparable,
    /// Homogeneous list, spelled `List<T>`
    List(Box<Type>),
}

impl Type {
    /// Built-in names, in the order they are seeded into a registry
    pub const BUILTINS: [Type; 8] = [
        Type::Nil,
        Type::Boolean,
        Type::Integer,
        Type::Decimal,
        Type::Character,
        Type::String,
        Type::Any,
        Type::Comparable,
    ];

    pub fn list(elem: Type) -> Self {
        Self::List(Box::new(elem))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }

    /// Types with a native ordering that `Comparable` accepts
    pub fn is_comparable(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Character | Self::String)
    }

    /// Element type of a list type
    pub fn element(&self) -> Option<&Type> {
        match self {
            Self::List(elem) => Some(elem),
            _ => None,
        }
    }

    /// Can a value of type `source` be stored where `self` is expected?
    pub fn accepts(&self, source: &Type) -> bool {
        is_assignable(self, source)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Integer => write!(f, "Integer"),
            Self::Decimal => write!(f, "Decimal"),
            Self::Character => write!(f, "Character"),
            Self::String => write!(f, "String"),
            Self::Any => write!(f, "Any"),
            Self::Comparable => write!(f, "Comparable"),
            Self::List(elem) => write!(f, "List<{}>", elem),
        }
    }
}

/// The assignability relation.
///
/// True iff the types are identical, the target is `Any`, or the target is
/// `Comparable` and the source has a native ordering. The relation is one
/// hop only: it is neither symmetric nor transitive.
pub fn is_assignable(target: &Type, source: &Type) -> bool {
    if target == source {
        return true;
    }
    match target {
        Type::Any => true,
        Type::Comparable => source.is_comparable(),
        _ => false,
    }
}

/// Resolves type names to types.
///
/// Seeded with the built-in names; callers may register aliases before
/// analysis starts. Each analyzer owns its registry, so nothing here is
/// global state.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Type>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let types = Type::BUILTINS
            .iter()
            .map(|ty| (ty.to_string(), ty.clone()))
            .collect();
        Self { types }
    }

    /// Register `name` as another name for `ty`
    pub fn register(&mut self, name: impl Into<String>, ty: Type) {
        let name = name.into();
        log::debug!("registering type alias {} = {}", name, ty);
        self.types.insert(name, ty);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Resolve a type name, failing with `UnknownType`
    pub fn resolve(&self, name: &str, span: Span) -> Result<Type> {
        self.lookup(name).ok_or_else(|| Error::UnknownType {
            name: name.to_string(),
            span,
        })
    }

    fn lookup(&self, name: &str) -> Option<Type> {
        let name = name.trim();
        if let Some(ty) = self.types.get(name) {
            return Some(ty.clone());
        }
        // List<T>
        let inner = name.strip_prefix("List<")?.strip_suffix('>')?;
        self.lookup(inner).map(Type::list)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
