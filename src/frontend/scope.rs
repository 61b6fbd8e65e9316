//! Lexical scopes
//!
//! A scope owns two binding tables and borrows its parent. Both passes build
//! their own chain from a fresh root: children live on the Rust stack for
//! exactly as long as the block being processed, so a scope can never
//! outlive its block or leak into the other pass.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::stdlib::Builtin;
use crate::types::{Type, Value};
use crate::utils::{Error, Result, Span};

// ==================== Bindings ====================

/// A variable binding
#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
    value: RefCell<Value>,
}

impl Variable {
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn set_value(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }

    /// Inspect the stored value without copying it
    pub fn with_value<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Mutate the stored value in place
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.value.borrow_mut())
    }

    pub fn binding(&self) -> VariableBinding {
        VariableBinding {
            name: self.name.clone(),
            ty: self.ty.clone(),
            mutable: self.mutable,
        }
    }
}

/// What a function binding invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callable {
    Builtin(Builtin),
    /// Index of the definition in `Source::functions`
    Declared(usize),
}

/// A function binding, keyed in its scope by name and arity
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
    pub callable: Callable,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn builtin(builtin: Builtin) -> Self {
        Self {
            name: builtin.name().to_string(),
            parameter_types: builtin.parameter_types(),
            return_type: builtin.return_type(),
            callable: Callable::Builtin(builtin),
        }
    }

    pub fn binding(&self) -> FunctionBinding {
        FunctionBinding {
            name: self.name.clone(),
            parameter_types: self.parameter_types.clone(),
            return_type: self.return_type.clone(),
        }
    }
}

/// Snapshot of a variable binding, recorded on `Access` nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
}

/// Snapshot of a function binding, recorded on `FunctionCall` nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBinding {
    pub name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
}

// ==================== Scope ====================

pub struct Scope<'p> {
    parent: Option<&'p Scope<'p>>,
    variables: HashMap<String, Variable>,
    functions: HashMap<(String, usize), Function>,
}

impl Scope<'static> {
    /// A global scope seeded with the built-in functions
    pub fn root() -> Self {
        let mut scope = Scope {
            parent: None,
            variables: HashMap::new(),
            functions: HashMap::new(),
        };
        for builtin in Builtin::ALL {
            let function = Function::builtin(builtin);
            scope.functions.insert((function.name.clone(), function.arity()), function);
        }
        scope
    }
}

impl<'p> Scope<'p> {
    /// A new innermost scope whose lookups fall back to `self`
    pub fn child(&self) -> Scope<'_> {
        Scope {
            parent: Some(self),
            variables: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    /// The root of this scope's chain
    pub fn global(&self) -> &Scope<'_> {
        match self.parent {
            Some(parent) => parent.global(),
            None => self,
        }
    }

    /// Number of scopes between this one and the root
    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |parent| parent.depth() + 1)
    }

    /// Declare a variable in this scope. Shadowing an outer binding is fine,
    /// redeclaring one of this scope's own is not.
    pub fn declare_variable(
        &mut self,
        name: &str,
        ty: Type,
        mutable: bool,
        value: Value,
        span: Span,
    ) -> Result<&Variable> {
        if self.variables.contains_key(name) {
            return Err(Error::DuplicateBinding {
                name: name.to_string(),
                span,
            });
        }
        let variable = Variable {
            name: name.to_string(),
            ty,
            mutable,
            value: RefCell::new(value),
        };
        Ok(self.variables.entry(name.to_string()).or_insert(variable))
    }

    /// Declare a function in this scope under `(name, arity)`
    pub fn declare_function(&mut self, function: Function, span: Span) -> Result<&Function> {
        let key = (function.name.clone(), function.arity());
        if self.functions.contains_key(&key) {
            return Err(Error::DuplicateBinding {
                name: format!("{}/{}", key.0, key.1),
                span,
            });
        }
        Ok(self.functions.entry(key).or_insert(function))
    }

    /// Find the innermost variable called `name`
    pub fn lookup_variable(&self, name: &str, span: Span) -> Result<&Variable> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(variable) = current.variables.get(name) {
                return Ok(variable);
            }
            scope = current.parent;
        }
        Err(Error::UnresolvedName {
            name: name.to_string(),
            span,
        })
    }

    /// Find the innermost function called `name` taking `arity` arguments
    pub fn lookup_function(&self, name: &str, arity: usize, span: Span) -> Result<&Function> {
        let key = (name.to_string(), arity);
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(function) = current.functions.get(&key) {
                return Ok(function);
            }
            scope = current.parent;
        }
        Err(Error::UnresolvedName {
            name: format!("{}/{}", name, arity),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn declare(scope: &mut Scope<'_>, name: &str, ty: Type) -> Result<()> {
        scope
            .declare_variable(name, ty, true, Value::Nil, Span::dummy())
            .map(|_| ())
    }

    #[test]
    fn test_root_has_print() {
        let root = Scope::root();
        let print = root.lookup_function("print", 1, Span::dummy()).unwrap();
        assert_eq!(print.callable, Callable::Builtin(Builtin::Print));
        assert!(root.lookup_function("print", 2, Span::dummy()).is_err());
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let mut root = Scope::root();
        declare(&mut root, "x", Type::Integer).unwrap();
        assert!(matches!(
            declare(&mut root, "x", Type::String),
            Err(Error::DuplicateBinding { .. })
        ));
    }

    #[test]
    fn test_shadowing_and_lookup_chain() {
        let mut root = Scope::root();
        declare(&mut root, "x", Type::Integer).unwrap();
        declare(&mut root, "y", Type::Boolean).unwrap();

        let mut child = root.child();
        declare(&mut child, "x", Type::String).unwrap();
        assert_eq!(child.depth(), 1);
        assert_eq!(child.child().global().depth(), 0);
        assert_eq!(child.lookup_variable("x", Span::dummy()).unwrap().ty, Type::String);
        assert_eq!(child.lookup_variable("y", Span::dummy()).unwrap().ty, Type::Boolean);
        assert!(matches!(
            child.lookup_variable("z", Span::dummy()),
            Err(Error::UnresolvedName { .. })
        ));
        drop(child);

        assert_eq!(root.lookup_variable("x", Span::dummy()).unwrap().ty, Type::Integer);
    }

    #[test]
    fn test_child_bindings_discarded() {
        let root = Scope::root();
        {
            let mut child = root.child();
            declare(&mut child, "tmp", Type::Integer).unwrap();
        }
        assert!(root.lookup_variable("tmp", Span::dummy()).is_err());
    }

    #[test]
    fn test_functions_keyed_by_arity() {
        let mut root = Scope::root();
        let one = Function {
            name: "f".to_string(),
            parameter_types: vec![Type::Integer],
            return_type: Type::Integer,
            callable: Callable::Declared(0),
        };
        let two = Function {
            parameter_types: vec![Type::Integer, Type::Integer],
            callable: Callable::Declared(1),
            ..one.clone()
        };
        root.declare_function(one.clone(), Span::dummy()).unwrap();
        root.declare_function(two, Span::dummy()).unwrap();
        assert!(matches!(
            root.declare_function(one, Span::dummy()),
            Err(Error::DuplicateBinding { ref name, .. }) if name == "f/1"
        ));

        let child = root.child();
        let found = child.lookup_function("f", 2, Span::dummy()).unwrap();
        assert_eq!(found.callable, Callable::Declared(1));
    }

    #[test]
    fn test_assignment_through_shared_reference() {
        let mut root = Scope::root();
        declare(&mut root, "counter", Type::Integer).unwrap();
        let child = root.child();
        child
            .lookup_variable("counter", Span::dummy())
            .unwrap()
            .set_value(Value::from(3_i64));
        drop(child);
        assert_eq!(
            root.lookup_variable("counter", Span::dummy()).unwrap().value(),
            Value::from(3_i64)
        );
    }

    #[test]
    fn test_update_and_borrow_in_place() {
        let mut root = Scope::root();
        let items = Value::List(vec![Value::from(1_i64)]);
        root.declare_variable("xs", Type::list(Type::Integer), true, items, Span::dummy())
            .unwrap();
        let xs = root.lookup_variable("xs", Span::dummy()).unwrap();
        xs.update(|value| {
            if let Value::List(items) = value {
                items.push(Value::from(2_i64));
            }
        });
        let len = xs.with_value(|value| match value {
            Value::List(items) => items.len(),
            _ => 0,
        });
        assert_eq!(len, 2);
    }
}
