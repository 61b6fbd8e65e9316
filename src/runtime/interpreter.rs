//! Tree-walking interpreter
//!
//! Evaluates a `Source` against its own scope chain. Operator semantics are
//! chosen from the runtime tags of the operands; the analyzer's annotations
//! are never consulted.

use std::cmp::Ordering;
use std::io::{self, Stdout, Write};

use num::{BigInt, Integer, One, Signed, ToPrimitive, Zero};

use crate::frontend::ast::{BinaryOp, Expr, ExprKind, Literal, Source, Stmt};
use crate::frontend::scope::{self, Callable, Scope};
use crate::types::{Type, Value};
use crate::utils::{Error, Result, Span};

/// How a statement finished
#[derive(Debug)]
enum Flow {
    Continue,
    /// A `RETURN` unwinding to the nearest call
    Return(Value),
}

/// Interpreter writing `print` output to `W`
pub struct Interpreter<W: Write = Stdout> {
    out: W,
}

impl Interpreter<Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(out: W) -> Self {
        Self { out }
    }

    /// Consume the interpreter, returning its output sink
    pub fn into_output(self) -> W {
        self.out
    }

    /// Run a program and return the value produced by `main()`
    pub fn run(&mut self, source: &Source) -> Result<Value> {
        log::debug!(
            "running {} globals, {} functions",
            source.globals.len(),
            source.functions.len()
        );
        let mut globals = Scope::root();

        for global in &source.globals {
            let value = match &global.value {
                Some(expr) => self.evaluate(expr, &globals, source)?,
                None => Value::Nil,
            };
            globals.declare_variable(&global.name, Type::Any, global.mutable, value, global.span)?;
        }

        for (index, function) in source.functions.iter().enumerate() {
            globals.declare_function(
                scope::Function {
                    name: function.name.clone(),
                    parameter_types: vec![Type::Any; function.parameters.len()],
                    return_type: Type::Any,
                    callable: Callable::Declared(index),
                },
                function.span,
            )?;
        }

        let entry = globals
            .lookup_function("main", 0, Span::dummy())
            .ok()
            .and_then(|main| match main.callable {
                Callable::Declared(index) => Some(index),
                Callable::Builtin(_) => None,
            })
            .ok_or_else(|| Error::EntryPoint {
                message: "no zero-argument function `main`".to_string(),
            })?;

        let result = self.call(entry, Vec::new(), &globals, source)?;
        self.out.flush()?;
        log::debug!("main returned {}", result);
        Ok(result)
    }

    /// Invoke a declared function in a frame whose parent is the global scope
    fn call(&mut self, index: usize, arguments: Vec<Value>, globals: &Scope<'_>, source: &Source) -> Result<Value> {
        let function = source.functions.get(index).ok_or_else(|| Error::UnresolvedName {
            name: format!("function #{}", index),
            span: Span::dummy(),
        })?;

        let mut frame = globals.child();
        for (name, argument) in function.parameters.iter().zip(arguments) {
            frame.declare_variable(name, Type::Any, true, argument, function.span)?;
        }
        log::trace!("calling {}/{}", function.name, function.parameters.len());

        match self.execute_block(&function.statements, &mut frame, source)? {
            Flow::Return(value) => Ok(value),
            Flow::Continue => Ok(Value::Nil),
        }
    }

    // ==================== Statements ====================

    fn execute_block(&mut self, stmts: &[Stmt], scope: &mut Scope<'_>, source: &Source) -> Result<Flow> {
        for stmt in stmts {
            if let Flow::Return(value) = self.execute(stmt, scope, source)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn execute_nested_block(&mut self, stmts: &[Stmt], scope: &Scope<'_>, source: &Source) -> Result<Flow> {
        let mut nested = scope.child();
        self.execute_block(stmts, &mut nested, source)
    }

    fn execute(&mut self, stmt: &Stmt, scope: &mut Scope<'_>, source: &Source) -> Result<Flow> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.evaluate(expr, scope, source)?;
            }

            Stmt::Declaration { name, value, span, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, scope, source)?,
                    None => Value::Nil,
                };
                scope.declare_variable(name, Type::Any, true, value, *span)?;
            }

            Stmt::Assignment { receiver, value, span } => {
                self.assign(receiver, value, *span, scope, source)?;
            }

            Stmt::If { condition, then_statements, else_statements, .. } => {
                let branch = if self.condition(condition, scope, source)? {
                    then_statements
                } else {
                    else_statements
                };
                return self.execute_nested_block(branch, scope, source);
            }

            Stmt::Switch { condition, cases, .. } => {
                let condition = self.evaluate(condition, scope, source)?;
                for case in cases {
                    let matched = match &case.value {
                        Some(value) => self.evaluate(value, scope, source)? == condition,
                        None => true,
                    };
                    if matched {
                        return self.execute_nested_block(&case.statements, scope, source);
                    }
                }
            }

            Stmt::While { condition, statements, .. } => {
                while self.condition(condition, scope, source)? {
                    if let Flow::Return(value) = self.execute_nested_block(statements, scope, source)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Return { value, .. } => {
                return Ok(Flow::Return(self.evaluate(value, scope, source)?));
            }
        }
        Ok(Flow::Continue)
    }

    fn assign(&mut self, receiver: &Expr, value: &Expr, span: Span, scope: &Scope<'_>, source: &Source) -> Result<()> {
        let ExprKind::Access { name, offset, .. } = &receiver.kind else {
            return Err(Error::invalid_form(
                "assignment target must be a variable or list element",
                span,
            ));
        };

        let offset = match offset {
            Some(offset) => Some(self.evaluate(offset, scope, source)?),
            None => None,
        };
        let value = self.evaluate(value, scope, source)?;

        let variable = scope.lookup_variable(name, receiver.span)?;
        if !variable.mutable {
            return Err(Error::invalid_form(
                format!("cannot assign to immutable variable `{}`", name),
                span,
            ));
        }

        match offset {
            None => variable.set_value(value),
            Some(offset) => variable.update(|current| match current {
                Value::List(items) => {
                    let index = list_index(&offset, items.len(), receiver.span)?;
                    items[index] = value;
                    Ok(())
                }
                other => Err(Error::mismatch("List", other.kind(), receiver.span)),
            })?,
        }
        Ok(())
    }

    fn condition(&mut self, condition: &Expr, scope: &Scope<'_>, source: &Source) -> Result<bool> {
        let value = self.evaluate(condition, scope, source)?;
        expect_boolean(&value, condition.span)
    }

    // ==================== Expressions ====================

    fn evaluate(&mut self, expr: &Expr, scope: &Scope<'_>, source: &Source) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(literal_value(literal)),

            ExprKind::Group(inner) => self.evaluate(inner, scope, source),

            ExprKind::Binary { op, left, right } => self.binary(*op, left, right, expr.span, scope, source),

            ExprKind::Access { name, offset, .. } => {
                let offset = match offset {
                    Some(offset) => Some(self.evaluate(offset, scope, source)?),
                    None => None,
                };
                let variable = scope.lookup_variable(name, expr.span)?;
                match offset {
                    None => Ok(variable.value()),
                    // Only the element is copied
                    Some(offset) => variable.with_value(|current| match current {
                        Value::List(items) => {
                            let index = list_index(&offset, items.len(), expr.span)?;
                            Ok(items[index].clone())
                        }
                        other => Err(Error::mismatch("List", other.kind(), expr.span)),
                    }),
                }
            }

            ExprKind::FunctionCall { name, arguments, .. } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument, scope, source))
                    .collect::<Result<Vec<_>>>()?;

                let callable = scope.lookup_function(name, arguments.len(), expr.span)?.callable;
                match callable {
                    Callable::Builtin(builtin) => builtin.invoke(&arguments, &mut self.out),
                    Callable::Declared(index) => self.call(index, arguments, scope.global(), source),
                }
            }

            ExprKind::List(elements) => elements
                .iter()
                .map(|element| self.evaluate(element, scope, source))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
        scope: &Scope<'_>,
        source: &Source,
    ) -> Result<Value> {
        let left_value = self.evaluate(left, scope, source)?;

        // Short-circuit: the right operand is evaluated at most once, and only
        // when it decides the result
        match op {
            BinaryOp::And | BinaryOp::Or => {
                let left_bool = expect_boolean(&left_value, left.span)?;
                if left_bool == (op == BinaryOp::Or) {
                    return Ok(Value::Boolean(left_bool));
                }
                let right_value = self.evaluate(right, scope, source)?;
                return expect_boolean(&right_value, right.span).map(Value::Boolean);
            }
            _ => {}
        }

        let right_value = self.evaluate(right, scope, source)?;
        binary_value(op, left_value, right_value, span)
    }
}

// ==================== Operators ====================

fn binary_value(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value> {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            let left = expect_boolean(&left, span)?;
            let right = expect_boolean(&right, span)?;
            Ok(Value::Boolean(if op == BinaryOp::And { left && right } else { left || right }))
        }

        BinaryOp::Lt | BinaryOp::Gt => {
            let ordering = left
                .compare(&right)
                .ok_or_else(|| Error::mismatch(left.kind(), right.kind(), span))?;
            let expected = if op == BinaryOp::Lt { Ordering::Less } else { Ordering::Greater };
            Ok(Value::Boolean(ordering == expected))
        }

        BinaryOp::Eq => Ok(Value::Boolean(left == right)),
        BinaryOp::Ne => Ok(Value::Boolean(left != right)),

        BinaryOp::Add if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", left, right)))
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, left, right, span),

        BinaryOp::Pow => match (&left, &right) {
            (Value::Integer(base), Value::Integer(exponent)) => {
                if exponent.is_negative() {
                    return Err(Error::NegativeExponent {
                        exponent: exponent.to_string(),
                        span,
                    });
                }
                Ok(Value::Integer(power(base, exponent)))
            }
            (Value::Integer(_), other) | (other, _) => Err(Error::mismatch(Type::Integer, other.kind(), span)),
        },
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => {
                    if b.is_zero() {
                        return Err(Error::DivisionByZero { span });
                    }
                    // Truncates toward zero
                    a / b
                }
            };
            Ok(Value::Integer(result))
        }
        (Value::Decimal(a), Value::Decimal(b)) => {
            let result = match op {
                BinaryOp::Add => a.add(&b),
                BinaryOp::Sub => a.sub(&b),
                BinaryOp::Mul => a.mul(&b),
                _ => a.div(&b).ok_or(Error::DivisionByZero { span })?,
            };
            Ok(Value::Decimal(result))
        }
        (left @ (Value::Integer(_) | Value::Decimal(_)), right) => Err(Error::mismatch(left.kind(), right.kind(), span)),
        (left, _) => Err(Error::mismatch("Integer or Decimal", left.kind(), span)),
    }
}

/// Exponentiation by squaring; `exponent` is non-negative
fn power(base: &BigInt, exponent: &BigInt) -> BigInt {
    let mut result = BigInt::one();
    let mut base = base.clone();
    let mut exponent = exponent.clone();
    while !exponent.is_zero() {
        if exponent.is_odd() {
            result *= &base;
        }
        exponent >>= 1_u32;
        if !exponent.is_zero() {
            base = &base * &base;
        }
    }
    result
}

fn expect_boolean(value: &Value, span: Span) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        other => Err(Error::mismatch(Type::Boolean, other.kind(), span)),
    }
}

fn list_index(offset: &Value, len: usize, span: Span) -> Result<usize> {
    match offset {
        Value::Integer(n) => n
            .to_usize()
            .filter(|index| *index < len)
            .ok_or_else(|| Error::IndexOutOfBounds {
                index: n.to_string(),
                len,
                span,
            }),
        other => Err(Error::mismatch(Type::Integer, other.kind(), span)),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Integer(n) => Value::Integer(n.clone()),
        Literal::Decimal(d) => Value::Decimal(d.clone()),
        Literal::Character(c) => Value::Character(*c),
        Literal::String(s) => Value::String(s.clone()),
    }
}
