//! Semantic Analysis for PLC
//!
//! Performs:
//! - Name resolution against a chain of lexical scopes
//! - Type checking and inference of declarations
//! - Annotation of the tree (expression types, resolved bindings)
//!
//! The pass is fail-fast: the first violation aborts it.

use crate::frontend::ast::{self, BinaryOp, Case, Expr, ExprKind, Literal, Source, Stmt};
use crate::frontend::scope::{self, Callable, FunctionBinding, Scope};
use crate::types::{Type, TypeRegistry, Value};
use crate::utils::{Error, Result, Span};

use num::ToPrimitive;

/// Semantic analyzer
pub struct Analyzer {
    registry: TypeRegistry,
    /// Declared return type of the function being checked
    return_type: Option<Type>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::with_registry(TypeRegistry::new())
    }

    /// Analyzer resolving type names through `registry` (e.g. with aliases)
    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self {
            registry,
            return_type: None,
        }
    }

    /// Analyze a program, annotating it in place
    pub fn analyze(&mut self, source: &mut Source) -> Result<()> {
        log::debug!(
            "analyzing {} globals, {} functions",
            source.globals.len(),
            source.functions.len()
        );
        self.check_entry_point(source)?;

        let mut scope = Scope::root();

        for global in &mut source.globals {
            self.check_global(global, &mut scope)?;
        }

        // Declare every signature before checking bodies, so functions may
        // call each other regardless of order.
        let mut signatures = Vec::with_capacity(source.functions.len());
        for (index, function) in source.functions.iter_mut().enumerate() {
            signatures.push(self.declare_function(index, function, &mut scope)?);
        }

        for (function, signature) in source.functions.iter_mut().zip(signatures) {
            self.check_function(function, &signature, &scope)?;
        }

        log::debug!("analysis passed");
        Ok(())
    }

    /// `main` must exist, take no arguments and return Integer
    fn check_entry_point(&self, source: &Source) -> Result<()> {
        let main = source
            .functions
            .iter()
            .find(|f| f.name == "main" && f.parameters.is_empty())
            .ok_or_else(|| Error::EntryPoint {
                message: "no zero-argument function `main`".to_string(),
            })?;

        let return_type = self
            .resolve_optional(main.return_type_name.as_deref(), main.span)
            .map_err(|_| Error::EntryPoint {
                message: format!(
                    "`main` must return Integer, found unknown type {}",
                    main.return_type_name.as_deref().unwrap_or_default()
                ),
            })?;
        if return_type != Type::Integer {
            return Err(Error::EntryPoint {
                message: format!("`main` must return Integer, found {}", return_type),
            });
        }
        Ok(())
    }

    fn resolve_optional(&self, name: Option<&str>, span: Span) -> Result<Type> {
        match name {
            Some(name) => self.registry.resolve(name, span),
            None => Ok(Type::Nil),
        }
    }

    // ==================== Declarations ====================

    fn check_global(&mut self, global: &mut ast::Global, scope: &mut Scope<'_>) -> Result<()> {
        if global.value.is_none() && !global.mutable {
            return Err(Error::invalid_form(
                format!("immutable global `{}` needs an initial value", global.name),
                global.span,
            ));
        }
        let ty = self.declared_type(
            global.type_name.as_deref(),
            global.value.as_mut(),
            &global.name,
            global.span,
            scope,
        )?;

        let variable = scope.declare_variable(&global.name, ty, global.mutable, Value::Nil, global.span)?;
        global.variable.resolve(variable.binding());
        Ok(())
    }

    /// Type of a declaration: the declared type, the initializer's type, or
    /// both when they are compatible
    fn declared_type(
        &mut self,
        type_name: Option<&str>,
        value: Option<&mut Expr>,
        name: &str,
        span: Span,
        scope: &Scope<'_>,
    ) -> Result<Type> {
        let declared = type_name
            .map(|type_name| self.registry.resolve(type_name, span))
            .transpose()?;

        let value = value
            .map(|expr| self.check_expr(expr, scope).map(|ty| (ty, expr.span)))
            .transpose()?;

        match (declared, value) {
            (Some(declared), Some((value_ty, value_span))) => {
                self.require_assignable(&declared, &value_ty, value_span)?;
                Ok(declared)
            }
            (Some(declared), None) => Ok(declared),
            (None, Some((value_ty, _))) => Ok(value_ty),
            (None, None) => Err(Error::invalid_form(
                format!("`{}` needs a type or an initial value", name),
                span,
            )),
        }
    }

    fn declare_function(
        &mut self,
        index: usize,
        function: &mut ast::Function,
        scope: &mut Scope<'_>,
    ) -> Result<FunctionBinding> {
        if function.parameters.len() != function.parameter_type_names.len() {
            return Err(Error::invalid_form(
                format!("every parameter of `{}` needs exactly one type", function.name),
                function.span,
            ));
        }
        let parameter_types = function
            .parameter_type_names
            .iter()
            .map(|name| self.registry.resolve(name, function.span))
            .collect::<Result<Vec<_>>>()?;
        let return_type = self.resolve_optional(function.return_type_name.as_deref(), function.span)?;

        let declared = scope.declare_function(
            scope::Function {
                name: function.name.clone(),
                parameter_types,
                return_type,
                callable: Callable::Declared(index),
            },
            function.span,
        )?;
        log::debug!("declared function {}/{}", declared.name, declared.arity());

        let binding = declared.binding();
        function.function.resolve(binding.clone());
        Ok(binding)
    }

    fn check_function(
        &mut self,
        function: &mut ast::Function,
        signature: &FunctionBinding,
        scope: &Scope<'_>,
    ) -> Result<()> {
        let mut body = scope.child();
        for (name, ty) in function.parameters.iter().zip(&signature.parameter_types) {
            body.declare_variable(name, ty.clone(), true, Value::Nil, function.span)?;
        }

        self.return_type = Some(signature.return_type.clone());
        let result = self.check_block(&mut function.statements, &mut body);
        self.return_type = None;
        result
    }

    // ==================== Statements ====================

    fn check_block(&mut self, stmts: &mut [Stmt], scope: &mut Scope<'_>) -> Result<()> {
        for stmt in stmts {
            self.check_stmt(stmt, scope)?;
        }
        Ok(())
    }

    /// Check statements in a fresh child scope that ends with them
    fn check_nested_block(&mut self, stmts: &mut [Stmt], scope: &Scope<'_>) -> Result<()> {
        let mut nested = scope.child();
        log::trace!("entering block scope at depth {}", nested.depth());
        self.check_block(stmts, &mut nested)
    }

    fn check_stmt(&mut self, stmt: &mut Stmt, scope: &mut Scope<'_>) -> Result<()> {
        match stmt {
            Stmt::Expression { expr, span } => {
                if !matches!(expr.kind, ExprKind::FunctionCall { .. }) {
                    return Err(Error::invalid_form(
                        "expression statement must be a function call",
                        *span,
                    ));
                }
                self.check_expr(expr, scope)?;
                Ok(())
            }

            Stmt::Declaration { name, type_name, value, span, variable } => {
                let ty = self.declared_type(type_name.as_deref(), value.as_mut(), name, *span, scope)?;
                let declared = scope.declare_variable(name, ty, true, Value::Nil, *span)?;
                variable.resolve(declared.binding());
                Ok(())
            }

            Stmt::Assignment { receiver, value, span } => {
                if !matches!(receiver.kind, ExprKind::Access { .. }) {
                    return Err(Error::invalid_form(
                        "assignment target must be a variable or list element",
                        *span,
                    ));
                }
                let receiver_ty = self.check_expr(receiver, scope)?;
                let value_ty = self.check_expr(value, scope)?;

                if let ExprKind::Access { name, variable, .. } = &receiver.kind {
                    if variable.get().map_or(false, |binding| !binding.mutable) {
                        return Err(Error::invalid_form(
                            format!("cannot assign to immutable variable `{}`", name),
                            *span,
                        ));
                    }
                }
                self.require_assignable(&receiver_ty, &value_ty, value.span)
            }

            Stmt::If { condition, then_statements, else_statements, span } => {
                self.check_condition(condition, scope)?;
                if then_statements.is_empty() {
                    return Err(Error::invalid_form("IF requires at least one statement", *span));
                }
                self.check_nested_block(then_statements, scope)?;
                self.check_nested_block(else_statements, scope)
            }

            Stmt::Switch { condition, cases, span } => {
                let condition_ty = self.check_expr(condition, scope)?;
                if cases.is_empty() {
                    return Err(Error::invalid_form("SWITCH requires a DEFAULT case", *span));
                }
                let last = cases.len() - 1;
                for (i, case) in cases.iter_mut().enumerate() {
                    self.check_case(case, i == last, &condition_ty, scope)?;
                }
                Ok(())
            }

            Stmt::While { condition, statements, .. } => {
                self.check_condition(condition, scope)?;
                self.check_nested_block(statements, scope)
            }

            Stmt::Return { value, span } => {
                let value_ty = self.check_expr(value, scope)?;
                let expected = self
                    .return_type
                    .as_ref()
                    .ok_or_else(|| Error::invalid_form("RETURN outside of a function", *span))?;
                // Exact match, not assignability
                if &value_ty != expected {
                    return Err(Error::mismatch(expected, value_ty, value.span));
                }
                Ok(())
            }
        }
    }

    fn check_condition(&mut self, condition: &mut Expr, scope: &Scope<'_>) -> Result<()> {
        let ty = self.check_expr(condition, scope)?;
        if ty != Type::Boolean {
            return Err(Error::mismatch(Type::Boolean, ty, condition.span));
        }
        Ok(())
    }

    fn check_case(&mut self, case: &mut Case, is_default: bool, condition_ty: &Type, scope: &Scope<'_>) -> Result<()> {
        match (&mut case.value, is_default) {
            (Some(_), true) => {
                return Err(Error::invalid_form("DEFAULT case cannot have a value", case.span));
            }
            (None, false) => {
                return Err(Error::invalid_form("only the last case may omit its value", case.span));
            }
            (Some(value), false) => {
                let value_ty = self.check_expr(value, scope)?;
                if &value_ty != condition_ty {
                    return Err(Error::mismatch(condition_ty, value_ty, value.span));
                }
            }
            (None, true) => {}
        }
        self.check_nested_block(&mut case.statements, scope)
    }

    // ==================== Expressions ====================

    /// Infer an expression's type and record it on the node
    fn check_expr(&mut self, expr: &mut Expr, scope: &Scope<'_>) -> Result<Type> {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::Literal(literal) => literal_type(literal, span)?,

            ExprKind::Group(inner) => {
                if !matches!(inner.kind, ExprKind::Binary { .. }) {
                    return Err(Error::invalid_form(
                        "parentheses may only wrap a binary expression",
                        span,
                    ));
                }
                self.check_expr(inner, scope)?
            }

            ExprKind::Binary { op, left, right } => {
                // Both sides are always checked before the operator
                let left_ty = self.check_expr(left, scope)?;
                let right_ty = self.check_expr(right, scope)?;
                self.check_binary_op(*op, &left_ty, &right_ty, span)?
            }

            ExprKind::Access { name, offset, variable } => match offset {
                None => {
                    let found = scope.lookup_variable(name, span)?;
                    variable.resolve(found.binding());
                    found.ty.clone()
                }
                Some(offset) => {
                    let offset_ty = self.check_expr(offset, scope)?;
                    if offset_ty != Type::Integer {
                        return Err(Error::mismatch(Type::Integer, offset_ty, offset.span));
                    }
                    let found = scope.lookup_variable(name, span)?;
                    let element = found
                        .ty
                        .element()
                        .cloned()
                        .ok_or_else(|| Error::mismatch("List", &found.ty, span))?;
                    variable.resolve(found.binding());
                    element
                }
            },

            ExprKind::FunctionCall { name, arguments, function } => {
                let binding = scope.lookup_function(name, arguments.len(), span)?.binding();
                for (argument, parameter_ty) in arguments.iter_mut().zip(&binding.parameter_types) {
                    let argument_ty = self.check_expr(argument, scope)?;
                    self.require_assignable(parameter_ty, &argument_ty, argument.span)?;
                }
                let return_type = binding.return_type.clone();
                function.resolve(binding);
                return_type
            }

            ExprKind::List(elements) => {
                let mut element_ty: Option<Type> = None;
                for element in elements.iter_mut() {
                    let ty = self.check_expr(element, scope)?;
                    if let Some(expected) = &element_ty {
                        if *expected != ty {
                            return Err(Error::mismatch(expected, ty, element.span));
                        }
                    } else {
                        element_ty = Some(ty);
                    }
                }
                let element_ty = element_ty
                    .ok_or_else(|| Error::invalid_form("list literal needs at least one element", span))?;
                Type::list(element_ty)
            }
        };

        expr.ty.resolve(ty.clone());
        Ok(ty)
    }

    /// Check binary operation and return result type
    fn check_binary_op(&self, op: BinaryOp, left: &Type, right: &Type, span: Span) -> Result<Type> {
        match op {
            BinaryOp::And | BinaryOp::Or => {
                for operand in [left, right] {
                    if *operand != Type::Boolean {
                        return Err(Error::mismatch(Type::Boolean, operand, span));
                    }
                }
                Ok(Type::Boolean)
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Eq | BinaryOp::Ne => {
                self.require_assignable(&Type::Comparable, left, span)?;
                self.require_assignable(&Type::Comparable, right, span)?;
                self.require_assignable(left, right, span)?;
                Ok(Type::Boolean)
            }
            BinaryOp::Add if *left == Type::String || *right == Type::String => Ok(Type::String),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                if !left.is_numeric() {
                    return Err(Error::mismatch("Integer or Decimal", left, span));
                }
                if right != left {
                    return Err(Error::mismatch(left, right, span));
                }
                Ok(left.clone())
            }
            BinaryOp::Pow => {
                for operand in [left, right] {
                    if *operand != Type::Integer {
                        return Err(Error::mismatch(Type::Integer, operand, span));
                    }
                }
                Ok(Type::Integer)
            }
        }
    }

    fn require_assignable(&self, target: &Type, source: &Type, span: Span) -> Result<()> {
        if target.accepts(source) {
            Ok(())
        } else {
            Err(Error::mismatch(target, source, span))
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of a literal, rejecting values outside the native ranges
fn literal_type(literal: &Literal, span: Span) -> Result<Type> {
    let ty = match literal {
        Literal::Nil => Type::Nil,
        Literal::Boolean(_) => Type::Boolean,
        Literal::Character(_) => Type::Character,
        Literal::String(_) => Type::String,
        Literal::Integer(value) => {
            if value.to_i32().is_none() {
                return Err(Error::LiteralRange {
                    literal: value.to_string(),
                    span,
                });
            }
            Type::Integer
        }
        Literal::Decimal(value) => {
            if value.to_f64().is_infinite() {
                return Err(Error::LiteralRange {
                    literal: value.to_string(),
                    span,
                });
            }
            Type::Decimal
        }
    };
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{Function, Global};
    use crate::types::Decimal;
    use pretty_assertions::assert_eq;

    fn main_fn(statements: Vec<Stmt>) -> Function {
        Function::new("main", &[], Some("Integer"), statements)
    }

    fn analyze(source: &mut Source) -> Result<()> {
        Analyzer::new().analyze(source)
    }

    /// Analyze `main` wrapping `statements` followed by `RETURN 0;`
    fn analyze_body(mut statements: Vec<Stmt>) -> Result<Source> {
        statements.push(Stmt::return_value(Expr::integer(0)));
        let mut source = Source::new(vec![], vec![main_fn(statements)]);
        analyze(&mut source)?;
        Ok(source)
    }

    fn print(expr: Expr) -> Stmt {
        Stmt::expression(Expr::call("print", vec![expr]))
    }

    fn decimal(text: &str) -> Expr {
        Expr::literal(text.parse::<Decimal>().unwrap())
    }

    fn return_expr(source: &Source, function: usize) -> &Expr {
        match source.functions[function].statements.last() {
            Some(Stmt::Return { value, .. }) => value,
            other => panic!("expected a return, found {:?}", other),
        }
    }

    // ==================== Entry Point ====================

    #[test]
    fn test_missing_main() {
        let mut source = Source::new(vec![], vec![]);
        assert!(matches!(analyze(&mut source), Err(Error::EntryPoint { .. })));
    }

    #[test]
    fn test_main_must_return_integer() {
        let mut source = Source::new(vec![], vec![Function::new("main", &[], None, vec![])]);
        assert!(matches!(analyze(&mut source), Err(Error::EntryPoint { .. })));

        let mut source = Source::new(
            vec![],
            vec![Function::new("main", &[("x", "Integer")], Some("Integer"), vec![])],
        );
        assert!(matches!(analyze(&mut source), Err(Error::EntryPoint { .. })));

        let mut source = Source::new(vec![], vec![Function::new("main", &[], Some("Foo"), vec![])]);
        assert!(matches!(
            analyze(&mut source),
            Err(Error::EntryPoint { ref message }) if message.contains("Foo")
        ));
    }

    #[test]
    fn test_global_inferred_and_annotated() {
        let mut source = Source::new(
            vec![Global::new("x", false, None, Some(Expr::integer(5)))],
            vec![main_fn(vec![Stmt::return_value(Expr::access("x"))])],
        );
        analyze(&mut source).unwrap();

        let binding = source.globals[0].variable.get().unwrap();
        assert_eq!(binding.ty, Type::Integer);
        assert!(!binding.mutable);

        let value = return_expr(&source, 0);
        assert_eq!(value.resolved_type(), Some(&Type::Integer));
        let ExprKind::Access { variable, .. } = &value.kind else {
            panic!("expected an access");
        };
        assert_eq!(variable.get().map(|b| b.name.as_str()), Some("x"));
        assert!(source.functions[0].function.is_resolved());
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let mut source = Source::new(
            vec![Global::new("total", true, Some("Decimal"), None)],
            vec![main_fn(vec![
                Stmt::assignment(Expr::access("total"), decimal("1.5")),
                print(Expr::binary(BinaryOp::Add, Expr::literal("n="), Expr::access("total"))),
                Stmt::return_value(Expr::integer(0)),
            ])],
        );
        analyze(&mut source).unwrap();
        let first = format!("{:?}", source);
        analyze(&mut source).unwrap();
        assert_eq!(format!("{:?}", source), first);
    }

    #[test]
    fn test_global_checks() {
        let mut source = Source::new(
            vec![Global::new("x", true, Some("Integer"), Some(Expr::literal("no")))],
            vec![main_fn(vec![Stmt::return_value(Expr::integer(0))])],
        );
        assert!(matches!(analyze(&mut source), Err(Error::TypeMismatch { .. })));

        let mut source = Source::new(
            vec![Global::new("x", false, Some("Integer"), None)],
            vec![main_fn(vec![Stmt::return_value(Expr::integer(0))])],
        );
        assert!(matches!(analyze(&mut source), Err(Error::InvalidStatementForm { .. })));

        let mut source = Source::new(
            vec![Global::new("x", true, Some("Comparable"), Some(Expr::literal('c')))],
            vec![main_fn(vec![Stmt::return_value(Expr::integer(0))])],
        );
        analyze(&mut source).unwrap();
        assert_eq!(source.globals[0].variable.get().unwrap().ty, Type::Comparable);
    }

    #[test]
    fn test_unknown_type_name() {
        let result = analyze_body(vec![Stmt::declaration("x", Some("Float"), None)]);
        assert!(matches!(result, Err(Error::UnknownType { ref name, .. }) if name == "Float"));
    }

    #[test]
    fn test_registry_aliases() {
        let mut registry = TypeRegistry::new();
        registry.register("Text", Type::String);
        let mut source = Source::new(
            vec![],
            vec![main_fn(vec![
                Stmt::declaration("s", Some("Text"), Some(Expr::literal("hi"))),
                Stmt::return_value(Expr::integer(0)),
            ])],
        );
        Analyzer::with_registry(registry).analyze(&mut source).unwrap();
    }

    // ==================== Literals ====================

    #[test]
    fn test_integer_literal_range() {
        assert!(analyze_body(vec![Stmt::declaration("x", None, Some(Expr::integer(i32::MAX as i64)))]).is_ok());
        assert!(analyze_body(vec![Stmt::declaration("x", None, Some(Expr::integer(i32::MIN as i64)))]).is_ok());
        let result = analyze_body(vec![Stmt::declaration("x", None, Some(Expr::integer(i32::MAX as i64 + 1)))]);
        assert!(matches!(result, Err(Error::LiteralRange { .. })));
    }

    #[test]
    fn test_decimal_literal_range() {
        let huge = format!("1{}.0", "0".repeat(400));
        let result = analyze_body(vec![Stmt::declaration("x", None, Some(decimal(&huge)))]);
        assert!(matches!(result, Err(Error::LiteralRange { .. })));
    }

    // ==================== Statements ====================

    #[test]
    fn test_expression_statement_must_be_call() {
        let result = analyze_body(vec![Stmt::expression(Expr::integer(1))]);
        assert!(matches!(result, Err(Error::InvalidStatementForm { .. })));
    }

    #[test]
    fn test_declaration_forms() {
        let result = analyze_body(vec![Stmt::declaration("x", None, None)]);
        assert!(matches!(result, Err(Error::InvalidStatementForm { .. })));

        let result = analyze_body(vec![Stmt::declaration("x", Some("Integer"), Some(decimal("1.0")))]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));

        let source = analyze_body(vec![Stmt::declaration("x", Some("Any"), Some(decimal("1.0")))]).unwrap();
        let Stmt::Declaration { variable, .. } = &source.functions[0].statements[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(variable.get().unwrap().ty, Type::Any);

        let result = analyze_body(vec![
            Stmt::declaration("x", Some("Integer"), None),
            Stmt::declaration("x", Some("Integer"), None),
        ]);
        assert!(matches!(result, Err(Error::DuplicateBinding { .. })));
    }

    #[test]
    fn test_assignment_rules() {
        let result = analyze_body(vec![Stmt::assignment(Expr::integer(1), Expr::integer(2))]);
        assert!(matches!(result, Err(Error::InvalidStatementForm { .. })));

        let result = analyze_body(vec![
            Stmt::declaration("x", Some("Integer"), None),
            Stmt::assignment(Expr::access("x"), Expr::literal("text")),
        ]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));

        let result = analyze_body(vec![
            Stmt::declaration("x", Some("Comparable"), None),
            Stmt::assignment(Expr::access("x"), Expr::literal("text")),
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_assignment_to_immutable_global() {
        let mut source = Source::new(
            vec![Global::new("limit", false, None, Some(Expr::integer(10)))],
            vec![main_fn(vec![
                Stmt::assignment(Expr::access("limit"), Expr::integer(11)),
                Stmt::return_value(Expr::integer(0)),
            ])],
        );
        assert!(matches!(analyze(&mut source), Err(Error::InvalidStatementForm { .. })));
    }

    #[test]
    fn test_if_rules() {
        let result = analyze_body(vec![Stmt::if_else(Expr::integer(1), vec![print(Expr::integer(1))], vec![])]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));

        let result = analyze_body(vec![Stmt::if_else(Expr::literal(true), vec![], vec![print(Expr::integer(1))])]);
        assert!(matches!(result, Err(Error::InvalidStatementForm { .. })));
    }

    #[test]
    fn test_branch_bindings_do_not_escape() {
        let result = analyze_body(vec![
            Stmt::if_else(
                Expr::literal(true),
                vec![
                    Stmt::declaration("inner", None, Some(Expr::integer(1))),
                    print(Expr::access("inner")),
                ],
                vec![],
            ),
            print(Expr::access("inner")),
        ]);
        assert!(matches!(result, Err(Error::UnresolvedName { ref name, .. }) if name == "inner"));
    }

    #[test]
    fn test_switch_rules() {
        let valid = analyze_body(vec![Stmt::switch(
            Expr::literal('a'),
            vec![
                Case::new(Expr::literal('a'), vec![print(Expr::literal("first"))]),
                Case::default_case(vec![print(Expr::literal("other"))]),
            ],
        )]);
        assert!(valid.is_ok());

        let result = analyze_body(vec![Stmt::switch(
            Expr::literal('a'),
            vec![
                Case::new(Expr::literal("a"), vec![]),
                Case::default_case(vec![]),
            ],
        )]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));

        let result = analyze_body(vec![Stmt::switch(
            Expr::integer(1),
            vec![Case::new(Expr::integer(1), vec![])],
        )]);
        assert!(matches!(result, Err(Error::InvalidStatementForm { .. })));
    }

    #[test]
    fn test_while_condition() {
        let result = analyze_body(vec![Stmt::while_loop(Expr::literal("yes"), vec![])]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_return_requires_exact_type() {
        let mut source = Source::new(vec![], vec![main_fn(vec![Stmt::return_value(decimal("1.0"))])]);
        assert!(matches!(analyze(&mut source), Err(Error::TypeMismatch { .. })));

        // Assignable is not enough
        let mut source = Source::new(
            vec![],
            vec![
                Function::new("f", &[], Some("Comparable"), vec![Stmt::return_value(Expr::integer(1))]),
                main_fn(vec![Stmt::return_value(Expr::integer(0))]),
            ],
        );
        assert!(matches!(analyze(&mut source), Err(Error::TypeMismatch { .. })));
    }

    // ==================== Expressions ====================

    fn binary_type(op: BinaryOp, left: Expr, right: Expr) -> Result<Type> {
        let source = analyze_body(vec![Stmt::declaration("r", None, Some(Expr::binary(op, left, right)))])?;
        let Stmt::Declaration { variable, .. } = &source.functions[0].statements[0] else {
            panic!("expected a declaration");
        };
        Ok(variable.get().unwrap().ty.clone())
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(binary_type(BinaryOp::And, Expr::literal(true), Expr::literal(false)), Ok(Type::Boolean));
        assert!(binary_type(BinaryOp::Or, Expr::literal(true), Expr::integer(0)).is_err());
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(binary_type(BinaryOp::Lt, Expr::integer(1), Expr::integer(2)), Ok(Type::Boolean));
        assert_eq!(binary_type(BinaryOp::Eq, Expr::literal("a"), Expr::literal("b")), Ok(Type::Boolean));
        assert!(binary_type(BinaryOp::Eq, Expr::literal(true), Expr::literal(true)).is_err());
        assert!(binary_type(BinaryOp::Gt, Expr::integer(1), decimal("1.0")).is_err());
        assert!(binary_type(BinaryOp::Ne, Expr::nil(), Expr::nil()).is_err());
    }

    #[test]
    fn test_arithmetic_operators() {
        assert_eq!(binary_type(BinaryOp::Add, Expr::literal("a"), Expr::integer(1)), Ok(Type::String));
        assert_eq!(binary_type(BinaryOp::Add, Expr::literal(true), Expr::literal("b")), Ok(Type::String));
        assert_eq!(binary_type(BinaryOp::Sub, decimal("1.0"), decimal("2.5")), Ok(Type::Decimal));
        assert!(matches!(
            binary_type(BinaryOp::Add, Expr::integer(1), decimal("1.0")),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(binary_type(BinaryOp::Mul, Expr::literal('a'), Expr::literal('b')).is_err());
        assert_eq!(binary_type(BinaryOp::Pow, Expr::integer(2), Expr::integer(3)), Ok(Type::Integer));
        assert!(binary_type(BinaryOp::Pow, decimal("2.0"), Expr::integer(3)).is_err());
    }

    #[test]
    fn test_group_must_wrap_binary() {
        let result = analyze_body(vec![Stmt::declaration("x", None, Some(Expr::group(Expr::integer(1))))]);
        assert!(matches!(result, Err(Error::InvalidStatementForm { .. })));

        let grouped = Expr::group(Expr::binary(BinaryOp::Add, Expr::integer(1), Expr::integer(2)));
        let source = analyze_body(vec![Stmt::declaration("x", None, Some(grouped))]).unwrap();
        let Stmt::Declaration { value: Some(value), .. } = &source.functions[0].statements[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(value.resolved_type(), Some(&Type::Integer));
    }

    #[test]
    fn test_calls_resolve_by_arity() {
        let mut source = Source::new(
            vec![],
            vec![
                Function::new("f", &[("a", "Integer")], Some("Integer"), vec![Stmt::return_value(Expr::access("a"))]),
                Function::new(
                    "f",
                    &[("a", "String"), ("b", "String")],
                    Some("String"),
                    vec![Stmt::return_value(Expr::access("b"))],
                ),
                main_fn(vec![
                    print(Expr::call("f", vec![Expr::literal("x"), Expr::literal("y")])),
                    Stmt::return_value(Expr::call("f", vec![Expr::integer(1)])),
                ]),
            ],
        );
        analyze(&mut source).unwrap();

        let ExprKind::FunctionCall { function, .. } = &return_expr(&source, 2).kind else {
            panic!("expected a call");
        };
        assert_eq!(function.get().unwrap().parameter_types, vec![Type::Integer]);

        let result = analyze_body(vec![print(Expr::call("f", vec![]))]);
        assert!(matches!(result, Err(Error::UnresolvedName { .. })));
    }

    #[test]
    fn test_argument_types() {
        let mut source = Source::new(
            vec![],
            vec![
                Function::new("id", &[("a", "Integer")], Some("Integer"), vec![Stmt::return_value(Expr::access("a"))]),
                main_fn(vec![Stmt::return_value(Expr::call("id", vec![Expr::literal("one")]))]),
            ],
        );
        assert!(matches!(analyze(&mut source), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_mutual_recursion_and_global_order() {
        let is_even = Function::new(
            "isEven",
            &[("n", "Integer")],
            Some("Boolean"),
            vec![Stmt::return_value(Expr::call("isOdd", vec![Expr::access("n")]))],
        );
        let is_odd = Function::new(
            "isOdd",
            &[("n", "Integer")],
            Some("Boolean"),
            vec![Stmt::return_value(Expr::call("isEven", vec![Expr::access("n")]))],
        );
        let mut source = Source::new(
            vec![],
            vec![is_even.clone(), is_odd.clone(), main_fn(vec![Stmt::return_value(Expr::integer(0))])],
        );
        assert!(analyze(&mut source).is_ok());

        // Globals are checked before any function exists
        let mut source = Source::new(
            vec![Global::new("flag", true, None, Some(Expr::call("isEven", vec![Expr::integer(2)])))],
            vec![is_even, is_odd, main_fn(vec![Stmt::return_value(Expr::integer(0))])],
        );
        assert!(matches!(analyze(&mut source), Err(Error::UnresolvedName { .. })));
    }

    #[test]
    fn test_duplicate_function() {
        let mut source = Source::new(
            vec![],
            vec![
                main_fn(vec![Stmt::return_value(Expr::integer(0))]),
                main_fn(vec![Stmt::return_value(Expr::integer(1))]),
            ],
        );
        assert!(matches!(analyze(&mut source), Err(Error::DuplicateBinding { .. })));
    }

    #[test]
    fn test_lists() {
        let source = analyze_body(vec![
            Stmt::declaration("xs", None, Some(Expr::list(vec![Expr::integer(1), Expr::integer(2)]))),
            Stmt::assignment(Expr::index("xs", Expr::integer(0)), Expr::integer(5)),
            print(Expr::index("xs", Expr::integer(1))),
        ])
        .unwrap();
        let Stmt::Declaration { variable, .. } = &source.functions[0].statements[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(variable.get().unwrap().ty, Type::list(Type::Integer));

        let result = analyze_body(vec![Stmt::declaration(
            "xs",
            None,
            Some(Expr::list(vec![Expr::integer(1), Expr::literal("two")])),
        )]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));

        let result = analyze_body(vec![Stmt::declaration("xs", None, Some(Expr::list(vec![])))]);
        assert!(matches!(result, Err(Error::InvalidStatementForm { .. })));

        let result = analyze_body(vec![
            Stmt::declaration("n", None, Some(Expr::integer(1))),
            print(Expr::index("n", Expr::integer(0))),
        ]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));

        let result = analyze_body(vec![
            Stmt::declaration("xs", Some("List<Integer>"), Some(Expr::list(vec![Expr::integer(1)]))),
            print(Expr::index("xs", decimal("0.0"))),
        ]);
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }
}
