//! PLC
//!
//! Semantic core of a small imperative language: a static analyzer that
//! resolves names and types and annotates the syntax tree, and a
//! tree-walking interpreter that evaluates it.

use std::io::Write;

pub mod feedback;
pub mod frontend;
pub mod runtime;
pub mod stdlib;
pub mod types;
pub mod utils;

pub use frontend::ast::Source;
pub use frontend::semantic::Analyzer;
pub use runtime::Interpreter;
pub use types::{Type, TypeRegistry, Value};
pub use utils::{Error, Phase, Result, Span};

/// Analyze `source` with the built-in types, annotating it in place
pub fn analyze(source: &mut Source) -> Result<()> {
    Analyzer::new().analyze(source)
}

/// Interpret `source`, printing to stdout, and return `main`'s value
pub fn run(source: &Source) -> Result<Value> {
    Interpreter::new().run(source)
}

/// Analyze, then interpret only if analysis succeeded
pub fn check_and_run(source: &mut Source) -> Result<Value> {
    check_and_run_with(source, &mut Interpreter::new())
}

/// `check_and_run` with a caller-supplied interpreter (and so output sink)
pub fn check_and_run_with<W: Write>(source: &mut Source, interpreter: &mut Interpreter<W>) -> Result<Value> {
    analyze(source)?;
    interpreter.run(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{Expr, Function, Global, Stmt};
    use pretty_assertions::assert_eq;

    /// `VAL greeting = print("hi");`, which prints when evaluated
    fn printing_global() -> Global {
        Global::new(
            "greeting",
            false,
            None,
            Some(Expr::call("print", vec![Expr::literal("hi")])),
        )
    }

    fn check_and_capture(mut source: Source) -> (Result<Value>, String) {
        let mut interpreter = Interpreter::with_output(Vec::new());
        let result = check_and_run_with(&mut source, &mut interpreter);
        (result, String::from_utf8(interpreter.into_output()).unwrap())
    }

    #[test]
    fn test_analysis_failure_never_runs() {
        let (result, output) = check_and_capture(Source::new(vec![printing_global()], vec![]));
        assert!(matches!(result, Err(Error::EntryPoint { .. })));
        assert_eq!(output, "");

        let main = Function::new(
            "main",
            &[],
            Some("Integer"),
            vec![Stmt::return_value(Expr::literal("zero"))],
        );
        let (result, output) = check_and_capture(Source::new(vec![printing_global()], vec![main]));
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
        assert_eq!(output, "");
    }

    #[test]
    fn test_checked_program_runs() {
        let main = Function::new("main", &[], Some("Integer"), vec![Stmt::return_value(Expr::integer(7))]);
        let (result, output) = check_and_capture(Source::new(vec![printing_global()], vec![main]));
        assert_eq!(result, Ok(Value::from(7_i64)));
        assert_eq!(output, "hi\n");
    }

    #[test]
    fn test_analyze_annotates() {
        let mut source = Source::new(
            vec![],
            vec![Function::new("main", &[], Some("Integer"), vec![Stmt::return_value(Expr::integer(0))])],
        );
        analyze(&mut source).unwrap();
        assert!(source.functions[0].function.is_resolved());
    }
}
