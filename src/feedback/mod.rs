//! Structured Feedback Module
//!
//! Machine-readable output for tooling:
//! - JSON error reports with fix suggestions
//! - Per-run outcome (diagnostics, exit status)

use serde::{Deserialize, Serialize};

use crate::utils::{Error, Phase};

// ==================== Structured Error Report ====================

/// A structured error report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    pub severity: Severity,

    /// Pass that raised the error
    pub phase: ReportPhase,

    /// Human-readable message
    pub message: String,

    pub location: Option<Location>,

    /// Suggested fixes, most confident first
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPhase {
    Analysis,
    Runtime,
}

impl From<Phase> for ReportPhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Analysis => Self::Analysis,
            Phase::Runtime => Self::Runtime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub message: String,

    /// Confidence in this suggestion (0.0 - 1.0)
    pub confidence: f64,
}

impl Suggestion {
    fn new(message: impl Into<String>, confidence: f64) -> Self {
        Self {
            message: message.into(),
            confidence,
        }
    }
}

// ==================== Run Feedback ====================

/// Outcome of checking or running one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFeedback {
    pub success: bool,

    pub source_file: String,

    pub diagnostics: Vec<ErrorReport>,

    /// Exit status produced by `main`, when the program ran to completion
    pub exit_code: Option<i32>,
}

impl RunFeedback {
    pub fn success(source_file: &str, exit_code: Option<i32>) -> Self {
        Self {
            success: true,
            source_file: source_file.to_string(),
            diagnostics: vec![],
            exit_code,
        }
    }

    pub fn failure(source_file: &str, error: &Error) -> Self {
        Self {
            success: false,
            source_file: source_file.to_string(),
            diagnostics: vec![ErrorReport::from_error(error, source_file)],
            exit_code: None,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ==================== Error Conversion ====================

impl ErrorReport {
    /// Create an error report from an analyzer or interpreter error
    pub fn from_error(error: &Error, file_name: &str) -> Self {
        let location = error.span().filter(|span| !span.is_dummy()).map(|span| Location {
            file: file_name.to_string(),
            start: span.start,
            end: span.end,
        });

        let mut report = Self {
            code: error.code().to_string(),
            severity: Severity::Error,
            phase: error.phase().into(),
            message: error.to_string(),
            location,
            suggestions: suggestions_for(error),
        };
        report.sort_suggestions();
        report
    }

    /// Sort suggestions by confidence (highest first)
    pub fn sort_suggestions(&mut self) {
        self.suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

fn suggestions_for(error: &Error) -> Vec<Suggestion> {
    match error {
        Error::EntryPoint { .. } => vec![Suggestion::new(
            "Declare `FUN main(): Integer DO ... END` taking no arguments",
            0.9,
        )],

        Error::UnknownType { name, .. } => {
            let mut suggestions = vec![Suggestion::new(
                "Use one of Nil, Boolean, Integer, Decimal, Character, String, Any, Comparable",
                0.6,
            )];
            if let Some(known) = case_insensitive_builtin(name) {
                suggestions.push(Suggestion::new(format!("Did you mean `{}`?", known), 0.9));
            }
            suggestions
        }

        Error::UnresolvedName { name, .. } => vec![
            Suggestion::new(format!("Declare `{}` before using it", name), 0.7),
            Suggestion::new(
                "Bindings declared inside IF, SWITCH and WHILE bodies end with that body",
                0.5,
            ),
        ],

        Error::DuplicateBinding { name, .. } => {
            vec![Suggestion::new(format!("Rename one of the `{}` declarations", name), 0.8)]
        }

        Error::TypeMismatch { expected, got, .. } => {
            let mut suggestions = vec![Suggestion::new(
                format!("Produce a value of type {} instead of {}", expected, got),
                0.6,
            )];
            if (expected == "Integer" && got == "Decimal") || (expected == "Decimal" && got == "Integer") {
                suggestions.push(Suggestion::new(
                    "Integer and Decimal never mix; write both operands in the same kind",
                    0.9,
                ));
            }
            if expected == "String" || got == "String" {
                suggestions.push(Suggestion::new(
                    "`+` with a String operand concatenates; other operators do not",
                    0.4,
                ));
            }
            suggestions
        }

        Error::LiteralRange { .. } => vec![Suggestion::new(
            "Integer literals must fit in 32 bits and decimal literals in a double",
            0.8,
        )],

        Error::InvalidStatementForm { .. } => vec![Suggestion::new(
            "Only function calls may stand alone and only variables or list elements may be assigned",
            0.5,
        )],

        Error::DivisionByZero { .. } => vec![Suggestion::new("Guard the division with an IF on the divisor", 0.8)],

        Error::NegativeExponent { .. } => {
            vec![Suggestion::new("`^` only accepts non-negative Integer exponents", 0.9)]
        }

        Error::IndexOutOfBounds { len, .. } => vec![Suggestion::new(
            format!("Valid indices for this list are 0 to {}", len.saturating_sub(1)),
            0.8,
        )],

        Error::Io(_) => vec![],
    }
}

fn case_insensitive_builtin(name: &str) -> Option<&'static str> {
    const NAMES: [&str; 8] = [
        "Nil",
        "Boolean",
        "Integer",
        "Decimal",
        "Character",
        "String",
        "Any",
        "Comparable",
    ];
    NAMES
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(name) && *known != name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Span;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_from_static_error() {
        let error = Error::UnknownType {
            name: "integer".to_string(),
            span: Span::new(4, 11),
        };
        let report = ErrorReport::from_error(&error, "prog.json");
        assert_eq!(report.code, "E0002");
        assert_eq!(report.severity, Severity::Error);
        assert_eq!(report.phase, ReportPhase::Analysis);
        assert_eq!(
            report.location,
            Some(Location {
                file: "prog.json".to_string(),
                start: 4,
                end: 11,
            })
        );
        assert_eq!(report.suggestions[0].message, "Did you mean `Integer`?");
    }

    #[test]
    fn test_report_without_location() {
        let error = Error::DivisionByZero { span: Span::dummy() };
        let report = ErrorReport::from_error(&error, "prog.json");
        assert_eq!(report.phase, ReportPhase::Runtime);
        assert_eq!(report.location, None);
    }

    #[test]
    fn test_feedback_json() {
        let error = Error::EntryPoint {
            message: "no zero-argument function `main`".to_string(),
        };
        let json = RunFeedback::failure("prog.json", &error).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["diagnostics"][0]["code"], "E0001");
        assert_eq!(value["diagnostics"][0]["phase"], "analysis");

        let ok: RunFeedback = serde_json::from_str(&RunFeedback::success("prog.json", Some(3)).to_json()).unwrap();
        assert_eq!(ok.exit_code, Some(3));
    }
}
