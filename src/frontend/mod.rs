//! Frontend module - Syntax tree, Scopes, Semantic Analysis

pub mod ast;
pub mod scope;
pub mod semantic;
