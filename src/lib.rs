//! TSQP - the query-language front end of a time-series database
//!
//! This crate turns a parsed SQL-like statement (an AST produced by an
//! external lexer/grammar) into a validated, strongly-typed logical operator
//! tree that downstream planning and execution consume. It performs no I/O
//! and touches no storage; it is a pure, synchronous library boundary.

pub mod query;
