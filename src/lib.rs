//! A runtime grammar engine: build grammars programmatically, tokenize text, and parse it into
//! typed syntax trees using a hybrid of Packrat (PEG-style memoized choice) and Pratt
//! (operator-precedence) parselets.
//!
//! # Design
//!
//! Most parsing libraries ask a host to either hand-write a recursive-descent parser or author a
//! grammar in a separate DSL compiled ahead of time into tables. This crate takes a third path:
//! grammars are ordinary Rust values, assembled at runtime out of a small combinator algebra
//! ([combinator::Combinator]: token / parselet reference / sequence / optional / repeat / named /
//! postfix), and a [Parser] interprets them directly against a lazily-produced token stream. Two
//! grammars can be [merged](grammar::Grammar::merge) into a third, and a running grammar can grow
//! new syntax from a textual rule body via the bootstrapping [meta] grammar — the same mechanism
//! the engine uses to parse its own rule strings.
//!
//! A [grammar::Grammar] owns its tokens, patterns, parselet tables, bracket/trivia sets; a
//! [scanner::Scanner] (or its [scanner::DefaultScanner]/[scanner::IndentationScanner] variants)
//! turns source text into a token stream against one; a [Parser] drives that stream through one
//! parselet's table, backtracking on failure and accumulating the deepest [error::ParserError]
//! seen along the way.
//!
//! # Example
//!
//! A minimal arithmetic grammar: numbers, `+`, and left-associative Pratt precedence.
//!
//! ```
//! use std::rc::Rc;
//!
//! use lang_rt::action::make_call;
//! use lang_rt::combinator::Combinator;
//! use lang_rt::grammar::Grammar;
//! use lang_rt::location::Location;
//! use lang_rt::scanner::DefaultScanner;
//! use lang_rt::symbol::ParseletKind;
//! use lang_rt::syntax::Value;
//! use lang_rt::types::Type;
//! use lang_rt::Parser;
//!
//! #[derive(Debug)]
//! struct Leaf;
//!
//! let mut grammar = Grammar::new();
//! let number = grammar.add_token("Number", None, Location::new("expr")).unwrap();
//! grammar
//!     .add_pattern(number.clone(), regex::bytes::Regex::new(r"^[0-9]+").unwrap(), 10)
//!     .unwrap();
//! let whitespace = grammar.add_token("Whitespace", None, Location::new("expr")).unwrap();
//! grammar
//!     .add_pattern(whitespace.clone(), regex::bytes::Regex::new(r"^[ \t]+").unwrap(), 10)
//!     .unwrap();
//! grammar.add_trivia(&whitespace);
//! let plus = grammar.add_implicit("+", Location::new("expr")).unwrap();
//!
//! let expr = grammar
//!     .add_parselet("expr", Type::node(), ParseletKind::Pratt, Location::new("expr"))
//!     .unwrap();
//!
//! grammar
//!     .add_parser(
//!         &expr,
//!         Combinator::named("value", Combinator::token(number)),
//!         make_call(Rc::new(|_ns| Value::node(Leaf)), Type::node()),
//!         0,
//!         Location::new("expr"),
//!     )
//!     .unwrap();
//!
//! grammar
//!     .add_rule(
//!         &expr,
//!         Combinator::postfix(vec![
//!             Combinator::named("lhs", Combinator::parselet(expr.clone(), None)),
//!             Combinator::token(plus),
//!             Combinator::named("rhs", Combinator::parselet(expr.clone(), Some(600))),
//!         ]),
//!         600,
//!         Location::new("expr"),
//!     )
//!     .unwrap();
//!
//! let grammar = Rc::new(grammar);
//! let scanner = DefaultScanner::new(Rc::clone(&grammar), "expr", "1 + 2 + 3");
//! let mut parser = Parser::new(grammar, scanner);
//! let value = parser.parse(expr).unwrap();
//! assert!(matches!(value, Value::Node(_)));
//! ```
//!
//! # License
//! This crate is provided under the MIT license.

pub mod action;
pub mod combinator;
pub mod core;
pub mod demos;
pub mod error;
pub mod grammar;
pub mod location;
pub mod log;
pub mod meta;
mod parser;
pub mod printer;
pub mod scanner;
pub mod symbol;
pub mod syntax;
pub mod types;
pub mod writer;

pub use error::{GrammarError, ParserError};
pub use grammar::{Grammar, SharedGrammar};
pub use parser::Parser;
pub use syntax::{SyntaxToken, Value};
