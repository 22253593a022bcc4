//! The bootstrap meta-grammar: a small, self-describing grammar that parses combinator rule
//! bodies written as strings (e.g. `name:Name ":" combinator:combinator`) into real
//! [crate::combinator::Combinator] values.
//!
//! This is how [crate::grammar::Grammar::add_parser] accepts text instead of a hand-built
//! combinator tree: the meta-grammar is built entirely out of this crate's own
//! [crate::grammar::Grammar]/[crate::combinator::Combinator]/[crate::parser::Parser], not a
//! separate lexer/parser stack.

use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::action::{self, Functor};
use crate::combinator::Combinator;
use crate::core;
use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::location::Location;
use crate::parser::Parser;
use crate::scanner::DefaultScanner;
use crate::symbol::ParseletKind;
use crate::syntax::{SyntaxNode, Value};
use crate::types::Type;

/// The seven productions §4.I describes are parsed into this small, closed AST before being
/// walked by [convert_node] into real [Combinator] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombinatorNode {
    /// `name:Name ":" combinator:combinator` — a named sub-capture.
    Named {
        name: String,
        combinator: Box<CombinatorNode>,
    },
    /// `name:Name [ "<" priority:Integer ">" ]` — a reference to a token or parselet.
    Reference { name: String, priority: Option<i64> },
    /// `value:String` — an implicit token, named after the decoded string literal.
    Implicit(String),
    /// `"[" combinator:combinator_sequence "]"`.
    Optional(Box<CombinatorNode>),
    /// `"{" combinator:combinator_sequence "}"`.
    Repeat(Box<CombinatorNode>),
    /// `combinators:combinator { combinators:combinator }`.
    Sequence(Vec<CombinatorNode>),
}

fn node_type() -> Type {
    Type::named_node("CombinatorNode")
}

fn as_node(value: &Value) -> CombinatorNode {
    match value {
        Value::Node(node) => node
            .as_any()
            .downcast_ref::<CombinatorNode>()
            .expect("meta-grammar actions only ever produce CombinatorNode values")
            .clone(),
        other => panic!("expected a CombinatorNode value, got {:?}", other),
    }
}

fn as_token_value(value: &Value) -> String {
    match value {
        Value::Token(token) => token.value.clone(),
        other => panic!("expected a token value, got {:?}", other),
    }
}

/// Decodes a quoted string literal's standard escapes (`\n`, `\t`, `\r`, `\\`, `\"`, `\'`, `\0`);
/// unrecognized escapes pass the escaped character through unchanged.
pub fn decode_string_literal(raw: &str) -> String {
    let inner = raw
        .strip_prefix(['"', '\''])
        .and_then(|s| s.strip_suffix(['"', '\'']))
        .unwrap_or(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Builds the meta-grammar: [core::base_grammar] extended with the `combinator`/
/// `combinator_sequence` Packrat parselets that parse rule bodies into [CombinatorNode]s.
pub fn build_combinator_grammar() -> Result<Grammar, GrammarError> {
    let mut grammar = core::base_grammar()?;
    let here = || Location::new("<meta>");

    let name_id = grammar.token("Name").expect("base_grammar registers Name").clone();
    let string_id = grammar.token("String").expect("base_grammar registers String").clone();
    let integer_id = grammar.token("Integer").expect("base_grammar registers Integer").clone();
    let colon_id = grammar.add_implicit(":", here())?;
    let paren_open = grammar.token("(").unwrap().clone();
    let paren_close = grammar.token(")").unwrap().clone();
    let square_open = grammar.token("[").unwrap().clone();
    let square_close = grammar.token("]").unwrap().clone();
    let curly_open = grammar.token("{").unwrap().clone();
    let curly_close = grammar.token("}").unwrap().clone();
    let less_id = grammar.token("<").unwrap().clone();
    let great_id = grammar.token(">").unwrap().clone();

    let comb_id = grammar.add_parselet("combinator", node_type(), ParseletKind::Packrat, here())?;
    let seq_id = grammar.add_parselet(
        "combinator_sequence",
        node_type(),
        ParseletKind::Packrat,
        here(),
    )?;

    // combinator := name:Name ":" combinator:combinator
    let ctor: Functor = Rc::new(|ns| {
        let name = as_token_value(ns.get("name").expect("'name' is a declared variable"));
        let combinator = as_node(ns.get("combinator").expect("'combinator' is a declared variable"));
        Value::node(CombinatorNode::Named {
            name,
            combinator: Box::new(combinator),
        })
    });
    grammar.add_parser(
        &comb_id,
        Combinator::sequence(vec![
            Combinator::named("name", Combinator::token(name_id.clone())),
            Combinator::token(colon_id),
            Combinator::named("combinator", Combinator::parselet(comb_id.clone(), None)),
        ]),
        action::make_call(ctor, node_type()),
        crate::symbol::PRIORITY_MAX,
        here(),
    )?;

    // combinator := name:Name [ "<" priority:Integer ">" ]
    let ctor: Functor = Rc::new(|ns| {
        let name = as_token_value(ns.get("name").expect("'name' is a declared variable"));
        // `priority` is an Optional[Token] variable: present contributions arrive as the raw
        // Token (Optional's eval returns the inner triple unwrapped on success, per the
        // combinator's Optional semantics), absent ones as the `merge_namespace` default
        // `Value::Optional(None)`.
        let priority = match ns.get("priority") {
            Some(Value::Token(token)) => token.value.parse::<i64>().ok(),
            _ => None,
        };
        Value::node(CombinatorNode::Reference { name, priority })
    });
    grammar.add_parser(
        &comb_id,
        Combinator::sequence(vec![
            Combinator::named("name", Combinator::token(name_id.clone())),
            Combinator::optional(Combinator::sequence(vec![
                Combinator::token(less_id),
                Combinator::named("priority", Combinator::token(integer_id)),
                Combinator::token(great_id),
            ])),
        ]),
        action::make_call(ctor, node_type()),
        crate::symbol::PRIORITY_MAX,
        here(),
    )?;

    // combinator := value:String
    let ctor: Functor = Rc::new(|ns| {
        let raw = as_token_value(ns.get("value").expect("'value' is a declared variable"));
        Value::node(CombinatorNode::Implicit(decode_string_literal(&raw)))
    });
    grammar.add_parser(
        &comb_id,
        Combinator::named("value", Combinator::token(string_id)),
        action::make_call(ctor, node_type()),
        crate::symbol::PRIORITY_MAX,
        here(),
    )?;

    // combinator := "[" combinator:combinator_sequence "]"
    let ctor: Functor = Rc::new(|ns| {
        let inner = as_node(ns.get("combinator").expect("'combinator' is a declared variable"));
        Value::node(CombinatorNode::Optional(Box::new(inner)))
    });
    grammar.add_parser(
        &comb_id,
        Combinator::sequence(vec![
            Combinator::token(square_open),
            Combinator::named("combinator", Combinator::parselet(seq_id.clone(), None)),
            Combinator::token(square_close),
        ]),
        action::make_call(ctor, node_type()),
        crate::symbol::PRIORITY_MAX,
        here(),
    )?;

    // combinator := "{" combinator:combinator_sequence "}"
    let ctor: Functor = Rc::new(|ns| {
        let inner = as_node(ns.get("combinator").expect("'combinator' is a declared variable"));
        Value::node(CombinatorNode::Repeat(Box::new(inner)))
    });
    grammar.add_parser(
        &comb_id,
        Combinator::sequence(vec![
            Combinator::token(curly_open),
            Combinator::named("combinator", Combinator::parselet(seq_id.clone(), None)),
            Combinator::token(curly_close),
        ]),
        action::make_call(ctor, node_type()),
        crate::symbol::PRIORITY_MAX,
        here(),
    )?;

    // combinator := "(" combinator:combinator_sequence ")" -- identity, just unwraps the parens
    grammar.add_parser(
        &comb_id,
        Combinator::sequence(vec![
            Combinator::token(paren_open),
            Combinator::named("combinator", Combinator::parselet(seq_id.clone(), None)),
            Combinator::token(paren_close),
        ]),
        action::make_return_variable("combinator"),
        crate::symbol::PRIORITY_MAX,
        here(),
    )?;

    // combinator_sequence := combinators:combinator { combinators:combinator }
    let ctor: Functor = Rc::new(|ns| {
        let items = match ns.get("combinators") {
            Some(Value::Sequence(items)) => items.iter().map(as_node).collect(),
            Some(other) => vec![as_node(other)],
            None => Vec::new(),
        };
        Value::node(CombinatorNode::Sequence(items))
    });
    grammar.add_parser(
        &seq_id,
        Combinator::sequence(vec![
            Combinator::named("combinators", Combinator::parselet(comb_id.clone(), None)),
            Combinator::repeat(Combinator::named(
                "combinators",
                Combinator::parselet(comb_id.clone(), None),
            )),
        ]),
        action::make_call(ctor, node_type()),
        crate::symbol::PRIORITY_MAX,
        here(),
    )?;

    Ok(grammar)
}

thread_local! {
    static COMBINATOR_GRAMMAR: OnceCell<Rc<Grammar>> = OnceCell::new();
}

/// The meta-grammar, built once per thread and shared thereafter — building it is pure and
/// deterministic, so there is no reason to repeat the work for every call to [make_combinator].
pub fn combinator_grammar() -> Rc<Grammar> {
    COMBINATOR_GRAMMAR.with(|cell| {
        cell.get_or_init(|| {
            Rc::new(build_combinator_grammar().expect("the meta-grammar's own construction never fails"))
        })
        .clone()
    })
}

/// Parses `content` against the meta-grammar's `combinator_sequence` parselet, returning the
/// resulting [CombinatorNode] tree.
pub fn parse_combinator(content: &str) -> Result<CombinatorNode, GrammarError> {
    let grammar = combinator_grammar();
    let seq_id = grammar
        .parselet("combinator_sequence")
        .expect("meta-grammar registers combinator_sequence")
        .clone();
    let scanner = DefaultScanner::new(Rc::clone(&grammar), "<rule>", content);
    let mut parser = Parser::new(grammar, scanner);
    let value = parser
        .parse(seq_id)
        .map_err(|err| GrammarError::new(err.location.clone(), err.message()))?;
    Ok(as_node(&value))
}

/// Walks a [CombinatorNode] tree into a real [Combinator], registering any implicit tokens it
/// references against `grammar` (the grammar the rule is being added to, not the meta-grammar) and
/// resolving named references to that same grammar's tokens/parselets.
pub fn convert_node(
    grammar: &mut Grammar,
    node: &CombinatorNode,
    location: &Location,
) -> Result<Combinator, GrammarError> {
    match node {
        CombinatorNode::Sequence(items) => {
            let mut converted = Vec::with_capacity(items.len());
            for item in items {
                converted.push(convert_node(grammar, item, location)?);
            }
            Ok(Combinator::sequence(converted))
        }
        CombinatorNode::Repeat(inner) => {
            Ok(Combinator::repeat(convert_node(grammar, inner, location)?))
        }
        CombinatorNode::Optional(inner) => {
            Ok(Combinator::optional(convert_node(grammar, inner, location)?))
        }
        CombinatorNode::Named { name, combinator } => Ok(Combinator::named(
            name.clone(),
            convert_node(grammar, combinator, location)?,
        )),
        CombinatorNode::Implicit(literal) => {
            let token = grammar.add_implicit(literal, location.clone())?;
            Ok(Combinator::token(token))
        }
        CombinatorNode::Reference { name, priority } => {
            if let Some(token) = grammar.token(name) {
                if priority.is_some() {
                    return Err(GrammarError::new(
                        location.clone(),
                        format!("token combinator '{}' can not have a priority", name),
                    ));
                }
                Ok(Combinator::token(token.clone()))
            } else if let Some(parselet) = grammar.parselet(name) {
                Ok(Combinator::parselet(parselet.clone(), *priority))
            } else {
                Err(GrammarError::new(
                    location.clone(),
                    format!("not found symbol '{}' in grammar", name),
                ))
            }
        }
    }
}

/// Parses `content` as a combinator rule body and converts it into a [Combinator] registered
/// against `grammar`. This is what [crate::grammar::Grammar::add_parser] calls when given a rule
/// body as text instead of an already-built [Combinator].
pub fn make_combinator(
    grammar: &mut Grammar,
    content: &str,
    location: Location,
) -> Result<Combinator, GrammarError> {
    let node = parse_combinator(content)
        .map_err(|err| GrammarError::new(location.clone(), format!("malformed rule body: {}", err.message)))?;
    convert_node(grammar, &node, &location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::CombinatorKind;

    #[test]
    fn parses_named_reference() {
        let node = parse_combinator("lhs:expr").unwrap();
        match node {
            CombinatorNode::Sequence(items) => {
                assert_eq!(items.len(), 1);
                match &items[0] {
                    CombinatorNode::Named { name, combinator } => {
                        assert_eq!(name, "lhs");
                        assert!(matches!(**combinator, CombinatorNode::Reference { .. }));
                    }
                    other => panic!("expected Named, got {:?}", other),
                }
            }
            other => panic!("expected Sequence, got {:?}", other),
        }
    }

    #[test]
    fn parses_reference_with_priority() {
        let node = parse_combinator("expr<600>").unwrap();
        let CombinatorNode::Sequence(items) = node else { panic!("expected Sequence") };
        match &items[0] {
            CombinatorNode::Reference { name, priority } => {
                assert_eq!(name, "expr");
                assert_eq!(*priority, Some(600));
            }
            other => panic!("expected Reference, got {:?}", other),
        }
    }

    #[test]
    fn parses_implicit_string_literal() {
        let node = parse_combinator(r#""+""#).unwrap();
        let CombinatorNode::Sequence(items) = node else { panic!("expected Sequence") };
        assert_eq!(items[0], CombinatorNode::Implicit("+".to_string()));
    }

    #[test]
    fn parses_three_element_sequence_with_two_named_children() {
        let node = parse_combinator(r#"lhs:expr "+" rhs:expr"#).unwrap();
        match node {
            CombinatorNode::Sequence(items) => assert_eq!(items.len(), 3),
            other => panic!("expected Sequence, got {:?}", other),
        }
    }

    #[test]
    fn converts_named_token_into_combinator() {
        let mut g = core::base_grammar().unwrap();
        let expr = g
            .add_parselet("expr", Type::node(), ParseletKind::Packrat, Location::new("f"))
            .unwrap();
        let _ = expr;
        let combinator = make_combinator(&mut g, r#""+""#, Location::new("f")).unwrap();
        match combinator.kind() {
            CombinatorKind::Token(t) => assert_eq!(t.name, "+"),
            other => panic!("expected Token, got {:?}", other),
        }
    }

    #[test]
    fn unknown_symbol_reference_is_a_grammar_error() {
        let mut g = core::base_grammar().unwrap();
        let err = make_combinator(&mut g, "nonexistent", Location::new("f"));
        assert!(err.is_err());
    }
}
