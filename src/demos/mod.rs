//! Worked grammar examples, built out of the public API only — not exercised by the crate's own
//! parsing logic, but kept as runnable documentation alongside the library they demonstrate.

use std::rc::Rc;

use crate::action::make_call;
use crate::combinator::Combinator;
use crate::grammar::Grammar;
use crate::location::Location;
use crate::scanner::DefaultScanner;
use crate::symbol::ParseletID;
use crate::symbol::ParseletKind;
use crate::syntax::Value;
use crate::types::Type;
use crate::Parser;

#[derive(Debug)]
struct Number(String);

/// Builds a small expression grammar: `Number`, `+`, `Whitespace` trivia, and a Pratt `expr`
/// parselet for left-associative addition, matching the scenario in the end-to-end grammar
/// walkthroughs.
pub fn addition_grammar() -> (Grammar, ParseletID) {
    let mut grammar = Grammar::new();

    let number = grammar.add_token("Number", None, Location::new("demo")).unwrap();
    grammar
        .add_pattern(number.clone(), regex::bytes::Regex::new(r"^[0-9]+").unwrap(), 10)
        .unwrap();

    let whitespace = grammar.add_token("Whitespace", None, Location::new("demo")).unwrap();
    grammar
        .add_pattern(whitespace.clone(), regex::bytes::Regex::new(r"^[ \t]+").unwrap(), 10)
        .unwrap();
    grammar.add_trivia(&whitespace);

    let plus = grammar.add_implicit("+", Location::new("demo")).unwrap();

    let expr = grammar
        .add_parselet("expr", Type::node(), ParseletKind::Pratt, Location::new("demo"))
        .unwrap();

    grammar
        .add_parser(
            &expr,
            Combinator::named("value", Combinator::token(number)),
            make_call(
                Rc::new(|ns| {
                    let token = match ns.get("value") {
                        Some(Value::Token(token)) => token,
                        _ => unreachable!("value is declared as a bare Token capture"),
                    };
                    Value::node(Number(token.value.clone()))
                }),
                Type::node(),
            ),
            0,
            Location::new("demo"),
        )
        .unwrap();

    // Registered from a textual rule body through the bootstrap meta-grammar rather than built by
    // hand, the way a host grows a running grammar's syntax at setup time.
    grammar
        .add_rule(
            &expr,
            r#"lhs:expr "+" rhs:expr<600>"#,
            600,
            Location::new("demo"),
        )
        .unwrap();

    (grammar, expr)
}

/// Parses `source` against [addition_grammar] and returns the resulting syntax tree.
pub fn parse_addition(source: &str) -> Result<Value, crate::ParserError> {
    let (grammar, expr) = addition_grammar();
    let grammar = Rc::new(grammar);
    let scanner = DefaultScanner::new(Rc::clone(&grammar), "demo", source);
    let mut parser = Parser::new(grammar, scanner);
    parser.parse(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_chain_of_additions() {
        let value = parse_addition("1 + 2 + 3").unwrap();
        assert!(matches!(value, Value::Node(_)));
    }

    #[test]
    fn reports_the_expected_token_set_on_failure() {
        let err = parse_addition("+").unwrap_err();
        assert_eq!(err.actual_token.name, "+");
        assert!(err.expected_tokens.iter().any(|t| t.name == "Number"));
    }

    #[test]
    fn dumps_readably_via_the_printer() {
        let (grammar, _) = addition_grammar();
        let dump = crate::printer::to_string(&grammar, crate::printer::dump_grammar);
        assert!(dump.contains("expr"));
    }
}
