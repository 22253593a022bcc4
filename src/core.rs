//! A small grammar fragment shared by hosts that want the usual lexical tokens (comments,
//! whitespace, names, numbers, strings) and bracket nesting without redefining them: [base_grammar]
//! builds a fresh [Grammar] carrying these, ready to be extended with host-specific parselets.
//!
//! The regex literals below are a direct port of a dynamic language's lexer, adjusted only for
//! `regex::bytes` syntax (lookaround-free, anchored with `^`).

use regex::bytes::Regex;

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::location::Location;

const RE_COMMENT: &str = r"^#[^\r\n]*";
const RE_WHITESPACE: &str = r"^[ \t\x0c]+";
const RE_NEWLINE: &str = r"^(\r?\n)+";
const RE_NAME: &str = r"^[^\W\d](?:[\w-]*\w)?[?!]*";
const RE_NUMBER_HEXADECIMAL: &str = r"^0[xX](?:_?[0-9a-fA-F])+";
const RE_NUMBER_BINARY: &str = r"^0[bB](?:_?[01])+";
const RE_NUMBER_OCTAL: &str = r"^0[oO](?:_?[0-7])+";
const RE_NUMBER_DECIMAL: &str = r"^(?:0(?:_?0)*|[1-9](?:_?[0-9])*)";
const RE_FLOAT_POINT: &str = r"^(?:[0-9](?:_?[0-9])*\.(?:[0-9](?:_?[0-9])*)?|\.[0-9](?:_?[0-9])*)(?:[eE][-+]?[0-9](?:_?[0-9])*)?";
const RE_FLOAT_EXPONENT: &str = r"^[0-9](?:_?[0-9])*[eE][-+]?[0-9](?:_?[0-9])*";
const RE_STRING_SINGLE: &str = r#"^'[^\n'\\]*(?:\\.[^\n'\\]*)*'"#;
const RE_STRING_DOUBLE: &str = r#"^"[^\n"\\]*(?:\\.[^\n"\\]*)*""#;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("core lexical patterns are fixed and known to compile")
}

/// Builds a grammar pre-populated with `Comment`, `Whitespace`, `Name`, `NewLine`, `String`,
/// `Integer`, `Float` tokens, `( ) [ ] { } < >` implicits, `Comment`/`Whitespace` trivia, and
/// `()`/`[]`/`{}` bracket pairs.
///
/// `<`/`>` are registered as implicit tokens (hosts commonly use them for generics or comparison)
/// but are deliberately not registered as a bracket pair: unlike `()`/`[]`/`{}`, `<`/`>` also appear
/// unbalanced in ordinary expressions, so nesting them would miscount indentation scope.
pub fn base_grammar() -> Result<Grammar, GrammarError> {
    let mut grammar = Grammar::new();
    let here = || Location::new("<core>");

    let comment = grammar.add_token("Comment", None, here())?;
    grammar.add_pattern(comment.clone(), regex(RE_COMMENT), 10)?;

    let whitespace = grammar.add_token("Whitespace", None, here())?;
    grammar.add_pattern(whitespace.clone(), regex(RE_WHITESPACE), 10)?;

    let name = grammar.add_token("Name", None, here())?;
    grammar.add_pattern(name, regex(RE_NAME), 5)?;

    let newline = grammar.add_token("NewLine", None, here())?;
    grammar.add_pattern(newline, regex(RE_NEWLINE), 10)?;

    let string = grammar.add_token("String", None, here())?;
    grammar.add_pattern(string.clone(), regex(RE_STRING_SINGLE), 10)?;
    grammar.add_pattern(string, regex(RE_STRING_DOUBLE), 10)?;

    let integer = grammar.add_token("Integer", None, here())?;
    grammar.add_pattern(integer.clone(), regex(RE_NUMBER_BINARY), 10)?;
    grammar.add_pattern(integer.clone(), regex(RE_NUMBER_OCTAL), 10)?;
    grammar.add_pattern(integer.clone(), regex(RE_NUMBER_HEXADECIMAL), 10)?;
    grammar.add_pattern(integer, regex(RE_NUMBER_DECIMAL), 5)?;

    let float = grammar.add_token("Float", None, here())?;
    grammar.add_pattern(float.clone(), regex(RE_FLOAT_POINT), 10)?;
    grammar.add_pattern(float, regex(RE_FLOAT_EXPONENT), 10)?;

    let paren_open = grammar.add_implicit("(", here())?;
    let paren_close = grammar.add_implicit(")", here())?;
    let bracket_open = grammar.add_implicit("[", here())?;
    let bracket_close = grammar.add_implicit("]", here())?;
    let brace_open = grammar.add_implicit("{", here())?;
    let brace_close = grammar.add_implicit("}", here())?;
    grammar.add_implicit("<", here())?;
    grammar.add_implicit(">", here())?;

    grammar.add_trivia(&comment);
    grammar.add_trivia(&whitespace);
    grammar.add_brackets(&paren_open, &paren_close);
    grammar.add_brackets(&bracket_open, &bracket_close);
    grammar.add_brackets(&brace_open, &brace_close);

    Ok(grammar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::DefaultScanner;
    use std::rc::Rc;

    fn token_names(source: &str) -> Vec<String> {
        let grammar = Rc::new(base_grammar().unwrap());
        DefaultScanner::new(grammar, "<test>", source)
            .map(|t| t.id.name.clone())
            .collect()
    }

    #[test]
    fn tokenizes_names_numbers_and_strings() {
        assert_eq!(
            token_names(r#"foo 12 3.5 "hi""#),
            vec!["Name", "Integer", "Float", "String", "<EOF>"]
        );
    }

    #[test]
    fn drops_comments_and_whitespace_as_trivia() {
        assert_eq!(token_names("# a comment\nfoo"), vec!["NewLine", "Name", "<EOF>"]);
    }

    #[test]
    fn recognizes_all_bracket_literals() {
        assert_eq!(
            token_names("(a[b]{c}<d>)"),
            vec!["(", "Name", "[", "Name", "]", "{", "Name", "}", "<", "Name", ">", ")", "<EOF>"]
        );
    }

    #[test]
    fn brackets_are_registered_as_pairs_but_angle_is_not() {
        let grammar = base_grammar().unwrap();
        let paren_open = grammar.token("(").unwrap();
        let angle_open = grammar.token("<").unwrap();
        assert!(grammar.is_open_bracket(paren_open));
        assert!(!grammar.is_open_bracket(angle_open));
    }
}
