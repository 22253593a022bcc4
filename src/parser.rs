//! The driver that ties a [Grammar]'s parselet tables to a lazy token stream: Packrat memoization,
//! Pratt precedence climbing (via the tables themselves), and backtracking via explicit
//! save/restore of `position`.
//!
//! A `Parser` is single-use per call to [Parser::parse]: its token buffer grows monotonically as
//! the scanner is pulled, and its memo table is never cleared because one parser instance is never
//! reused across two top-level parses.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ParserError;
use crate::grammar::table::ParseletResult;
use crate::grammar::{Grammar, SharedGrammar};
use crate::log::Log;
use crate::symbol::{ParseletID, TokenID, PRIORITY_MIN};
use crate::syntax::{SyntaxToken, Value};

/// Drives one parse over one token stream against one [Grammar].
///
/// The token buffer is append-only: positions are plain indices into it, so
/// [Parser::set_position] after a failed alternative is O(1) and never re-scans.
pub struct Parser {
    grammar: SharedGrammar,
    scanner: Box<dyn Iterator<Item = SyntaxToken>>,
    tokens: Vec<SyntaxToken>,
    position: usize,
    memo: HashMap<(usize, usize), ParseletResult>,
    log: Log<()>,
}

impl Parser {
    pub fn new(grammar: SharedGrammar, scanner: impl Iterator<Item = SyntaxToken> + 'static) -> Self {
        Self {
            grammar,
            scanner: Box::new(scanner),
            tokens: Vec::new(),
            position: 0,
            memo: HashMap::new(),
            log: Log::None,
        }
    }

    /// Sets the verbosity of parse-time tracing (parselet attempts/results). Disabled
    /// (`Log::None`) by default; only ever emits anything in debug builds.
    pub fn with_log(mut self, log: Log<()>) -> Self {
        self.log = log;
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Pulls tokens from the scanner until the buffer covers `index`, or the scanner is exhausted
    /// (which only happens past the `<EOF>` token, since [crate::scanner::Scanner] never stops
    /// before emitting one).
    fn ensure(&mut self, index: usize) {
        while self.tokens.len() <= index {
            match self.scanner.next() {
                Some(token) => self.tokens.push(token),
                None => break,
            }
        }
    }

    pub fn current_token(&mut self) -> &SyntaxToken {
        self.ensure(self.position);
        self.tokens
            .get(self.position)
            .expect("scanner must emit <EOF> before exhausting")
    }

    /// Returns the current token; if it is not `<EOF>`, advances past it.
    pub fn advance(&mut self) -> SyntaxToken {
        let current = self.current_token().clone();
        if current.id != *self.grammar.eof_token() {
            self.position += 1;
            self.ensure(self.position);
        }
        current
    }

    /// Non-consuming equality check against the current token.
    pub fn matches(&mut self, token_id: &TokenID) -> bool {
        self.current_token().id == *token_id
    }

    /// Advances past the current token if it matches `token_id`, else raises a [ParserError]
    /// expecting `{token_id}`.
    pub fn consume(&mut self, token_id: TokenID) -> Result<SyntaxToken, ParserError> {
        if self.matches(&token_id) {
            Ok(self.advance())
        } else {
            Err(self.error([token_id]))
        }
    }

    /// Builds a [ParserError] at the current position, naming `expected` and the current token.
    pub fn error(&mut self, expected: impl IntoIterator<Item = TokenID>) -> ParserError {
        let current = self.current_token().clone();
        ParserError::new(current.location, current.id, expected)
    }

    /// Invokes (with memoization) the parselet `pid` at the current position and `priority`
    /// (defaulting to [PRIORITY_MIN]), dispatching into its [Grammar]-owned table.
    ///
    /// The memo is keyed on `(position, parselet symbol id)` and caches both success and failure,
    /// so repeated attempts at the same position — the common case under backtracking choice — are
    /// O(1) after the first.
    pub fn parselet(&mut self, pid: ParseletID, priority: Option<i64>) -> ParseletResult {
        let key = (self.position, pid.id.0);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }

        let location = self.current_token().location.clone();
        self.log.log_parselet_attempt(&pid, &location);

        // Clone the grammar handle so the table borrow below does not alias `self` while `self` is
        // passed to `table.call` mutably.
        let grammar: SharedGrammar = Rc::clone(&self.grammar);
        let table = grammar
            .table_for(&pid)
            .unwrap_or_else(|| panic!("parselet '{}' is not registered in this grammar", pid.name));

        let result = table.call(self, priority.unwrap_or(PRIORITY_MIN));
        self.log
            .log_parselet_result(&pid, result.is_ok(), result.as_ref().ok().map(|(v, _)| v));
        self.memo.insert(key, result.clone());
        result
    }

    /// Parses `pid` from the current position and requires the full input to be consumed: the
    /// parselet's result is returned only if a trailing `<EOF>` follows.
    pub fn parse(&mut self, pid: ParseletID) -> Result<Value, ParserError> {
        self.ensure(0);
        let (value, soft) = self.parselet(pid, None)?;
        let eof = self.grammar.eof_token().clone();
        match self.consume(eof) {
            Ok(_) => Ok(value),
            Err(err) => Err(ParserError::merge(soft, Some(err))
                .expect("merge of Some(_) with anything is always Some")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::Combinator;
    use crate::grammar::Grammar;
    use crate::location::Location;
    use crate::scanner::DefaultScanner;
    use crate::symbol::ParseletKind;
    use crate::types::Type;

    fn arithmetic_grammar() -> Grammar {
        let mut g = Grammar::new();
        let number = g.add_token("Number", None, Location::new("f")).unwrap();
        g.add_pattern(number.clone(), regex::bytes::Regex::new(r"^[0-9]+").unwrap(), 10)
            .unwrap();
        let name = g.add_token("Name", None, Location::new("f")).unwrap();
        g.add_pattern(name, regex::bytes::Regex::new(r"^[a-zA-Z]+").unwrap(), 5)
            .unwrap();
        let whitespace = g.add_token("Whitespace", None, Location::new("f")).unwrap();
        g.add_pattern(whitespace.clone(), regex::bytes::Regex::new(r"^[ \t]+").unwrap(), 10)
            .unwrap();
        g.add_trivia(&whitespace);

        let plus = g.add_implicit("+", Location::new("f")).unwrap();
        let star = g.add_implicit("*", Location::new("f")).unwrap();
        let pow = g.add_implicit("**", Location::new("f")).unwrap();
        let minus = g.add_implicit("-", Location::new("f")).unwrap();
        let slash = g.add_implicit("/", Location::new("f")).unwrap();
        let paren_open = g.add_implicit("(", Location::new("f")).unwrap();
        let paren_close = g.add_implicit(")", Location::new("f")).unwrap();

        let expr = g
            .add_parselet("expr", Type::node(), ParseletKind::Pratt, Location::new("f"))
            .unwrap();

        #[derive(Debug)]
        struct Leaf;

        g.add_parser(
            &expr,
            Combinator::named("value", Combinator::token(number)),
            crate::action::make_call(
                std::rc::Rc::new(|_ns: &crate::syntax::Namespace| Value::node(Leaf)),
                Type::node(),
            ),
            0,
            Location::new("f"),
        )
        .unwrap();
        g.add_parser(
            &expr,
            Combinator::sequence(vec![
                Combinator::token(paren_open),
                Combinator::named("inner", Combinator::parselet(expr.clone(), None)),
                Combinator::token(paren_close),
            ]),
            crate::action::make_return_variable("inner"),
            0,
            Location::new("f"),
        )
        .unwrap();

        // unary +/- at priority 800
        g.add_rule(
            &expr,
            Combinator::sequence(vec![
                Combinator::token(plus.clone()),
                Combinator::parselet(expr.clone(), Some(800)),
            ]),
            800,
            Location::new("f"),
        )
        .unwrap();
        g.add_rule(
            &expr,
            Combinator::sequence(vec![
                Combinator::token(minus.clone()),
                Combinator::parselet(expr.clone(), Some(800)),
            ]),
            800,
            Location::new("f"),
        )
        .unwrap();

        // postfix + - at 600, * / at 700, ** at 899 (right-assoc: climb only strictly lower)
        g.add_rule(
            &expr,
            Combinator::postfix(vec![
                Combinator::named("lhs", Combinator::parselet(expr.clone(), None)),
                Combinator::token(plus),
                Combinator::named("rhs", Combinator::parselet(expr.clone(), Some(600))),
            ]),
            600,
            Location::new("f"),
        )
        .unwrap();
        g.add_rule(
            &expr,
            Combinator::postfix(vec![
                Combinator::named("lhs", Combinator::parselet(expr.clone(), None)),
                Combinator::token(minus),
                Combinator::named("rhs", Combinator::parselet(expr.clone(), Some(600))),
            ]),
            600,
            Location::new("f"),
        )
        .unwrap();
        g.add_rule(
            &expr,
            Combinator::postfix(vec![
                Combinator::named("lhs", Combinator::parselet(expr.clone(), None)),
                Combinator::token(star),
                Combinator::named("rhs", Combinator::parselet(expr.clone(), Some(700))),
            ]),
            700,
            Location::new("f"),
        )
        .unwrap();
        g.add_rule(
            &expr,
            Combinator::postfix(vec![
                Combinator::named("lhs", Combinator::parselet(expr.clone(), None)),
                Combinator::token(slash),
                Combinator::named("rhs", Combinator::parselet(expr.clone(), Some(700))),
            ]),
            700,
            Location::new("f"),
        )
        .unwrap();
        g.add_rule(
            &expr,
            Combinator::postfix(vec![
                Combinator::named("lhs", Combinator::parselet(expr.clone(), None)),
                Combinator::token(pow),
                Combinator::named("rhs", Combinator::parselet(expr.clone(), Some(899))),
            ]),
            899,
            Location::new("f"),
        )
        .unwrap();

        g
    }

    fn parse(source: &str) -> Result<Value, ParserError> {
        let grammar = Rc::new(arithmetic_grammar());
        let expr = grammar.parselet("expr").unwrap().clone();
        let scanner = DefaultScanner::new(Rc::clone(&grammar), "f", source);
        let mut parser = Parser::new(grammar, scanner);
        parser.parse(expr)
    }

    #[test]
    fn left_associative_addition_consumes_whole_input() {
        assert!(parse("1 + 2 + 3").is_ok());
    }

    #[test]
    fn parses_without_error() {
        assert!(parse("1 + 2 * 3").is_ok());
        assert!(parse("1 ** 2 ** 3").is_ok());
        assert!(parse("-1 * 2").is_ok());
        assert!(parse("(4 * +1) / 2").is_ok());
    }

    #[test]
    fn parselet_memoizes_repeated_position_lookups() {
        let grammar = Rc::new(arithmetic_grammar());
        let expr = grammar.parselet("expr").unwrap().clone();
        let scanner = DefaultScanner::new(Rc::clone(&grammar), "f", "1 + 2");
        let mut parser = Parser::new(grammar, scanner);
        let key_position = 0;
        parser.parse(expr.clone()).unwrap();
        assert!(parser.memo.contains_key(&(key_position, expr.id.0)));
    }

    #[test]
    fn error_reports_actual_and_expected() {
        let err = parse("a").unwrap_err();
        assert_eq!(err.actual_token.name, "Name");
        let expected: std::collections::BTreeSet<String> =
            err.expected_tokens.iter().map(|t| t.name.clone()).collect();
        assert_eq!(
            expected,
            ["(", "+", "-", "Number"].into_iter().map(String::from).collect()
        );
    }
}
