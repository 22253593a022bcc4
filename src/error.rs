//! The two error families the engine raises: [GrammarError] at build time and [ParserError] at
//! parse time.
//!
//! Neither wraps the other — a host building a grammar only ever sees [GrammarError], and a host
//! driving a [crate::parser::Parser] only ever sees [ParserError]. Both are plain structs with a
//! manual [std::fmt::Display] and [std::error::Error] impl rather than pulling in `thiserror`.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::location::Location;
use crate::symbol::TokenID;
use crate::writer::render_excerpt;

#[derive(Debug, Clone)]
/// Raised while a [crate::grammar::Grammar] is being built: bad symbol names, redefinitions with
/// an incompatible kind or type, unresolved references from rule bodies, and the like.
pub struct GrammarError {
    pub location: Location,
    pub message: String,
}

impl GrammarError {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }

    /// Renders `[filename:line:col] message`, with a source excerpt attached when `content` is
    /// available.
    pub fn render(&self, content: Option<&str>) -> String {
        match content {
            Some(content) => render_excerpt(&self.location, &self.message, content),
            None => format!("[{}] {}", self.location, self.message),
        }
    }
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.location, self.message)
    }
}

impl Error for GrammarError {}

#[derive(Debug, Clone)]
/// Raised by a [crate::parser::Parser] when no alternative at the failing position could consume
/// the current token.
///
/// `expected_tokens` accumulates across backtracked alternatives via [ParserError::merge]: the
/// error surfaced to the caller is always the one at the deepest position reached, which tends to
/// be the most informative explanation of what went wrong.
pub struct ParserError {
    pub location: Location,
    pub actual_token: TokenID,
    pub expected_tokens: BTreeSet<TokenID>,
}

impl ParserError {
    pub fn new(
        location: Location,
        actual_token: TokenID,
        expected_tokens: impl IntoIterator<Item = TokenID>,
    ) -> Self {
        Self {
            location,
            actual_token,
            expected_tokens: expected_tokens.into_iter().collect(),
        }
    }

    /// Merges two optional errors, keeping whichever reached the later position. Ties union their
    /// expected-token sets. `None` is the identity element, making this an associative,
    /// commutative-on-ties monoid.
    pub fn merge(lhs: Option<ParserError>, rhs: Option<ParserError>) -> Option<ParserError> {
        match (lhs, rhs) {
            (None, rhs) => rhs,
            (lhs, None) => lhs,
            (Some(lhs), Some(rhs)) => {
                if lhs.location.end < rhs.location.end {
                    Some(rhs)
                } else if rhs.location.end < lhs.location.end {
                    Some(lhs)
                } else {
                    let mut expected_tokens = lhs.expected_tokens;
                    expected_tokens.extend(rhs.expected_tokens);
                    Some(ParserError {
                        location: lhs.location,
                        actual_token: lhs.actual_token,
                        expected_tokens,
                    })
                }
            }
        }
    }

    pub fn message(&self) -> String {
        if self.expected_tokens.len() > 1 {
            let required: Vec<String> = self
                .expected_tokens
                .iter()
                .map(|t| format!("'{}'", t.description))
                .collect();
            format!(
                "Required one of {}, but got '{}'",
                required.join(", "),
                self.actual_token.description
            )
        } else {
            let required = self
                .expected_tokens
                .iter()
                .next()
                .map(|t| t.description.as_str())
                .unwrap_or("?");
            format!(
                "Required '{}', but got '{}'",
                required, self.actual_token.description
            )
        }
    }

    pub fn render(&self, content: Option<&str>) -> String {
        match content {
            Some(content) => render_excerpt(&self.location, &self.message(), content),
            None => format!("[{}] {}", self.location, self.message()),
        }
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.location, self.message())
    }
}

impl Error for ParserError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;
    use crate::symbol::SymbolID;

    fn token(id: usize, name: &str) -> TokenID {
        TokenID::new(SymbolID(id), name, name, false, Location::new("f"))
    }

    #[test]
    fn merge_keeps_deepest_position() {
        let near = ParserError::new(
            Location::at("f", Position::new(1, 1), Position::new(1, 1)),
            token(3, "Number"),
            [token(1, "Plus")],
        );
        let far = ParserError::new(
            Location::at("f", Position::new(1, 5), Position::new(1, 5)),
            token(3, "Number"),
            [token(2, "Minus")],
        );
        let merged = ParserError::merge(Some(near), Some(far)).unwrap();
        assert_eq!(merged.location.end, Position::new(1, 5));
        assert_eq!(merged.expected_tokens.len(), 1);
    }

    #[test]
    fn merge_on_tie_unions_expected() {
        let loc = Location::at("f", Position::new(2, 2), Position::new(2, 2));
        let a = ParserError::new(loc.clone(), token(3, "Number"), [token(1, "Plus")]);
        let b = ParserError::new(loc, token(3, "Number"), [token(2, "Minus")]);
        let merged = ParserError::merge(Some(a), Some(b)).unwrap();
        assert_eq!(merged.expected_tokens.len(), 2);
    }

    #[test]
    fn message_plural_form() {
        let loc = Location::new("f");
        let err = ParserError::new(
            loc,
            token(3, "Name"),
            [token(1, "Plus"), token(2, "Minus")],
        );
        assert!(err.message().starts_with("Required one of"));
    }

    #[test]
    fn message_singular_form() {
        let loc = Location::new("f");
        let err = ParserError::new(loc, token(3, "Name"), [token(1, "Plus")]);
        assert!(err.message().starts_with("Required 'Plus'"));
    }
}
