//! Dense integer identifiers shared between tokens and parselets.
//!
//! A grammar is built at runtime rather than over a host-supplied token/node enum, so every name
//! a grammar knows about — tokens and parselets alike — is interned into one namespace of plain
//! `usize` ids. [TokenID] and [ParseletID] both carry a [SymbolID] and add the bits specific to
//! their kind. Equality, ordering and hashing for both are defined purely on that id: two values
//! with the same id but (by construction, never) different names are indistinguishable to the
//! engine.

use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

use crate::location::Location;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// A dense identifier assigned to a name the first time it is registered with a grammar.
///
/// Equality and ordering are defined purely on the integer id; two [SymbolID]s with the same id
/// but different names cannot occur within one grammar by construction.
pub struct SymbolID(pub usize);

impl Display for SymbolID {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
/// A registered token: a terminal symbol the scanner can produce.
pub struct TokenID {
    pub id: SymbolID,
    pub name: String,
    pub description: String,
    pub is_implicit: bool,
    pub location: Location,
}

impl TokenID {
    pub fn new(
        id: SymbolID,
        name: impl Into<String>,
        description: impl Into<String>,
        is_implicit: bool,
        location: Location,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            is_implicit,
            location,
        }
    }
}

impl PartialEq for TokenID {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TokenID {}

impl Hash for TokenID {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TokenID {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenID {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for TokenID {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Dispatch strategy for a parselet's registered productions.
pub enum ParseletKind {
    /// Ordered-choice memoized recursive descent.
    Packrat,
    /// Precedence-climbing, with separate prefix (nud) and postfix (led) dispatch.
    Pratt,
}

#[derive(Debug, Clone)]
/// A registered parselet: a named, non-terminal production owned by a [crate::grammar::Grammar].
pub struct ParseletID {
    pub id: SymbolID,
    pub name: String,
    pub location: Location,
    pub kind: ParseletKind,
    pub result_type: Type,
}

impl ParseletID {
    /// Constructs a plain `ParseletID` for tests and call sites that do not need the full
    /// registration path; defaults to [ParseletKind::Packrat] and the root node type.
    pub fn new(id: SymbolID, name: impl Into<String>, location: Location) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            kind: ParseletKind::Packrat,
            result_type: Type::node(),
        }
    }

    pub fn with_kind_and_type(
        id: SymbolID,
        name: impl Into<String>,
        location: Location,
        kind: ParseletKind,
        result_type: Type,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            kind,
            result_type,
        }
    }
}

impl PartialEq for ParseletID {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ParseletID {}

impl Hash for ParseletID {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for ParseletID {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParseletID {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for ParseletID {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The lowest legal parselet/pattern priority.
pub const PRIORITY_MIN: i64 = 0;
/// The highest legal parselet/pattern priority.
pub const PRIORITY_MAX: i64 = i64::MAX;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_equality_uses_id_only() {
        let a = TokenID::new(SymbolID(1), "Plus", "plus", false, Location::new("f"));
        let b = TokenID::new(SymbolID(1), "Plus", "different desc", false, Location::new("g"));
        assert_eq!(a, b);
    }

    #[test]
    fn parselet_ordering_uses_id() {
        let a = ParseletID::new(SymbolID(2), "expr", Location::new("f"));
        let b = ParseletID::new(SymbolID(5), "term", Location::new("f"));
        assert!(a < b);
    }
}
