//! The two shapes of value a grammar can produce: lexical [SyntaxToken]s, and tree-shaped
//! [SyntaxNode]s built by host [crate::action::Action]s.

use std::fmt::Debug;
use std::rc::Rc;

use crate::location::Location;
use crate::symbol::TokenID;

#[derive(Debug, Clone)]
/// A single lexeme produced by a [crate::scanner::Scanner]: a token identity, its source text, and
/// the [Location] it occupies.
pub struct SyntaxToken {
    pub id: TokenID,
    pub value: String,
    pub location: Location,
}

impl SyntaxToken {
    pub fn new(id: TokenID, value: impl Into<String>, location: Location) -> Self {
        Self {
            id,
            value: value.into(),
            location,
        }
    }
}

/// A host-defined tree node produced by a [crate::action::Action::Call].
///
/// The engine never constructs concrete node types itself — it only needs to move them around as
/// `Rc<dyn SyntaxNode>` — so this trait is deliberately minimal and object-safe. Host crates
/// implement it on whatever structs their grammar's actions build.
pub trait SyntaxNode: Debug {
    fn as_any(&self) -> &dyn std::any::Any;
}

impl<T: Debug + 'static> SyntaxNode for T {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Debug, Clone)]
/// The runtime value a combinator or parselet evaluation produces.
///
/// Because grammars are assembled dynamically there is no host-supplied enum of node kinds to
/// parameterize this crate over; [Value] is the closed set every combinator and action exchanges.
pub enum Value {
    /// No value (e.g. an implicit token that does not feed a named variable).
    Unit,
    /// A raw token, typically the immediate result of a [crate::combinator::Combinator::Token].
    Token(SyntaxToken),
    /// A tree node built by a host action.
    Node(Rc<dyn SyntaxNode>),
    /// A homogeneous run of values, produced by [crate::combinator::Combinator::Repeat] or by
    /// merging two same-named captures in a [crate::combinator::Combinator::Sequence].
    Sequence(Vec<Value>),
    /// An optional capture, produced by [crate::combinator::Combinator::Optional].
    Optional(Option<Box<Value>>),
}

impl Value {
    pub fn node(node: impl SyntaxNode + 'static) -> Self {
        Value::Node(Rc::new(node))
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

/// Per-match mapping from a [crate::combinator::Combinator::Named] variable name to its captured
/// value, passed to a parselet's [crate::action::Action].
pub type Namespace = std::collections::HashMap<String, Value>;
