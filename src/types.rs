//! The small type algebra combinators use to describe what a match produces.
//!
//! A grammar is assembled at runtime, so there is no host-supplied enum of node kinds to
//! parameterize the engine over the way a compile-time parser generator would; [Type] is the
//! engine's own stand-in for "the type this combinator's value or namespace entry has", closed
//! over scalar tokens/nodes plus the `Optional`/`Sequence` wrappers variable inference produces.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// The value shape produced by a combinator or carried by a namespace variable.
pub enum Type {
    /// A raw [crate::syntax::SyntaxToken].
    Token,
    /// A host tree node. `None` names the root [crate::syntax::SyntaxNode]; `Some(name)` names a
    /// parselet's declared node type, which is only ever compared for equality against itself or
    /// the root.
    Node(Option<String>),
    Optional(Box<Type>),
    Sequence(Box<Type>),
}

impl Type {
    pub fn node() -> Self {
        Type::Node(None)
    }

    pub fn named_node(name: impl Into<String>) -> Self {
        Type::Node(Some(name.into()))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Token => write!(f, "Token"),
            Type::Node(None) => write!(f, "SyntaxNode"),
            Type::Node(Some(name)) => write!(f, "{}", name),
            Type::Optional(inner) => write!(f, "Optional[{}]", inner),
            Type::Sequence(inner) => write!(f, "Sequence[{}]", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError(pub String);

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TypeError {}

/// Strips an `Optional[T]`/`Sequence[T]` wrapper down to `T`; a scalar type unpacks to itself.
pub fn unpack(typ: &Type) -> Type {
    match typ {
        Type::Optional(inner) | Type::Sequence(inner) => (**inner).clone(),
        other => other.clone(),
    }
}

/// Merges two same-named captures. Both sides are unpacked first, so `Optional[T]` and
/// `Sequence[T]` fold into the same scalar `T` as a bare `T`; the merged result is always
/// `Sequence[T]`, since two captures sharing a name always means "there can be more than one".
pub fn merge_sequence(lhs: &Type, rhs: &Type) -> Result<Type, TypeError> {
    let l = unpack(lhs);
    let r = unpack(rhs);
    if l != r {
        return Err(TypeError(format!("Can not merge types: {} and {}", l, r)));
    }
    Ok(Type::Sequence(Box::new(l)))
}

pub fn make_sequence(typ: &Type) -> Type {
    Type::Sequence(Box::new(unpack(typ)))
}

/// Wraps `typ` in `Optional`, unless it is already `Sequence[_]` or `Optional[_]` — an optional
/// sequence is still just a sequence (possibly empty), and an optional-of-optional collapses.
pub fn make_optional(typ: &Type) -> Type {
    match typ {
        Type::Sequence(_) | Type::Optional(_) => typ.clone(),
        other => Type::Optional(Box::new(other.clone())),
    }
}

/// `Sequence[A] <: Sequence[B]` and `Optional[A] <: Optional[B]` hold variantly over `A <: B`; a
/// named node type is a subtype only of itself or of the root `SyntaxNode`.
pub fn is_subclass(sub: &Type, sup: &Type) -> bool {
    match (sub, sup) {
        (Type::Token, Type::Token) => true,
        (Type::Node(_), Type::Node(None)) => true,
        (Type::Node(Some(a)), Type::Node(Some(b))) => a == b,
        (Type::Optional(a), Type::Optional(b)) => is_subclass(a, b),
        (Type::Sequence(a), Type::Sequence(b)) => is_subclass(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_scalar_is_identity() {
        assert_eq!(unpack(&Type::Token), Type::Token);
    }

    #[test]
    fn unpack_optional_and_sequence() {
        let opt = Type::Optional(Box::new(Type::Token));
        let seq = Type::Sequence(Box::new(Type::Token));
        assert_eq!(unpack(&opt), Type::Token);
        assert_eq!(unpack(&seq), Type::Token);
    }

    #[test]
    fn merge_sequence_is_commutative_and_closed() {
        let a = Type::Optional(Box::new(Type::Token));
        let b = Type::Sequence(Box::new(Type::Token));
        let lhs = merge_sequence(&a, &b).unwrap();
        let rhs = merge_sequence(&b, &a).unwrap();
        assert_eq!(lhs, rhs);
        assert_eq!(lhs, Type::Sequence(Box::new(Type::Token)));
    }

    #[test]
    fn merge_sequence_rejects_mismatched_scalars() {
        let a = Type::Token;
        let b = Type::named_node("Expr");
        assert!(merge_sequence(&a, &b).is_err());
    }

    #[test]
    fn make_optional_skips_sequence_and_optional() {
        let seq = Type::Sequence(Box::new(Type::Token));
        assert_eq!(make_optional(&seq), seq);
        let opt = Type::Optional(Box::new(Type::Token));
        assert_eq!(make_optional(&opt), opt);
        assert_eq!(
            make_optional(&Type::Token),
            Type::Optional(Box::new(Type::Token))
        );
    }

    #[test]
    fn is_subclass_variance() {
        let a = Type::Sequence(Box::new(Type::named_node("Expr")));
        let b = Type::Sequence(Box::new(Type::node()));
        assert!(is_subclass(&a, &b));
        assert!(!is_subclass(&b, &a));
    }

    #[test]
    fn is_subclass_node_to_root() {
        assert!(is_subclass(&Type::named_node("Expr"), &Type::node()));
        assert!(!is_subclass(&Type::node(), &Type::named_node("Expr")));
    }
}
