//! The combinator algebra: a closed sum type describing how to match a fragment of input, plus
//! the evaluation rules that turn a combinator into a `(result, namespace, soft_error)` triple.
//!
//! [Combinator] caches its two derived attributes — [Combinator::result_type] and
//! [Combinator::variables] — behind `OnceCell`: both are pure functions of the combinator's shape
//! and are re-queried often (once per registration check, once per parselet invocation for the
//! default-value fill-in).

use once_cell::unsync::OnceCell;
use std::collections::HashMap;

use crate::parser::Parser;
use crate::symbol::{ParseletID, TokenID};
use crate::syntax::{Namespace, Value};
use crate::types::{self, Type};
use crate::error::ParserError;

#[derive(Debug, Clone)]
/// The data of a [Combinator], separated out so [Combinator] itself can carry the two memoized
/// attributes without fighting the recursive, boxed shape of its children.
pub enum CombinatorKind {
    Token(TokenID),
    Parselet(ParseletID, Option<i64>),
    Sequence(Vec<Combinator>),
    /// A [CombinatorKind::Sequence] whose first element is skipped during evaluation — the led
    /// slot of a Pratt rule, where the first element exists only to dispatch on the token that
    /// follows the left operand.
    Postfix(Vec<Combinator>),
    Named(String, Box<Combinator>),
    Optional(Box<Combinator>),
    Repeat(Box<Combinator>),
}

#[derive(Debug, Clone)]
pub struct Combinator {
    kind: CombinatorKind,
    result_type: OnceCell<Type>,
    variables: OnceCell<HashMap<String, Type>>,
}

impl Combinator {
    fn wrap(kind: CombinatorKind) -> Self {
        Self {
            kind,
            result_type: OnceCell::new(),
            variables: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> &CombinatorKind {
        &self.kind
    }

    pub fn token(token_id: TokenID) -> Self {
        Self::wrap(CombinatorKind::Token(token_id))
    }

    pub fn parselet(parselet_id: ParseletID, priority: Option<i64>) -> Self {
        Self::wrap(CombinatorKind::Parselet(parselet_id, priority))
    }

    pub fn named(name: impl Into<String>, inner: Combinator) -> Self {
        Self::wrap(CombinatorKind::Named(name.into(), Box::new(inner)))
    }

    pub fn optional(inner: Combinator) -> Self {
        Self::wrap(CombinatorKind::Optional(Box::new(inner)))
    }

    pub fn repeat(inner: Combinator) -> Self {
        Self::wrap(CombinatorKind::Repeat(Box::new(inner)))
    }

    /// Builds a sequence combinator, flattening nested sequences (but not [CombinatorKind::Postfix])
    /// and collapsing a single-element sequence down to that element.
    pub fn sequence(items: impl IntoIterator<Item = Combinator>) -> Self {
        let flat = flatten_sequence(items);
        if flat.len() == 1 {
            flat.into_iter().next().unwrap()
        } else {
            Self::wrap(CombinatorKind::Sequence(flat))
        }
    }

    /// Builds a postfix (Pratt led) combinator from an already-ordered list of elements; the first
    /// element is the left-operand dispatch slot and is not flattened away.
    pub fn postfix(items: Vec<Combinator>) -> Self {
        Self::wrap(CombinatorKind::Postfix(items))
    }

    pub fn result_type(&self) -> Type {
        self.result_type
            .get_or_init(|| self.compute_result_type())
            .clone()
    }

    fn compute_result_type(&self) -> Type {
        match &self.kind {
            CombinatorKind::Token(_) => Type::Token,
            CombinatorKind::Parselet(p, _) => p.result_type.clone(),
            CombinatorKind::Sequence(cs) | CombinatorKind::Postfix(cs) => cs
                .last()
                .expect("sequence combinator must have at least one element")
                .result_type(),
            CombinatorKind::Named(_, inner) => inner.result_type(),
            CombinatorKind::Optional(inner) => types::make_optional(&inner.result_type()),
            CombinatorKind::Repeat(inner) => types::make_sequence(&inner.result_type()),
        }
    }

    pub fn variables(&self) -> HashMap<String, Type> {
        self.variables
            .get_or_init(|| self.compute_variables())
            .clone()
    }

    fn compute_variables(&self) -> HashMap<String, Type> {
        match &self.kind {
            CombinatorKind::Token(_) | CombinatorKind::Parselet(_, _) => HashMap::new(),
            CombinatorKind::Named(name, inner) => {
                let mut vars = HashMap::new();
                vars.insert(name.clone(), inner.result_type());
                vars
            }
            CombinatorKind::Sequence(cs) | CombinatorKind::Postfix(cs) => {
                let mut vars: HashMap<String, Type> = HashMap::new();
                for c in cs {
                    for (name, typ) in c.variables() {
                        match vars.remove(&name) {
                            Some(existing) => {
                                let merged = types::merge_sequence(&existing, &typ)
                                    .expect("duplicate variable name with incompatible types");
                                vars.insert(name, merged);
                            }
                            None => {
                                vars.insert(name, typ);
                            }
                        }
                    }
                }
                vars
            }
            CombinatorKind::Optional(inner) => inner
                .variables()
                .into_iter()
                .map(|(name, typ)| (name, types::make_optional(&typ)))
                .collect(),
            CombinatorKind::Repeat(inner) => inner
                .variables()
                .into_iter()
                .map(|(name, typ)| (name, types::make_sequence(&typ)))
                .collect(),
        }
    }
}

fn flatten_sequence(items: impl IntoIterator<Item = Combinator>) -> Vec<Combinator> {
    let mut out = Vec::new();
    for item in items {
        match item.kind {
            CombinatorKind::Sequence(nested) => out.extend(flatten_sequence(nested)),
            _ => out.push(item),
        }
    }
    out
}

/// `Ok` carries the usual `(result, namespace, soft_error)` triple; `Err` is a hard failure that
/// propagates to the enclosing combinator (a [crate::combinator::Combinator::Sequence] merges it
/// with its accumulated soft error and rethrows; [crate::combinator::Combinator::Optional] and
/// [crate::combinator::Combinator::Repeat] demote it to a soft error instead).
pub type EvalResult = Result<(Value, Namespace, Option<ParserError>), ParserError>;

/// Inserts `name -> wrapped` into `namespace`, wrapping `value` as a singleton
/// [Value::Sequence] first when the owning parselet declared `name` as a sequence-typed variable.
/// This is what keeps the accumulator in [merge_into] homogeneous: once a name is known to be
/// collected more than once anywhere in the rule, every contribution arrives pre-wrapped.
fn make_namespace_entry(context: &HashMap<String, Type>, name: &str, value: Value) -> Namespace {
    let mut ns = Namespace::new();
    let wrapped = match context.get(name) {
        Some(Type::Sequence(_)) => Value::Sequence(vec![value]),
        _ => value,
    };
    ns.insert(name.to_string(), wrapped);
    ns
}

/// Folds `incoming` into `namespace`, concatenating [Value::Sequence] entries that share a name.
fn merge_into(namespace: &mut Namespace, incoming: Namespace) {
    for (name, value) in incoming {
        match namespace.remove(&name) {
            Some(Value::Sequence(mut existing)) => {
                match value {
                    Value::Sequence(more) => existing.extend(more),
                    other => existing.push(other),
                }
                namespace.insert(name, Value::Sequence(existing));
            }
            Some(existing) => {
                namespace.insert(name, Value::Sequence(vec![existing, value]));
            }
            None => {
                namespace.insert(name, value);
            }
        }
    }
}

impl Combinator {
    /// Evaluates this combinator against `parser`. `context` is the owning parselet's full
    /// declared variable map, used by [CombinatorKind::Named] to decide whether a capture must be
    /// wrapped as a sequence element.
    pub fn eval(&self, parser: &mut Parser, context: &HashMap<String, Type>) -> EvalResult {
        match &self.kind {
            CombinatorKind::Token(token_id) => {
                let token = parser.consume(token_id.clone())?;
                Ok((Value::Token(token), Namespace::new(), None))
            }
            CombinatorKind::Parselet(parselet_id, priority) => {
                let (value, error) = parser.parselet(parselet_id.clone(), *priority)?;
                Ok((value, Namespace::new(), error))
            }
            CombinatorKind::Sequence(cs) => eval_sequence(cs.iter(), parser, context),
            CombinatorKind::Postfix(cs) => eval_sequence(cs.iter().skip(1), parser, context),
            CombinatorKind::Named(name, inner) => {
                let (result, _inner_namespace, error) = inner.eval(parser, context)?;
                let namespace = make_namespace_entry(context, name, result.clone());
                Ok((result, namespace, error))
            }
            CombinatorKind::Optional(inner) => {
                let saved = parser.position();
                match inner.eval(parser, context) {
                    Ok(triple) => Ok(triple),
                    Err(error) => {
                        parser.set_position(saved);
                        Ok((Value::Optional(None), Namespace::new(), Some(error)))
                    }
                }
            }
            CombinatorKind::Repeat(inner) => {
                let mut items = Vec::new();
                let mut namespace = Namespace::new();
                let mut error = None;
                loop {
                    let saved = parser.position();
                    match inner.eval(parser, context) {
                        Ok((result, last_namespace, soft)) => {
                            error = ParserError::merge(error, soft);
                            items.push(result);
                            merge_into(&mut namespace, last_namespace);
                        }
                        Err(last_error) => {
                            parser.set_position(saved);
                            error = ParserError::merge(error, Some(last_error));
                            break;
                        }
                    }
                }
                Ok((Value::Sequence(items), namespace, error))
            }
        }
    }

    /// Evaluates a [CombinatorKind::Postfix] combinator with `left` standing in for the skipped
    /// first element, injecting `{name: left}` into the namespace when that first element is a
    /// [CombinatorKind::Named] wrapping a self-reference to `owner` — this is how a led rule names
    /// its left operand.
    pub fn eval_postfix_with_left(
        &self,
        parser: &mut Parser,
        context: &HashMap<String, Type>,
        owner: &ParseletID,
        left: Value,
    ) -> EvalResult {
        let cs = match &self.kind {
            CombinatorKind::Postfix(cs) => cs,
            _ => panic!("eval_postfix_with_left called on a non-Postfix combinator"),
        };
        let (result, mut namespace, error) = self.eval(parser, context)?;
        if let Some(first) = cs.first() {
            if let CombinatorKind::Named(name, inner) = &first.kind {
                if let CombinatorKind::Parselet(p, _) = &inner.kind {
                    if p.id == owner.id {
                        let entry = make_namespace_entry(context, name, left);
                        merge_into(&mut namespace, entry);
                    }
                }
            }
        }
        Ok((result, namespace, error))
    }
}

fn eval_sequence<'a>(
    mut cs: impl Iterator<Item = &'a Combinator>,
    parser: &mut Parser,
    context: &HashMap<String, Type>,
) -> EvalResult {
    let mut result = Value::Unit;
    let mut namespace = Namespace::new();
    let mut error: Option<ParserError> = None;
    loop {
        let Some(combinator) = cs.next() else { break };
        match combinator.eval(parser, context) {
            Ok((r, last_namespace, soft)) => {
                result = r;
                merge_into(&mut namespace, last_namespace);
                error = ParserError::merge(error, soft);
            }
            Err(last_error) => {
                return Err(ParserError::merge(error, Some(last_error))
                    .expect("merge of Some(_) with anything is always Some"));
            }
        }
    }
    Ok((result, namespace, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::symbol::SymbolID;

    fn token(id: usize, name: &str) -> TokenID {
        TokenID::new(SymbolID(id), name, name, false, Location::new("f"))
    }

    fn parselet(id: usize, name: &str, result_type: Type) -> ParseletID {
        ParseletID::with_kind_and_type(
            SymbolID(id),
            name,
            Location::new("f"),
            crate::symbol::ParseletKind::Packrat,
            result_type,
        )
    }

    #[test]
    fn token_result_type_is_token() {
        let c = Combinator::token(token(1, "Plus"));
        assert_eq!(c.result_type(), Type::Token);
        assert!(c.variables().is_empty());
    }

    #[test]
    fn named_combinator_variables() {
        let c = Combinator::named("lhs", Combinator::token(token(1, "Number")));
        let vars = c.variables();
        assert_eq!(vars.get("lhs"), Some(&Type::Token));
    }

    #[test]
    fn sequence_collapses_single_element() {
        let c = Combinator::sequence(vec![Combinator::token(token(1, "Number"))]);
        assert!(matches!(c.kind(), CombinatorKind::Token(_)));
    }

    #[test]
    fn sequence_flattens_nested_sequences() {
        let inner = Combinator::sequence(vec![
            Combinator::token(token(1, "A")),
            Combinator::token(token(2, "B")),
        ]);
        let outer = Combinator::sequence(vec![inner, Combinator::token(token(3, "C"))]);
        match outer.kind() {
            CombinatorKind::Sequence(cs) => assert_eq!(cs.len(), 3),
            _ => panic!("expected a flattened sequence"),
        }
    }

    #[test]
    fn sequence_merges_duplicate_names_to_sequence_type() {
        let c = Combinator::sequence(vec![
            Combinator::named("args", Combinator::token(token(1, "Number"))),
            Combinator::repeat(Combinator::named("args", Combinator::token(token(1, "Number")))),
        ]);
        let vars = c.variables();
        assert_eq!(
            vars.get("args"),
            Some(&Type::Sequence(Box::new(Type::Token)))
        );
    }

    #[test]
    fn repeat_named_variable_is_always_sequence() {
        let c = Combinator::repeat(Combinator::named(
            "items",
            Combinator::parselet(parselet(9, "expr", Type::named_node("Expr")), None),
        ));
        let vars = c.variables();
        assert_eq!(
            vars.get("items"),
            Some(&Type::Sequence(Box::new(Type::named_node("Expr"))))
        );
    }

    #[test]
    fn optional_result_type_wraps_scalar() {
        let c = Combinator::optional(Combinator::token(token(1, "Number")));
        assert_eq!(c.result_type(), Type::Optional(Box::new(Type::Token)));
    }

    #[test]
    fn postfix_result_type_is_last_element() {
        let c = Combinator::postfix(vec![
            Combinator::parselet(parselet(1, "expr", Type::named_node("Expr")), None),
            Combinator::token(token(2, "Plus")),
            Combinator::parselet(parselet(1, "expr", Type::named_node("Expr")), None),
        ]);
        assert_eq!(c.result_type(), Type::named_node("Expr"));
    }

    #[test]
    fn merge_into_concatenates_sequences() {
        let mut namespace = Namespace::new();
        let mut first = Namespace::new();
        first.insert("xs".to_string(), Value::Sequence(vec![Value::Unit]));
        merge_into(&mut namespace, first);
        let mut second = Namespace::new();
        second.insert("xs".to_string(), Value::Sequence(vec![Value::Unit, Value::Unit]));
        merge_into(&mut namespace, second);
        match namespace.get("xs") {
            Some(Value::Sequence(items)) => assert_eq!(items.len(), 3),
            _ => panic!("expected accumulated sequence"),
        }
    }
}
