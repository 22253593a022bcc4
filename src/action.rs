//! The layer that maps a combinator's `(result, namespace)` pair into the value a parselet
//! actually returns.
//!
//! Every parselet owns exactly one [Action]. It is built by an [ActionGenerator] closure at
//! registration time, given the combinator it will run against — this is how
//! [make_return_result] can declare its result type as "whatever the combinator produces" without
//! the caller having to say so twice.

use std::rc::Rc;

use crate::combinator::Combinator;
use crate::syntax::{Namespace, Value};
use crate::types::Type;

/// A functor invoked as `functor(namespace)` by a [Action::Call] action.
pub type Functor = Rc<dyn Fn(&Namespace) -> Value>;

#[derive(Clone)]
/// The action a parselet runs over its combinator's match to produce its result.
pub enum Action {
    /// Return the combinator's own result unchanged.
    ReturnResult(Type),
    /// Return `namespace[name]`.
    ReturnVariable(String, Type),
    /// Invoke `functor(namespace)`. Requires an explicit `result_type` rather than attempting to
    /// infer one from the closure.
    Call(Functor, Type),
}

impl Action {
    pub fn result_type(&self) -> Type {
        match self {
            Action::ReturnResult(t) => t.clone(),
            Action::ReturnVariable(_, t) => t.clone(),
            Action::Call(_, t) => t.clone(),
        }
    }

    pub fn call(&self, last_result: Value, namespace: &Namespace) -> Value {
        match self {
            Action::ReturnResult(_) => last_result,
            Action::ReturnVariable(name, _) => namespace
                .get(name)
                .cloned()
                .unwrap_or(Value::Optional(None)),
            Action::Call(functor, _) => functor(namespace),
        }
    }
}

/// Builds an [Action] from a combinator once it is known, e.g. to check the combinator's own
/// `result_type` or declared variable types.
pub type ActionGenerator = Rc<dyn Fn(&Combinator) -> Action>;

/// The default action generator: a parselet with no explicit action just returns whatever its
/// combinator matched.
pub fn make_return_result() -> ActionGenerator {
    Rc::new(|combinator: &Combinator| Action::ReturnResult(combinator.result_type()))
}

/// Returns the named variable instead of the combinator's own result — used for rules like
/// `combinator := "(" combinator:combinator_sequence ")"` where the parentheses themselves carry
/// no value.
pub fn make_return_variable(name: impl Into<String>) -> ActionGenerator {
    let name = name.into();
    Rc::new(move |combinator: &Combinator| {
        let variables = combinator.variables();
        let result_type = variables
            .get(&name)
            .cloned()
            .unwrap_or_else(|| combinator.result_type());
        Action::ReturnVariable(name.clone(), result_type)
    })
}

/// Invokes `functor` with the merged namespace as its sole argument, producing a value of
/// `result_type` — a host-supplied node constructor or free function.
pub fn make_call(functor: Functor, result_type: Type) -> ActionGenerator {
    Rc::new(move |_combinator: &Combinator| Action::Call(functor.clone(), result_type.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{ParseletID, SymbolID};
    use crate::location::Location;

    fn parselet_id(name: &str) -> ParseletID {
        ParseletID::new(SymbolID(10), name, Location::new("f"))
    }

    #[test]
    fn return_result_passes_through() {
        let action = Action::ReturnResult(Type::Token);
        let ns = Namespace::new();
        let value = action.call(Value::Unit, &ns);
        assert!(matches!(value, Value::Unit));
    }

    #[test]
    fn return_variable_looks_up_namespace() {
        let action = Action::ReturnVariable("x".into(), Type::Token);
        let mut ns = Namespace::new();
        ns.insert("x".into(), Value::Sequence(vec![]));
        let value = action.call(Value::Unit, &ns);
        assert!(matches!(value, Value::Sequence(items) if items.is_empty()));
    }

    #[test]
    fn call_action_invokes_functor() {
        let functor: Functor = Rc::new(|ns: &Namespace| {
            Value::Sequence(ns.values().cloned().collect())
        });
        let action = Action::Call(functor, Type::named_node("Pair"));
        let mut ns = Namespace::new();
        ns.insert("a".into(), Value::Unit);
        let value = action.call(Value::Unit, &ns);
        assert!(matches!(value, Value::Sequence(items) if items.len() == 1));
    }

    #[test]
    fn make_return_result_uses_combinator_type() {
        let combinator = Combinator::token(crate::symbol::TokenID::new(
            SymbolID(1),
            "Plus",
            "plus",
            false,
            Location::new("f"),
        ));
        let generator = make_return_result();
        let action = generator(&combinator);
        assert_eq!(action.result_type(), Type::Token);
    }

    #[test]
    fn make_return_variable_prefers_declared_type() {
        let inner = Combinator::named(
            "combinator",
            Combinator::parselet(parselet_id("combinator_sequence"), None),
        );
        let generator = make_return_variable("combinator");
        let action = generator(&inner);
        assert!(matches!(action, Action::ReturnVariable(name, _) if name == "combinator"));
    }
}
