//! Parselet tables: the per-[crate::symbol::ParseletID] dispatch structures a
//! [crate::parser::Parser] drives. Two shapes exist — [PackratTable] for ordered-choice
//! memoized recursive descent, and [PrattTable] for precedence-climbing with separate nud/led
//! dispatch — matching §4.F of the grammar this engine implements.

use std::collections::HashMap;
use std::fmt;

use crate::action::Action;
use crate::combinator::{Combinator, CombinatorKind};
use crate::error::{GrammarError, ParserError};
use crate::location::Location;
use crate::parser::Parser;
use crate::symbol::{ParseletID, TokenID};
use crate::syntax::Value;
use crate::types::Type;

/// Result of invoking a parselet: its value plus the deepest soft [ParserError] seen even on
/// success (used for "expected one of" reporting at the longest prefix).
pub type ParseletResult = Result<(Value, Option<ParserError>), ParserError>;

#[derive(Clone)]
/// A registered parselet: a combinator, the action that turns its match into a value, a priority,
/// and the location it was registered at.
pub struct Parselet {
    pub parselet_id: ParseletID,
    pub combinator: Combinator,
    pub action: Action,
    pub priority: i64,
    pub location: Location,
}

impl Parselet {
    pub fn new(
        parselet_id: ParseletID,
        combinator: Combinator,
        action: Action,
        priority: i64,
        location: Location,
    ) -> Self {
        Self {
            parselet_id,
            combinator,
            action,
            priority,
            location,
        }
    }

    pub fn variables(&self) -> HashMap<String, Type> {
        self.combinator.variables()
    }

    /// Fills in defaults for declared variables absent from `namespace` and freezes sequence-typed
    /// entries to a homogeneous [Value::Sequence] before calling the action.
    fn merge_namespace(&self, namespace: HashMap<String, Value>) -> HashMap<String, Value> {
        let mut result = HashMap::new();
        for (name, typ) in self.variables() {
            let value = match namespace.get(&name) {
                Some(value) => match (&typ, value) {
                    (Type::Sequence(_), Value::Sequence(items)) => {
                        Value::Sequence(items.clone())
                    }
                    (Type::Sequence(_), other) => Value::Sequence(vec![other.clone()]),
                    (_, other) => other.clone(),
                },
                None => match &typ {
                    Type::Sequence(_) => Value::Sequence(Vec::new()),
                    _ => Value::Optional(None),
                },
            };
            result.insert(name, value);
        }
        result
    }

    /// Invokes this parselet as a Packrat rule or the nud (prefix) slot of a Pratt rule.
    pub fn call_prefix(&self, parser: &mut Parser) -> ParseletResult {
        let vars = self.variables();
        let (result, namespace, error) = self.combinator.eval(parser, &vars)?;
        let merged = self.merge_namespace(namespace);
        Ok((self.action.call(result, &merged), error))
    }

    /// Invokes this parselet as the led (postfix) slot of a Pratt rule, with `left` standing in
    /// for the already-parsed left operand.
    pub fn call_postfix(&self, parser: &mut Parser, left: Value) -> ParseletResult {
        let vars = self.variables();
        let (result, namespace, error) = self
            .combinator
            .eval_postfix_with_left(parser, &vars, &self.parselet_id, left)?;
        let merged = self.merge_namespace(namespace);
        Ok((self.action.call(result, &merged), error))
    }
}

impl fmt::Debug for Parselet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parselet")
            .field("parselet_id", &self.parselet_id)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Inserts `item` into a priority-ascending list, to the right of any existing equal-priority
/// entries — `bisect.insort_right` over `priority`, so registration order is preserved among ties.
fn insort_right_by_priority<T>(vec: &mut Vec<T>, item: T, priority: impl Fn(&T) -> i64) {
    let key = priority(&item);
    let idx = vec.partition_point(|existing| priority(existing) <= key);
    vec.insert(idx, item);
}

/// Tries `parselets` in order under backtracking, returning the first success merged with the
/// accumulated soft error, or the deepest merged error if every alternative fails.
pub fn choice_prefix(parser: &mut Parser, parselets: &[Parselet]) -> ParseletResult {
    let mut error: Option<ParserError> = None;
    for parselet in parselets {
        let saved = parser.position();
        match parselet.call_prefix(parser) {
            Ok((value, soft)) => return Ok((value, ParserError::merge(error, soft))),
            Err(last_error) => {
                parser.set_position(saved);
                error = ParserError::merge(error, Some(last_error));
            }
        }
    }
    Err(error.expect("choice_prefix called with no alternatives"))
}

fn choice_postfix(parser: &mut Parser, parselets: &[Parselet], left: Value) -> ParseletResult {
    let mut error: Option<ParserError> = None;
    for parselet in parselets {
        let saved = parser.position();
        match parselet.call_postfix(parser, left.clone()) {
            Ok((value, soft)) => return Ok((value, ParserError::merge(error, soft))),
            Err(last_error) => {
                parser.set_position(saved);
                error = ParserError::merge(error, Some(last_error));
            }
        }
    }
    Err(error.expect("choice_postfix called with no alternatives"))
}

/// Strips a leading [CombinatorKind::Named] wrapper so registration dispatch can inspect the
/// token or parselet underneath a named capture.
fn unwrap_named(combinator: &Combinator) -> &Combinator {
    match combinator.kind() {
        CombinatorKind::Named(_, inner) => inner,
        _ => combinator,
    }
}

/// A parselet table: either Packrat (ordered choice) or Pratt (precedence climbing).
pub trait ParseletTable {
    fn parselet_id(&self) -> &ParseletID;
    fn parselets(&self) -> Vec<&Parselet>;
    fn add_parser(
        &mut self,
        combinator: Combinator,
        action: Action,
        priority: i64,
        location: Location,
    ) -> Result<(), GrammarError>;
    fn call(&self, parser: &mut Parser, priority: i64) -> ParseletResult;
}

#[derive(Debug, Default)]
pub struct PackratTable {
    parselet_id: Option<ParseletID>,
    parselets: Vec<Parselet>,
}

impl PackratTable {
    pub fn new(parselet_id: ParseletID) -> Self {
        Self {
            parselet_id: Some(parselet_id),
            parselets: Vec::new(),
        }
    }
}

impl ParseletTable for PackratTable {
    fn parselet_id(&self) -> &ParseletID {
        self.parselet_id.as_ref().expect("PackratTable not initialized")
    }

    fn parselets(&self) -> Vec<&Parselet> {
        self.parselets.iter().collect()
    }

    fn add_parser(
        &mut self,
        combinator: Combinator,
        action: Action,
        priority: i64,
        location: Location,
    ) -> Result<(), GrammarError> {
        let parselet = Parselet::new(
            self.parselet_id().clone(),
            combinator,
            action,
            priority,
            location,
        );
        insort_right_by_priority(&mut self.parselets, parselet, |p| p.priority);
        Ok(())
    }

    fn call(&self, parser: &mut Parser, _priority: i64) -> ParseletResult {
        choice_prefix(parser, &self.parselets)
    }
}

#[derive(Default)]
pub struct PrattTable {
    parselet_id: Option<ParseletID>,
    parselets: Vec<Parselet>,
    prefixes: HashMap<usize, Vec<Parselet>>,
    postfixes: HashMap<usize, Vec<Parselet>>,
}

impl fmt::Debug for PrattTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrattTable")
            .field("parselet_id", &self.parselet_id)
            .field("parselets", &self.parselets.len())
            .finish()
    }
}

impl PrattTable {
    pub fn new(parselet_id: ParseletID) -> Self {
        Self {
            parselet_id: Some(parselet_id),
            parselets: Vec::new(),
            prefixes: HashMap::new(),
            postfixes: HashMap::new(),
        }
    }

    fn add_prefix(&mut self, token_id: &TokenID, parselet: Parselet) {
        insort_right_by_priority(
            self.prefixes.entry(token_id.id.0).or_default(),
            parselet.clone(),
            |p| p.priority,
        );
        insort_right_by_priority(&mut self.parselets, parselet, |p| p.priority);
    }

    fn add_postfix(&mut self, token_id: &TokenID, parselet: Parselet) {
        insort_right_by_priority(
            self.postfixes.entry(token_id.id.0).or_default(),
            parselet.clone(),
            |p| p.priority,
        );
        insort_right_by_priority(&mut self.parselets, parselet, |p| p.priority);
    }
}

impl ParseletTable for PrattTable {
    fn parselet_id(&self) -> &ParseletID {
        self.parselet_id.as_ref().expect("PrattTable not initialized")
    }

    fn parselets(&self) -> Vec<&Parselet> {
        self.parselets.iter().collect()
    }

    fn add_parser(
        &mut self,
        combinator: Combinator,
        action: Action,
        priority: i64,
        location: Location,
    ) -> Result<(), GrammarError> {
        let self_id = self.parselet_id().clone();

        let elements: Option<&[Combinator]> = match combinator.kind() {
            CombinatorKind::Sequence(cs) | CombinatorKind::Postfix(cs) => Some(cs.as_slice()),
            _ => None,
        };

        let head = match elements {
            Some(cs) if !cs.is_empty() => unwrap_named(&cs[0]),
            Some(_) => {
                return Err(GrammarError::new(location, "Pratt parselet combinator has no elements"))
            }
            None => unwrap_named(&combinator),
        };

        if let CombinatorKind::Token(token_id) = head.kind() {
            let token_id = token_id.clone();
            let parselet = Parselet::new(self_id, combinator, action, priority, location);
            self.add_prefix(&token_id, parselet);
            return Ok(());
        }

        if let CombinatorKind::Parselet(p, _) = head.kind() {
            if p.id == self_id.id {
                let cs = elements.expect("self-reference head only occurs inside a sequence");
                if cs.len() > 1 {
                    let second = unwrap_named(&cs[1]);
                    if let CombinatorKind::Token(token_id) = second.kind() {
                        let token_id = token_id.clone();
                        // A rule text compiles to a plain Sequence whose head is the self-reference
                        // dispatch slot; re-wrap it as a Postfix combinator (skipping that head during
                        // evaluation) regardless of whether it arrived hand-built or via the meta-grammar.
                        let postfix = Combinator::postfix(cs.to_vec());
                        let parselet = Parselet::new(self_id, postfix, action, priority, location);
                        self.add_postfix(&token_id, parselet);
                        return Ok(());
                    }
                }
                return Err(GrammarError::new(
                    location,
                    "Second combinator for a Pratt postfix parselet must be a token",
                ));
            }
        }

        Err(GrammarError::new(
            location,
            "First combinator for a Pratt parselet must be a token or a self-reference followed by a token",
        ))
    }

    fn call(&self, parser: &mut Parser, priority: i64) -> ParseletResult {
        let current = parser.current_token().id.clone();
        let prefixes = self.prefixes.get(&current.id.0).cloned().unwrap_or_default();
        if prefixes.is_empty() {
            return Err(parser.error(prefix_tokens(self)));
        }

        let (mut left, mut error) = choice_prefix(parser, &prefixes)?;

        loop {
            let current = parser.current_token().id.clone();
            let candidates: Vec<Parselet> = self
                .postfixes
                .get(&current.id.0)
                .map(|v| {
                    v.iter()
                        .filter(|p| priority < p.priority)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if candidates.is_empty() {
                break;
            }
            match choice_postfix(parser, &candidates, left.clone()) {
                Ok((value, soft)) => {
                    left = value;
                    error = ParserError::merge(error, soft);
                }
                Err(last_error) => {
                    error = ParserError::merge(error, Some(last_error));
                    break;
                }
            }
        }

        Ok((left, error))
    }
}

/// The set of tokens a Pratt table's prefix (nud) dispatch recognizes — used to build the
/// "expected one of" error when none of them match the current token.
fn prefix_tokens(table: &PrattTable) -> std::collections::BTreeSet<TokenID> {
    table
        .prefixes
        .values()
        .filter_map(|parselets| parselets.first())
        .filter_map(|parselet| match unwrap_named(&parselet.combinator).kind() {
            CombinatorKind::Token(t) => Some(t.clone()),
            CombinatorKind::Sequence(cs) | CombinatorKind::Postfix(cs) => {
                cs.first().and_then(|c| match unwrap_named(c).kind() {
                    CombinatorKind::Token(t) => Some(t.clone()),
                    _ => None,
                })
            }
            _ => None,
        })
        .collect()
}
