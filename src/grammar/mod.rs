//! The grammar data structure: a registry of tokens, patterns, and parselet tables, assembled
//! at runtime rather than over a host-supplied enum.
//!
//! Grammar objects are built monotonically — symbols, patterns and parselets are only ever added
//! or merged in, never removed — and become read-only once a [crate::parser::Parser] starts
//! referencing them.

pub mod table;

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use regex::bytes::Regex;

use crate::action::{self, ActionGenerator};
use crate::combinator::Combinator;
use crate::error::GrammarError;
use crate::location::Location;
use crate::log::Log;
use crate::meta;
use crate::symbol::{ParseletID, ParseletKind, SymbolID, TokenID};
use crate::types::{self, Type};

use table::{PackratTable, ParseletTable, PrattTable};

#[derive(Clone)]
/// A compiled lexical rule: a [TokenID], its regex, and the priority used to break longest-match
/// ties against patterns that matched the same length.
pub struct SyntaxPattern {
    pub token_id: TokenID,
    pub regex: Rc<Regex>,
    pub priority: i64,
}

impl std::fmt::Debug for SyntaxPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxPattern")
            .field("token_id", &self.token_id)
            .field("regex", &self.regex.as_str())
            .field("priority", &self.priority)
            .finish()
    }
}

/// The two shapes [Grammar::add_parser] accepts for a rule body: an already-built [Combinator], or
/// a rule written as text and compiled through the bootstrap [crate::meta] grammar at registration
/// time — the textual route is how a running grammar grows new syntactic forms without a host
/// recompiling anything.
pub enum RuleBody {
    Combinator(Combinator),
    Text(String),
}

impl From<Combinator> for RuleBody {
    fn from(combinator: Combinator) -> Self {
        RuleBody::Combinator(combinator)
    }
}

impl From<&str> for RuleBody {
    fn from(text: &str) -> Self {
        RuleBody::Text(text.to_string())
    }
}

impl From<String> for RuleBody {
    fn from(text: String) -> Self {
        RuleBody::Text(text)
    }
}

/// One of [table::PackratTable] or [table::PrattTable], dispatched on through the
/// [table::ParseletTable] trait.
enum AnyTable {
    Packrat(PackratTable),
    Pratt(PrattTable),
}

impl AnyTable {
    fn as_table(&self) -> &dyn ParseletTable {
        match self {
            AnyTable::Packrat(t) => t,
            AnyTable::Pratt(t) => t,
        }
    }

    fn as_table_mut(&mut self) -> &mut dyn ParseletTable {
        match self {
            AnyTable::Packrat(t) => t,
            AnyTable::Pratt(t) => t,
        }
    }
}

fn is_valid_token_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

/// A runtime-built grammar: the symbol/token/parselet tables, the ordered pattern list, and the
/// trivia/bracket sets a [crate::scanner::Scanner] consults.
pub struct Grammar {
    next_symbol: usize,
    tokens_by_name: HashMap<String, TokenID>,
    parselets_by_name: HashMap<String, ParseletID>,
    patterns: Vec<SyntaxPattern>,
    tables: HashMap<usize, AnyTable>,
    trivia: HashSet<usize>,
    open_brackets: HashMap<usize, usize>,
    close_brackets: HashSet<usize>,
    bracket_names: HashMap<usize, String>,
    eof_token: TokenID,
    error_token: TokenID,
    log: Log<()>,
}

impl std::fmt::Debug for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("tokens", &self.tokens_by_name.len())
            .field("parselets", &self.parselets_by_name.len())
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

impl Grammar {
    /// Builds an empty grammar, pre-registering the two predefined implicit tokens every grammar
    /// carries from construction: `<EOF>` (id 1) and `<ERROR>` (id 2).
    pub fn new() -> Self {
        let mut grammar = Self {
            next_symbol: 1,
            tokens_by_name: HashMap::new(),
            parselets_by_name: HashMap::new(),
            patterns: Vec::new(),
            tables: HashMap::new(),
            trivia: HashSet::new(),
            open_brackets: HashMap::new(),
            close_brackets: HashSet::new(),
            bracket_names: HashMap::new(),
            eof_token: TokenID::new(SymbolID(0), "<EOF>", "end of file", true, Location::new("<grammar>")),
            error_token: TokenID::new(SymbolID(0), "<ERROR>", "invalid token", true, Location::new("<grammar>")),
            log: Log::None,
        };
        let eof = grammar
            .add_token_impl("<EOF>", Some("end of file"), true, Location::new("<grammar>"))
            .expect("registering the predefined <EOF> token never fails");
        let error = grammar
            .add_token_impl("<ERROR>", Some("invalid token"), true, Location::new("<grammar>"))
            .expect("registering the predefined <ERROR> token never fails");
        grammar.eof_token = eof;
        grammar.error_token = error;
        grammar
    }

    /// Sets the verbosity of construction-time tracing (token/parselet registration). Disabled
    /// (`Log::None`) by default; only ever emits anything in debug builds.
    pub fn with_log(mut self, log: Log<()>) -> Self {
        self.log = log;
        self
    }

    pub fn eof_token(&self) -> &TokenID {
        &self.eof_token
    }

    pub fn error_token(&self) -> &TokenID {
        &self.error_token
    }

    fn fresh_symbol(&mut self) -> SymbolID {
        let id = SymbolID(self.next_symbol);
        self.next_symbol += 1;
        id
    }

    /// Registers a token name (non-implicit names must match `[A-Z][a-zA-Z0-9]*`). Re-registering
    /// an existing token returns its existing id; a name already bound to a parselet fails.
    pub fn add_token(
        &mut self,
        name: impl Into<String>,
        description: Option<&str>,
        location: Location,
    ) -> Result<TokenID, GrammarError> {
        self.add_token_impl(name, description, false, location)
    }

    fn add_token_impl(
        &mut self,
        name: impl Into<String>,
        description: Option<&str>,
        is_implicit: bool,
        location: Location,
    ) -> Result<TokenID, GrammarError> {
        let name = name.into();
        if !is_implicit && !is_valid_token_name(&name) {
            return Err(GrammarError::new(
                location,
                format!("'{}' is not a legal token name", name),
            ));
        }
        if let Some(existing) = self.tokens_by_name.get(&name) {
            return Ok(existing.clone());
        }
        if self.parselets_by_name.contains_key(&name) {
            return Err(GrammarError::new(
                location,
                format!("'{}' is already registered as a parselet", name),
            ));
        }
        let id = self.fresh_symbol();
        let description = description.unwrap_or(&name).to_string();
        let token = TokenID::new(id, name.clone(), description, is_implicit, location);
        self.log.log_token_registered(&token);
        self.tokens_by_name.insert(name, token.clone());
        Ok(token)
    }

    /// Inserts a [SyntaxPattern] into the priority-ordered pattern list, to the right of any
    /// existing equal-priority entries.
    pub fn add_pattern(
        &mut self,
        token_id: TokenID,
        regex: Regex,
        priority: i64,
    ) -> Result<(), GrammarError> {
        let pattern = SyntaxPattern {
            token_id,
            regex: Rc::new(regex),
            priority,
        };
        let idx = self
            .patterns
            .partition_point(|existing| existing.priority <= priority);
        self.patterns.insert(idx, pattern);
        Ok(())
    }

    /// Creates (or reuses) an implicit token named after `literal`, with a regex that matches the
    /// literal verbatim at priority `-literal.len()`.
    pub fn add_implicit(&mut self, literal: &str, location: Location) -> Result<TokenID, GrammarError> {
        let token = self.add_token_impl(literal, Some(literal), true, location)?;
        if self
            .patterns
            .iter()
            .any(|p| p.token_id.id == token.id)
        {
            return Ok(token);
        }
        let pattern = regex::escape(literal);
        let regex = Regex::new(&pattern)
            .map_err(|e| GrammarError::new(token.location.clone(), format!("bad implicit pattern: {e}")))?;
        self.add_pattern(token.clone(), regex, -(literal.len() as i64))?;
        Ok(token)
    }

    pub fn add_trivia(&mut self, token_id: &TokenID) {
        self.trivia.insert(token_id.id.0);
    }

    pub fn is_trivia(&self, token_id: &TokenID) -> bool {
        self.trivia.contains(&token_id.id.0)
    }

    /// Registers `open`/`close` as a bracket pair: `open` nests, `close` un-nests.
    pub fn add_brackets(&mut self, open: &TokenID, close: &TokenID) {
        self.open_brackets.insert(open.id.0, close.id.0);
        self.close_brackets.insert(close.id.0);
        self.bracket_names
            .entry(open.id.0)
            .or_insert_with(|| open.name.clone());
        self.bracket_names
            .entry(close.id.0)
            .or_insert_with(|| close.name.clone());
    }

    pub fn is_open_bracket(&self, token_id: &TokenID) -> bool {
        self.open_brackets.contains_key(&token_id.id.0)
    }

    pub fn is_close_bracket(&self, token_id: &TokenID) -> bool {
        self.close_brackets.contains(&token_id.id.0)
    }

    /// Registers a parselet name. Re-registration with a different `kind` or `result_type` fails.
    pub fn add_parselet(
        &mut self,
        name: impl Into<String>,
        result_type: Type,
        kind: ParseletKind,
        location: Location,
    ) -> Result<ParseletID, GrammarError> {
        let name = name.into();
        if let Some(existing) = self.parselets_by_name.get(&name) {
            if existing.kind != kind || existing.result_type != result_type {
                return Err(GrammarError::new(
                    location,
                    format!(
                        "'{}' is already registered with a different kind or result type",
                        name
                    ),
                ));
            }
            return Ok(existing.clone());
        }
        if self.tokens_by_name.contains_key(&name) {
            return Err(GrammarError::new(
                location,
                format!("'{}' is already registered as a token", name),
            ));
        }
        let id = self.fresh_symbol();
        let parselet_id =
            ParseletID::with_kind_and_type(id, name.clone(), location, kind, result_type);
        self.log.log_parselet_registered(&parselet_id);
        self.parselets_by_name.insert(name, parselet_id.clone());
        self.tables.insert(
            parselet_id.id.0,
            match kind {
                ParseletKind::Packrat => AnyTable::Packrat(PackratTable::new(parselet_id.clone())),
                ParseletKind::Pratt => AnyTable::Pratt(PrattTable::new(parselet_id.clone())),
            },
        );
        Ok(parselet_id)
    }

    /// Registers a production for `parselet_id`, enforcing `action.result_type <: parselet.result_type`
    /// and dispatching to the parselet's table (Packrat or Pratt, per §4.F's registration rules).
    ///
    /// `body` accepts either an already-built [Combinator] or a rule body written as text (e.g.
    /// `name:Name ":" combinator:combinator`), which is compiled through the bootstrap
    /// [crate::meta] grammar before registration — this is the "`add_parser(parseletRef,
    /// combinator_or_text, ...)`" surface described for the engine's external interface.
    pub fn add_parser(
        &mut self,
        parselet_id: &ParseletID,
        body: impl Into<RuleBody>,
        action_generator: ActionGenerator,
        priority: i64,
        location: Location,
    ) -> Result<(), GrammarError> {
        let combinator = match body.into() {
            RuleBody::Combinator(c) => c,
            RuleBody::Text(text) => meta::make_combinator(self, &text, location.clone())?,
        };
        let action = action_generator(&combinator);
        if !types::is_subclass(&action.result_type(), &parselet_id.result_type) {
            return Err(GrammarError::new(
                location,
                format!(
                    "action result type {} is not a subtype of parselet result type {}",
                    action.result_type(),
                    parselet_id.result_type
                ),
            ));
        }
        let table = self
            .tables
            .get_mut(&parselet_id.id.0)
            .ok_or_else(|| GrammarError::new(location.clone(), "unknown parselet"))?;
        table.as_table_mut().add_parser(combinator, action, priority, location)
    }

    /// Convenience wrapper over [Grammar::add_parser] defaulting the action to
    /// [action::make_return_result].
    pub fn add_rule(
        &mut self,
        parselet_id: &ParseletID,
        body: impl Into<RuleBody>,
        priority: i64,
        location: Location,
    ) -> Result<(), GrammarError> {
        self.add_parser(
            parselet_id,
            body,
            action::make_return_result(),
            priority,
            location,
        )
    }

    pub fn token(&self, name: &str) -> Option<&TokenID> {
        self.tokens_by_name.get(name)
    }

    pub fn parselet(&self, name: &str) -> Option<&ParseletID> {
        self.parselets_by_name.get(name)
    }

    pub fn patterns(&self) -> &[SyntaxPattern] {
        &self.patterns
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenID> {
        self.tokens_by_name.values()
    }

    pub fn parselets(&self) -> impl Iterator<Item = &ParseletID> {
        self.parselets_by_name.values()
    }

    pub(crate) fn table_for(&self, parselet_id: &ParseletID) -> Option<&dyn ParseletTable> {
        self.tables.get(&parselet_id.id.0).map(AnyTable::as_table)
    }

    /// Copies `other`'s tokens (idempotent), parselets (idempotent, kind+type checked), trivia,
    /// brackets and patterns (deduplicated), then re-registers every parselet's productions
    /// against this grammar so cross-grammar ids get rewritten to this grammar's own ids.
    pub fn extend(&mut self, other: &Grammar) -> Result<(), GrammarError> {
        let mut correspondence: HashMap<usize, TokenID> = HashMap::new();
        for token in other.tokens_by_name.values() {
            let new_token = self.add_token_impl(
                token.name.clone(),
                Some(&token.description),
                token.is_implicit,
                token.location.clone(),
            )?;
            correspondence.insert(token.id.0, new_token);
        }

        for pattern in &other.patterns {
            let new_token = &correspondence[&pattern.token_id.id.0];
            let already = self.patterns.iter().any(|p| {
                p.token_id.id == new_token.id
                    && p.token_id.is_implicit == new_token.is_implicit
                    && p.priority == pattern.priority
                    && p.regex.as_str() == pattern.regex.as_str()
            });
            if !already {
                self.add_pattern(
                    new_token.clone(),
                    pattern.regex.as_str().parse_regex()?,
                    pattern.priority,
                )?;
            }
        }

        for token_id in &other.trivia {
            if let Some(t) = correspondence.get(token_id) {
                self.add_trivia(t);
            }
        }

        for (&open, &close) in &other.open_brackets {
            if let (Some(o), Some(c)) = (correspondence.get(&open), correspondence.get(&close)) {
                self.add_brackets(o, c);
            }
        }

        let mut parselet_correspondence: HashMap<usize, ParseletID> = HashMap::new();
        for parselet_id in other.parselets_by_name.values() {
            let new_id = self.add_parselet(
                parselet_id.name.clone(),
                parselet_id.result_type.clone(),
                parselet_id.kind,
                parselet_id.location.clone(),
            )?;
            parselet_correspondence.insert(parselet_id.id.0, new_id);
        }

        for parselet_id in other.parselets_by_name.values() {
            let table = other.tables.get(&parselet_id.id.0).expect("registered parselet has a table");
            let new_id = parselet_correspondence[&parselet_id.id.0].clone();
            for rule in table.as_table().parselets() {
                let rewritten = rewrite_combinator(&rule.combinator, &correspondence, &parselet_correspondence);
                self.add_parser(
                    &new_id,
                    rewritten,
                    Rc::new({
                        let action = rule.action.clone();
                        move |_: &Combinator| action.clone()
                    }),
                    rule.priority,
                    rule.location.clone(),
                )?;
            }
        }

        Ok(())
    }

    /// Returns a fresh grammar extended by each of `grammars`, in order.
    pub fn merge(grammars: &[&Grammar]) -> Result<Grammar, GrammarError> {
        let mut result = Grammar::new();
        for g in grammars {
            result.extend(g)?;
        }
        Ok(result)
    }
}

trait ParseRegexExt {
    fn parse_regex(&self) -> Result<Regex, GrammarError>;
}

impl ParseRegexExt for str {
    fn parse_regex(&self) -> Result<Regex, GrammarError> {
        Regex::new(self).map_err(|e| {
            GrammarError::new(Location::new("<pattern>"), format!("bad pattern: {e}"))
        })
    }
}

/// Rewrites a combinator tree copied from another grammar so its `TokenID`/`ParseletID` leaves
/// point at this grammar's own ids, per [Grammar::extend]'s correspondence maps.
fn rewrite_combinator(
    combinator: &Combinator,
    tokens: &HashMap<usize, TokenID>,
    parselets: &HashMap<usize, ParseletID>,
) -> Combinator {
    use crate::combinator::CombinatorKind::*;
    match combinator.kind() {
        Token(t) => Combinator::token(tokens.get(&t.id.0).cloned().unwrap_or_else(|| t.clone())),
        Parselet(p, priority) => Combinator::parselet(
            parselets.get(&p.id.0).cloned().unwrap_or_else(|| p.clone()),
            *priority,
        ),
        Sequence(cs) => Combinator::sequence(
            cs.iter().map(|c| rewrite_combinator(c, tokens, parselets)),
        ),
        Postfix(cs) => Combinator::postfix(
            cs.iter().map(|c| rewrite_combinator(c, tokens, parselets)).collect(),
        ),
        Named(name, inner) => {
            Combinator::named(name.clone(), rewrite_combinator(inner, tokens, parselets))
        }
        Optional(inner) => Combinator::optional(rewrite_combinator(inner, tokens, parselets)),
        Repeat(inner) => Combinator::repeat(rewrite_combinator(inner, tokens, parselets)),
    }
}

/// A grammar-level view over the token tables a scanner needs, kept separate from `Grammar`'s
/// mutation API so `Rc<Grammar>` can be shared freely between a [crate::parser::Parser] and its
/// [crate::scanner::Scanner].
pub type SharedGrammar = Rc<Grammar>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_token_rejects_bad_name() {
        let mut g = Grammar::new();
        let err = g.add_token("plus", None, Location::new("f"));
        assert!(err.is_err());
    }

    #[test]
    fn add_token_is_idempotent() {
        let mut g = Grammar::new();
        let a = g.add_token("Plus", None, Location::new("f")).unwrap();
        let b = g.add_token("Plus", None, Location::new("f")).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn add_implicit_uses_negative_length_priority() {
        let mut g = Grammar::new();
        let t = g.add_implicit("+", Location::new("f")).unwrap();
        let pattern = g.patterns().iter().find(|p| p.token_id.id == t.id).unwrap();
        assert_eq!(pattern.priority, -1);
    }

    #[test]
    fn add_parselet_rejects_kind_mismatch() {
        let mut g = Grammar::new();
        g.add_parselet("expr", Type::node(), ParseletKind::Packrat, Location::new("f"))
            .unwrap();
        let err = g.add_parselet("expr", Type::node(), ParseletKind::Pratt, Location::new("f"));
        assert!(err.is_err());
    }

    #[test]
    fn token_and_parselet_names_collide() {
        let mut g = Grammar::new();
        g.add_token("Plus", None, Location::new("f")).unwrap();
        let err = g.add_parselet("Plus", Type::node(), ParseletKind::Packrat, Location::new("f"));
        assert!(err.is_err());
    }
}
