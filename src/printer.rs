//! Human-readable dumps of grammars, patterns, parselets, combinators and types — debugging
//! output only, with no stable byte-for-byte format any other part of the crate depends on.
//!
//! `dump_combinator` dispatches through one `match` over [crate::combinator::CombinatorKind],
//! one arm per variant.

use std::borrow::Cow;

use ptree::TreeItem;

use crate::combinator::{Combinator, CombinatorKind};
use crate::grammar::table::{Parselet, ParseletTable};
use crate::grammar::{Grammar, SyntaxPattern};
use crate::symbol::{ParseletID, TokenID};
use crate::types::Type;
use crate::writer::{Color, Writer};

/// Appends `pattern`'s `token ::= r"regex"` line to `stream`.
pub fn dump_pattern(stream: &mut dyn Writer, pattern: &SyntaxPattern) {
    dump_token_id(stream, &pattern.token_id);
    stream.write_plain(" ::= r\"");
    stream.write(pattern.regex.as_str(), Some(Color::Magenta));
    stream.write_plain("\"");
}

/// Dumps every non-implicit pattern followed by every registered parselet, one per line.
pub fn dump_grammar(stream: &mut dyn Writer, grammar: &Grammar) {
    for pattern in grammar.patterns() {
        if pattern.token_id.is_implicit {
            continue;
        }
        dump_pattern(stream, pattern);
        stream.write_plain("\n");
    }

    for parselet_id in grammar.parselets() {
        let table = grammar
            .table_for(parselet_id)
            .expect("every registered parselet id has a table");
        for parselet in table.parselets() {
            dump_parselet(stream, parselet);
            stream.write_plain("\n");
        }
    }
}

/// Writes a token's name in red; implicit token names are quoted, matching how a literal
/// punctuation/keyword token reads in source (`'+' ::= r"\+"` rather than bare `+`).
pub fn dump_token_id(stream: &mut dyn Writer, token_id: &TokenID) {
    if token_id.is_implicit {
        stream.write(&format!("'{}'", token_id.name), Some(Color::Red));
    } else {
        stream.write(&token_id.name, Some(Color::Red));
    }
}

/// Writes a parselet's name in blue.
pub fn dump_parselet_id(stream: &mut dyn Writer, parselet_id: &ParseletID) {
    stream.write(&parselet_id.name, Some(Color::Blue));
}

/// Dumps one parselet as `name := combinator -> result_type`.
pub fn dump_parselet(stream: &mut dyn Writer, parselet: &Parselet) {
    dump_parselet_id(stream, &parselet.parselet_id);
    stream.write_plain(" := ");
    dump_combinator(stream, &parselet.combinator);
    stream.write_plain(" -> ");
    dump_type(stream, &parselet.parselet_id.result_type);
}

/// Dumps a combinator tree. `Named` parenthesizes a `Sequence` child (`name:( a b )`) so the
/// capture's extent reads unambiguously; every other variant matches the textual rule-body syntax
/// §4.I accepts as closely as a debug dump reasonably can.
pub fn dump_combinator(stream: &mut dyn Writer, combinator: &Combinator) {
    match combinator.kind() {
        CombinatorKind::Token(token_id) => dump_token_id(stream, token_id),
        CombinatorKind::Parselet(parselet_id, priority) => {
            dump_parselet_id(stream, parselet_id);
            if let Some(priority) = priority {
                stream.write_plain("<");
                stream.write(&priority.to_string(), Some(Color::Grey));
                stream.write_plain(">");
            }
        }
        CombinatorKind::Named(name, inner) => {
            stream.write(name, Some(Color::Grey));
            stream.write_plain(":");
            if matches!(inner.kind(), CombinatorKind::Sequence(_)) {
                stream.write_plain("( ");
                dump_combinator(stream, inner);
                stream.write_plain(" )");
            } else {
                dump_combinator(stream, inner);
            }
        }
        CombinatorKind::Optional(inner) => {
            stream.write_plain("[ ");
            dump_combinator(stream, inner);
            stream.write_plain(" ]");
        }
        CombinatorKind::Repeat(inner) => {
            stream.write_plain("{ ");
            dump_combinator(stream, inner);
            stream.write_plain(" }");
        }
        CombinatorKind::Sequence(cs) => {
            for (idx, child) in cs.iter().enumerate() {
                if idx > 0 {
                    stream.write_plain(" ");
                }
                dump_combinator(stream, child);
            }
        }
        CombinatorKind::Postfix(cs) => {
            for (idx, child) in cs.iter().enumerate() {
                if idx > 0 {
                    stream.write_plain(" ");
                }
                dump_combinator(stream, child);
            }
        }
    }
}

/// Spells out `Optional[T]`/`Sequence[T]` recursively; a scalar [Type] writes its own name.
pub fn dump_type(stream: &mut dyn Writer, typ: &Type) {
    match typ {
        Type::Optional(inner) => {
            stream.write("Optional", Some(Color::Green));
            stream.write_plain("[");
            dump_type(stream, inner);
            stream.write_plain("]");
        }
        Type::Sequence(inner) => {
            stream.write("Sequence", Some(Color::Green));
            stream.write_plain("[");
            dump_type(stream, inner);
            stream.write_plain("]");
        }
        Type::Token => stream.write("Token", Some(Color::Green)),
        Type::Node(None) => stream.write("SyntaxNode", Some(Color::Green)),
        Type::Node(Some(name)) => stream.write(name, Some(Color::Green)),
    }
}

/// A single-line label for one combinator node, with no recursion into its children — the label
/// half of the `(label, children)` split [TreeItem] wants, factored out of [dump_combinator]'s
/// recursive walk.
fn node_label(combinator: &Combinator) -> String {
    match combinator.kind() {
        CombinatorKind::Token(token_id) => to_string(token_id, dump_token_id),
        CombinatorKind::Parselet(parselet_id, priority) => match priority {
            Some(p) => format!("{}<{}>", parselet_id.name, p),
            None => parselet_id.name.clone(),
        },
        CombinatorKind::Named(name, _) => format!("{}:", name),
        CombinatorKind::Optional(_) => "optional".to_string(),
        CombinatorKind::Repeat(_) => "repeat".to_string(),
        CombinatorKind::Sequence(_) => "sequence".to_string(),
        CombinatorKind::Postfix(_) => "postfix".to_string(),
    }
}

/// The direct children of one combinator node, for [TreeItem::children] — `Named`/`Optional`/
/// `Repeat` each have exactly one, `Sequence`/`Postfix` have theirs in order, and the leaves
/// (`Token`/`Parselet`) have none.
fn node_children(combinator: &Combinator) -> Vec<Combinator> {
    match combinator.kind() {
        CombinatorKind::Token(_) | CombinatorKind::Parselet(_, _) => Vec::new(),
        CombinatorKind::Named(_, inner) | CombinatorKind::Optional(inner) | CombinatorKind::Repeat(inner) => {
            vec![(**inner).clone()]
        }
        CombinatorKind::Sequence(cs) | CombinatorKind::Postfix(cs) => cs.clone(),
    }
}

impl TreeItem for Combinator {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", node_label(self))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(node_children(self))
    }
}

/// Prints a combinator's shape as an indented tree to stdout — useful for a quick look at a rule's
/// structure without reading the linear `dump_combinator` form.
pub fn print_combinator_tree(combinator: &Combinator) -> std::io::Result<()> {
    ptree::print_tree(combinator)
}

/// Renders `value` through `dump` over a throwaway [crate::writer::PlainWriter], a `to_string`
/// convenience alongside the stream-writing form.
pub fn to_string<T>(value: &T, dump: impl Fn(&mut dyn Writer, &T)) -> String {
    let mut writer = crate::writer::PlainWriter::new();
    dump(&mut writer, value);
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::symbol::{ParseletKind, SymbolID};
    use crate::writer::PlainWriter;

    #[test]
    fn dump_type_spells_out_wrappers() {
        let typ = Type::Optional(Box::new(Type::Sequence(Box::new(Type::Token))));
        let out = to_string(&typ, dump_type);
        assert_eq!(out, "Optional[Sequence[Token]]");
    }

    #[test]
    fn dump_token_id_quotes_implicit_names() {
        let token = TokenID::new(SymbolID(1), "+", "plus", true, Location::new("f"));
        let out = to_string(&token, dump_token_id);
        assert_eq!(out, "'+'");
    }

    #[test]
    fn dump_token_id_leaves_explicit_names_bare() {
        let token = TokenID::new(SymbolID(1), "Number", "number", false, Location::new("f"));
        let out = to_string(&token, dump_token_id);
        assert_eq!(out, "Number");
    }

    #[test]
    fn dump_combinator_parenthesizes_named_sequence() {
        let token_a = TokenID::new(SymbolID(1), "A", "a", false, Location::new("f"));
        let token_b = TokenID::new(SymbolID(2), "B", "b", false, Location::new("f"));
        let inner = Combinator::sequence(vec![
            Combinator::token(token_a),
            Combinator::token(token_b),
        ]);
        let named = Combinator::named("pair", inner);
        let mut writer = PlainWriter::new();
        dump_combinator(&mut writer, &named);
        assert_eq!(writer.finish(), "pair:( A B )");
    }

    #[test]
    fn tree_item_exposes_one_child_per_wrapper_and_one_per_sequence_element() {
        let token_a = TokenID::new(SymbolID(1), "A", "a", false, Location::new("f"));
        let token_b = TokenID::new(SymbolID(2), "B", "b", false, Location::new("f"));
        let pair = Combinator::sequence(vec![
            Combinator::named("first", Combinator::token(token_a)),
            Combinator::named("second", Combinator::token(token_b)),
        ]);
        assert_eq!(pair.children().len(), 2);
        let named = Combinator::named("wrapped", pair);
        assert_eq!(named.children().len(), 1);
        assert_eq!(named.children()[0].children().len(), 2);
    }

    #[test]
    fn dump_parselet_id_is_just_the_name() {
        let parselet_id = ParseletID::with_kind_and_type(
            SymbolID(5),
            "expr",
            Location::new("f"),
            ParseletKind::Pratt,
            Type::node(),
        );
        let out = to_string(&parselet_id, dump_parselet_id);
        assert_eq!(out, "expr");
    }
}
