//! Longest-match tokenizer, trivia filtering, and offside/indentation layering.
//!
//! [Scanner] is the raw lexeme source: it walks a [SharedGrammar]'s pattern list and produces one
//! [SyntaxToken] per call to [Iterator::next], falling back to a one-character `<ERROR>` token when
//! nothing matches. [DefaultScanner] wraps it to drop trivia; [IndentationScanner] wraps the raw
//! scanner directly (it needs to see trivia tokens itself) to layer Python-style `Indent`/`Dedent`
//! tokens over the base stream.

use crate::error::GrammarError;
use crate::grammar::{Grammar, SharedGrammar};
use crate::location::Location;
use crate::symbol::TokenID;
use crate::syntax::SyntaxToken;

/// A longest-match tokenizer over one grammar and one source buffer.
///
/// Matches every registered [crate::grammar::SyntaxPattern] at the current cursor; the pattern
/// whose match extends furthest wins, ties broken in favor of the pattern that appears later in
/// the priority-sorted list (i.e. higher priority). A position nothing matches yields a
/// one-character `<ERROR>` token instead of stopping the scan.
pub struct Scanner {
    grammar: SharedGrammar,
    buffer: String,
    position: usize,
    location: Location,
    done: bool,
}

impl Scanner {
    pub fn new(grammar: SharedGrammar, filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            grammar,
            buffer: content.into(),
            position: 0,
            location: Location::new(filename.into()),
            done: false,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn eof_id(&self) -> &TokenID {
        self.grammar.eof_token()
    }

    pub fn error_id(&self) -> &TokenID {
        self.grammar.error_token()
    }

    /// Advances `self.location` by the characters of `value`, returning the location the emitted
    /// token should carry: the span up to (but not through) the advance caused by `value`'s final
    /// character. A single-character `value` therefore yields a zero-width location, matching how
    /// a lone `NewLine` token is reported at the point before the line break it consumes.
    fn consume_location(&mut self, value: &str) -> Location {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() > 1 {
            for &c in &chars[..chars.len() - 1] {
                self.location = if c == '\n' {
                    self.location.lines(1)
                } else {
                    self.location.columns(1)
                };
            }
        }
        let location = self.location.clone();
        self.location = if chars.last() == Some(&'\n') {
            self.location.lines(1)
        } else {
            self.location.columns(1)
        };
        location
    }

    fn match_next(&mut self) -> SyntaxToken {
        self.location = self.location.step();
        let slice = &self.buffer.as_bytes()[self.position..];

        let mut best_end = None;
        let mut best_token: Option<TokenID> = None;
        for pattern in self.grammar.patterns() {
            if let Some(m) = pattern.regex.find(slice) {
                if m.start() == 0 && best_end.map_or(true, |end| m.end() >= end) {
                    best_end = Some(m.end());
                    best_token = Some(pattern.token_id.clone());
                }
            }
        }

        let (token_id, value) = match (best_token, best_end) {
            (Some(token_id), Some(end)) => {
                let value = std::str::from_utf8(&slice[..end])
                    .expect("a pattern matched across a UTF-8 character boundary")
                    .to_string();
                self.position += end;
                (token_id, value)
            }
            _ => {
                let ch = self.buffer[self.position..]
                    .chars()
                    .next()
                    .expect("match_next called with an exhausted buffer");
                self.position += ch.len_utf8();
                (self.error_id().clone(), ch.to_string())
            }
        };

        let location = self.consume_location(&value);
        SyntaxToken::new(token_id, value, location)
    }
}

impl Iterator for Scanner {
    type Item = SyntaxToken;

    fn next(&mut self) -> Option<SyntaxToken> {
        if self.done {
            return None;
        }
        if self.position >= self.buffer.len() {
            self.done = true;
            let location = self.location.step();
            return Some(SyntaxToken::new(self.eof_id().clone(), "", location));
        }
        Some(self.match_next())
    }
}

/// Wraps [Scanner], dropping every token whose id is registered as trivia.
pub struct DefaultScanner {
    inner: Scanner,
}

impl DefaultScanner {
    pub fn new(grammar: SharedGrammar, filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            inner: Scanner::new(grammar, filename, content),
        }
    }

    pub fn grammar(&self) -> &Grammar {
        self.inner.grammar()
    }
}

impl Iterator for DefaultScanner {
    type Item = SyntaxToken;

    fn next(&mut self) -> Option<SyntaxToken> {
        loop {
            let token = self.inner.next()?;
            if !self.inner.grammar().is_trivia(&token.id) {
                return Some(token);
            }
        }
    }
}

/// Wraps the raw [Scanner] with Python-style offside/indentation tracking, producing `Indent` and
/// `Dedent` tokens around lines whose leading whitespace width changes.
///
/// If the host grammar does not already define `NewLine`, `Whitespace`, `Indent` or `Dedent`, the
/// constructor registers them — this is why it takes an owned [Grammar] rather than a
/// [SharedGrammar]: registration needs `&mut Grammar`, which is no longer available once a grammar
/// is shared between a scanner and a parser.
pub struct IndentationScanner {
    inner: Scanner,
    grammar: SharedGrammar,
    newline_id: TokenID,
    whitespace_id: TokenID,
    indent_id: TokenID,
    dedent_id: TokenID,
    indentations: Vec<usize>,
    is_new_line: bool,
    pending_whitespace: Option<SyntaxToken>,
    level: i64,
    queue: std::collections::VecDeque<SyntaxToken>,
    finished: bool,
}

impl IndentationScanner {
    pub fn new(
        mut grammar: Grammar,
        filename: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, GrammarError> {
        let newline_id = Self::ensure_token(&mut grammar, "NewLine")?;
        let whitespace_id = Self::ensure_token(&mut grammar, "Whitespace")?;
        let indent_id = Self::ensure_token(&mut grammar, "Indent")?;
        let dedent_id = Self::ensure_token(&mut grammar, "Dedent")?;
        let grammar: SharedGrammar = std::rc::Rc::new(grammar);
        let inner = Scanner::new(std::rc::Rc::clone(&grammar), filename, content);
        Ok(Self {
            inner,
            grammar,
            newline_id,
            whitespace_id,
            indent_id,
            dedent_id,
            indentations: vec![0],
            is_new_line: true,
            pending_whitespace: None,
            level: 0,
            queue: std::collections::VecDeque::new(),
            finished: false,
        })
    }

    fn ensure_token(grammar: &mut Grammar, name: &str) -> Result<TokenID, GrammarError> {
        if let Some(existing) = grammar.token(name) {
            Ok(existing.clone())
        } else {
            grammar.add_token(name, None, Location::new("<indentation-scanner>"))
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    fn handle(&mut self, token: SyntaxToken) {
        if token.id == self.newline_id {
            if self.level > 0 {
                return;
            }
            if !self.is_new_line {
                self.queue.push_back(token);
            }
            self.is_new_line = true;
            return;
        }

        if token.id == self.whitespace_id {
            if self.is_new_line {
                self.pending_whitespace = Some(token);
            }
            return;
        }

        if token.id == *self.inner.eof_id() {
            let location = token.location.step();
            if !self.is_new_line {
                self.queue
                    .push_back(SyntaxToken::new(self.newline_id.clone(), "", location.clone()));
            }
            while *self.indentations.last().expect("indentation stack is never empty") > 0 {
                self.queue
                    .push_back(SyntaxToken::new(self.dedent_id.clone(), "", location.clone()));
                self.indentations.pop();
            }
            self.queue.push_back(token);
            self.finished = true;
            return;
        }

        if self.grammar.is_trivia(&token.id) {
            return;
        }

        if self.is_new_line {
            let (indent, location) = match self.pending_whitespace.take() {
                Some(ws) => (ws.value.chars().count(), ws.location),
                None => (0, Location::at(token.location.filename.clone(), token.location.begin, token.location.begin)),
            };
            let top = *self.indentations.last().expect("indentation stack is never empty");
            if top < indent {
                self.queue
                    .push_back(SyntaxToken::new(self.indent_id.clone(), "", location.clone()));
                self.indentations.push(indent);
            } else {
                while *self.indentations.last().expect("indentation stack is never empty") > indent {
                    self.queue
                        .push_back(SyntaxToken::new(self.dedent_id.clone(), "", location.clone()));
                    self.indentations.pop();
                }
            }
        }
        self.is_new_line = false;

        if self.grammar.is_open_bracket(&token.id) {
            self.level += 1;
        } else if self.grammar.is_close_bracket(&token.id) {
            self.level -= 1;
        }
        self.queue.push_back(token);
    }
}

impl Iterator for IndentationScanner {
    type Item = SyntaxToken;

    fn next(&mut self) -> Option<SyntaxToken> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(token);
            }
            if self.finished {
                return None;
            }
            let token = self.inner.next()?;
            self.handle(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::ParseletKind;
    use crate::types::Type;
    use std::rc::Rc;

    fn number_grammar() -> Grammar {
        let mut g = Grammar::new();
        let number = g.add_token("Number", None, Location::new("f")).unwrap();
        g.add_pattern(number, regex::bytes::Regex::new(r"^[0-9]+").unwrap(), 10).unwrap();
        let plus = g.add_implicit("+", Location::new("f")).unwrap();
        let _ = plus;
        let whitespace = g.add_token("Whitespace", None, Location::new("f")).unwrap();
        g.add_pattern(whitespace, regex::bytes::Regex::new(r"^[ \t]+").unwrap(), 10).unwrap();
        g.add_trivia(&whitespace);
        g
    }

    #[test]
    fn longest_match_wins_on_shared_prefix() {
        let mut g = Grammar::new();
        let name = g.add_token("Name", None, Location::new("f")).unwrap();
        g.add_pattern(name, regex::bytes::Regex::new(r"^[a-z]+").unwrap(), 10).unwrap();
        let kw = g.add_implicit("in", Location::new("f")).unwrap();
        let scanner = Scanner::new(Rc::new(g), "f", "inside");
        let token = scanner.into_iter().next().unwrap();
        assert_eq!(token.id, name);
        assert_ne!(token.id, kw);
        assert_eq!(token.value, "inside");
    }

    #[test]
    fn scanner_emits_eof_once() {
        let g = number_grammar();
        let mut scanner = Scanner::new(Rc::new(g), "f", "1");
        let first = scanner.next().unwrap();
        assert_eq!(first.value, "1");
        let second = scanner.next().unwrap();
        assert_eq!(second.id.name, "<EOF>");
        assert!(scanner.next().is_none());
    }

    #[test]
    fn unmatched_byte_becomes_error_token() {
        let g = number_grammar();
        let mut scanner = Scanner::new(Rc::new(g), "f", "@");
        let token = scanner.next().unwrap();
        assert_eq!(token.id.name, "<ERROR>");
        assert_eq!(token.value, "@");
    }

    #[test]
    fn default_scanner_drops_trivia() {
        let g = number_grammar();
        let scanner = DefaultScanner::new(Rc::new(g), "f", "1 + 2");
        let values: Vec<String> = scanner.map(|t| t.value).collect();
        assert_eq!(values, vec!["1", "+", "2", ""]);
    }

    #[test]
    fn indentation_scanner_brackets_nested_block() {
        let mut g = Grammar::new();
        let name = g.add_token("Name", None, Location::new("f")).unwrap();
        g.add_pattern(name, regex::bytes::Regex::new(r"^[a-z]+").unwrap(), 10).unwrap();
        let colon = g.add_implicit(":", Location::new("f")).unwrap();
        let _ = colon;
        let newline = g.add_token("NewLine", None, Location::new("f")).unwrap();
        g.add_pattern(newline, regex::bytes::Regex::new(r"^\n").unwrap(), 10).unwrap();
        let whitespace = g.add_token("Whitespace", None, Location::new("f")).unwrap();
        g.add_pattern(whitespace, regex::bytes::Regex::new(r"^[ \t]+").unwrap(), 10).unwrap();

        let scanner = IndentationScanner::new(g, "f", "a:\n  b\n  c\nd").unwrap();
        let names: Vec<String> = scanner.map(|t| t.id.name.clone()).collect();
        assert_eq!(
            names,
            vec![
                "Name", ":", "NewLine", "Indent", "Name", "NewLine", "Name", "NewLine", "Dedent", "Name", "NewLine",
                "<EOF>",
            ]
        );
    }

    #[test]
    fn parselet_and_token_names_remain_distinct_after_scanning() {
        let mut g = Grammar::new();
        g.add_parselet("expr", Type::node(), ParseletKind::Packrat, Location::new("f"))
            .unwrap();
        assert!(g.token("expr").is_none());
        assert!(g.parselet("expr").is_some());
    }
}
