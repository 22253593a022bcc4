//! Colored output sinks and diagnostic excerpt rendering.
//!
//! [Writer] is the minimal capability the rest of the crate depends on: a sink that can emit a
//! handful of fragments with an optional [Color]. [PlainWriter] discards styling; [ColorWriter]
//! renders through the [colored] crate and is only meant to be attached to an interactive stream.
//! [IndentWriter] decorates either one with a per-line indent counter, mirroring how
//! [crate::printer] nests a grammar dump.

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};

use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Foreground color understood by [ColorWriter].
pub enum Color {
    Grey,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    fn paint(self, text: &str) -> ColoredString {
        match self {
            Color::Grey => text.bright_black(),
            Color::Red => text.red(),
            Color::Green => text.green(),
            Color::Yellow => text.yellow(),
            Color::Blue => text.blue(),
            Color::Magenta => text.magenta(),
            Color::Cyan => text.cyan(),
            Color::White => text.white(),
        }
    }
}

/// A sink that accumulates textual fragments, optionally styled with a [Color].
///
/// Implementors write into an in-memory buffer rather than directly to a stream, so a caller can
/// retrieve the finished string with [Writer::finish] instead of the crate depending on `io::Write`.
pub trait Writer {
    fn write(&mut self, text: &str, color: Option<Color>);
    fn finish(self) -> String;

    fn write_plain(&mut self, text: &str) {
        self.write(text, None);
    }
}

#[derive(Debug, Default)]
/// A [Writer] that discards color information entirely.
pub struct PlainWriter {
    buffer: String,
}

impl PlainWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for PlainWriter {
    fn write(&mut self, text: &str, _color: Option<Color>) {
        self.buffer.push_str(text);
    }

    fn finish(self) -> String {
        self.buffer
    }
}

#[derive(Debug, Default)]
/// A [Writer] that renders ANSI escapes for styled fragments.
///
/// Callers should only construct this over a stream known to be a terminal; the crate does not
/// perform that detection itself since [Writer] works over an in-memory buffer.
pub struct ColorWriter {
    buffer: String,
}

impl ColorWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for ColorWriter {
    fn write(&mut self, text: &str, color: Option<Color>) {
        match color {
            Some(c) => {
                let _ = write!(self.buffer, "{}", c.paint(text));
            }
            None => self.buffer.push_str(text),
        }
    }

    fn finish(self) -> String {
        self.buffer
    }
}

/// Decorates a [Writer] with a per-line indent, matching the convention used by [crate::printer].
pub struct IndentWriter<W: Writer> {
    inner: W,
    indent_size: usize,
    indent: usize,
    at_line_start: bool,
}

impl<W: Writer> IndentWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            indent_size: 4,
            indent: 0,
            at_line_start: true,
        }
    }

    pub fn with_indent_size(inner: W, indent_size: usize) -> Self {
        Self {
            inner,
            indent_size,
            indent: 0,
            at_line_start: true,
        }
    }

    /// Run `body` with the indent level increased by one step.
    pub fn indented(&mut self, body: impl FnOnce(&mut Self)) {
        self.indent += self.indent_size;
        body(self);
        self.indent -= self.indent_size;
    }
}

impl<W: Writer> Writer for IndentWriter<W> {
    fn write(&mut self, text: &str, color: Option<Color>) {
        if self.at_line_start && !text.is_empty() {
            self.at_line_start = false;
            self.inner.write(&" ".repeat(self.indent), None);
        }
        self.inner.write(text, color);
        if text.ends_with('\n') {
            self.at_line_start = true;
        }
    }

    fn finish(self) -> String {
        self.inner.finish()
    }
}

/// Creates a writer appropriate for `is_tty`: a [ColorWriter] when true, a [PlainWriter] otherwise.
pub fn create_writer(is_tty: bool) -> Box<dyn Writer> {
    if is_tty {
        Box::new(ColorWriter::new())
    } else {
        Box::new(PlainWriter::new())
    }
}

/// Renders a `[filename:line:col] message` header followed by an annotated excerpt of `content`
/// spanning two lines before and after `location`, with the offending span underlined by carets.
/// Always operates against in-memory `content` — this crate never re-reads the source from disk.
pub fn render_excerpt(location: &Location, message: &str, content: &str) -> String {
    let before = 2usize;
    let after = 2usize;
    let at_before = location.begin.line.saturating_sub(before).max(1);
    let at_after = location.end.line + after;

    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(idx, _)| *idx >= at_before && *idx <= at_after)
        .collect();

    if lines.is_empty() {
        return format!("[{}] {}", location, message);
    }

    let width = lines
        .iter()
        .map(|(idx, _)| idx.to_string().len())
        .max()
        .unwrap_or(1)
        .max(5);

    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}:", location, message);

    let is_error_column = |line: usize, column: usize| -> bool {
        let mut hit = true;
        if location.begin.line == line {
            hit &= column >= location.begin.column;
        }
        if location.end.line == line {
            hit &= column <= location.end.column;
        }
        hit
    };

    for (line, text) in &lines {
        let _ = writeln!(out, "{:>width$} : {}", line, text, width = width);

        if location.begin.line <= *line && *line <= location.end.line {
            let mut caret_line = String::new();
            caret_line.push_str(&"·".repeat(width));
            caret_line.push_str(" : ");
            for (column, _) in text.chars().enumerate().map(|(i, c)| (i + 1, c)) {
                caret_line.push(if is_error_column(*line, column) { '^' } else { '·' });
            }
            if text.is_empty() && is_error_column(*line, 1) {
                caret_line.push('^');
            }
            let _ = writeln!(out, "{}", caret_line);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;

    #[test]
    fn plain_writer_ignores_color() {
        let mut w = PlainWriter::new();
        w.write("hello", Some(Color::Red));
        assert_eq!(w.finish(), "hello");
    }

    #[test]
    fn indent_writer_prefixes_lines() {
        let mut w = IndentWriter::new(PlainWriter::new());
        w.indented(|w| {
            w.write_plain("a\n");
            w.write_plain("b\n");
        });
        assert_eq!(w.finish(), "    a\n    b\n");
    }

    #[test]
    fn render_excerpt_marks_span() {
        let loc = Location::at("f.txt", Position::new(1, 1), Position::new(1, 3));
        let out = render_excerpt(&loc, "oops", "abc\ndef\n");
        assert!(out.contains("abc"));
        assert!(out.contains("^^^"));
    }
}
