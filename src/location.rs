use std::fmt::{Display, Formatter};
use std::ops::Add;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// A one-based line and column position inside a source document.
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Compute `max(min, lhs + rhs)`, provided `min <= lhs`.
    fn bump(lhs: usize, rhs: isize, min: usize) -> usize {
        if rhs > 0 || (-rhs as usize) < lhs {
            (lhs as isize + rhs) as usize
        } else {
            min
        }
    }

    /// Advance to the next `count` lines, resetting the column to 1.
    pub fn lines(self, count: isize) -> Self {
        if count == 0 {
            return self;
        }
        Self::new(Self::bump(self.line, count, 1), 1)
    }

    /// Advance to the next `count` columns on the same line.
    pub fn columns(self, count: isize) -> Self {
        Self::new(self.line, Self::bump(self.column, count, 1))
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
/// A source span identified by filename and a begin/end [Position] pair.
///
/// `begin == end` represents a zero-width point, which is what [Location::step]
/// produces between tokens.
pub struct Location {
    pub filename: String,
    pub begin: Position,
    pub end: Position,
}

impl Location {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            begin: Position::default(),
            end: Position::default(),
        }
    }

    pub fn at(filename: impl Into<String>, begin: Position, end: Position) -> Self {
        Self {
            filename: filename.into(),
            begin,
            end,
        }
    }

    /// Collapse this location to a zero-width point at its current end.
    pub fn step(&self) -> Self {
        Self::at(self.filename.clone(), self.end, self.end)
    }

    /// Extend the end position by `count` columns.
    pub fn columns(&self, count: isize) -> Self {
        Self::at(self.filename.clone(), self.begin, self.end.columns(count))
    }

    /// Extend the end position by `count` lines.
    pub fn lines(&self, count: isize) -> Self {
        Self::at(self.filename.clone(), self.begin, self.end.lines(count))
    }
}

impl Add for Location {
    type Output = Location;

    fn add(self, other: Location) -> Location {
        Location::at(self.filename, self.begin, other.end)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.begin == self.end {
            write!(f, "{}:{}", self.filename, self.begin)
        } else if self.begin.line == self.end.line {
            write!(
                f,
                "{}:{}-{}",
                self.filename, self.begin, self.end.column
            )
        } else {
            write!(f, "{}:{}-{}", self.filename, self.begin, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_columns_advance() {
        let p = Position::new(1, 1).columns(4);
        assert_eq!(p, Position::new(1, 5));
    }

    #[test]
    fn position_lines_reset_column() {
        let p = Position::new(3, 7).lines(1);
        assert_eq!(p, Position::new(4, 1));
    }

    #[test]
    fn location_step_collapses() {
        let loc = Location::at("f", Position::new(1, 1), Position::new(1, 5));
        let stepped = loc.step();
        assert_eq!(stepped.begin, stepped.end);
        assert_eq!(stepped.begin, Position::new(1, 5));
    }

    #[test]
    fn location_display_same_line() {
        let loc = Location::at("f.txt", Position::new(2, 3), Position::new(2, 9));
        assert_eq!(format!("{}", loc), "f.txt:2:3-9");
    }

    #[test]
    fn location_display_multi_line() {
        let loc = Location::at("f.txt", Position::new(2, 3), Position::new(4, 1));
        assert_eq!(format!("{}", loc), "f.txt:2:3-4:1");
    }

    #[test]
    fn location_display_point() {
        let loc = Location::new("f.txt");
        assert_eq!(format!("{}", loc), "f.txt:1:1");
    }
}
