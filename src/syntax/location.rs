use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in a text document expressed as zero-based line and character offset.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Default, Deserialize, Serialize)]
pub struct Position {
    /// Line position in a document (zero-based).
    pub line: u32,
    /// Character offset on a line in a document (zero-based).
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

// The effective range of a node.
// `start` inclusive, `end` exclusive.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Default, Deserialize, Serialize)]
pub struct EffectiveRange {
    #[serde(default)]
    pub length: u32,
    pub start: Position,
    pub end: Position,
}

impl EffectiveRange {
    pub fn new(start: Position, end: Position, length: u32) -> Self {
        Self { length, start, end }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line:{}:{}", self.line, self.character)
    }
}

impl fmt::Display for EffectiveRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.start, f)
    }
}

/// Anything that occupies a range of the source and can anchor a diagnostic.
pub trait Locatable {
    fn range(&self) -> EffectiveRange;
}

impl Locatable for EffectiveRange {
    fn range(&self) -> EffectiveRange {
        *self
    }
}

impl<T: Locatable + ?Sized> Locatable for &T {
    fn range(&self) -> EffectiveRange {
        (**self).range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_position() {
        let range = EffectiveRange::new(Position::new(3, 7), Position::new(3, 9), 2);
        assert_eq!(range.to_string(), "line:3:7");
    }
}
