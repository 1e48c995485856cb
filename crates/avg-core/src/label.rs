//! Sequence labels attached to segments.
//!
//! A label captures the printable form of whatever value it was built from
//! at construction time. All comparisons downstream (lifted-label
//! triviality, cost bounds, bridge detection) are defined over that
//! canonical rendering, so `Label::new(1)` and `Label::new("1")` are the
//! same label.

use std::fmt;

/// An immutable segment label, compared by its canonical printable form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    text: String,
}

impl Label {
    /// Build a label from anything printable. The rendering is captured
    /// once, here; later changes to the source value cannot leak in.
    pub fn new(value: impl fmt::Display) -> Self {
        Self {
            text: value.to_string(),
        }
    }

    /// The canonical rendering.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self {
            text: value.to_string(),
        }
    }
}
