//! Segment records and the handles that address them.
//!
//! Segments live in the [`HistoryGraph`](crate::graph::HistoryGraph) arena
//! and refer to each other exclusively through [`SegmentId`] handles, never
//! through references. Handles are assigned at creation and never reused,
//! so a stale handle after a disconnect fails loudly instead of silently
//! resolving to a different segment.

use std::collections::BTreeSet;
use std::fmt;

use crate::label::Label;

/// Stable handle addressing one segment in a graph's arena.
///
/// Ordering follows creation order, which makes iteration over handle
/// collections deterministic.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(usize);

impl SegmentId {
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// The arena slot behind this handle.
    #[must_use]
    pub const fn as_index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two ends of a segment's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum End {
    Left,
    Right,
}

impl End {
    /// The other end of the same segment.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for End {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Address of one side (one end of one segment). Bonds connect two of
/// these; they are plain values, safe to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SideRef {
    pub segment: SegmentId,
    pub end: End,
}

impl SideRef {
    #[must_use]
    pub const fn new(segment: SegmentId, end: End) -> Self {
        Self { segment, end }
    }

    /// The left side of `segment`.
    #[must_use]
    pub const fn left(segment: SegmentId) -> Self {
        Self::new(segment, End::Left)
    }

    /// The right side of `segment`.
    #[must_use]
    pub const fn right(segment: SegmentId) -> Self {
        Self::new(segment, End::Right)
    }

    /// The opposite side of the same segment.
    #[must_use]
    pub const fn opposite(self) -> Self {
        Self::new(self.segment, self.end.opposite())
    }
}

impl fmt::Display for SideRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.end)
    }
}

/// Storage for one side: at most one symmetric, non-owning bond.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Side {
    pub(crate) bond: Option<SideRef>,
}

/// One ancestral segment: an optional label, descent links, and two sides.
///
/// All mutation goes through the owning graph so that the forest and bond
/// invariants hold after every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub(crate) label: Option<Label>,
    pub(crate) parent: Option<SegmentId>,
    pub(crate) children: BTreeSet<SegmentId>,
    pub(crate) left: Side,
    pub(crate) right: Side,
}

impl Segment {
    /// A fresh, detached segment. Every call allocates its own children
    /// set; nothing is shared between constructions.
    pub(crate) fn new(label: Option<Label>) -> Self {
        Self {
            label,
            parent: None,
            children: BTreeSet::new(),
            left: Side::default(),
            right: Side::default(),
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    #[must_use]
    pub fn is_labeled(&self) -> bool {
        self.label.is_some()
    }

    #[must_use]
    pub fn parent(&self) -> Option<SegmentId> {
        self.parent
    }

    /// Children in ascending handle order.
    pub fn children(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.children.iter().copied()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The bond partner of the given end, if that side is bonded.
    #[must_use]
    pub fn bond(&self, end: End) -> Option<SideRef> {
        self.side(end).bond
    }

    pub(crate) const fn side(&self, end: End) -> &Side {
        match end {
            End::Left => &self.left,
            End::Right => &self.right,
        }
    }

    pub(crate) const fn side_mut(&mut self, end: End) -> &mut Side {
        match end {
            End::Left => &mut self.left,
            End::Right => &mut self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ends_are_opposites() {
        assert_eq!(End::Left.opposite(), End::Right);
        assert_eq!(End::Right.opposite(), End::Left);
        let side = SideRef::left(SegmentId::from_index(3));
        assert_eq!(side.opposite(), SideRef::right(SegmentId::from_index(3)));
    }

    #[test]
    fn side_refs_render_compactly() {
        let side = SideRef::right(SegmentId::from_index(7));
        assert_eq!(side.to_string(), "7:right");
    }

    #[test]
    fn fresh_segments_share_nothing() {
        let a = Segment::new(None);
        let b = Segment::new(Some(Label::new('A')));
        assert!(a.is_root() && a.is_leaf() && !a.is_labeled());
        assert!(b.is_labeled());
        assert_eq!(a.child_count(), 0);
        assert_eq!(b.child_count(), 0);
    }
}
