//! Threads: maximal end-to-end traversals through bonds.
//!
//! # Overview
//!
//! A thread models one genome at one point in the history: starting from
//! any segment, enter it through one end, leave through the other, cross
//! the bond on the exit side into the next segment, and repeat in both
//! directions until an unbonded side stops the walk (a linear thread) or
//! it returns to its start (a circular thread).
//!
//! # Algorithm
//!
//! Bond symmetry makes successor and predecessor inverse partial
//! functions on traversals, so every orbit is a simple path or a simple
//! cycle; the walk needs no visited bookkeeping beyond recognizing its
//! seed. A walk and its mirror (reversed order, flipped orientations)
//! describe the same physical thread, so threads are canonicalized: the
//! lexicographically smaller of the two directions, rotated for circular
//! threads so the smallest traversal comes first. The canonical form
//! makes [`HistoryGraph::thread_containing`] seed-independent.
//!
//! # Edge Cases
//!
//! - A segment with no bonds forms a one-traversal linear thread.
//! - A hairpin (left bonded to right of the same segment) forms a
//!   one-traversal circular thread.

use std::collections::HashSet;

use crate::error::HistoryError;
use crate::graph::HistoryGraph;
use crate::segment::{End, SegmentId};

/// Direction a segment is read in while walking a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Orientation {
    /// Entered at the left end, left at the right end.
    Forward,
    /// Entered at the right end, left at the left end.
    Reverse,
}

impl Orientation {
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// One step of a thread: a segment read in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Traversal {
    pub segment: SegmentId,
    pub orientation: Orientation,
}

impl Traversal {
    #[must_use]
    pub const fn new(segment: SegmentId, orientation: Orientation) -> Self {
        Self {
            segment,
            orientation,
        }
    }

    #[must_use]
    pub const fn forward(segment: SegmentId) -> Self {
        Self::new(segment, Orientation::Forward)
    }

    /// The same segment read the other way.
    #[must_use]
    pub const fn flipped(self) -> Self {
        Self::new(self.segment, self.orientation.flipped())
    }

    const fn entry_end(self) -> End {
        match self.orientation {
            Orientation::Forward => End::Left,
            Orientation::Reverse => End::Right,
        }
    }

    const fn exit_end(self) -> End {
        self.entry_end().opposite()
    }
}

/// An ordered maximal traversal. Canonical: two walks over the same
/// physical thread compare equal regardless of where they started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    traversals: Vec<Traversal>,
    circular: bool,
}

impl Thread {
    fn canonical(traversals: Vec<Traversal>, circular: bool) -> Self {
        let mirror: Vec<Traversal> = traversals.iter().rev().map(|t| t.flipped()).collect();
        let traversals = if circular {
            min_rotation(&traversals).min(min_rotation(&mirror))
        } else {
            traversals.min(mirror)
        };
        Self {
            traversals,
            circular,
        }
    }

    #[must_use]
    pub fn traversals(&self) -> &[Traversal] {
        &self.traversals
    }

    #[must_use]
    pub const fn is_circular(&self) -> bool {
        self.circular
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.traversals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traversals.is_empty()
    }

    /// Segments in walk order. A repeat would need a side bonded to
    /// itself, which bonding forbids, so every segment appears once.
    pub fn segments(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.traversals.iter().map(|t| t.segment)
    }

    #[must_use]
    pub fn contains(&self, segment: SegmentId) -> bool {
        self.segments().any(|s| s == segment)
    }
}

/// Rotate so the smallest traversal comes first. Orbits never repeat a
/// traversal, so the minimum is unique.
fn min_rotation(traversals: &[Traversal]) -> Vec<Traversal> {
    let Some(pos) = traversals
        .iter()
        .enumerate()
        .min_by_key(|(_, t)| **t)
        .map(|(pos, _)| pos)
    else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(traversals.len());
    out.extend_from_slice(&traversals[pos..]);
    out.extend_from_slice(&traversals[..pos]);
    out
}

impl HistoryGraph {
    /// The next traversal along the thread, crossing the exit-side bond.
    fn successor(&self, traversal: Traversal) -> Result<Option<Traversal>, HistoryError> {
        let exit = traversal.exit_end();
        let Some(partner) = self.get(traversal.segment)?.bond(exit) else {
            return Ok(None);
        };
        let orientation = match partner.end {
            End::Left => Orientation::Forward,
            End::Right => Orientation::Reverse,
        };
        Ok(Some(Traversal::new(partner.segment, orientation)))
    }

    /// The previous traversal along the thread, crossing the entry-side
    /// bond.
    fn predecessor(&self, traversal: Traversal) -> Result<Option<Traversal>, HistoryError> {
        let entry = traversal.entry_end();
        let Some(partner) = self.get(traversal.segment)?.bond(entry) else {
            return Ok(None);
        };
        let orientation = match partner.end {
            End::Right => Orientation::Forward,
            End::Left => Orientation::Reverse,
        };
        Ok(Some(Traversal::new(partner.segment, orientation)))
    }

    /// The canonical maximal thread containing `id`.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn thread_containing(&self, id: SegmentId) -> Result<Thread, HistoryError> {
        self.get(id)?;
        let seed = Traversal::forward(id);

        // Walk backwards to the start, or all the way around.
        let mut start = seed;
        let mut circular = false;
        loop {
            match self.predecessor(start)? {
                None => break,
                Some(previous) if previous == seed => {
                    circular = true;
                    break;
                }
                Some(previous) => start = previous,
            }
        }

        let mut traversals = vec![start];
        let mut current = start;
        while let Some(next) = self.successor(current)? {
            if next == start {
                break;
            }
            traversals.push(next);
            current = next;
        }
        Ok(Thread::canonical(traversals, circular))
    }

    /// Partition every live segment into threads, ordered by their
    /// smallest member handle.
    ///
    /// This recomputes from scratch on each call; rebuild-and-cache lives
    /// in [`rebuild_derived`](Self::rebuild_derived).
    ///
    /// # Errors
    ///
    /// Propagates handle-integrity failures from the walk; none occur on
    /// a graph mutated only through this API.
    pub fn threads(&self) -> Result<Vec<Thread>, HistoryError> {
        let mut assigned: HashSet<SegmentId> = HashSet::new();
        let mut threads = Vec::new();
        for id in self.segment_ids() {
            if assigned.contains(&id) {
                continue;
            }
            let thread = self.thread_containing(id)?;
            assigned.extend(thread.segments());
            threads.push(thread);
        }
        Ok(threads)
    }
}
