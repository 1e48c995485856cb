//! Structural validation of a history graph.
//!
//! # Overview
//!
//! Every mutation in [`crate::graph`] preserves the representation
//! invariants, so a graph driven purely through the public API always
//! passes. [`HistoryGraph::validate`] re-checks them from scratch anyway:
//! it is the oracle tests and long-running pipelines lean on after a
//! batch of edits, and the first thing to run when persisted state is
//! loaded from elsewhere.
//!
//! # Checks
//!
//! Per segment, in ascending id order: the parent link is live and the
//! parent records the child; every recorded child is live and points
//! back; every bond is live, symmetric, and not a side bonded to itself;
//! the substitution cost bounds are ordered. After the per-segment pass,
//! a sweep from the roots confirms descent is acyclic.

use std::collections::HashSet;

use tracing::{instrument, trace};

use crate::error::HistoryError;
use crate::event::ThreadId;
use crate::graph::HistoryGraph;
use crate::segment::{End, Segment, SegmentId, SideRef};

/// A representation invariant does not hold.
///
/// On a graph mutated only through the public API these indicate a bug
/// in this crate; they are reachable for callers who deserialize or
/// hand-assemble state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralViolation {
    /// A segment names a parent that does not record it as a child.
    #[error("segment {child} names {parent} as parent but is not recorded as its child")]
    MissingChildRecord { parent: SegmentId, child: SegmentId },

    /// A segment records a child that does not point back at it.
    #[error("segment {parent} records child {child} which does not name it as parent")]
    ParentMismatch { parent: SegmentId, child: SegmentId },

    /// A segment records a child that is not live.
    #[error("segment {parent} records unknown child {child}")]
    DanglingChild { parent: SegmentId, child: SegmentId },

    /// A segment names a parent that is not live.
    #[error("segment {child} names unknown parent {parent}")]
    DanglingParent { child: SegmentId, parent: SegmentId },

    /// A bonded side whose partner does not carry the matching bond.
    #[error("side {side} is bonded to {partner} without a bond back")]
    AsymmetricBond { side: SideRef, partner: SideRef },

    /// A bonded side whose partner segment is not live.
    #[error("side {side} is bonded to {partner} on an unknown segment")]
    DanglingBond { side: SideRef, partner: SideRef },

    /// A side bonded to itself. A hairpin joining the two opposite ends
    /// of one segment is legal; one side as its own partner is not.
    #[error("side {side} is bonded to itself")]
    SelfBondedSide { side: SideRef },

    /// Substitution cost bounds out of order.
    #[error("segment {segment} has lower substitution bound {lower} above upper bound {upper}")]
    InvertedCostBounds {
        segment: SegmentId,
        lower: usize,
        upper: usize,
    },

    /// Descent reaches a segment from itself.
    #[error("descent at segment {segment} is cyclic")]
    DescentCycle { segment: SegmentId },

    /// Descent enters and leaves one thread, so no event ordering exists.
    #[error("event ordering is cyclic at thread {thread}")]
    EventOrderCycle { thread: ThreadId },
}

impl HistoryGraph {
    /// Check every representation invariant, reporting the first
    /// violation in ascending segment order.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Structural`] wrapping the first
    /// [`StructuralViolation`] found.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), HistoryError> {
        for id in self.segment_ids() {
            self.validate_segment(id)?;
        }
        self.check_acyclic()?;
        trace!(segments = self.len(), "validated");
        Ok(())
    }

    /// Check one segment's local invariants: descent links agree in both
    /// directions, bonds are live and symmetric, and the substitution
    /// cost bounds are ordered. Descent acyclicity is a whole-graph
    /// property and belongs to [`HistoryGraph::validate`].
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live,
    /// [`HistoryError::Structural`] wrapping the first violation found.
    pub fn validate_segment(&self, id: SegmentId) -> Result<(), HistoryError> {
        let segment = self.get(id)?;
        self.check_links(id, segment)?;
        self.check_bonds(id, segment)?;
        let lower = self.lower_bound_substitution_cost(id)?;
        let upper = self.upper_bound_substitution_cost(id)?;
        if lower > upper {
            return Err(StructuralViolation::InvertedCostBounds {
                segment: id,
                lower,
                upper,
            }
            .into());
        }
        Ok(())
    }

    fn check_links(&self, id: SegmentId, segment: &Segment) -> Result<(), StructuralViolation> {
        if let Some(parent) = segment.parent() {
            match self.segment(parent) {
                None => return Err(StructuralViolation::DanglingParent { child: id, parent }),
                Some(record) if !record.children().any(|c| c == id) => {
                    return Err(StructuralViolation::MissingChildRecord { parent, child: id });
                }
                Some(_) => {}
            }
        }
        for child in segment.children() {
            match self.segment(child) {
                None => return Err(StructuralViolation::DanglingChild { parent: id, child }),
                Some(record) if record.parent() != Some(id) => {
                    return Err(StructuralViolation::ParentMismatch { parent: id, child });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn check_bonds(&self, id: SegmentId, segment: &Segment) -> Result<(), StructuralViolation> {
        for end in [End::Left, End::Right] {
            let side = SideRef::new(id, end);
            let Some(partner) = segment.bond(end) else {
                continue;
            };
            if partner == side {
                return Err(StructuralViolation::SelfBondedSide { side });
            }
            match self.segment(partner.segment) {
                None => return Err(StructuralViolation::DanglingBond { side, partner }),
                Some(record) if record.bond(partner.end) != Some(side) => {
                    return Err(StructuralViolation::AsymmetricBond { side, partner });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Sweep descent from the roots; a live segment the sweep never
    /// reaches sits on (or under) a parent cycle.
    fn check_acyclic(&self) -> Result<(), StructuralViolation> {
        let mut reached = HashSet::new();
        let mut stack: Vec<SegmentId> = self.roots().collect();
        while let Some(id) = stack.pop() {
            if !reached.insert(id) {
                continue;
            }
            if let Some(segment) = self.segment(id) {
                stack.extend(segment.children());
            }
        }
        match self.segment_ids().find(|id| !reached.contains(id)) {
            Some(segment) => Err(StructuralViolation::DescentCycle { segment }),
            None => Ok(()),
        }
    }
}
