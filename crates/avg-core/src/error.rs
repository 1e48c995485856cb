//! Error types for graph mutation and queries.
//!
//! Two failure families exist. Precondition violations ([`HistoryError`])
//! are caller mistakes: a mutation or query was asked to do something the
//! current state does not permit, and the graph is left unchanged.
//! Invariant violations ([`StructuralViolation`]) are reported by
//! validation and by the derived-state rebuild; on a graph mutated only
//! through this API they indicate a bug here, not in the caller.

use crate::segment::{SegmentId, SideRef};
use crate::validate::StructuralViolation;

/// A mutation or query precondition did not hold. The operation performed
/// no observable change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// The handle does not name a live segment (never created, or already
    /// disconnected).
    #[error("unknown segment {0}")]
    UnknownSegment(SegmentId),

    /// `delete_branch` was asked to remove a descent edge that does not
    /// exist.
    #[error("segment {child} is not a child of segment {parent}")]
    NotAChild { parent: SegmentId, child: SegmentId },

    /// `create_branch` was asked to adopt a child that already has a
    /// different parent. Detach the child first; re-parenting is never
    /// implicit.
    #[error("segment {child} already descends from {existing}; delete that branch first")]
    AlreadyParented { child: SegmentId, existing: SegmentId },

    /// The requested branch would make a segment its own ancestor.
    #[error("branch {parent} -> {child} would create a descent cycle")]
    WouldCycle { parent: SegmentId, child: SegmentId },

    /// `create_bond` was asked to bond a side that is already bonded.
    /// Delete the old bond first; silent re-bonding would leave the old
    /// partner pointing at a side that no longer points back.
    #[error("side {side} is already bonded to {partner}; delete that bond first")]
    AlreadyBonded { side: SideRef, partner: SideRef },

    /// A side cannot bond to itself. Bonding the two ends of one segment
    /// to each other (a hairpin) is allowed; this error is only about one
    /// single side.
    #[error("cannot bond side {0} to itself")]
    SelfBond(SideRef),

    /// An invariant violation surfaced while recomputing derived state or
    /// validating.
    #[error(transparent)]
    Structural(#[from] StructuralViolation),
}
