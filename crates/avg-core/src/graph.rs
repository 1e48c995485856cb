//! The segment arena and its mutation surface.
//!
//! # Overview
//!
//! A [`HistoryGraph`] owns every segment of one ancestral history in a flat
//! arena indexed by [`SegmentId`]. Parent/child descent and side bonds are
//! stored as handles into the same arena, so the whole structure is `Clone`
//! and has no ownership cycles. Slots are never reused: disconnecting a
//! segment leaves a permanent hole, and a stale handle keeps failing with
//! [`HistoryError::UnknownSegment`] instead of aliasing a newer segment.
//!
//! # Mutation discipline
//!
//! Every mutation validates its preconditions before touching any state,
//! so a returned error means nothing changed. Two generation stamps track
//! change: `generation` advances on every mutation (including label edits)
//! and keys the lifted-label cache; `structure_generation` advances only
//! when descent or bonds change and marks derived thread/event state stale.

use std::cell::RefCell;

use tracing::trace;

use crate::error::HistoryError;
use crate::event::DerivedState;
use crate::label::Label;
use crate::lift::LiftTables;
use crate::segment::{Segment, SegmentId, SideRef};

/// An ancestral history: a forest of segments plus lateral bonds between
/// segment sides.
#[derive(Debug, Clone)]
pub struct HistoryGraph {
    pub(crate) arena: Vec<Option<Segment>>,
    pub(crate) live: usize,
    pub(crate) generation: u64,
    pub(crate) structure_generation: u64,
    pub(crate) lift: RefCell<Option<LiftTables>>,
    pub(crate) derived: Option<DerivedState>,
}

impl Default for HistoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: same slots holding the same segments. Generation
/// stamps, caches, and derived state are deliberately ignored.
impl PartialEq for HistoryGraph {
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena
    }
}

impl Eq for HistoryGraph {}

impl HistoryGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            live: 0,
            generation: 0,
            structure_generation: 0,
            lift: RefCell::new(None),
            derived: None,
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    /// Number of live segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Does `id` name a live segment?
    #[must_use]
    pub fn contains(&self, id: SegmentId) -> bool {
        self.arena
            .get(id.as_index())
            .is_some_and(Option::is_some)
    }

    /// The segment behind `id`, or `None` for stale/unknown handles.
    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.arena.get(id.as_index()).and_then(Option::as_ref)
    }

    /// Live segment handles in ascending (creation) order.
    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.arena
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| SegmentId::from_index(index)))
    }

    /// Handles of all root segments, ascending.
    pub fn roots(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.arena.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .filter(|segment| segment.is_root())
                .map(|_| SegmentId::from_index(index))
        })
    }

    /// The label of `id`, if any.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn label(&self, id: SegmentId) -> Result<Option<&Label>, HistoryError> {
        Ok(self.get(id)?.label.as_ref())
    }

    /// The bond partner of `side`, if that side is bonded.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if the side's segment is not live.
    pub fn bond(&self, side: SideRef) -> Result<Option<SideRef>, HistoryError> {
        Ok(self.get(side.segment)?.bond(side.end))
    }

    pub(crate) fn get(&self, id: SegmentId) -> Result<&Segment, HistoryError> {
        self.segment(id).ok_or(HistoryError::UnknownSegment(id))
    }

    pub(crate) fn get_mut(&mut self, id: SegmentId) -> Result<&mut Segment, HistoryError> {
        self.arena
            .get_mut(id.as_index())
            .and_then(Option::as_mut)
            .ok_or(HistoryError::UnknownSegment(id))
    }

    // -----------------------------------------------------------------------
    // Creation and descent
    // -----------------------------------------------------------------------

    /// Create a detached segment, optionally labeled, and return its
    /// handle. Handles are dense at first and never reused thereafter.
    pub fn add_segment(&mut self, label: Option<Label>) -> SegmentId {
        let id = SegmentId::from_index(self.arena.len());
        self.arena.push(Some(Segment::new(label)));
        self.live += 1;
        self.touch_structure();
        id
    }

    /// Create a segment and attach it under `parent` in one step.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `parent` is not live.
    pub fn add_child(
        &mut self,
        parent: SegmentId,
        label: Option<Label>,
    ) -> Result<SegmentId, HistoryError> {
        self.get(parent)?;
        let child = self.add_segment(label);
        // A fresh segment cannot be an ancestor of anything.
        self.get_mut(parent)?.children.insert(child);
        self.get_mut(child)?.parent = Some(parent);
        self.touch_structure();
        Ok(child)
    }

    /// Register `child` in `parent`'s children and set its parent link.
    ///
    /// Re-adding an existing branch is a no-op. A child that already
    /// descends from a *different* parent is rejected; callers must
    /// `delete_branch` first, so reparenting is always explicit.
    ///
    /// # Errors
    ///
    /// - [`HistoryError::UnknownSegment`] if either handle is not live.
    /// - [`HistoryError::AlreadyParented`] if `child` has another parent.
    /// - [`HistoryError::WouldCycle`] if `child` is `parent` or one of its
    ///   ancestors.
    pub fn create_branch(
        &mut self,
        parent: SegmentId,
        child: SegmentId,
    ) -> Result<(), HistoryError> {
        self.get(parent)?;
        match self.get(child)?.parent {
            Some(current) if current == parent => return Ok(()),
            Some(current) => {
                return Err(HistoryError::AlreadyParented {
                    child,
                    existing: current,
                });
            }
            None => {}
        }
        if child == parent || self.is_strict_ancestor(child, parent)? {
            return Err(HistoryError::WouldCycle { parent, child });
        }
        self.get_mut(parent)?.children.insert(child);
        self.get_mut(child)?.parent = Some(parent);
        self.touch_structure();
        trace!(parent = %parent, child = %child, "created branch");
        Ok(())
    }

    /// Remove the descent edge from `parent` to `child`, leaving `child`
    /// as a root.
    ///
    /// # Errors
    ///
    /// - [`HistoryError::UnknownSegment`] if either handle is not live.
    /// - [`HistoryError::NotAChild`] if the edge does not exist.
    pub fn delete_branch(
        &mut self,
        parent: SegmentId,
        child: SegmentId,
    ) -> Result<(), HistoryError> {
        self.get(child)?;
        if !self.get(parent)?.children.contains(&child) {
            return Err(HistoryError::NotAChild { parent, child });
        }
        self.get_mut(parent)?.children.remove(&child);
        self.get_mut(child)?.parent = None;
        self.touch_structure();
        trace!(parent = %parent, child = %child, "deleted branch");
        Ok(())
    }

    /// Remove `id` from the history entirely.
    ///
    /// Both of its bonds are deleted, every child is reparented to its
    /// former parent (or becomes a root if it had none), and the arena
    /// slot is cleared. No remaining segment references it afterwards.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn disconnect(&mut self, id: SegmentId) -> Result<(), HistoryError> {
        self.get(id)?;
        self.delete_bond(SideRef::left(id))?;
        self.delete_bond(SideRef::right(id))?;

        let parent = self.get(id)?.parent;
        let children: Vec<SegmentId> = self.get(id)?.children().collect();
        for child in &children {
            self.get_mut(*child)?.parent = parent;
        }
        if let Some(parent) = parent {
            let up = self.get_mut(parent)?;
            up.children.remove(&id);
            up.children.extend(children.iter().copied());
        }
        self.arena[id.as_index()] = None;
        self.live -= 1;
        self.touch_structure();
        trace!(segment = %id, reparented = children.len(), "disconnected segment");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------

    /// Set (or replace) the label of `id`.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn set_label(&mut self, id: SegmentId, label: Label) -> Result<(), HistoryError> {
        self.get_mut(id)?.label = Some(label);
        self.touch();
        Ok(())
    }

    /// Remove the label of `id`, if any.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn clear_label(&mut self, id: SegmentId) -> Result<(), HistoryError> {
        self.get_mut(id)?.label = None;
        self.touch();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bonds
    // -----------------------------------------------------------------------

    /// Bond two sides to each other. Bonds are symmetric; both sides must
    /// currently be unbonded. Bonding the left end of a segment to its own
    /// right end (a hairpin) is legal.
    ///
    /// # Errors
    ///
    /// - [`HistoryError::UnknownSegment`] if either segment is not live.
    /// - [`HistoryError::SelfBond`] if `a == b`.
    /// - [`HistoryError::AlreadyBonded`] if either side is occupied.
    pub fn create_bond(&mut self, a: SideRef, b: SideRef) -> Result<(), HistoryError> {
        if a == b {
            return Err(HistoryError::SelfBond(a));
        }
        for side in [a, b] {
            if let Some(partner) = self.bond(side)? {
                return Err(HistoryError::AlreadyBonded { side, partner });
            }
        }
        self.get_mut(a.segment)?.side_mut(a.end).bond = Some(b);
        self.get_mut(b.segment)?.side_mut(b.end).bond = Some(a);
        self.touch_structure();
        trace!(a = %a, b = %b, "created bond");
        Ok(())
    }

    /// Remove the bond on `side`, clearing both endpoints. Deleting from
    /// an unbonded side is a no-op; `disconnect` relies on that.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if the side's segment is not live.
    pub fn delete_bond(&mut self, side: SideRef) -> Result<(), HistoryError> {
        let Some(partner) = self.bond(side)? else {
            return Ok(());
        };
        self.get_mut(side.segment)?.side_mut(side.end).bond = None;
        if let Ok(other) = self.get_mut(partner.segment) {
            other.side_mut(partner.end).bond = None;
        }
        self.touch_structure();
        trace!(side = %side, partner = %partner, "deleted bond");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ancestry
    // -----------------------------------------------------------------------

    /// The segment whose label `id` would inherit: `id` itself when it is
    /// a root, otherwise the nearest strict ancestor that carries a label,
    /// or the lineage root when no ancestor is labeled.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn ancestor(&self, id: SegmentId) -> Result<SegmentId, HistoryError> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(id);
        };
        let mut current = parent;
        loop {
            let segment = self.get(current)?;
            if segment.is_labeled() {
                return Ok(current);
            }
            match segment.parent {
                Some(up) => current = up,
                None => return Ok(current),
            }
        }
    }

    /// Walks upward from `below`; true when `above` appears strictly
    /// above it.
    fn is_strict_ancestor(&self, above: SegmentId, below: SegmentId) -> Result<bool, HistoryError> {
        let mut current = self.get(below)?.parent;
        while let Some(id) = current {
            if id == above {
                return Ok(true);
            }
            current = self.get(id)?.parent;
        }
        Ok(false)
    }

    // -----------------------------------------------------------------------
    // Change tracking
    // -----------------------------------------------------------------------

    /// Stamp for label-sensitive caches.
    pub(crate) fn touch(&mut self) {
        self.generation += 1;
    }

    /// Stamp for structure-sensitive caches and derived state.
    pub(crate) fn touch_structure(&mut self) {
        self.generation += 1;
        self.structure_generation += 1;
    }
}
