//! Lifted labels and lifted bonds.
//!
//! # Overview
//!
//! The *lifted labels* of a segment are its nearest labeled descendants:
//! for each child, the child itself when labeled, otherwise that child's
//! own lifted labels. A childless segment lifts nothing. Lifted *bonds*
//! are the side-wise mirror of the same idea on one end of the segment:
//! the nearest bonded descendant sides reachable through unbonded sides.
//!
//! # Algorithm
//!
//! The defining recursion touches every descendant, so evaluating it per
//! query is wasteful once callers score a whole graph. Instead one
//! post-order pass over each lineage fills a table for every live segment
//! (labels plus both ends' bonds in the same walk). The table is cached
//! behind a `RefCell` and keyed on the graph's mutation generation: any
//! mutation, structural or label-only, makes the next query rebuild.
//! Results are identical to the naive recursion, and repeated queries on
//! an unchanged graph return bit-identical sets.
//!
//! # Edge Cases
//!
//! - An unlabeled segment treats *every* lifted label as non-trivial;
//!   absence never equals a printable value.
//! - Unbonded sides mirror that rule for lifted bonds.
//! - Triviality of a lifted bond is judged by where its partner's lineage
//!   lifts to: the bond is trivial only when that walk lands on the own
//!   bond's partner.

use std::collections::BTreeSet;

use tracing::trace;

use crate::error::HistoryError;
use crate::graph::HistoryGraph;
use crate::segment::{End, Segment, SegmentId, SideRef};

/// Per-segment lifted sets for one generation of one graph.
#[derive(Debug, Clone)]
pub(crate) struct LiftTables {
    generation: u64,
    labels: Vec<BTreeSet<SegmentId>>,
    left_bonds: Vec<BTreeSet<SideRef>>,
    right_bonds: Vec<BTreeSet<SideRef>>,
}

impl LiftTables {
    fn build(graph: &HistoryGraph) -> Self {
        let slots = graph.arena.len();
        let mut tables = Self {
            generation: graph.generation,
            labels: vec![BTreeSet::new(); slots],
            left_bonds: vec![BTreeSet::new(); slots],
            right_bonds: vec![BTreeSet::new(); slots],
        };

        // Post-order over each lineage: children are filled before their
        // parent reads them.
        let mut stack: Vec<(SegmentId, std::vec::IntoIter<SegmentId>)> = Vec::new();
        for root in graph.roots() {
            stack.push((root, child_list(graph, root)));
            while let Some((_, frame)) = stack.last_mut() {
                if let Some(child) = frame.next() {
                    stack.push((child, child_list(graph, child)));
                } else if let Some((done, _)) = stack.pop() {
                    tables.fill(graph, done);
                }
            }
        }
        trace!(
            segments = graph.len(),
            generation = tables.generation,
            "rebuilt lift tables"
        );
        tables
    }

    fn fill(&mut self, graph: &HistoryGraph, id: SegmentId) {
        let mut labels = BTreeSet::new();
        let mut left = BTreeSet::new();
        let mut right = BTreeSet::new();
        if let Some(segment) = graph.segment(id) {
            for child in segment.children() {
                let Some(child_segment) = graph.segment(child) else {
                    continue;
                };
                if child_segment.is_labeled() {
                    labels.insert(child);
                } else {
                    labels.extend(&self.labels[child.as_index()]);
                }
                if child_segment.bond(End::Left).is_some() {
                    left.insert(SideRef::left(child));
                } else {
                    left.extend(&self.left_bonds[child.as_index()]);
                }
                if child_segment.bond(End::Right).is_some() {
                    right.insert(SideRef::right(child));
                } else {
                    right.extend(&self.right_bonds[child.as_index()]);
                }
            }
        }
        self.labels[id.as_index()] = labels;
        self.left_bonds[id.as_index()] = left;
        self.right_bonds[id.as_index()] = right;
    }

    pub(crate) fn labels_of(&self, id: SegmentId) -> &BTreeSet<SegmentId> {
        &self.labels[id.as_index()]
    }

    pub(crate) fn bonds_of(&self, side: SideRef) -> &BTreeSet<SideRef> {
        match side.end {
            End::Left => &self.left_bonds[side.segment.as_index()],
            End::Right => &self.right_bonds[side.segment.as_index()],
        }
    }
}

fn child_list(graph: &HistoryGraph, id: SegmentId) -> std::vec::IntoIter<SegmentId> {
    graph
        .segment(id)
        .map(|segment| segment.children().collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
}

impl HistoryGraph {
    /// Run `f` against lift tables that are current for this generation,
    /// rebuilding them first if anything changed since the last query.
    pub(crate) fn with_lift<R>(&self, f: impl FnOnce(&LiftTables) -> R) -> R {
        let mut slot = self.lift.borrow_mut();
        if slot
            .as_ref()
            .is_none_or(|tables| tables.generation != self.generation)
        {
            *slot = None;
        }
        f(slot.get_or_insert_with(|| LiftTables::build(self)))
    }

    /// The nearest labeled descendants of `id`: per child, the child when
    /// labeled, otherwise that child's lifted labels. Childless segments
    /// lift nothing.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn lifted_labels(&self, id: SegmentId) -> Result<BTreeSet<SegmentId>, HistoryError> {
        self.get(id)?;
        Ok(self.with_lift(|tables| tables.labels_of(id).clone()))
    }

    /// Members of [`lifted_labels`](Self::lifted_labels) whose label
    /// rendering differs from `id`'s own. When `id` is unlabeled, every
    /// lifted label differs.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn non_trivial_lifted_labels(
        &self,
        id: SegmentId,
    ) -> Result<BTreeSet<SegmentId>, HistoryError> {
        let own = self.get(id)?.label.clone();
        Ok(self.with_lift(|tables| {
            tables
                .labels_of(id)
                .iter()
                .copied()
                .filter(|lifted| {
                    self.segment(*lifted).and_then(Segment::label) != own.as_ref()
                })
                .collect()
        }))
    }

    /// The nearest bonded descendant sides of `side`, walking the same
    /// end down through unbonded sides.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if the side's segment is not live.
    pub fn lifted_bonds(&self, side: SideRef) -> Result<BTreeSet<SideRef>, HistoryError> {
        self.get(side.segment)?;
        Ok(self.with_lift(|tables| tables.bonds_of(side).clone()))
    }

    /// Where `side` lifts to: itself when its segment is a root, else the
    /// nearest strict-ancestor side (same end) that is bonded, else the
    /// lineage root's side. The side analogue of
    /// [`ancestor`](Self::ancestor).
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if the side's segment is not live.
    pub fn side_ancestor(&self, side: SideRef) -> Result<SideRef, HistoryError> {
        let Some(parent) = self.get(side.segment)?.parent else {
            return Ok(side);
        };
        let mut current = SideRef::new(parent, side.end);
        loop {
            let segment = self.get(current.segment)?;
            if segment.bond(current.end).is_some() {
                return Ok(current);
            }
            match segment.parent {
                Some(up) => current = SideRef::new(up, side.end),
                None => return Ok(current),
            }
        }
    }

    /// Lifted bonds of `side` that do not mirror its own bond. A lifted
    /// bond is trivial only when `side` is bonded and the lifted bond's
    /// partner lifts to `side`'s own partner; an unbonded side makes every
    /// lifted bond non-trivial.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if the side's segment is not live.
    pub fn non_trivial_lifted_bonds(
        &self,
        side: SideRef,
    ) -> Result<BTreeSet<SideRef>, HistoryError> {
        let own_partner = self.bond(side)?;
        let mut out = BTreeSet::new();
        for lifted in self.lifted_bonds(side)? {
            let trivial = match (own_partner, self.bond(lifted)?) {
                (Some(partner), Some(lifted_partner)) => {
                    self.side_ancestor(lifted_partner)? == partner
                }
                _ => false,
            };
            if !trivial {
                out.insert(lifted);
            }
        }
        Ok(out)
    }
}
