//! Reduction of a history to its essential segments.
//!
//! # Overview
//!
//! A reduced history keeps only roots and leaves: every segment that has
//! both a parent and children is disconnected, its children splicing up
//! to the nearest surviving ancestor. What remains is the direct
//! root-to-leaf descent relation, with interior inference stripped out.
//!
//! # Algorithm
//!
//! The removable set is decided on the input structure before anything
//! is touched. Disconnecting an interior segment can only hand its
//! children to another segment that already had children, so no survivor
//! becomes removable and no removable segment loses the property before
//! its turn; the outcome is independent of removal order.
//!
//! # Edge Cases
//!
//! Isolated segments are both root and leaf and always survive. Bonds
//! touching a removed segment are deleted with it; bonds between
//! survivors persist. Reducing an already reduced history removes
//! nothing.

use tracing::{debug, instrument};

use crate::error::HistoryError;
use crate::graph::HistoryGraph;
use crate::segment::SegmentId;

/// Build the reduced copy of `graph`, with derived state already
/// rebuilt for the new structure.
///
/// # Errors
///
/// [`HistoryError::Structural`] if the reduced structure admits no event
/// ordering. A graph whose derived state builds cleanly reduces cleanly.
#[instrument(skip(graph))]
pub fn reduce(graph: &HistoryGraph) -> Result<HistoryGraph, HistoryError> {
    let mut reduced = graph.clone();
    let removable: Vec<SegmentId> = reduced
        .segment_ids()
        .filter(|&id| {
            reduced
                .segment(id)
                .is_some_and(|segment| !segment.is_root() && !segment.is_leaf())
        })
        .collect();
    for &id in &removable {
        reduced.disconnect(id)?;
    }
    reduced.rebuild_derived()?;
    debug!(
        removed = removable.len(),
        remaining = reduced.len(),
        "reduced history"
    );
    Ok(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::segment::SideRef;

    #[test]
    fn interior_segments_are_removed_and_descent_splices() {
        let mut graph = HistoryGraph::new();
        let root = graph.add_segment(Some(Label::new("A")));
        let mid = graph.add_child(root, None).expect("live");
        let leaf = graph.add_child(mid, Some(Label::new("T"))).expect("live");
        let lone = graph.add_segment(Some(Label::new("C")));

        let reduced = reduce(&graph).expect("orderable");

        assert_eq!(reduced.len(), 3);
        assert!(!reduced.contains(mid));
        assert_eq!(reduced.segment(leaf).and_then(|s| s.parent()), Some(root));
        assert!(reduced.contains(lone));
        // The input is untouched.
        assert!(graph.contains(mid));
    }

    #[test]
    fn a_deep_chain_collapses_to_its_endpoints() {
        let mut graph = HistoryGraph::new();
        let a = graph.add_segment(None);
        let b = graph.add_child(a, None).expect("live");
        let c = graph.add_child(b, None).expect("live");
        let d = graph.add_child(c, None).expect("live");

        let reduced = reduce(&graph).expect("orderable");

        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced.segment(d).and_then(|s| s.parent()), Some(a));
        assert_eq!(
            reduced.segment(a).map(|s| s.children().collect::<Vec<_>>()),
            Some(vec![d])
        );
    }

    #[test]
    fn labels_and_surviving_bonds_are_kept() {
        let mut graph = HistoryGraph::new();
        let root = graph.add_segment(Some(Label::new("A")));
        let mid = graph.add_child(root, Some(Label::new("G"))).expect("live");
        let left_leaf = graph.add_child(mid, Some(Label::new("T"))).expect("live");
        let right_leaf = graph.add_child(mid, None).expect("live");
        graph
            .create_bond(SideRef::right(left_leaf), SideRef::left(right_leaf))
            .expect("both free");
        graph
            .create_bond(SideRef::left(left_leaf), SideRef::right(mid))
            .expect("both free");

        let reduced = reduce(&graph).expect("orderable");

        assert_eq!(reduced.label(left_leaf), graph.label(left_leaf));
        assert_eq!(
            reduced.bond(SideRef::right(left_leaf)),
            Ok(Some(SideRef::left(right_leaf)))
        );
        // The bond into the removed interior segment went with it.
        assert_eq!(reduced.bond(SideRef::left(left_leaf)), Ok(None));
    }

    #[test]
    fn reduction_is_idempotent() {
        let mut graph = HistoryGraph::new();
        let root = graph.add_segment(None);
        let mid = graph.add_child(root, None).expect("live");
        let deeper = graph.add_child(mid, None).expect("live");
        graph.add_child(deeper, Some(Label::new("A"))).expect("live");
        graph.add_child(mid, Some(Label::new("C"))).expect("live");

        let once = reduce(&graph).expect("orderable");
        let twice = reduce(&once).expect("orderable");
        assert_eq!(once, twice);
    }

    #[test]
    fn the_result_validates_and_carries_fresh_derived_state() {
        let mut graph = HistoryGraph::new();
        let root = graph.add_segment(None);
        let mid = graph.add_child(root, None).expect("live");
        graph.add_child(mid, None).expect("live");

        let reduced = reduce(&graph).expect("orderable");
        reduced.validate().expect("consistent");
        assert!(reduced.derived().is_some());
    }

    #[test]
    fn an_empty_history_reduces_to_itself() {
        let graph = HistoryGraph::new();
        let reduced = reduce(&graph).expect("orderable");
        assert!(reduced.is_empty());
        assert_eq!(
            reduced.derived().map(crate::event::DerivedState::thread_count),
            Some(0)
        );
    }
}
