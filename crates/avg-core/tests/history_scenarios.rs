//! Known-topology regression tests for whole histories.
//!
//! Each test drives one hand-crafted history through the full API
//! surface. Expected values are computed analytically from the topology
//! and hardcoded, so any change that shifts scores, threads, or event
//! order will be caught here.

use avg_core::{
    HistoryGraph, HistoryStats, Label, Orientation, SegmentId, SideRef, Traversal, reduce,
};

/// Two extant genomes descending from the ancestral genome "AC" through
/// one intermediate. Genome "AT" records a substitution at the second
/// position; genome "?C" keeps the ancestral second value and leaves its
/// first unsampled.
struct TwoGenomeHistory {
    graph: HistoryGraph,
    roots: [SegmentId; 2],
    mids: [SegmentId; 2],
    sampled: [SegmentId; 2],
    sparse: [SegmentId; 2],
}

fn two_genome_history() -> TwoGenomeHistory {
    let mut graph = HistoryGraph::new();
    let r1 = graph.add_segment(Some(Label::new("A")));
    let r2 = graph.add_segment(Some(Label::new("C")));
    let m1 = graph.add_child(r1, None).expect("live");
    let m2 = graph.add_child(r2, Some(Label::new("T"))).expect("live");
    let s1 = graph.add_child(m1, Some(Label::new("A"))).expect("live");
    let s2 = graph.add_child(m2, Some(Label::new("T"))).expect("live");
    let t1 = graph.add_child(r1, None).expect("live");
    let t2 = graph.add_child(r2, Some(Label::new("C"))).expect("live");
    for (left, right) in [(r1, r2), (m1, m2), (s1, s2), (t1, t2)] {
        graph
            .create_bond(SideRef::right(left), SideRef::left(right))
            .expect("both free");
    }
    TwoGenomeHistory {
        graph,
        roots: [r1, r2],
        mids: [m1, m2],
        sampled: [s1, s2],
        sparse: [t1, t2],
    }
}

#[test]
fn ancestors_resolve_to_the_nearest_labeled_forebear() {
    let h = two_genome_history();
    // Through the unlabeled intermediate up to the labeled root.
    assert_eq!(h.graph.ancestor(h.sampled[0]).expect("live"), h.roots[0]);
    // The labeled intermediate stops the walk.
    assert_eq!(h.graph.ancestor(h.sampled[1]).expect("live"), h.mids[1]);
    // Roots resolve to themselves.
    assert_eq!(h.graph.ancestor(h.roots[0]).expect("live"), h.roots[0]);
}

#[test]
fn the_history_is_fully_explained() {
    let h = two_genome_history();
    for id in h.graph.segment_ids() {
        assert_eq!(h.graph.ambiguity(id).expect("live"), 0, "segment {id}");
    }
    // The one real substitution is charged to the second root.
    assert_eq!(
        h.graph
            .lower_bound_substitution_cost(h.roots[1])
            .expect("live"),
        1
    );
    assert_eq!(
        h.graph
            .upper_bound_substitution_cost(h.roots[1])
            .expect("live"),
        1
    );
    assert!(h.graph.is_junction(h.roots[1]).expect("live"));
    assert!(!h.graph.is_junction(h.roots[0]).expect("live"));
}

#[test]
fn genomes_come_out_as_threads_in_event_order() {
    let mut h = two_genome_history();
    let state = h.graph.rebuild_derived().expect("acyclic").clone();

    assert_eq!(state.thread_count(), 4);
    let ancestral = state.thread_of(h.roots[0]).expect("assigned");
    let intermediate = state.thread_of(h.mids[0]).expect("assigned");
    let sampled = state.thread_of(h.sampled[0]).expect("assigned");
    let sparse = state.thread_of(h.sparse[0]).expect("assigned");
    assert_eq!(state.thread_of(h.roots[1]), Some(ancestral));

    assert_eq!(
        state.thread(ancestral).expect("built").traversals(),
        [
            Traversal::forward(h.roots[0]),
            Traversal::forward(h.roots[1])
        ]
    );
    assert_eq!(
        state.event_order(),
        [ancestral, intermediate, sampled, sparse]
    );
    assert_eq!(state.event_time(ancestral), Some(0));
    assert_eq!(state.event_time(intermediate), Some(1));
    assert_eq!(state.event_time(sampled), Some(2));
    assert_eq!(state.event_time(sparse), Some(1));
}

#[test]
fn editing_a_hypothesis_moves_the_scores() {
    let mut h = two_genome_history();
    // Diverge the sparse genome's second value from the ancestor.
    h.graph
        .set_label(h.sparse[1], Label::new("G"))
        .expect("live");

    assert_eq!(h.graph.substitution_ambiguity(h.roots[1]).expect("live"), 1);
    assert_eq!(
        h.graph
            .lower_bound_substitution_cost(h.roots[1])
            .expect("live"),
        2
    );
    assert_eq!(
        h.graph
            .upper_bound_substitution_cost(h.roots[1])
            .expect("live"),
        2
    );

    // Restoring the ancestral value restores the scores.
    h.graph
        .set_label(h.sparse[1], Label::new("C"))
        .expect("live");
    assert_eq!(h.graph.substitution_ambiguity(h.roots[1]).expect("live"), 0);
}

#[test]
fn reduction_collapses_the_intermediate_generation() {
    let h = two_genome_history();
    let reduced = reduce(&h.graph).expect("acyclic");

    assert_eq!(reduced.len(), 6);
    assert!(!reduced.contains(h.mids[0]));
    assert!(!reduced.contains(h.mids[1]));
    assert_eq!(
        reduced.segment(h.sampled[0]).and_then(|s| s.parent()),
        Some(h.roots[0])
    );
    reduced.validate().expect("consistent");
    assert_eq!(reduced.threads().expect("walkable").len(), 3);

    // Reducing again changes nothing.
    assert_eq!(reduce(&reduced).expect("acyclic"), reduced);
}

#[test]
fn stats_summarize_the_whole_history() {
    let h = two_genome_history();
    let stats = HistoryStats::from_graph(&h.graph).expect("countable");

    assert_eq!(stats.segments, 8);
    assert_eq!(stats.roots, 2);
    assert_eq!(stats.leaves, 4);
    assert_eq!(stats.labeled, 6);
    assert_eq!(stats.bonds, 4);
    assert_eq!(stats.threads, 4);
    assert_eq!(stats.substitution_ambiguity, 0);
    assert_eq!(stats.rearrangement_ambiguity, 0);
    assert_eq!(stats.lower_substitution_cost, 1);
    assert_eq!(stats.upper_substitution_cost, 1);
    assert_eq!(stats.junctions, 1);
    assert_eq!(stats.bridges, 0);

    let json = serde_json::to_value(stats).expect("serializable");
    assert_eq!(json["segments"], 8);
    assert_eq!(json["threads"], 4);
}

#[test]
fn a_reversed_genome_reads_against_the_grain() {
    // The second extant genome carries an inversion: its first segment
    // is stitched in reverse.
    let mut graph = HistoryGraph::new();
    let a = graph.add_segment(Some(Label::new("A")));
    let b = graph.add_segment(Some(Label::new("C")));
    graph
        .create_bond(SideRef::right(a), SideRef::right(b))
        .expect("both free");
    let thread = graph.thread_containing(a).expect("live");
    assert_eq!(
        thread.traversals(),
        [
            Traversal::forward(a),
            Traversal::new(b, Orientation::Reverse)
        ]
    );
    assert!(!thread.is_circular());
}
