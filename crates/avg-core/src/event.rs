//! Derived state: thread decomposition, event graph, and event timing.
//!
//! # Overview
//!
//! Once segments are partitioned into threads, descent induces an event
//! graph: one node per thread, and an edge from a parent segment's thread
//! to its child's thread. Topologically ordering that graph yields the
//! event ordering of the history; the longest-path layer of each thread
//! is its event time. Parent and child in the *same* thread would place
//! a genome before itself, which surfaces as an event-order cycle.
//!
//! # Staleness
//!
//! Derived state is rebuilt explicitly and stamped with the structure
//! generation it was built from. [`HistoryGraph::derived`] refuses to
//! serve state built before the latest structural mutation; label edits
//! do not invalidate it, since threads and descent are unaffected.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, instrument};

use crate::error::HistoryError;
use crate::graph::HistoryGraph;
use crate::segment::{Segment, SegmentId};
use crate::thread::Thread;
use crate::validate::StructuralViolation;

/// Handle of one thread (one event) within a [`DerivedState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(usize);

impl ThreadId {
    #[must_use]
    pub const fn as_index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread decomposition plus event ordering for one structure generation.
#[derive(Debug, Clone)]
pub struct DerivedState {
    pub(crate) generation: u64,
    threads: Vec<Thread>,
    membership: HashMap<SegmentId, ThreadId>,
    events: DiGraph<ThreadId, ()>,
    order: Vec<ThreadId>,
    times: Vec<usize>,
}

impl DerivedState {
    fn build(graph: &HistoryGraph) -> Result<Self, HistoryError> {
        let threads = graph.threads()?;

        let mut membership = HashMap::new();
        for (index, thread) in threads.iter().enumerate() {
            for segment in thread.segments() {
                membership.insert(segment, ThreadId(index));
            }
        }

        let mut events: DiGraph<ThreadId, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..threads.len())
            .map(|index| events.add_node(ThreadId(index)))
            .collect();
        for id in graph.segment_ids() {
            let Some(parent) = graph.segment(id).and_then(Segment::parent) else {
                continue;
            };
            let (Some(&from), Some(&to)) = (membership.get(&parent), membership.get(&id)) else {
                continue;
            };
            let (from, to) = (nodes[from.as_index()], nodes[to.as_index()]);
            // Descent inside one thread maps to a self edge and fails the
            // ordering below, by intent.
            if !events.contains_edge(from, to) {
                events.add_edge(from, to, ());
            }
        }

        // Kahn's algorithm, smallest thread first for a deterministic
        // order; times are longest-path layers.
        let mut indegree: Vec<usize> = nodes
            .iter()
            .map(|&node| events.neighbors_directed(node, Direction::Incoming).count())
            .collect();
        let mut ready: BTreeSet<ThreadId> = indegree
            .iter()
            .enumerate()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(index, _)| ThreadId(index))
            .collect();
        let mut order = Vec::with_capacity(threads.len());
        let mut times = vec![0_usize; threads.len()];
        while let Some(current) = ready.pop_first() {
            order.push(current);
            for next in events.neighbors_directed(nodes[current.as_index()], Direction::Outgoing) {
                let next_id = events[next];
                let slot = next_id.as_index();
                times[slot] = times[slot].max(times[current.as_index()] + 1);
                indegree[slot] -= 1;
                if indegree[slot] == 0 {
                    ready.insert(next_id);
                }
            }
        }
        if order.len() != threads.len() {
            let stuck = indegree
                .iter()
                .enumerate()
                .find(|&(_, &degree)| degree > 0)
                .map_or(ThreadId(0), |(index, _)| ThreadId(index));
            return Err(StructuralViolation::EventOrderCycle { thread: stuck }.into());
        }

        Ok(Self {
            generation: graph.structure_generation,
            threads,
            membership,
            events,
            order,
            times,
        })
    }

    #[must_use]
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(id.as_index())
    }

    /// The thread holding `segment`, if it was live at build time.
    #[must_use]
    pub fn thread_of(&self, segment: SegmentId) -> Option<ThreadId> {
        self.membership.get(&segment).copied()
    }

    /// Threads in event order: every parent thread before every thread it
    /// descends into.
    #[must_use]
    pub fn event_order(&self) -> &[ThreadId] {
        &self.order
    }

    /// Longest-path layer of the thread in the event graph; roots are 0.
    #[must_use]
    pub fn event_time(&self, id: ThreadId) -> Option<usize> {
        self.times.get(id.as_index()).copied()
    }

    /// The descent-constraint graph over threads.
    #[must_use]
    pub fn event_graph(&self) -> &DiGraph<ThreadId, ()> {
        &self.events
    }
}

impl HistoryGraph {
    /// Recompute threads, the event graph, and event times from the
    /// current structure, replacing any previous derived state.
    ///
    /// # Errors
    ///
    /// [`StructuralViolation::EventOrderCycle`] (wrapped in
    /// [`HistoryError::Structural`]) when descent runs inside or around a
    /// thread loop and no event ordering exists.
    #[instrument(skip(self))]
    pub fn rebuild_derived(&mut self) -> Result<&DerivedState, HistoryError> {
        let state = DerivedState::build(self)?;
        debug!(
            threads = state.thread_count(),
            generation = state.generation,
            "rebuilt derived state"
        );
        Ok(self.derived.insert(state))
    }

    /// The derived state, if built and still current. Returns `None`
    /// after any structural mutation until the next
    /// [`rebuild_derived`](Self::rebuild_derived); label edits do not
    /// stale it.
    #[must_use]
    pub fn derived(&self) -> Option<&DerivedState> {
        self.derived
            .as_ref()
            .filter(|state| state.generation == self.structure_generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::segment::SideRef;
    use crate::thread::Traversal;

    #[test]
    fn descent_orders_parent_threads_first() {
        let mut graph = HistoryGraph::new();
        let root = graph.add_segment(None);
        let child = graph.add_child(root, None).expect("live");
        let state = graph.rebuild_derived().expect("acyclic").clone();

        let root_thread = state.thread_of(root).expect("assigned");
        let child_thread = state.thread_of(child).expect("assigned");
        assert_ne!(root_thread, child_thread);
        assert_eq!(state.event_order(), [root_thread, child_thread]);
        assert_eq!(state.event_time(root_thread), Some(0));
        assert_eq!(state.event_time(child_thread), Some(1));
    }

    #[test]
    fn bonded_siblings_share_a_thread_and_an_event() {
        let mut graph = HistoryGraph::new();
        let root = graph.add_segment(None);
        let a = graph.add_child(root, None).expect("live");
        let b = graph.add_child(root, None).expect("live");
        graph
            .create_bond(SideRef::right(a), SideRef::left(b))
            .expect("both free");
        let state = graph.rebuild_derived().expect("acyclic").clone();

        assert_eq!(state.thread_count(), 2);
        assert_eq!(state.thread_of(a), state.thread_of(b));
        let child_thread = state.thread_of(a).expect("assigned");
        assert_eq!(
            state.thread(child_thread).map(Thread::traversals),
            Some(&[Traversal::forward(a), Traversal::forward(b)][..])
        );
        // Two descent edges collapse into one event-graph edge.
        assert_eq!(state.event_graph().edge_count(), 1);
    }

    #[test]
    fn event_times_follow_the_longest_path() {
        // Two lineages of different depths joining the same leaf thread.
        let mut graph = HistoryGraph::new();
        let top = graph.add_segment(None);
        let mid = graph.add_child(top, None).expect("live");
        let deep = graph.add_child(mid, None).expect("live");
        let side = graph.add_segment(None);
        let shallow = graph.add_child(side, None).expect("live");
        graph
            .create_bond(SideRef::right(deep), SideRef::left(shallow))
            .expect("both free");
        let state = graph.rebuild_derived().expect("acyclic").clone();

        let leaf_thread = state.thread_of(deep).expect("assigned");
        assert_eq!(state.thread_of(shallow), Some(leaf_thread));
        // top -> mid -> leaf is the longer route.
        assert_eq!(state.event_time(leaf_thread), Some(2));
    }

    #[test]
    fn structural_mutation_stales_derived_state_but_labels_do_not() {
        let mut graph = HistoryGraph::new();
        let root = graph.add_segment(None);
        graph.rebuild_derived().expect("acyclic");
        assert!(graph.derived().is_some());

        graph.set_label(root, Label::new("A")).expect("live");
        assert!(graph.derived().is_some());

        graph.add_segment(None);
        assert!(graph.derived().is_none());
        graph.rebuild_derived().expect("acyclic");
        assert!(graph.derived().is_some());
    }

    #[test]
    fn descent_within_one_thread_is_an_event_cycle() {
        let mut graph = HistoryGraph::new();
        let parent = graph.add_segment(None);
        let child = graph.add_child(parent, None).expect("live");
        graph
            .create_bond(SideRef::right(parent), SideRef::left(child))
            .expect("both free");
        let err = graph.rebuild_derived().expect_err("self edge");
        assert!(matches!(
            err,
            HistoryError::Structural(StructuralViolation::EventOrderCycle { .. })
        ));
        assert!(graph.derived().is_none());
    }

    #[test]
    fn rebuilds_without_mutation_are_identical() {
        let mut graph = HistoryGraph::new();
        let root = graph.add_segment(None);
        let a = graph.add_child(root, None).expect("live");
        let b = graph.add_child(root, None).expect("live");
        graph
            .create_bond(SideRef::right(a), SideRef::left(b))
            .expect("both free");
        let first = graph.rebuild_derived().expect("acyclic").clone();
        let second = graph.rebuild_derived().expect("acyclic").clone();
        assert_eq!(first.threads(), second.threads());
        assert_eq!(first.event_order(), second.event_order());
        assert_eq!(
            first.event_order().iter().map(|&t| first.event_time(t)).collect::<Vec<_>>(),
            second.event_order().iter().map(|&t| second.event_time(t)).collect::<Vec<_>>()
        );
    }
}
