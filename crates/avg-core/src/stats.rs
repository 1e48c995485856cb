//! Whole-history summary counts.
//!
//! One pass over the graph folding the per-segment measures into totals
//! fit for dashboards and regression fixtures. The struct is plain data
//! and serializes as a flat JSON object.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::HistoryError;
use crate::graph::HistoryGraph;
use crate::segment::{End, SideRef};

/// Aggregate measures of one history graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    pub segments: usize,
    pub roots: usize,
    pub leaves: usize,
    pub labeled: usize,
    /// Bonds counted once each, hairpins included.
    pub bonds: usize,
    pub threads: usize,
    pub substitution_ambiguity: usize,
    pub rearrangement_ambiguity: usize,
    pub lower_substitution_cost: usize,
    pub upper_substitution_cost: usize,
    pub junctions: usize,
    pub bridges: usize,
}

impl HistoryStats {
    /// Fold the whole graph into totals.
    ///
    /// # Errors
    ///
    /// [`HistoryError`] never fires on a live graph; it propagates from
    /// the per-segment measures if the structure is broken mid-count.
    #[instrument(skip(graph))]
    pub fn from_graph(graph: &HistoryGraph) -> Result<Self, HistoryError> {
        let mut stats = Self {
            segments: graph.len(),
            threads: graph.threads()?.len(),
            ..Self::default()
        };
        for id in graph.segment_ids() {
            let segment = graph.get(id)?;
            if segment.is_root() {
                stats.roots += 1;
            }
            if segment.is_leaf() {
                stats.leaves += 1;
            }
            if segment.is_labeled() {
                stats.labeled += 1;
            }
            for end in [End::Left, End::Right] {
                let side = SideRef::new(id, end);
                if segment.bond(end).is_some_and(|partner| side < partner) {
                    stats.bonds += 1;
                }
            }
            stats.substitution_ambiguity += graph.substitution_ambiguity(id)?;
            stats.rearrangement_ambiguity += graph.rearrangement_ambiguity(id)?;
            stats.lower_substitution_cost += graph.lower_bound_substitution_cost(id)?;
            stats.upper_substitution_cost += graph.upper_bound_substitution_cost(id)?;
            if graph.is_junction(id)? {
                stats.junctions += 1;
            }
            if graph.is_bridge(id)? {
                stats.bridges += 1;
            }
        }
        Ok(stats)
    }

    /// Total ambiguity, substitution and rearrangement together.
    #[must_use]
    pub const fn ambiguity(&self) -> usize {
        self.substitution_ambiguity + self.rearrangement_ambiguity
    }
}
