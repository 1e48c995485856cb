//! Ambiguity scores and substitution cost bounds.
//!
//! All scores are pure functions of the lifted sets. A segment whose
//! value is purely inferred (unlabeled, with a parent) carries no
//! substitution ambiguity or cost of its own; the divergence below it is
//! charged to the labeled segment it lifts to. Sides follow the same
//! rule with bonds in place of labels.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::HistoryError;
use crate::graph::HistoryGraph;
use crate::label::Label;
use crate::segment::{Segment, SegmentId, SideRef};

impl HistoryGraph {
    /// Competing divergent explanations at `id` beyond the first.
    ///
    /// Zero when `id` is unlabeled and has a parent; otherwise the size
    /// of the non-trivial lifted label set minus one, floored at zero.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn substitution_ambiguity(&self, id: SegmentId) -> Result<usize, HistoryError> {
        let segment = self.get(id)?;
        if !segment.is_labeled() && segment.parent().is_some() {
            return Ok(0);
        }
        Ok(self.non_trivial_lifted_labels(id)?.len().saturating_sub(1))
    }

    /// Rearrangement score of one side: zero when the side is unbonded
    /// and its segment has a parent, otherwise the count of non-trivial
    /// lifted bonds minus one, floored at zero.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if the side's segment is not live.
    pub fn side_rearrangement_ambiguity(&self, side: SideRef) -> Result<usize, HistoryError> {
        let segment = self.get(side.segment)?;
        if segment.bond(side.end).is_none() && segment.parent().is_some() {
            return Ok(0);
        }
        Ok(self.non_trivial_lifted_bonds(side)?.len().saturating_sub(1))
    }

    /// Sum of the two sides' rearrangement scores.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn rearrangement_ambiguity(&self, id: SegmentId) -> Result<usize, HistoryError> {
        Ok(self.side_rearrangement_ambiguity(SideRef::left(id))?
            + self.side_rearrangement_ambiguity(SideRef::right(id))?)
    }

    /// Total ambiguity: substitution plus rearrangement.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn ambiguity(&self, id: SegmentId) -> Result<usize, HistoryError> {
        Ok(self.substitution_ambiguity(id)? + self.rearrangement_ambiguity(id)?)
    }

    /// Fewest substitutions that could explain the divergence below `id`.
    ///
    /// With D distinct renderings among the non-trivial lifted labels,
    /// the bound is D when `id` is labeled and D minus one when it is an
    /// unlabeled root (it can absorb one value for free). Unlabeled
    /// segments with a parent cost nothing here.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn lower_bound_substitution_cost(&self, id: SegmentId) -> Result<usize, HistoryError> {
        let segment = self.get(id)?;
        let labeled = segment.is_labeled();
        if !labeled && segment.parent().is_some() {
            return Ok(0);
        }
        let non_trivial = self.non_trivial_lifted_labels(id)?;
        let distinct = distinct_renderings(self, &non_trivial).len();
        if labeled {
            Ok(distinct)
        } else {
            Ok(distinct.saturating_sub(1))
        }
    }

    /// Most substitutions the divergence below `id` could require.
    ///
    /// N non-trivial lifted labels cost N when `id` is labeled. An
    /// unlabeled root takes the majority rendering for free, paying
    /// N minus the highest single-rendering count. Unlabeled segments
    /// with a parent cost nothing here.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn upper_bound_substitution_cost(&self, id: SegmentId) -> Result<usize, HistoryError> {
        let segment = self.get(id)?;
        let labeled = segment.is_labeled();
        if !labeled && segment.parent().is_some() {
            return Ok(0);
        }
        let non_trivial = self.non_trivial_lifted_labels(id)?;
        let total = non_trivial.len();
        if labeled || total == 0 {
            return Ok(total);
        }
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for member in &non_trivial {
            if let Some(label) = self.segment(*member).and_then(Segment::label) {
                *counts.entry(label.as_str()).or_insert(0) += 1;
            }
        }
        let majority = counts.values().copied().max().unwrap_or(0);
        Ok(total - majority)
    }

    /// A labeled segment with more than one lifted-label lineage below it.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn is_junction(&self, id: SegmentId) -> Result<bool, HistoryError> {
        if !self.get(id)?.is_labeled() {
            return Ok(false);
        }
        Ok(self.lifted_labels(id)?.len() > 1)
    }

    /// A labeled segment sandwiched between identically rendered ancestor
    /// evidence while both it and that ancestor see divergence below.
    ///
    /// # Errors
    ///
    /// [`HistoryError::UnknownSegment`] if `id` is not live.
    pub fn is_bridge(&self, id: SegmentId) -> Result<bool, HistoryError> {
        let segment = self.get(id)?;
        let Some(own) = segment.label() else {
            return Ok(false);
        };
        if segment.parent().is_none() {
            return Ok(false);
        }
        let ancestor = self.ancestor(id)?;
        let Some(ancestor_label) = self.get(ancestor)?.label() else {
            return Ok(false);
        };
        if ancestor_label.as_str() != own.as_str() {
            return Ok(false);
        }
        Ok(!self.non_trivial_lifted_labels(id)?.is_empty()
            && !self.non_trivial_lifted_labels(ancestor)?.is_empty())
    }
}

fn distinct_renderings<'graph>(
    graph: &'graph HistoryGraph,
    members: &BTreeSet<SegmentId>,
) -> BTreeSet<&'graph str> {
    members
        .iter()
        .filter_map(|member| graph.segment(*member).and_then(Segment::label))
        .map(Label::as_str)
        .collect()
}
