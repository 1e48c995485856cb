#![forbid(unsafe_code)]
//! Ancestral variation graph core.
//!
//! A history graph records hypothesized descent between DNA segments:
//! a forest of parent-child branches, plus bonds pairing segment sides
//! into threads. On top of that structure sit the derived measures this
//! crate exists for: lifted labels and bonds, ambiguity scores,
//! substitution cost bounds, thread decomposition with event ordering,
//! and reduction down to roots and leaves.
//!
//! Mutations go through [`HistoryGraph`] and either apply fully or
//! return an error with the graph unchanged. Expensive derived data is
//! computed on demand (lifted sets, cached per mutation generation) or
//! rebuilt explicitly ([`HistoryGraph::rebuild_derived`]).
//!
//! # Conventions
//!
//! - **Errors**: fallible operations return [`HistoryError`] via
//!   `thiserror`; invariant breakage surfaces as [`StructuralViolation`].
//! - **Logging**: `tracing` macros (`debug!`, `trace!`, `#[instrument]`)
//!   on mutations and rebuilds; queries stay quiet.

pub mod error;
pub mod event;
pub mod graph;
pub mod label;
pub mod reduce;
pub mod segment;
pub mod stats;
pub mod thread;
pub mod validate;

mod ambiguity;
mod lift;

pub use error::HistoryError;
pub use event::{DerivedState, ThreadId};
pub use graph::HistoryGraph;
pub use label::Label;
pub use reduce::reduce;
pub use segment::{End, Segment, SegmentId, SideRef};
pub use stats::HistoryStats;
pub use thread::{Orientation, Thread, Traversal};
pub use validate::StructuralViolation;
