//! # acfs-graph: Dependency Graph & Sequencing
//!
//! Takes a schema-valid [`acfs_manifest::Manifest`] and either rejects it
//! with every graph violation ([`GraphErrors`]) or produces a
//! [`ValidatedGraph`], which is the only input the [`sequence`] pass accepts.
//!
//! ## Passes
//!
//! - [`graph::validate`]: duplicate ids, unknown dependencies, cycles and
//!   phase ordering, all collected in one pass; plus non-fatal
//!   [`Advisory`] findings for placeholder-only install lists.
//! - [`sequence::sequence`]: phase-grouped, intra-phase topological order
//!   with ties broken by manifest order.
//!
//! Phase-ordering validation is global and runs here; the sequencer only
//! looks at edges inside one phase. The two passes stay separate.
//!
//! ## Crate Policy
//!
//! - No native recursion over the graph. DFS uses an explicit stack over an
//!   index arena, so stack depth does not grow with manifest size.
//! - Pure functions; logging only.

pub mod error;
pub mod graph;
pub mod sequence;
pub mod steps;

pub use error::{Advisory, GraphError, GraphErrorKind, GraphErrors};
pub use graph::{validate, ValidatedGraph};
pub use sequence::{sequence, PhaseGroup, Sequence};
pub use steps::{classify, PlaceholderReason, StepKind};
