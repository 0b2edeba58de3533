//! Confidence trees over an engine's principal variation.
//!
//! The builder asks the engine for its main line, turns it into a spine of
//! positions and then spends a bounded number of extra engine calls on the
//! weakest spine positions, hanging the strongest alternatives off them as
//! branches. The result tells a reader which moves of the line can be
//! trusted.
//!
//! # Overview
//!
//! - [`ConfidenceTreeBuilder`] - Seeds, extends and recolors trees
//! - [`ConfidenceTree`] / [`TreeNode`] - Arena of spine and branch nodes
//! - [`classify`] - Shape and color tag for a node
//! - [`TreeReport`] - Flat, serializable view of a finished build
//!
//! # Example
//!
//! ```ignore
//! use confidence_tree::{BuildConfig, BuildRequest, ConfidenceTreeBuilder};
//!
//! let builder = ConfidenceTreeBuilder::new(queue, BuildConfig::default());
//! let outcome = builder
//!     .build(&BuildRequest::new(Position::startpos(), 80, 18, 12))
//!     .await?;
//! println!("{:?} after {} iterations", outcome.termination_reason, outcome.iterations_used);
//! ```

pub mod builder;
pub mod classify;
pub mod error;
pub mod report;
pub mod rules;
pub mod tree;

pub use builder::{
    BuildConfig, BuildOutcome, BuildRequest, ConfidenceTreeBuilder, SelectionPolicy,
    TerminationReason,
};
pub use classify::{classify, Color, NodeClass, Shape, TreeStats};
pub use error::{BuildError, TreeError};
pub use report::{NodeReport, TreeReport};
pub use rules::{MoveRules, UciNotation};
pub use tree::{ConfidenceTree, NodeId, NodeKind, TreeNode};
