//! Error types for tree construction.

use analysis_queue::{AnalysisError, Position};
use thiserror::Error;

use crate::tree::NodeId;

/// Errors raised by the tree arena and the move rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The move is not legal (or not even well-formed) in the position.
    #[error("Illegal move {mv} in position {position}")]
    IllegalMove { mv: String, position: Position },
    /// No node with this id exists in the tree.
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    /// The requested attachment would break the spine/branch shape.
    #[error("Cannot attach {kind} node under {parent}: {reason}")]
    InvalidAttachment {
        kind: &'static str,
        parent: NodeId,
        reason: &'static str,
    },
}

/// Errors that abort a build.
///
/// Extension failures never show up here: they are counted in the outcome.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The root position could not be analyzed.
    #[error("Failed to analyze root position: {0}")]
    Seed(#[source] AnalysisError),
    /// An analysis submitted during extension failed.
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}
