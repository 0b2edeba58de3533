//! Serializable build reports.
//!
//! A tree goes out as a flat node list; each node names its parent by id and
//! carries its classification.

use serde::Serialize;
use uuid::Uuid;

use crate::builder::{BuildOutcome, TerminationReason};
use crate::classify::{classify, NodeClass, TreeStats};
use crate::tree::TreeNode;

#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    #[serde(flatten)]
    pub node: TreeNode,
    #[serde(flatten)]
    pub class: NodeClass,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeReport {
    pub build_id: Uuid,
    pub nodes: Vec<NodeReport>,
    pub iterations_used: u32,
    pub failed_extensions: u32,
    pub spine_truncated: bool,
    pub termination_reason: TerminationReason,
    pub target_confidence: u8,
    pub max_ply: u32,
    pub stats: TreeStats,
}

impl BuildOutcome {
    pub fn report(&self) -> TreeReport {
        let target = self.target_confidence;
        TreeReport {
            build_id: self.build_id,
            nodes: self
                .tree
                .nodes()
                .iter()
                .map(|node| NodeReport {
                    node: node.clone(),
                    class: classify(node, target),
                })
                .collect(),
            iterations_used: self.iterations_used,
            failed_extensions: self.failed_extensions,
            spine_truncated: self.spine_truncated,
            termination_reason: self.termination_reason,
            target_confidence: target,
            max_ply: self.max_ply,
            stats: TreeStats::collect(&self.tree, target),
        }
    }
}
