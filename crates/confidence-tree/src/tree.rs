//! Arena-backed confidence tree.
//!
//! Nodes live in one `Vec` and point at each other through [`NodeId`]s, so
//! parents and children can be walked both ways without shared ownership.
//! All structural mutation goes through [`ConfidenceTree`], which keeps the
//! shape rules intact: one spine chain from the root, branch nodes hang off
//! spine nodes only, and plies grow by one per edge.

use std::fmt;

use analysis_queue::{Evaluation, Position};
use serde::Serialize;

use crate::error::TreeError;

/// Index of a node inside its [`ConfidenceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a node lies on the main line or is an alternative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Spine,
    Branch,
}

/// One position in the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Move leading here from the parent; empty for the root.
    #[serde(rename = "move")]
    pub mv: String,
    pub position: Position,
    pub ply_from_root: u32,
    pub confidence_percent: u8,
    /// Confidence at the moment the node was created.
    pub initial_confidence: u8,
    /// Best branch confidence, recorded when the node is extended.
    pub frozen_confidence: Option<u8>,
    pub has_branches: bool,
    pub insufficient_confidence: bool,
    /// The root, and the last node of the seeded spine.
    pub is_boundary: bool,
    /// Engine evaluation for the side to move in this position.
    pub evaluation: Evaluation,
    /// Evaluation of the spine move from this node's side to move, as seen by
    /// the latest extension.
    pub spine_line_evaluation: Option<Evaluation>,
    /// How many times the node has been extended.
    pub extension_count: u32,
}

impl TreeNode {
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: NodeId,
        kind: NodeKind,
        parent: Option<NodeId>,
        mv: &str,
        position: Position,
        ply_from_root: u32,
        confidence: u8,
        evaluation: Evaluation,
    ) -> Self {
        Self {
            id,
            kind,
            parent,
            children: Vec::new(),
            mv: mv.to_string(),
            position,
            ply_from_root,
            confidence_percent: confidence,
            initial_confidence: confidence,
            frozen_confidence: None,
            has_branches: false,
            insufficient_confidence: false,
            is_boundary: false,
            evaluation,
            spine_line_evaluation: None,
            extension_count: 0,
        }
    }

    pub fn is_spine(&self) -> bool {
        self.kind == NodeKind::Spine
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceTree {
    nodes: Vec<TreeNode>,
}

impl ConfidenceTree {
    /// A tree holding only the root spine node.
    pub fn new(root: Position, confidence: u8, evaluation: Evaluation) -> Self {
        let node = TreeNode::new(
            NodeId(0),
            NodeKind::Spine,
            None,
            "",
            root,
            0,
            confidence,
            evaluation,
        );
        Self { nodes: vec![node] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.index())
    }

    fn node(&self, id: NodeId) -> Result<&TreeNode, TreeError> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode, TreeError> {
        self.get_mut(id).ok_or(TreeError::UnknownNode(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Continues the spine below `parent`, which must be its current tail.
    pub fn push_spine(
        &mut self,
        parent: NodeId,
        mv: &str,
        position: Position,
        confidence: u8,
        evaluation: Evaluation,
    ) -> Result<NodeId, TreeError> {
        let tail = self.node(parent)?;
        if !tail.is_spine() {
            return Err(TreeError::InvalidAttachment {
                kind: "spine",
                parent,
                reason: "parent is a branch node",
            });
        }
        if self.spine_child(parent).is_some() {
            return Err(TreeError::InvalidAttachment {
                kind: "spine",
                parent,
                reason: "parent already continues the spine",
            });
        }
        let ply = tail.ply_from_root + 1;
        Ok(self.attach(parent, NodeKind::Spine, mv, position, ply, confidence, evaluation))
    }

    /// Adds an alternative to the spine move at `parent`, a spine node.
    pub fn push_branch(
        &mut self,
        parent: NodeId,
        mv: &str,
        position: Position,
        confidence: u8,
        evaluation: Evaluation,
    ) -> Result<NodeId, TreeError> {
        let owner = self.node(parent)?;
        if !owner.is_spine() {
            return Err(TreeError::InvalidAttachment {
                kind: "branch",
                parent,
                reason: "branches only grow from spine nodes",
            });
        }
        if owner.is_boundary {
            return Err(TreeError::InvalidAttachment {
                kind: "branch",
                parent,
                reason: "parent is a boundary node",
            });
        }
        let ply = owner.ply_from_root + 1;
        Ok(self.attach(parent, NodeKind::Branch, mv, position, ply, confidence, evaluation))
    }

    #[allow(clippy::too_many_arguments)]
    fn attach(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        mv: &str,
        position: Position,
        ply: u32,
        confidence: u8,
        evaluation: Evaluation,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TreeNode::new(
            id,
            kind,
            Some(parent),
            mv,
            position,
            ply,
            confidence,
            evaluation,
        ));
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// The spine child of `id`, if the spine continues below it.
    pub fn spine_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.index()].is_spine())
    }

    /// Branch children of `id`.
    pub fn branches(&self, id: NodeId) -> impl Iterator<Item = &TreeNode> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .map(|c| &self.nodes[c.index()])
            .filter(|c| !c.is_spine())
    }

    /// Spine node ids from the root down.
    pub fn spine(&self) -> Vec<NodeId> {
        let mut spine = vec![self.root()];
        let mut current = self.root();
        while let Some(next) = self.spine_child(current) {
            spine.push(next);
            current = next;
        }
        spine
    }

    /// Lowest confidence along the spine.
    pub fn min_spine_confidence(&self) -> u8 {
        self.spine()
            .into_iter()
            .map(|id| self.nodes[id.index()].confidence_percent)
            .min()
            .unwrap_or(0)
    }

    /// Flags the root and the spine tail as boundaries. Call once the spine
    /// is complete.
    pub fn mark_boundaries(&mut self) {
        let tail = self.spine().last().copied().unwrap_or(self.root());
        for node in &mut self.nodes {
            node.is_boundary = node.is_root() || node.id == tail;
        }
    }

    /// Re-derives a node's flags after an extension.
    ///
    /// `spine_eval` is how the latest analysis rated the spine move, from the
    /// node's side to move; `None` means the spine move did not show up among
    /// the analyzed lines. Each call counts as one extension. The node stays
    /// unbranched if no alternative exists.
    pub fn recolor(
        &mut self,
        id: NodeId,
        spine_eval: Option<Evaluation>,
        margin_cp: i32,
    ) -> Result<(), TreeError> {
        // Branch evaluations are stored from the child's side; flip them back
        // to compare against the spine move.
        let branches: Vec<(u8, i32)> = self
            .branches(id)
            .map(|b| (b.confidence_percent, b.evaluation.flip().to_centipawns()))
            .collect();

        let node = self.node_mut(id)?;
        node.extension_count += 1;
        let Some(frozen) = branches.iter().map(|(conf, _)| *conf).max() else {
            return Ok(());
        };

        node.has_branches = true;
        node.frozen_confidence = Some(frozen);
        node.spine_line_evaluation = spine_eval;
        node.insufficient_confidence = match spine_eval {
            Some(spine) => {
                let threshold = spine.to_centipawns().saturating_sub(margin_cp);
                branches.iter().any(|(_, cp)| *cp >= threshold)
            }
            None => true,
        };
        node.confidence_percent = node.confidence_percent.max(frozen);
        Ok(())
    }
}
