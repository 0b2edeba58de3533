//! Display classification of tree nodes.
//!
//! Squares are the two boundary nodes, triangles are spine nodes that grew
//! branches, and every other node is a circle. Green means the node meets
//! the target. Red means it falls short, or that an alternative came too
//! close to the spine move. Blue marks a branched node whose spine move held
//! up but whose confidence is still under the target.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::tree::{ConfidenceTree, TreeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Square,
    Triangle,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Green,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeClass {
    pub shape: Shape,
    pub color: Color,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Square => write!(f, "square"),
            Shape::Triangle => write!(f, "triangle"),
            Shape::Circle => write!(f, "circle"),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Green => write!(f, "green"),
            Color::Blue => write!(f, "blue"),
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.shape)
    }
}

/// Classifies one node against a target confidence.
///
/// Pure: reads only the node's own fields.
pub fn classify(node: &TreeNode, target_confidence: u8) -> NodeClass {
    let meets = |yes: Color| {
        if node.confidence_percent >= target_confidence {
            yes
        } else {
            Color::Red
        }
    };
    if node.is_boundary {
        NodeClass {
            shape: Shape::Square,
            color: meets(Color::Green),
        }
    } else if node.has_branches {
        let color = if node.insufficient_confidence {
            Color::Red
        } else if node.confidence_percent < target_confidence {
            Color::Blue
        } else {
            Color::Green
        };
        NodeClass {
            shape: Shape::Triangle,
            color,
        }
    } else {
        NodeClass {
            shape: Shape::Circle,
            color: meets(Color::Green),
        }
    }
}

/// Number of nodes in one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    #[serde(flatten)]
    pub class: NodeClass,
    pub count: usize,
}

/// Aggregate view of a tree, for reports and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub spine_nodes: usize,
    pub branch_nodes: usize,
    /// Spine nodes that grew branches.
    pub branched_nodes: usize,
    pub insufficient_nodes: usize,
    pub min_spine_confidence: u8,
    pub max_ply_reached: u32,
    pub classes: Vec<ClassCount>,
}

impl TreeStats {
    pub fn collect(tree: &ConfidenceTree, target_confidence: u8) -> Self {
        let nodes = tree.nodes();
        let mut classes: BTreeMap<NodeClass, usize> = BTreeMap::new();
        for node in nodes {
            *classes.entry(classify(node, target_confidence)).or_default() += 1;
        }
        Self {
            total_nodes: nodes.len(),
            spine_nodes: nodes.iter().filter(|n| n.is_spine()).count(),
            branch_nodes: nodes.iter().filter(|n| !n.is_spine()).count(),
            branched_nodes: nodes.iter().filter(|n| n.has_branches).count(),
            insufficient_nodes: nodes.iter().filter(|n| n.insufficient_confidence).count(),
            min_spine_confidence: tree.min_spine_confidence(),
            max_ply_reached: nodes.iter().map(|n| n.ply_from_root).max().unwrap_or(0),
            classes: classes
                .into_iter()
                .map(|(class, count)| ClassCount { class, count })
                .collect(),
        }
    }

    /// How many nodes fall in `class`.
    pub fn count(&self, class: NodeClass) -> usize {
        self.classes
            .iter()
            .find(|c| c.class == class)
            .map_or(0, |c| c.count)
    }
}
