//! Confidence tree construction.
//!
//! A build seeds a spine from the engine's principal variation, then keeps
//! extending the least confident spine node with the engine's best
//! alternatives until the line is trusted, nothing is left to extend, or the
//! iteration budget runs out.

use std::collections::HashSet;
use std::sync::Arc;

use analysis_queue::{AnalysisError, AnalysisOptions, AnalysisQueue, Position};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::error::{BuildError, TreeError};
use crate::rules::{MoveRules, UciNotation};
use crate::tree::{ConfidenceTree, NodeId, TreeNode};

/// Engine budgets and tree-shaping knobs shared by all builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Search depth for the root and spine positions.
    #[serde(default = "default_seed_depth")]
    pub seed_depth: u32,

    /// Search depth for a node's first extension.
    #[serde(default = "default_extension_depth")]
    pub extension_depth: u32,

    /// Extra depth for every later extension of the same node.
    #[serde(default = "default_revisit_depth_step")]
    pub revisit_depth_step: u32,

    /// Alternatives added per extension.
    #[serde(default = "default_branch_count")]
    pub branch_count: u32,

    /// Successful extensions a node may receive within one build.
    #[serde(default = "default_max_extensions_per_node")]
    pub max_extensions_per_node: u32,

    /// An alternative within this many centipawns of the spine move makes
    /// the node insufficient.
    #[serde(default = "default_recolor_margin_cp")]
    pub recolor_margin_cp: i32,
}

fn default_seed_depth() -> u32 {
    14
}

fn default_extension_depth() -> u32 {
    16
}

fn default_revisit_depth_step() -> u32 {
    4
}

fn default_branch_count() -> u32 {
    2
}

fn default_max_extensions_per_node() -> u32 {
    2
}

fn default_recolor_margin_cp() -> i32 {
    30
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            seed_depth: default_seed_depth(),
            extension_depth: default_extension_depth(),
            revisit_depth_step: default_revisit_depth_step(),
            branch_count: default_branch_count(),
            max_extensions_per_node: default_max_extensions_per_node(),
            recolor_margin_cp: default_recolor_margin_cp(),
        }
    }
}

/// Parameters of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub position: Position,
    pub target_confidence: u8,
    pub max_ply: u32,
    pub max_iterations: u32,
}

impl BuildRequest {
    pub fn new(position: Position, target_confidence: u8, max_ply: u32, max_iterations: u32) -> Self {
        Self {
            position,
            target_confidence: target_confidence.min(100),
            max_ply,
            max_iterations,
        }
    }
}

/// Why a build stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Every spine node met the target confidence.
    TargetReached,
    /// No spine node was left to extend.
    QueueExhausted,
    /// The iteration budget ran out first.
    IterationCapReached,
}

/// A finished build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub build_id: Uuid,
    pub tree: ConfidenceTree,
    pub iterations_used: u32,
    pub failed_extensions: u32,
    /// The spine stops short of the root's principal variation because a
    /// spine analysis failed. That failure is also in `failed_extensions`.
    pub spine_truncated: bool,
    pub termination_reason: TerminationReason,
    pub target_confidence: u8,
    pub max_ply: u32,
}

/// A spine analysis failure that ends seeding early.
///
/// Overload is not a per-position problem, so it aborts the build instead.
fn truncates_spine(err: &AnalysisError) -> bool {
    !matches!(err, AnalysisError::QueueOverloaded { .. })
}

/// Which spine nodes may be extended, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub target_confidence: u8,
    pub max_ply: u32,
    pub max_extensions_per_node: u32,
}

impl SelectionPolicy {
    /// The structural eligibility rule. Branch nodes never qualify.
    pub fn is_eligible(&self, node: &TreeNode) -> bool {
        node.is_spine()
            && !node.is_boundary
            && node.ply_from_root < self.max_ply
            && (node.confidence_percent < self.target_confidence
                || (node.has_branches && node.insufficient_confidence))
    }

    /// Eligible nodes that this build may still extend, least confident
    /// first and earliest ply on ties.
    pub fn candidates(&self, tree: &ConfidenceTree, excluded: &HashSet<NodeId>) -> Vec<NodeId> {
        let mut nodes: Vec<&TreeNode> = tree
            .nodes()
            .iter()
            .filter(|n| self.is_eligible(n))
            .filter(|n| n.extension_count < self.max_extensions_per_node)
            .filter(|n| !excluded.contains(&n.id))
            .collect();
        nodes.sort_by_key(|n| (n.confidence_percent, n.ply_from_root));
        nodes.into_iter().map(|n| n.id).collect()
    }
}

/// Builds confidence trees on top of a shared [`AnalysisQueue`].
///
/// Cheap to clone; every clone submits to the same queue.
#[derive(Clone)]
pub struct ConfidenceTreeBuilder {
    queue: AnalysisQueue,
    rules: Arc<dyn MoveRules>,
    config: BuildConfig,
}

impl ConfidenceTreeBuilder {
    pub fn new(queue: AnalysisQueue, config: BuildConfig) -> Self {
        Self {
            queue,
            rules: Arc::new(UciNotation),
            config,
        }
    }

    /// Replaces the default [`UciNotation`] rules.
    pub fn with_rules(mut self, rules: Arc<dyn MoveRules>) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn queue(&self) -> &AnalysisQueue {
        &self.queue
    }

    /// Builds a tree for `request`.
    ///
    /// A failing root analysis, an overloaded queue while seeding, or a
    /// malformed move in the root's principal variation aborts the build.
    /// Any other failed analysis is counted in
    /// [`BuildOutcome::failed_extensions`]: on the spine it cuts the line
    /// short, on an extension the node is skipped.
    pub async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, BuildError> {
        let build_id = Uuid::new_v4();
        let span = tracing::info_span!("build", %build_id);
        self.run(build_id, request).instrument(span).await
    }

    async fn run(&self, build_id: Uuid, request: &BuildRequest) -> Result<BuildOutcome, BuildError> {
        info!(
            position = %request.position,
            target = request.target_confidence,
            max_ply = request.max_ply,
            max_iterations = request.max_iterations,
            "Building confidence tree"
        );

        let (mut tree, spine_truncated) = self.seed(request).await?;
        let policy = SelectionPolicy {
            target_confidence: request.target_confidence,
            max_ply: request.max_ply,
            max_extensions_per_node: self.config.max_extensions_per_node,
        };

        let mut excluded = HashSet::new();
        let mut iterations_used = 0;
        let mut failed_extensions = u32::from(spine_truncated);

        let termination_reason = loop {
            if tree.min_spine_confidence() >= request.target_confidence {
                break TerminationReason::TargetReached;
            }
            let Some(&next) = policy.candidates(&tree, &excluded).first() else {
                break TerminationReason::QueueExhausted;
            };
            if iterations_used >= request.max_iterations {
                break TerminationReason::IterationCapReached;
            }
            iterations_used += 1;

            match self.extend(&mut tree, next).await {
                Ok(added) => debug!(node = %next, added, "Extended node"),
                Err(e) => {
                    warn!(node = %next, error = %e, "Extension failed, skipping node");
                    excluded.insert(next);
                    failed_extensions += 1;
                }
            }
        };

        info!(
            nodes = tree.len(),
            iterations_used,
            failed_extensions,
            spine_truncated,
            reason = ?termination_reason,
            "Build finished"
        );

        Ok(BuildOutcome {
            build_id,
            tree,
            iterations_used,
            failed_extensions,
            spine_truncated,
            termination_reason,
            target_confidence: request.target_confidence,
            max_ply: request.max_ply,
        })
    }

    /// Materializes the principal variation from the root as the spine.
    /// Also returns whether the spine was cut short by a failed analysis.
    async fn seed(&self, request: &BuildRequest) -> Result<(ConfidenceTree, bool), BuildError> {
        let options = AnalysisOptions::new(self.config.seed_depth, 1);
        let root = self
            .queue
            .submit(request.position.clone(), options)
            .await
            .map_err(BuildError::Seed)?;

        let mut tree = ConfidenceTree::new(
            request.position.clone(),
            root.confidence_percent,
            root.evaluation,
        );
        let mut tail = tree.root();
        let mut position = request.position.clone();
        let mut truncated = false;

        for mv in root.principal_variation.iter().take(request.max_ply as usize) {
            let next = self.rules.apply(&position, mv)?;
            let analysis = match self.queue.submit(next.clone(), options).await {
                Ok(analysis) => analysis,
                Err(e) if truncates_spine(&e) => {
                    warn!(ply = tail.index() + 1, error = %e, "Spine analysis failed, truncating line");
                    truncated = true;
                    break;
                }
                Err(e) => return Err(BuildError::Seed(e)),
            };
            tail = tree.push_spine(
                tail,
                mv,
                next.clone(),
                analysis.confidence_percent,
                analysis.evaluation,
            )?;
            position = next;
        }

        tree.mark_boundaries();
        debug!(spine = tree.len(), truncated, "Seeded spine");
        Ok((tree, truncated))
    }

    /// Adds the best alternatives at `id` and recolors it. Returns how many
    /// branches were added.
    async fn extend(&self, tree: &mut ConfidenceTree, id: NodeId) -> Result<usize, BuildError> {
        let node = tree.get(id).ok_or(TreeError::UnknownNode(id))?;
        let position = node.position.clone();
        let depth = self.config.extension_depth
            + self.config.revisit_depth_step * node.extension_count;

        let spine_move = tree
            .spine_child(id)
            .and_then(|c| tree.get(c))
            .map(|c| c.mv.clone());
        let mut known: Vec<String> = tree.branches(id).map(|b| b.mv.clone()).collect();
        known.extend(spine_move.iter().cloned());

        let options = AnalysisOptions::new(depth, self.config.branch_count + known.len() as u32);
        let analysis = self.queue.submit(position.clone(), options).await?;

        // Resolve every child before touching the tree so a bad move leaves
        // the node as it was.
        let fresh = analysis
            .candidates
            .iter()
            .filter(|c| !known.contains(&c.mv))
            .take(self.config.branch_count as usize)
            .map(|c| self.rules.apply(&position, &c.mv).map(|child| (c, child)))
            .collect::<Result<Vec<_>, TreeError>>()?;

        for (candidate, child) in &fresh {
            // Stored from the side to move in the child position.
            tree.push_branch(
                id,
                &candidate.mv,
                child.clone(),
                candidate.confidence_percent,
                candidate.evaluation.flip(),
            )?;
        }

        let spine_eval = spine_move
            .as_deref()
            .and_then(|mv| analysis.candidate(mv))
            .map(|c| c.evaluation);
        tree.recolor(id, spine_eval, self.config.recolor_margin_cp)?;
        Ok(fresh.len())
    }
}
