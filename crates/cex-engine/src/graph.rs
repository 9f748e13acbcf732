//! The graph builder (C6): turn a namespace's root nodes into a
//! topologically ordered graph with predecessor lookups.
//!
//! A [`Node`] is immutable once `NodeBuilder::build()` returns, and
//! successors must already exist (as finished `Arc<Node>`s) before a node
//! referencing them can itself be built. The cycle check below is the
//! seam the validator's "cycle in graph" finding (§4.5 check 1) hangs off.

use std::collections::HashMap;
use std::sync::Arc;

use crate::node::{Node, NodeRuntimeId};

#[derive(Debug)]
pub struct CycleDetected;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// A namespace's node graph: every reachable node in a stable topological
/// order, plus a predecessor lookup the validator and scheduler both need
/// to compute "available inputs" for a node.
pub struct Graph {
    pub topo_order: Vec<Arc<Node>>,
    predecessors: HashMap<NodeRuntimeId, Vec<Arc<Node>>>,
}

impl Graph {
    /// Depth-first walk from `root_nodes`, visiting each node exactly once
    /// (by runtime identity) regardless of how many predecessors reach it.
    /// This is what makes a diamond join produce one executor per node.
    pub fn build(root_nodes: &[Arc<Node>]) -> Result<Self, CycleDetected> {
        let mut marks: HashMap<NodeRuntimeId, Mark> = HashMap::new();
        let mut postorder: Vec<Arc<Node>> = Vec::new();
        let mut predecessors: HashMap<NodeRuntimeId, Vec<Arc<Node>>> = HashMap::new();

        for root in root_nodes {
            visit(root, &mut marks, &mut postorder, &mut predecessors)?;
        }

        postorder.reverse();
        Ok(Self {
            topo_order: postorder,
            predecessors,
        })
    }

    pub fn predecessors(&self, node: &Node) -> &[Arc<Node>] {
        self.predecessors
            .get(&node.runtime_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn visit(
    node: &Arc<Node>,
    marks: &mut HashMap<NodeRuntimeId, Mark>,
    postorder: &mut Vec<Arc<Node>>,
    predecessors: &mut HashMap<NodeRuntimeId, Vec<Arc<Node>>>,
) -> Result<(), CycleDetected> {
    match marks.get(&node.runtime_id) {
        Some(Mark::InProgress) => return Err(CycleDetected),
        Some(Mark::Done) => return Ok(()),
        None => {}
    }

    marks.insert(node.runtime_id, Mark::InProgress);
    for successor in &node.subsequent_nodes {
        predecessors
            .entry(successor.runtime_id)
            .or_default()
            .push(node.clone());
        visit(successor, marks, postorder, predecessors)?;
    }
    marks.insert(node.runtime_id, Mark::Done);
    postorder.push(node.clone());
    Ok(())
}
