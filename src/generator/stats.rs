//! Shape statistics over sampled trees

use std::collections::BTreeMap;

use serde::Serialize;

use crate::grammar::{ExprNode, NodeKind};

/// Aggregate shape statistics of generated trees
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationStats {
    /// Number of trees recorded
    pub samples: usize,
    /// Node count per construct over all trees
    pub kind_counts: BTreeMap<NodeKind, usize>,
    /// Root construct count per construct
    pub root_counts: BTreeMap<NodeKind, usize>,
    /// Deepest tree seen
    pub max_depth: usize,
    total_depth: usize,
    total_nodes: usize,
    total_code_len: usize,
}

impl GenerationStats {
    /// Create empty statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tree and its rendered text
    pub fn record(&mut self, node: &ExprNode, code: &str) {
        self.samples += 1;
        *self.root_counts.entry(node.kind()).or_default() += 1;

        let depth = node.depth();
        self.max_depth = self.max_depth.max(depth);
        self.total_depth += depth;
        self.total_code_len += code.len();

        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.total_nodes += 1;
            *self.kind_counts.entry(current.kind()).or_default() += 1;
            stack.extend(current.children());
        }
    }

    /// Mean tree depth
    #[must_use]
    pub fn mean_depth(&self) -> f64 {
        self.mean(self.total_depth)
    }

    /// Mean number of nodes per tree
    #[must_use]
    pub fn mean_node_count(&self) -> f64 {
        self.mean(self.total_nodes)
    }

    /// Mean rendered length in bytes
    #[must_use]
    pub fn mean_code_len(&self) -> f64 {
        self.mean(self.total_code_len)
    }

    /// Share of all nodes that have the given kind, in percent
    #[must_use]
    pub fn kind_percentage(&self, kind: NodeKind) -> f64 {
        if self.total_nodes == 0 {
            return 0.0;
        }
        let count = self.kind_counts.get(&kind).copied().unwrap_or(0);
        (count as f64 / self.total_nodes as f64) * 100.0
    }

    fn mean(&self, total: usize) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        total as f64 / self.samples as f64
    }
}
