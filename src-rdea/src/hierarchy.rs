//! Criteria hierarchy
//!
//! A rooted tree whose leaves are exactly the problem's factors. Nodes are
//! arena-allocated and refer to each other by index, so the structure is
//! acyclic by construction. A node's weight is the sum of the leaf weights
//! beneath it; the root therefore carries weight 1 under the simplex row,
//! and sibling weights sum to their parent's by definition. Analyses can be
//! scoped to any node: only the subtree's leaves enter the weighted sum.

use serde::Serialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize)]
pub struct HierNode {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Index into the problem's factor list; `Some` only on leaves, filled
    /// in when the hierarchy is bound to a problem.
    pub factor: Option<usize>,
}

// No `Deserialize`: the tree shape and the leaf/factor binding are enforced
// by `add_node`/`bind_factors`, and a field-wise decode would skip both.
#[derive(Debug, Clone, Serialize)]
pub struct Hierarchy {
    nodes: Vec<HierNode>,
    root: usize,
}

impl Hierarchy {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![HierNode {
                name: root_name.into(),
                parent: None,
                children: Vec::new(),
                factor: None,
            }],
            root: 0,
        }
    }

    /// Add a node under `parent`; returns its index.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: &str,
    ) -> Result<usize, ConfigError> {
        let name = name.into();
        if self.node_index(&name).is_some() {
            return Err(ConfigError::HierarchyMismatch(format!(
                "duplicate node name `{name}`"
            )));
        }
        let parent_idx = self
            .node_index(parent)
            .ok_or_else(|| ConfigError::UnknownFactor(parent.to_string()))?;
        let idx = self.nodes.len();
        self.nodes.push(HierNode {
            name,
            parent: Some(parent_idx),
            children: Vec::new(),
            factor: None,
        });
        self.nodes[parent_idx].children.push(idx);
        Ok(idx)
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn node(&self, idx: usize) -> &HierNode {
        &self.nodes[idx]
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Leaf node indices under `idx`, in factor declaration order after
    /// binding.
    pub fn leaves_under(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            if node.children.is_empty() {
                out.push(i);
            } else {
                // Reverse keeps declaration order on the stack.
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Factor indices (into the problem's factor list) under `idx`.
    pub fn factors_under(&self, idx: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .leaves_under(idx)
            .into_iter()
            .filter_map(|i| self.nodes[i].factor)
            .collect();
        out.sort_unstable();
        out
    }

    /// Match the leaves against the factor list; every factor must own
    /// exactly one leaf and every leaf must name a factor.
    pub(crate) fn bind_factors(&mut self, factor_names: &[String]) -> Result<(), ConfigError> {
        let leaves = self.leaves_under(self.root);
        if leaves.len() != factor_names.len() {
            return Err(ConfigError::HierarchyMismatch(format!(
                "{} leaves vs {} factors",
                leaves.len(),
                factor_names.len()
            )));
        }
        let mut seen = vec![false; factor_names.len()];
        for leaf in leaves {
            let name = self.nodes[leaf].name.clone();
            let f = factor_names
                .iter()
                .position(|n| *n == name)
                .ok_or_else(|| {
                    ConfigError::HierarchyMismatch(format!("leaf `{name}` is not a factor"))
                })?;
            if seen[f] {
                return Err(ConfigError::HierarchyMismatch(format!(
                    "factor `{name}` appears under two leaves"
                )));
            }
            seen[f] = true;
            self.nodes[leaf].factor = Some(f);
        }
        Ok(())
    }
}
