//! Tree ensemble in a flat node-array layout, loaded from JSON.
//!
//! Numeric splits send a row left when `value < threshold`; missing values
//! (`NaN`) follow the node's default direction.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Sigmoid of `base_score + sum(leaves)`.
    BinaryLogistic,
    /// `base_score + sum(leaves)`.
    Regression,
    /// Mean leaf value across trees (random forests).
    Average,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub leaf: bool,
    #[serde(default)]
    pub feature: u32,
    #[serde(default)]
    pub threshold: f32,
    #[serde(default)]
    pub left: u32,
    #[serde(default)]
    pub right: u32,
    #[serde(default)]
    pub default_left: bool,
    #[serde(default)]
    pub value: f32,
}

impl Node {
    pub fn split(feature: u32, threshold: f32, left: u32, right: u32, default_left: bool) -> Self {
        Self {
            leaf: false,
            feature,
            threshold,
            left,
            right,
            default_left,
            value: 0.0,
        }
    }

    pub fn leaf(value: f32) -> Self {
        Self {
            leaf: true,
            value,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Walk from the root to a leaf and return its value.
    #[inline]
    pub fn predict_row(&self, features: &[f32]) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.leaf {
                return node.value;
            }
            let fvalue = features
                .get(node.feature as usize)
                .copied()
                .unwrap_or(f32::NAN);
            let go_left = if fvalue.is_nan() {
                node.default_left
            } else {
                fvalue < node.threshold
            };
            idx = (if go_left { node.left } else { node.right }) as usize;
        }
    }

    fn validate(&self, tree_idx: usize, num_features: usize) -> Result<()> {
        ensure!(!self.nodes.is_empty(), "tree {tree_idx} has no nodes");
        for (i, node) in self.nodes.iter().enumerate() {
            if node.leaf {
                continue;
            }
            // Children must come after their parent so traversal always ends.
            for child in [node.left, node.right] {
                let child = child as usize;
                ensure!(
                    child > i && child < self.nodes.len(),
                    "tree {tree_idx} node {i}: child {child} out of order or out of range"
                );
            }
            ensure!(
                (node.feature as usize) < num_features,
                "tree {tree_idx} node {i}: feature {} >= {num_features}",
                node.feature
            );
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    pub objective: Objective,
    #[serde(default)]
    pub base_score: f64,
    pub num_features: usize,
    pub trees: Vec<Tree>,
}

impl Forest {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let forest: Forest = serde_json::from_str(raw)?;
        forest.validate()?;
        Ok(forest)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.trees.is_empty(), "forest has no trees");
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.num_features)?;
        }
        Ok(())
    }

    pub fn predict_row(&self, features: &[f32]) -> f64 {
        let sum: f64 = self
            .trees
            .iter()
            .map(|t| t.predict_row(features) as f64)
            .sum();
        match self.objective {
            Objective::BinaryLogistic => sigmoid(self.base_score + sum),
            Objective::Regression => self.base_score + sum,
            Objective::Average => sum / self.trees.len() as f64,
        }
    }

    pub fn predict_rows<'a>(&self, rows: impl Iterator<Item = &'a [f32]>) -> Vec<f64> {
        rows.map(|r| self.predict_row(r)).collect()
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
