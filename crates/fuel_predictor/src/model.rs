//! Regression models
//!
//! The trained regressor is exported to JSON. Two shapes are understood:
//!
//! ```json
//! { "kind": "gradient_boosting", "feature_names": [...], "init": 4.9,
//!   "learning_rate": 0.1,
//!   "trees": [ { "nodes": [ { "feature": 1, "threshold": 40.0, "left": 1, "right": 2 },
//!                           { "value": -0.2 }, { "value": 0.3 } ] } ] }
//!
//! { "kind": "linear", "feature_names": [...], "intercept": 4.1, "coefficients": [...] }
//! ```
//!
//! Tree nodes must list children after their parent, which keeps evaluation
//! loop-free.

use serde::{Deserialize, Serialize};

/// Regression model seam
pub trait RegressionModel: Send + Sync {
    /// Feature names in the order `predict` expects them
    fn feature_names(&self) -> &[String];

    /// Single scalar output for one feature row
    fn predict(&self, features: &[f64]) -> f64;
}

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Regression tree in flat node layout, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Evaluate the tree (`x[feature] <= threshold` goes left)
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    index = if value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
    }

    fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(format!("node {i} splits on unknown feature {feature}"));
                }
                for child in [*left, *right] {
                    if child <= i || child >= self.nodes.len() {
                        return Err(format!("node {i} has invalid child index {child}"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Gradient-boosted regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingModel {
    pub feature_names: Vec<String>,
    /// Initial prediction (training target mean)
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoostingModel {
    /// Structural checks performed at load time
    pub fn check(&self) -> Result<(), String> {
        let n = self.feature_names.len();
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(t, tree)| tree.check(n).map_err(|e| format!("tree {t}: {e}")))
    }
}

impl RegressionModel for GradientBoostingModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
        self.init + self.learning_rate * boost
    }
}

/// Ordinary linear regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub feature_names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn check(&self) -> Result<(), String> {
        if self.coefficients.len() != self.feature_names.len() {
            return Err(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.feature_names.len()
            ));
        }
        Ok(())
    }
}

impl RegressionModel for LinearModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// On-disk model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    GradientBoosting(GradientBoostingModel),
    Linear(LinearModel),
}

impl ModelArtifact {
    /// Structural checks, then erase into the model seam
    pub fn into_model(self) -> Result<Box<dyn RegressionModel>, String> {
        match self {
            Self::GradientBoosting(m) => {
                m.check()?;
                Ok(Box::new(m))
            }
            Self::Linear(m) => {
                m.check()?;
                Ok(Box::new(m))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn test_gradient_boosting_predict() {
        let model = GradientBoostingModel {
            feature_names: names(2),
            init: 5.0,
            learning_rate: 0.5,
            trees: vec![stump(0, 10.0, -1.0, 1.0), stump(1, 0.5, 0.0, 2.0)],
        };
        assert!(model.check().is_ok());
        assert_eq!(model.predict(&[5.0, 0.0]), 4.5);
        assert_eq!(model.predict(&[20.0, 1.0]), 6.5);
    }

    #[test]
    fn test_tree_rejects_backward_child() {
        let tree = RegressionTree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(tree.check(1).is_err());
    }

    #[test]
    fn test_tree_rejects_unknown_feature() {
        assert!(stump(3, 1.0, 0.0, 1.0).check(2).is_err());
    }

    #[test]
    fn test_linear_predict() {
        let model = LinearModel {
            feature_names: names(3),
            intercept: 1.0,
            coefficients: vec![0.5, 2.0, -1.0],
        };
        assert_eq!(model.predict(&[2.0, 1.0, 3.0]), 1.0);
    }

    #[test]
    fn test_artifact_json_shape() {
        let json = r#"{
            "kind": "gradient_boosting",
            "feature_names": ["a"],
            "init": 1.0,
            "learning_rate": 1.0,
            "trees": [ { "nodes": [
                { "feature": 0, "threshold": 0.5, "left": 1, "right": 2 },
                { "value": 10.0 },
                { "value": 20.0 }
            ] } ]
        }"#;
        let artifact: ModelArtifact = serde_json::from_str(json).unwrap();
        let model = artifact.into_model().unwrap();
        assert_eq!(model.predict(&[1.0]), 21.0);
    }
}
