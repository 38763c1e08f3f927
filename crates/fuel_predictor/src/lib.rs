//! # Fuel Predictor
//!
//! Adapter around a pretrained fuel-consumption regressor.
//!
//! Responsibilities:
//! - Load the exported model artifact once (JSON)
//! - One-hot encode trip parameters into the training feature layout
//! - Return the model's scalar output unmodified

pub mod error;
pub mod model;
pub mod predictor;

pub use error::{FuelPredictorError, Result};
pub use model::{GradientBoostingModel, LinearModel, ModelArtifact, RegressionModel, TreeNode};
pub use predictor::{encode_features, FuelPredictor, FEATURE_NAMES};
