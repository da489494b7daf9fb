//! Inference module
//!
//! Reconstructs stored pipelines and predicts on caller-supplied rows:
//! - Schema validation of feature rows against the recorded feature set
//! - Single-task and dual model dispatch by `model_type`
//! - Decoded class labels with per-class probabilities

mod engine;
mod row;

pub use engine::{predict_loaded, resolve_task, FeatureListing, InferenceEngine, Prediction};
pub use row::{rows_to_frame, FeatureRow};
