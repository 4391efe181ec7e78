//! Core domain models and types for model-gate
//!
//! This crate contains the data structures shared by the trainer and the
//! promoter: run identifiers, registered model specifications, workspace
//! scopes with their derived artifact paths, and the promotion policy that
//! decides whether a new model replaces the incumbent.

pub mod error;
pub mod model;
pub mod policy;
pub mod storage;
pub mod types;

// Re-exports for convenience
pub use error::{CoreError, Result};
pub use model::{ModelRef, ModelSpec, ModelSpecBuilder, ModelType, RegisteredModel};
pub use policy::{PromotionDecision, PromotionPolicy, Rejection, TiePolicy};
pub use storage::{ArtifactPath, WorkspaceScope};
pub use types::{
    Labels, Properties, RunId, RunStatus, Tags, DEFAULT_METRIC_NAME, DEFAULT_MODEL_NAME,
    NO_INCUMBENT_METRIC, PRODUCTION_LABEL, RUN_ID_PROPERTY, STAGE_TAG,
};
