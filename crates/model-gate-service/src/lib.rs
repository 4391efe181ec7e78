//! Service layer for model-gate
//!
//! Orchestration sits here, between the binaries and the tracking/learning
//! crates. Both services depend only on the capability traits, so they run
//! unchanged against MLflow and Azure ML, the local file store or in-memory
//! test doubles.
//!
//! - **TrainingService**: fit, evaluate, log the metric and save the model
//! - **PromotionService**: compare a run against production and register it
//!
//! # Example
//!
//! ```rust,no_run
//! use model_gate_core::{RunId, WorkspaceScope};
//! use model_gate_service::{DefaultPromotionService, PromoteRequest, PromotionService};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     metrics: Arc<dyn model_gate_tracking::MetricStore>,
//! #     registry: Arc<dyn model_gate_tracking::ModelRegistry>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let service = DefaultPromotionService::new(metrics, registry);
//! let request = PromoteRequest::new(RunId::new("run-1")?, WorkspaceScope::new("sub", "rg", "ws")?);
//!
//! match service.promote(request).await {
//!     Ok(promoted) => println!("registered {:?}", promoted.registered),
//!     Err(err) if err.is_rejection() => println!("kept production model: {}", err),
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod dto;
pub mod error;
pub mod promotion;
pub mod training;

// Re-export main types for convenience
pub use dto::*;
pub use error::{ServiceError, ServiceResult};

// Re-export service traits and implementations
pub use promotion::{DefaultPromotionService, PromotionService};
pub use training::{DefaultTrainingService, TrainingService, MODEL_HASH_TAG, MODEL_PATH_TAG};
