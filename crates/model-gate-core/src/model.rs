//! Registered model types
//!
//! A [`ModelSpec`] is what the promoter submits to the registry; the registry
//! answers with a [`RegisteredModel`] carrying the version it assigned. Lookups
//! that only need to find a version's training run return a lighter
//! [`ModelRef`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::storage::ArtifactPath;
use crate::types::{Labels, Properties, RunId, Tags, RUN_ID_PROPERTY};

/// Kind of model asset stored in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Opaque model file with no framework-specific packaging
    CustomModel,
    /// MLflow model directory
    MlflowModel,
    /// Triton model repository
    TritonModel,
}

impl ModelType {
    /// Wire name used by the registry
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::CustomModel => "custom_model",
            ModelType::MlflowModel => "mlflow_model",
            ModelType::TritonModel => "triton_model",
        }
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::CustomModel
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "custom_model" | "custommodel" => Ok(ModelType::CustomModel),
            "mlflow_model" | "mlflowmodel" => Ok(ModelType::MlflowModel),
            "triton_model" | "tritonmodel" => Ok(ModelType::TritonModel),
            _ => Err(CoreError::ValidationError(format!("Invalid model type: {}", s))),
        }
    }
}

/// Validate a registry model name
pub fn validate_model_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::InvalidModelName("model name cannot be empty".to_string()));
    }
    if name.len() > 255 {
        return Err(CoreError::InvalidModelName(format!(
            "model name exceeds 255 characters: {}",
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::InvalidModelName(format!(
            "'{}' may only contain letters, digits, '-', '_' and '.'",
            name
        )));
    }
    Ok(())
}

/// Request to register a new model version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name (the version is assigned by the registry)
    pub name: String,

    /// Asset kind
    #[serde(default)]
    pub model_type: ModelType,

    /// Location of the model files
    pub path: ArtifactPath,

    /// Optional human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Key-value tags
    #[serde(default)]
    pub tags: Tags,

    /// Labels such as `production`
    #[serde(default)]
    pub labels: Labels,

    /// Free-form properties
    #[serde(default)]
    pub properties: Properties,
}

impl ModelSpec {
    /// Create a builder for a model spec
    pub fn builder(name: impl Into<String>, path: ArtifactPath) -> ModelSpecBuilder {
        ModelSpecBuilder::new(name, path)
    }

    /// Validate the spec before submission
    pub fn validate(&self) -> Result<()> {
        validate_model_name(&self.name)?;
        if self.path.as_str().is_empty() {
            return Err(CoreError::ValidationError(
                "model path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Training run this spec was produced by, if recorded
    pub fn run_id(&self) -> Option<RunId> {
        self.properties
            .get(RUN_ID_PROPERTY)
            .and_then(|id| RunId::new(id.as_str()).ok())
    }

    /// Whether the spec carries the given label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }
}

/// Builder for [`ModelSpec`]
#[derive(Debug, Clone)]
pub struct ModelSpecBuilder {
    spec: ModelSpec,
}

impl ModelSpecBuilder {
    /// Start a builder with the required fields
    pub fn new(name: impl Into<String>, path: ArtifactPath) -> Self {
        Self {
            spec: ModelSpec {
                name: name.into(),
                model_type: ModelType::default(),
                path,
                description: None,
                tags: Tags::new(),
                labels: Labels::new(),
                properties: Properties::new(),
            },
        }
    }

    /// Set the model type
    pub fn model_type(mut self, model_type: ModelType) -> Self {
        self.spec.model_type = model_type;
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    /// Add a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.tags.insert(key.into(), value.into());
        self
    }

    /// Add a label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.spec.labels.insert(label.into(), String::new());
        self
    }

    /// Add a property
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.properties.insert(key.into(), value.into());
        self
    }

    /// Record the training run that produced the model
    pub fn run_id(self, run_id: &RunId) -> Self {
        self.property(RUN_ID_PROPERTY, run_id.as_str())
    }

    /// Build and validate the spec
    pub fn build(self) -> Result<ModelSpec> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

/// A model version as stored in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    /// Submitted specification
    #[serde(flatten)]
    pub spec: ModelSpec,

    /// Version assigned by the registry, starting at 1
    pub version: u32,

    /// Creation time reported by the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RegisteredModel {
    /// Wrap a spec with its assigned version
    pub fn new(spec: ModelSpec, version: u32) -> Self {
        Self {
            spec,
            version,
            created_at: None,
        }
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Lightweight reference to this version
    pub fn to_ref(&self) -> ModelRef {
        ModelRef {
            name: self.spec.name.clone(),
            version: self.version,
            run_id: self.spec.run_id(),
            path: Some(self.spec.path.clone()),
        }
    }
}

/// Reference to a registered model version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Model name
    pub name: String,
    /// Registry version
    pub version: u32,
    /// Training run the version was produced by, if recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Model location, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<ArtifactPath>,
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}
