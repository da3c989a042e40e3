//! cibuild API - step-graph vocabulary
//!
//! Shared types every build-graph step speaks:
//! - Pipeline image tag references and the links between steps
//! - The `Step` contract driven by the graph scheduler
//! - Execution mode (real vs. simulated) and cooperative cancellation
//! - Declarative step configuration loaded from YAML
//! - Collaborator errors and failure-reason classification
//!
//! # Example
//!
//! ```rust,ignore
//! use cibuild_api::prelude::*;
//!
//! let config = StepConfiguration::from_yaml_str(raw)?;
//! config.validate()?;
//! let step = cibuild_steps::steps::from_configuration(config, &clients, &env);
//! step.run(&ExecutionContext::new(), ExecutionMode::Simulated).await?;
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod error;
pub mod step;
pub mod types;

pub use config::{
    BundleSourceStepConfiguration, JobSpec, PullSecret, PullSpecSubstitution,
    ResourceConfiguration, ResourceRequirements, StepConfiguration,
};
pub use context::{ExecutionContext, ExecutionMode};
pub use error::{ClientError, ConfigError, FailureReason, ParameterError, ResultExt, StepFailure};
pub use step::{InputDefinition, ParameterMap, ParameterValue, Step};
pub use types::{
    PipelineImageStreamTagReference, StepLink, PIPELINE_IMAGE_STREAM, PIPELINE_SOURCE_TAG,
    STABLE_IMAGE_STREAM,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for implementing and driving steps
    pub use crate::{
        ExecutionContext, ExecutionMode, PipelineImageStreamTagReference, ResultExt, Step,
        StepConfiguration, StepFailure, StepLink,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
