//! The step contract
//!
//! Every node of the build graph implements `Step`. The scheduler only
//! talks to steps through this trait: it orders them using `requires` and
//! `creates`, wires parameters using `provides`, then calls `run`.

use crate::context::{ExecutionContext, ExecutionMode};
use crate::error::{ParameterError, StepFailure};
use crate::types::StepLink;
use std::collections::BTreeMap;
use std::sync::Arc;

/// External file inputs a step depends on, used for cache keys
pub type InputDefinition = Vec<String>;

/// Lazily evaluated parameter value
pub type ParameterValue = Arc<dyn Fn() -> Result<String, ParameterError> + Send + Sync>;

/// Named parameters a step exposes to downstream steps
pub type ParameterMap = BTreeMap<String, ParameterValue>;

/// A node in the build graph
///
/// Implementations hold no mutable state between runs, so independent steps
/// may run concurrently.
#[async_trait::async_trait]
pub trait Step: Send + Sync {
    /// External inputs of this step
    fn inputs(&self, mode: ExecutionMode) -> Result<InputDefinition, StepFailure>;

    /// Execute the step once. No retries happen at this layer.
    async fn run(&self, ctx: &ExecutionContext, mode: ExecutionMode) -> Result<(), StepFailure>;

    /// Links that must exist before this step runs
    fn requires(&self) -> Vec<StepLink>;

    /// Links this step produces
    fn creates(&self) -> Vec<StepLink>;

    /// Parameters exposed downstream and the link they belong to
    fn provides(&self) -> (ParameterMap, StepLink);

    /// Unique identity in the graph
    fn name(&self) -> &str;

    /// One-line human readable summary
    fn description(&self) -> String;
}
