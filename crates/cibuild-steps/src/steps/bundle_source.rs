//! Bundle source step
//!
//! Takes the pipeline source image, rewrites image pull specs inside its
//! operator manifests and commits the result as a new pipeline image.
//!
//! # Run sequence
//! 1. Resolve the source image's working directory (placeholder when
//!    simulated)
//! 2. Plan substitutions and render the recipe
//! 3. Assemble the build request
//! 4. Hand it to the build submitter
//!
//! Every failure is tagged `building_bundle_source`. There are no retries
//! here.

use super::{StepClients, StepEnvironment};
use crate::build::{BuildRequest, BuildSubmitter};
use crate::clients::WorkingDirResolver;
use crate::dry_logger::DryLogger;
use crate::error::{BundleSourceError, RecipeError};
use crate::phase::{PhaseTracker, RunPhase};
use crate::planner;
use crate::pullspec::PullSpecResolver;
use crate::recipe::Recipe;
use cibuild_api::{
    BundleSourceStepConfiguration, ExecutionContext, ExecutionMode, FailureReason, InputDefinition,
    JobSpec, ParameterMap, PipelineImageStreamTagReference, PullSecret, ResourceConfiguration,
    ResultExt, Step, StepFailure, StepLink,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Classification of every bundle source failure
pub const BUILDING_BUNDLE_SOURCE: FailureReason = FailureReason::new("building_bundle_source");

/// Working directory assumed for the source image in simulated runs
pub const DRY_WORKING_DIR: &str = "dry-fake";

const BUNDLE_SOURCE_SUFFIX: &str = "-sub";

/// Tag of the source image feeding the bundle image `bundle`
///
/// Lets the graph builder wire the two steps together without shared state.
#[must_use]
pub fn bundle_source_name(bundle: &PipelineImageStreamTagReference) -> PipelineImageStreamTagReference {
    PipelineImageStreamTagReference::new(format!("{bundle}{BUNDLE_SOURCE_SUFFIX}"))
}

/// Build-graph node producing a bundle source image
pub struct BundleSourceStep {
    config: BundleSourceStepConfiguration,
    resources: ResourceConfiguration,
    builds: Arc<dyn BuildSubmitter>,
    working_dirs: Arc<dyn WorkingDirResolver>,
    pull_specs: PullSpecResolver,
    job_spec: Arc<JobSpec>,
    artifact_dir: PathBuf,
    dry_logger: Arc<DryLogger>,
    pull_secret: Option<PullSecret>,
}

impl BundleSourceStep {
    /// Create the step with its collaborators
    #[must_use]
    pub fn new(config: BundleSourceStepConfiguration, clients: &StepClients, env: &StepEnvironment) -> Self {
        Self {
            config,
            resources: env.resources.clone(),
            builds: Arc::clone(&clients.builds),
            working_dirs: Arc::clone(&clients.working_dirs),
            pull_specs: PullSpecResolver::new(Arc::clone(&clients.image_streams), env.job_spec.namespace()),
            job_spec: Arc::clone(&env.job_spec),
            artifact_dir: env.artifact_dir.clone(),
            dry_logger: Arc::clone(&env.dry_logger),
            pull_secret: env.pull_secret.clone(),
        }
    }

    /// Step configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BundleSourceStepConfiguration {
        &self.config
    }

    /// Generate the recipe for this step's substitutions
    ///
    /// # Errors
    /// Fails on the first replacement tag that cannot be resolved, or on a
    /// substitution value the command cannot carry.
    pub async fn recipe(&self, mode: ExecutionMode) -> Result<Recipe, RecipeError> {
        let manifest_dir = self.config.manifest_dir();
        let commands = planner::plan(&manifest_dir, &self.config.substitute, &self.pull_specs, mode).await?;
        Ok(Recipe::render(
            PipelineImageStreamTagReference::source().stream_tag(),
            commands,
        ))
    }

    async fn working_dir(&self, mode: ExecutionMode) -> Result<String, BundleSourceError> {
        if mode.is_dry() {
            return Ok(DRY_WORKING_DIR.to_string());
        }
        let image = PipelineImageStreamTagReference::source().stream_tag();
        self.working_dirs
            .working_dir(&image, self.job_spec.namespace())
            .await
            .map_err(|source| BundleSourceError::WorkingDir { image, source })
    }

    fn build_request(&self, working_dir: &str, recipe: &Recipe) -> BuildRequest {
        let source = PipelineImageStreamTagReference::source();
        BuildRequest::from_pipeline_image(&self.job_spec, &source, &self.config.to, recipe.text())
            .with_image_source(
                &source,
                format!("{working_dir}/{}/.", self.config.context_dir),
                ".",
            )
            .with_resources(self.resources.requirements_for_step(self.config.to.as_str()))
            .with_pull_secret(self.pull_secret.clone())
    }

    async fn build_bundle_source(
        &self,
        ctx: &ExecutionContext,
        mode: ExecutionMode,
        phase: &mut PhaseTracker<'_>,
    ) -> Result<(), BundleSourceError> {
        phase.advance(RunPhase::ResolvingInputs);
        let working_dir = self.working_dir(mode).await?;

        phase.advance(RunPhase::GeneratingRecipe);
        let recipe = self.recipe(mode).await?;
        tracing::debug!(
            "Step {}: recipe has {} instructions",
            self.name(),
            recipe.len()
        );

        phase.advance(RunPhase::SubmittingBuild);
        let build = self.build_request(&working_dir, &recipe);
        self.builds
            .submit(ctx, build, mode, &self.artifact_dir, &self.dry_logger)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for BundleSourceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleSourceStep")
            .field("config", &self.config)
            .field("namespace", &self.job_spec.namespace)
            .field("artifact_dir", &self.artifact_dir)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Step for BundleSourceStep {
    fn inputs(&self, _mode: ExecutionMode) -> Result<InputDefinition, StepFailure> {
        Ok(InputDefinition::new())
    }

    async fn run(&self, ctx: &ExecutionContext, mode: ExecutionMode) -> Result<(), StepFailure> {
        tracing::info!("Building bundle source image {} ({} mode)", self.config.to, mode);
        let mut phase = PhaseTracker::new(self.name());
        let result = self.build_bundle_source(ctx, mode, &mut phase).await;
        match &result {
            Ok(()) => {
                phase.advance(RunPhase::Succeeded);
                tracing::info!("Built bundle source image {}", self.config.to);
            }
            Err(e) => {
                let failed_in = phase.current();
                phase.advance(RunPhase::Failed);
                tracing::error!(
                    "Step {} failed while {:?} ({}, {}): {}",
                    self.name(),
                    failed_in,
                    BUILDING_BUNDLE_SOURCE,
                    e.kind(),
                    e
                );
            }
        }
        result.for_reason(BUILDING_BUNDLE_SOURCE)
    }

    fn requires(&self) -> Vec<StepLink> {
        vec![StepLink::internal_image(PipelineImageStreamTagReference::source())]
    }

    fn creates(&self) -> Vec<StepLink> {
        vec![StepLink::internal_image(self.config.to.clone())]
    }

    fn provides(&self) -> (ParameterMap, StepLink) {
        (ParameterMap::new(), StepLink::internal_image(self.config.to.clone()))
    }

    fn name(&self) -> &str {
        self.config.to.as_str()
    }

    fn description(&self) -> String {
        format!("Build image {} from the repository", self.config.to)
    }
}
