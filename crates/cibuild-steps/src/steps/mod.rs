//! Step implementations and their construction from configuration
//!
//! The graph builder selects an implementation per `StepConfiguration`
//! variant; every implementation gets the collaborators it needs injected
//! through `StepClients` and `StepEnvironment`.

pub mod bundle_source;

pub use bundle_source::{bundle_source_name, BundleSourceStep, BUILDING_BUNDLE_SOURCE};

use crate::build::{BuildSubmitter, DryRunBuildSubmitter};
use crate::clients::{ImageStreamReader, OfflineCluster, WorkingDirResolver};
use crate::dry_logger::DryLogger;
use cibuild_api::{JobSpec, PullSecret, ResourceConfiguration, Step, StepConfiguration};
use std::path::PathBuf;
use std::sync::Arc;

/// Collaborator handles shared by all steps of a job
#[derive(Clone)]
pub struct StepClients {
    /// Build submission
    pub builds: Arc<dyn BuildSubmitter>,
    /// Image stream reads
    pub image_streams: Arc<dyn ImageStreamReader>,
    /// Image working-directory lookups
    pub working_dirs: Arc<dyn WorkingDirResolver>,
}

impl StepClients {
    /// Clients for a process without cluster access; only simulated runs succeed
    #[must_use]
    pub fn offline() -> Self {
        Self {
            builds: Arc::new(DryRunBuildSubmitter),
            image_streams: Arc::new(OfflineCluster),
            working_dirs: Arc::new(OfflineCluster),
        }
    }
}

impl std::fmt::Debug for StepClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepClients").finish_non_exhaustive()
    }
}

/// Job-wide settings passed to every step unchanged
#[derive(Debug, Clone)]
pub struct StepEnvironment {
    /// Running job
    pub job_spec: Arc<JobSpec>,
    /// Resource requirements per step
    pub resources: ResourceConfiguration,
    /// Registry pull credentials for builds
    pub pull_secret: Option<PullSecret>,
    /// Where build output is captured
    pub artifact_dir: PathBuf,
    /// Sink for simulated objects
    pub dry_logger: Arc<DryLogger>,
}

impl StepEnvironment {
    /// Environment for a job with no resources, secret or artifact dir
    #[must_use]
    pub fn new(job_spec: JobSpec) -> Self {
        Self {
            job_spec: Arc::new(job_spec),
            resources: ResourceConfiguration::default(),
            pull_secret: None,
            artifact_dir: PathBuf::new(),
            dry_logger: Arc::new(DryLogger::new()),
        }
    }

    /// With resource requirements
    #[must_use]
    pub fn with_resources(mut self, resources: ResourceConfiguration) -> Self {
        self.resources = resources;
        self
    }

    /// With pull credentials
    #[must_use]
    pub fn with_pull_secret(mut self, pull_secret: PullSecret) -> Self {
        self.pull_secret = Some(pull_secret);
        self
    }

    /// With artifact directory
    #[must_use]
    pub fn with_artifact_dir(mut self, artifact_dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = artifact_dir.into();
        self
    }
}

/// Configuration variant this build has no step for
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported step configuration: {0}")]
pub struct UnsupportedStep(pub String);

/// Build the step described by `config`
pub fn from_configuration(
    config: StepConfiguration,
    clients: &StepClients,
    env: &StepEnvironment,
) -> Result<Box<dyn Step>, UnsupportedStep> {
    match config {
        StepConfiguration::BundleSourceStep(bundle) => {
            Ok(Box::new(BundleSourceStep::new(bundle, clients, env)))
        }
        other => Err(UnsupportedStep(format!("{other:?}"))),
    }
}
