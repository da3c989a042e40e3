//! Build requests and their submission
//!
//! Steps assemble a `BuildRequest` and hand it to a `BuildSubmitter`, which
//! owns creating (or reusing) the build, waiting for it and capturing its
//! output. Retry policy, if any, lives above the step.

use crate::dry_logger::DryLogger;
use cibuild_api::{
    ClientError, ExecutionContext, ExecutionMode, JobSpec, PipelineImageStreamTagReference,
    PullSecret, ResourceRequirements,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Label carrying the job name
pub const JOB_LABEL: &str = "ci.cibuild.io/job";
/// Label carrying the job's build id
pub const BUILD_ID_LABEL: &str = "ci.cibuild.io/build-id";
/// Label marking objects created by CI
pub const CREATED_BY_CI_LABEL: &str = "ci.cibuild.io/created-by-ci";

/// Kind of object an image reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// `stream:tag` in the job namespace
    ImageStreamTag,
}

/// Reference to an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// What `name` refers to
    pub kind: ReferenceKind,
    /// Object name
    pub name: String,
}

impl ImageReference {
    /// Reference to a pipeline image
    #[must_use]
    pub fn pipeline(tag: &PipelineImageStreamTagReference) -> Self {
        Self {
            kind: ReferenceKind::ImageStreamTag,
            name: tag.stream_tag(),
        }
    }
}

/// Path copied out of an image into the build context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSourcePath {
    /// Path inside the image
    pub source_path: String,
    /// Directory inside the build context
    pub destination_dir: String,
}

/// Image whose content is extracted into the build context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Image to extract from
    pub from: ImageReference,
    /// Paths to copy
    pub paths: Vec<ImageSourcePath>,
}

/// Everything needed to run one image build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Build name, equal to the destination tag
    pub name: String,
    /// Namespace the build runs in
    pub namespace: String,
    /// Labels identifying the job
    pub labels: BTreeMap<String, String>,
    /// Base image
    pub from: ImageReference,
    /// Recipe text
    pub recipe: String,
    /// Content extracted into the build context
    pub images: Vec<ImageSource>,
    /// Image the build commits to
    pub output: ImageReference,
    /// Disable layer cache reuse
    pub no_cache: bool,
    /// Requirements for this build, resolved from the per-step configuration
    pub resources: ResourceRequirements,
    /// Pull credentials, passed through from configuration
    pub pull_secret: Option<PullSecret>,
}

impl BuildRequest {
    /// Build of `to` from pipeline image `from`, with job labels
    #[must_use]
    pub fn from_pipeline_image(
        job: &JobSpec,
        from: &PipelineImageStreamTagReference,
        to: &PipelineImageStreamTagReference,
        recipe: String,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(CREATED_BY_CI_LABEL.to_string(), "true".to_string());
        if !job.job.is_empty() {
            labels.insert(JOB_LABEL.to_string(), job.job.clone());
        }
        if !job.build_id.is_empty() {
            labels.insert(BUILD_ID_LABEL.to_string(), job.build_id.clone());
        }

        Self {
            name: to.as_str().to_string(),
            namespace: job.namespace.clone(),
            labels,
            from: ImageReference::pipeline(from),
            recipe,
            images: Vec::new(),
            output: ImageReference::pipeline(to),
            no_cache: true,
            resources: ResourceRequirements::default(),
            pull_secret: None,
        }
    }

    /// Extract `source_path` from `image` into `destination_dir`
    #[must_use]
    pub fn with_image_source(
        mut self,
        image: &PipelineImageStreamTagReference,
        source_path: impl Into<String>,
        destination_dir: impl Into<String>,
    ) -> Self {
        self.images.push(ImageSource {
            from: ImageReference::pipeline(image),
            paths: vec![ImageSourcePath {
                source_path: source_path.into(),
                destination_dir: destination_dir.into(),
            }],
        });
        self
    }

    /// With resource requirements
    #[must_use]
    pub fn with_resources(mut self, resources: ResourceRequirements) -> Self {
        self.resources = resources;
        self
    }

    /// With pull credentials
    #[must_use]
    pub fn with_pull_secret(mut self, pull_secret: Option<PullSecret>) -> Self {
        self.pull_secret = pull_secret;
        self
    }
}

/// Build submission errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The build object could not be created
    #[error("could not create build {name}: {source}")]
    Create {
        /// Build name
        name: String,
        /// Collaborator error
        #[source]
        source: ClientError,
    },

    /// The build ran and failed
    #[error("build {name} failed: {reason}")]
    Failed {
        /// Build name
        name: String,
        /// Failure reason reported by the build
        reason: String,
    },

    /// Output could not be captured
    #[error("could not capture output of build {name}: {message}")]
    Capture {
        /// Build name
        name: String,
        /// What went wrong
        message: String,
    },

    /// The execution context was cancelled
    #[error("build {name} cancelled")]
    Cancelled {
        /// Build name
        name: String,
    },
}

/// Submits builds and waits for them
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BuildSubmitter: Send + Sync {
    /// Create or reuse the build and, unless simulated, wait for a terminal
    /// state. Output is captured under `artifact_dir`; simulated runs record
    /// what they would create in `dry_logger`. Must honour `ctx` cancellation.
    async fn submit(
        &self,
        ctx: &ExecutionContext,
        build: BuildRequest,
        mode: ExecutionMode,
        artifact_dir: &Path,
        dry_logger: &DryLogger,
    ) -> Result<(), BuildError>;
}

/// Submitter that only records builds
///
/// Simulated submissions are logged to the dry logger and, when an artifact
/// directory is set, written to `<artifact_dir>/build-<name>.json`. Real
/// submissions are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunBuildSubmitter;

#[async_trait::async_trait]
impl BuildSubmitter for DryRunBuildSubmitter {
    async fn submit(
        &self,
        ctx: &ExecutionContext,
        build: BuildRequest,
        mode: ExecutionMode,
        artifact_dir: &Path,
        dry_logger: &DryLogger,
    ) -> Result<(), BuildError> {
        if ctx.is_cancelled() {
            return Err(BuildError::Cancelled { name: build.name });
        }
        if !mode.is_dry() {
            return Err(BuildError::Create {
                name: build.name,
                source: ClientError::Unavailable("dry-run submitter cannot execute builds".to_string()),
            });
        }

        let capture_err = |name: &str, message: String| BuildError::Capture {
            name: name.to_string(),
            message,
        };
        dry_logger
            .add_object("Build", &build)
            .map_err(|e| capture_err(&build.name, e.to_string()))?;

        if !artifact_dir.as_os_str().is_empty() {
            let body = serde_json::to_vec_pretty(&build).map_err(|e| capture_err(&build.name, e.to_string()))?;
            let path = artifact_dir.join(format!("build-{}.json", build.name));
            tokio::fs::create_dir_all(artifact_dir)
                .await
                .map_err(|e| capture_err(&build.name, e.to_string()))?;
            tokio::fs::write(&path, body)
                .await
                .map_err(|e| capture_err(&build.name, e.to_string()))?;
            tracing::debug!("Wrote dry-run build {} to {}", build.name, path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request() -> BuildRequest {
        let job = JobSpec::new("ci-op-1234").with_job("pull-ci-operator", "42");
        BuildRequest::from_pipeline_image(
            &job,
            &PipelineImageStreamTagReference::source(),
            &PipelineImageStreamTagReference::new("bundle"),
            "\nFROM pipeline:src\n".to_string(),
        )
        .with_image_source(&PipelineImageStreamTagReference::source(), "/go/src/bundle/.", ".")
    }

    #[test]
    fn request_from_pipeline_image() {
        let build = request();
        assert_eq!(build.name, "bundle");
        assert_eq!(build.namespace, "ci-op-1234");
        assert_eq!(build.from.name, "pipeline:src");
        assert_eq!(build.output.name, "pipeline:bundle");
        assert_eq!(build.labels[JOB_LABEL], "pull-ci-operator");
        assert_eq!(build.labels[BUILD_ID_LABEL], "42");
        assert_eq!(build.images.len(), 1);
        assert_eq!(build.images[0].paths[0].source_path, "/go/src/bundle/.");
        assert!(build.no_cache);
    }

    #[test]
    fn empty_job_fields_are_not_labels() {
        let build = BuildRequest::from_pipeline_image(
            &JobSpec::new("ns"),
            &PipelineImageStreamTagReference::source(),
            &PipelineImageStreamTagReference::new("bundle"),
            String::new(),
        );
        assert_eq!(build.labels.len(), 1);
        assert_eq!(build.labels[CREATED_BY_CI_LABEL], "true");
    }

    #[tokio::test]
    async fn dry_run_records_build() {
        let logger = DryLogger::new();
        let dir = tempfile::tempdir().unwrap();
        let artifacts = dir.path().join("artifacts");

        DryRunBuildSubmitter
            .submit(&ExecutionContext::new(), request(), ExecutionMode::Simulated, &artifacts, &logger)
            .await
            .unwrap();

        let objects = logger.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["kind"], "Build");
        assert_eq!(objects[0]["object"]["name"], "bundle");

        let written = std::fs::read_to_string(artifacts.join("build-bundle.json")).unwrap();
        let parsed: BuildRequest = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, request());
    }

    #[tokio::test]
    async fn dry_run_refuses_real_builds() {
        let err = DryRunBuildSubmitter
            .submit(&ExecutionContext::new(), request(), ExecutionMode::Real, Path::new(""), &DryLogger::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Create { .. }));
    }

    #[tokio::test]
    async fn dry_run_honours_cancellation() {
        let ctx = ExecutionContext::new();
        ctx.cancel();
        let logger = DryLogger::new();
        let err = DryRunBuildSubmitter
            .submit(&ctx, request(), ExecutionMode::Simulated, Path::new(""), &logger)
            .await
            .unwrap_err();
        assert_eq!(err, BuildError::Cancelled { name: "bundle".to_string() });
        assert!(logger.objects().is_empty());
    }
}
