//! Pull spec resolution
//!
//! Symbolic tags resolve against the shared stable image stream of the job
//! namespace. The public repository address wins over the cluster-internal
//! one so the result is usable wherever a build executes; internal-only
//! deployments still work through the fallback.

use crate::clients::ImageStreamReader;
use crate::error::ResolveError;
use cibuild_api::{ExecutionMode, STABLE_IMAGE_STREAM};
use std::sync::Arc;

/// Repository every simulated pull spec points into
pub const SIMULATED_REPOSITORY: &str = "dry-registry.ci.openshift.org/namespace/stable";

/// Resolves symbolic tags to full pull specs
#[derive(Clone)]
pub struct PullSpecResolver {
    streams: Arc<dyn ImageStreamReader>,
    namespace: String,
}

impl PullSpecResolver {
    /// Resolver reading the stable stream of `namespace`
    pub fn new(streams: Arc<dyn ImageStreamReader>, namespace: impl Into<String>) -> Self {
        Self {
            streams,
            namespace: namespace.into(),
        }
    }

    /// Namespace the stable stream is read from
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolve `tag` to `<repository>:<tag>`
    ///
    /// Simulated mode returns `SIMULATED_REPOSITORY:<tag>` without any
    /// lookup.
    ///
    /// # Errors
    /// Returns `ResolveError::Lookup` if the stream cannot be read and
    /// `ResolveError::NoPullSpec` if it exposes no repository address.
    pub async fn resolve(&self, tag: &str, mode: ExecutionMode) -> Result<String, ResolveError> {
        if mode.is_dry() {
            return Ok(simulated_pull_spec(tag));
        }

        let status = self
            .streams
            .image_stream(&self.namespace, STABLE_IMAGE_STREAM)
            .await
            .map_err(|source| ResolveError::Lookup {
                namespace: self.namespace.clone(),
                name: STABLE_IMAGE_STREAM.to_string(),
                source,
            })?;

        if !status.public_docker_image_repository.is_empty() {
            tracing::debug!("Resolved {} via public repository", tag);
            return Ok(format!("{}:{tag}", status.public_docker_image_repository));
        }
        if !status.docker_image_repository.is_empty() {
            tracing::warn!(
                "Image stream {} exposes no public repository, using internal address for {}",
                STABLE_IMAGE_STREAM,
                tag
            );
            return Ok(format!("{}:{tag}", status.docker_image_repository));
        }
        Err(ResolveError::NoPullSpec {
            name: STABLE_IMAGE_STREAM.to_string(),
        })
    }
}

impl std::fmt::Debug for PullSpecResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullSpecResolver")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Deterministic placeholder pull spec for simulated runs
#[inline]
#[must_use]
pub fn simulated_pull_spec(tag: &str) -> String {
    format!("{SIMULATED_REPOSITORY}:{tag}")
}
