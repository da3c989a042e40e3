//! Cluster collaborator capabilities
//!
//! Steps receive these as trait objects at construction; there is no global
//! client state. Implementations must be safe for concurrent use.

use cibuild_api::ClientError;
use serde::{Deserialize, Serialize};

/// Repository addresses an image stream exposes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStreamStatus {
    /// Address reachable from outside the cluster; may be empty
    #[serde(default)]
    pub public_docker_image_repository: String,
    /// Cluster-internal address; may be empty
    #[serde(default)]
    pub docker_image_repository: String,
}

impl ImageStreamStatus {
    /// Status with both addresses
    #[must_use]
    pub fn new(public: impl Into<String>, internal: impl Into<String>) -> Self {
        Self {
            public_docker_image_repository: public.into(),
            docker_image_repository: internal.into(),
        }
    }
}

/// Reads image streams
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageStreamReader: Send + Sync {
    /// Fetch the status of stream `name` in `namespace`
    async fn image_stream(&self, namespace: &str, name: &str) -> Result<ImageStreamStatus, ClientError>;
}

/// Locates the working directory baked into an image
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WorkingDirResolver: Send + Sync {
    /// Working directory of image stream tag `image` (`stream:tag`) in `namespace`
    async fn working_dir(&self, image: &str, namespace: &str) -> Result<String, ClientError>;
}

/// Collaborator for processes with no cluster access
///
/// Every lookup fails with `ClientError::Unavailable`. Simulated runs never
/// reach it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCluster;

const OFFLINE: &str = "no cluster connection configured";

#[async_trait::async_trait]
impl ImageStreamReader for OfflineCluster {
    async fn image_stream(&self, _namespace: &str, _name: &str) -> Result<ImageStreamStatus, ClientError> {
        Err(ClientError::Unavailable(OFFLINE.to_string()))
    }
}

#[async_trait::async_trait]
impl WorkingDirResolver for OfflineCluster {
    async fn working_dir(&self, _image: &str, _namespace: &str) -> Result<String, ClientError> {
        Err(ClientError::Unavailable(OFFLINE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_cluster_refuses_lookups() {
        let offline = OfflineCluster;
        assert!(matches!(
            offline.image_stream("ns", "stable").await,
            Err(ClientError::Unavailable(_))
        ));
        assert!(matches!(
            offline.working_dir("pipeline:src", "ns").await,
            Err(ClientError::Unavailable(_))
        ));
    }
}
