//! Core graph types
//!
//! Pipeline images are tags on a single internal image stream. Steps name
//! the images they read and write through `StepLink`s so the scheduler can
//! order them.

use serde::{Deserialize, Serialize};

/// Image stream holding every pipeline image of a job.
pub const PIPELINE_IMAGE_STREAM: &str = "pipeline";

/// Tag of the pipeline image containing the checked-out source tree.
pub const PIPELINE_SOURCE_TAG: &str = "src";

/// Shared image stream that symbolic replacement tags resolve against.
pub const STABLE_IMAGE_STREAM: &str = "stable";

/// Tag name of an image on the pipeline image stream
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineImageStreamTagReference(String);

impl PipelineImageStreamTagReference {
    /// Create a tag reference
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag reference of the source image
    #[inline]
    #[must_use]
    pub fn source() -> Self {
        Self::new(PIPELINE_SOURCE_TAG)
    }

    /// Bare tag name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `pipeline:<tag>` reference usable as an image stream tag name
    #[must_use]
    pub fn stream_tag(&self) -> String {
        format!("{PIPELINE_IMAGE_STREAM}:{}", self.0)
    }

    /// True when the tag name is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for PipelineImageStreamTagReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PipelineImageStreamTagReference {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for PipelineImageStreamTagReference {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

/// Edge in the build graph
///
/// A step `requires` links that other steps `create`. Two links match when
/// they name the same image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLink {
    /// Image on the job's pipeline image stream
    InternalImage(PipelineImageStreamTagReference),
    /// Image living outside the job namespace
    ExternalImage {
        /// Namespace of the stream
        namespace: String,
        /// Stream name
        name: String,
        /// Tag on the stream
        tag: String,
    },
}

impl StepLink {
    /// Link to a pipeline image
    #[inline]
    #[must_use]
    pub fn internal_image(tag: impl Into<PipelineImageStreamTagReference>) -> Self {
        Self::InternalImage(tag.into())
    }

    /// Link to an image outside the job namespace
    #[must_use]
    pub fn external_image(
        namespace: impl Into<String>,
        name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self::ExternalImage {
            namespace: namespace.into(),
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Whether a step creating `other` satisfies a requirement on `self`
    #[inline]
    #[must_use]
    pub fn satisfied_by(&self, other: &StepLink) -> bool {
        self == other
    }
}

impl std::fmt::Display for StepLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InternalImage(tag) => write!(f, "{PIPELINE_IMAGE_STREAM}:{tag}"),
            Self::ExternalImage {
                namespace,
                name,
                tag,
            } => write!(f, "{namespace}/{name}:{tag}"),
        }
    }
}
