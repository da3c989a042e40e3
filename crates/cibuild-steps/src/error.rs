//! Error types for the bundle source step
//!
//! A failed run is always exactly one of:
//! - working-directory lookup failure (`BundleSourceError::WorkingDir`)
//! - recipe generation failure, including pull spec resolution
//!   (`BundleSourceError::Recipe`)
//! - build submission failure, passed through as-is (`BundleSourceError::Build`)

use crate::build::BuildError;
use cibuild_api::ClientError;

/// Pull spec resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The stream lookup itself failed
    #[error("failed to get image stream {namespace}/{name}: {source}")]
    Lookup {
        /// Namespace searched
        namespace: String,
        /// Stream name
        name: String,
        /// Collaborator error
        #[source]
        source: ClientError,
    },

    /// The stream exposes neither a public nor an internal repository
    #[error("no pull spec available for image stream {name}")]
    NoPullSpec {
        /// Stream name
        name: String,
    },
}

/// Recipe generation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeError {
    /// A replacement tag could not be resolved; no partial recipe exists
    #[error("failed to get replacement imagestream for image tag `{tag}`: {source}")]
    Replacement {
        /// Symbolic tag that failed
        tag: String,
        /// Resolution error
        #[source]
        source: ResolveError,
    },

    /// A search or replacement value would break out of the generated command
    #[error("substitution value `{value}` contains reserved character {character:?}")]
    UnsafeSubstitution {
        /// Offending value
        value: String,
        /// First reserved character found
        character: char,
    },

    /// The manifest directory would split or break out of the generated command
    #[error("manifest directory `{path}` contains unsafe character {character:?}")]
    UnsafeManifestDir {
        /// Offending directory
        path: String,
        /// First unsafe character found
        character: char,
    },
}

/// Bundle source step errors
#[derive(Debug, thiserror::Error)]
pub enum BundleSourceError {
    /// The source image's working directory could not be determined
    #[error("failed to get workingDir of {image}: {source}")]
    WorkingDir {
        /// Image stream tag looked up
        image: String,
        /// Collaborator error
        #[source]
        source: ClientError,
    },

    /// Recipe generation failed
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    /// Build submission failed
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl BundleSourceError {
    /// Short category name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkingDir { .. } => "input_resolution",
            Self::Recipe(_) => "pull_spec_resolution",
            Self::Build(_) => "build_submission",
        }
    }
}
