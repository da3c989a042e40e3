//! Error types shared across steps
//!
//! Collaborator failures (`ClientError`), configuration failures
//! (`ConfigError`) and the step-contract failure (`StepFailure`), which tags
//! any underlying error with a fixed classification reason.

use std::error::Error as StdError;

/// Errors returned by cluster collaborators (image streams, builds, ...)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Requested object does not exist
    #[error("{kind} {name} not found")]
    NotFound {
        /// Object kind, e.g. `ImageStream`
        kind: &'static str,
        /// Object name
        name: String,
    },

    /// The API rejected or failed the request
    #[error("api request failed: {0}")]
    Api(String),

    /// No backend is reachable from this process
    #[error("client unavailable: {0}")]
    Unavailable(String),

    /// The request was abandoned because the context was cancelled
    #[error("request cancelled")]
    Cancelled,
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path of the file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid YAML for the expected schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required field is empty
    #[error("{field} must not be empty")]
    MissingField {
        /// Dotted field path
        field: String,
    },

    /// A value contains a character the generated command cannot carry
    #[error("{field} `{value}` contains reserved character {character:?}")]
    ReservedCharacter {
        /// Dotted field path
        field: String,
        /// Offending value
        value: String,
        /// First reserved character found
        character: char,
    },
}

/// Error produced when a lazily evaluated parameter cannot be computed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parameter {name} unavailable: {reason}")]
pub struct ParameterError {
    /// Parameter name
    pub name: String,
    /// Why it could not be produced
    pub reason: String,
}

/// Fixed classification attached to every failure of a step kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailureReason(&'static str);

impl FailureReason {
    /// Create a reason tag
    #[inline]
    #[must_use]
    pub const fn new(reason: &'static str) -> Self {
        Self(reason)
    }

    /// Reason tag as text
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Failure reported by `Step::run`
///
/// Carries the step-category reason plus the underlying error, which stays
/// reachable through `source()` for downcasting.
#[derive(Debug, thiserror::Error)]
#[error("{reason}: {source}")]
pub struct StepFailure {
    reason: FailureReason,
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl StepFailure {
    /// Wrap an error with a reason
    pub fn new(reason: FailureReason, error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            reason,
            source: error.into(),
        }
    }

    /// Classification reason
    #[inline]
    #[must_use]
    pub fn reason(&self) -> FailureReason {
        self.reason
    }

    /// Underlying error as a concrete type, if it is one
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }
}

/// Attach a failure reason to a result
pub trait ResultExt<T> {
    /// Convert the error side into a `StepFailure` tagged with `reason`
    fn for_reason(self, reason: FailureReason) -> Result<T, StepFailure>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn for_reason(self, reason: FailureReason) -> Result<T, StepFailure> {
        self.map_err(|error| StepFailure::new(reason, error))
    }
}
