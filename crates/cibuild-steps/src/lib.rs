//! cibuild steps - build-graph step implementations
//!
//! The bundle source step takes the pipeline source image, rewrites image
//! pull specs inside its operator manifests and commits the result as a new
//! pipeline image through a build submission.
//!
//! Pieces, leaves first:
//! - [`pullspec::PullSpecResolver`]: symbolic tag to full pull spec
//! - [`planner`]: substitutions to ordered in-place rewrite commands
//! - [`recipe::Recipe`]: base image plus commands rendered as build recipe text
//! - [`steps::BundleSourceStep`]: orchestration and the `Step` contract
//!
//! Cluster I/O sits behind the capability traits in [`clients`] and
//! [`build`], injected into each step at construction.

#![warn(unreachable_pub)]

pub mod build;
pub mod clients;
pub mod dry_logger;
pub mod error;
pub mod phase;
pub mod planner;
pub mod pullspec;
pub mod recipe;
pub mod steps;
pub mod telemetry;

pub use build::{BuildError, BuildRequest, BuildSubmitter, DryRunBuildSubmitter};
pub use clients::{ImageStreamReader, ImageStreamStatus, OfflineCluster, WorkingDirResolver};
pub use dry_logger::DryLogger;
pub use error::{BundleSourceError, RecipeError, ResolveError};
pub use phase::RunPhase;
pub use planner::ShellCommand;
pub use pullspec::PullSpecResolver;
pub use recipe::{Instruction, Recipe};
pub use steps::{bundle_source_name, BundleSourceStep, StepClients, StepEnvironment};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
