//! Testing utilities for cibuild workspace
//!
//! In-memory collaborators that count calls and record what they were
//! given.

#![allow(missing_docs)]

use cibuild_api::{ClientError, ExecutionContext, ExecutionMode, JobSpec};
use cibuild_steps::{
    BuildError, BuildRequest, BuildSubmitter, DryLogger, ImageStreamReader, ImageStreamStatus,
    StepClients, StepEnvironment, WorkingDirResolver,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TEST_NAMESPACE: &str = "ci-op-test";

#[derive(Debug)]
pub struct FakeImageStreams {
    result: Result<ImageStreamStatus, ClientError>,
    calls: AtomicUsize,
}

impl FakeImageStreams {
    pub fn returning(result: Result<ImageStreamStatus, ClientError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn public(repository: &str) -> Arc<Self> {
        Self::returning(Ok(ImageStreamStatus::new(repository, "")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageStreamReader for FakeImageStreams {
    async fn image_stream(&self, _namespace: &str, _name: &str) -> Result<ImageStreamStatus, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Debug)]
pub struct FakeWorkingDirs {
    result: Result<String, ClientError>,
    calls: AtomicUsize,
}

impl FakeWorkingDirs {
    pub fn returning(result: Result<String, ClientError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WorkingDirResolver for FakeWorkingDirs {
    async fn working_dir(&self, _image: &str, _namespace: &str) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub build: BuildRequest,
    pub mode: ExecutionMode,
}

/// Records every submission; succeeds unless built with `failing`
#[derive(Debug, Default)]
pub struct RecordingBuilds {
    submissions: Mutex<Vec<Submission>>,
    failure: Option<String>,
}

impl RecordingBuilds {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            submissions: Mutex::default(),
            failure: Some(reason.to_string()),
        })
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }
}

#[async_trait::async_trait]
impl BuildSubmitter for RecordingBuilds {
    async fn submit(
        &self,
        ctx: &ExecutionContext,
        build: BuildRequest,
        mode: ExecutionMode,
        _artifact_dir: &Path,
        _dry_logger: &DryLogger,
    ) -> Result<(), BuildError> {
        if ctx.is_cancelled() {
            return Err(BuildError::Cancelled { name: build.name });
        }
        let name = build.name.clone();
        self.submissions.lock().push(Submission { build, mode });
        match &self.failure {
            Some(reason) => Err(BuildError::Failed {
                name,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Fakes wired together as step clients
#[derive(Debug, Clone)]
pub struct FakeCluster {
    pub builds: Arc<RecordingBuilds>,
    pub image_streams: Arc<FakeImageStreams>,
    pub working_dirs: Arc<FakeWorkingDirs>,
}

impl FakeCluster {
    pub fn new(builds: Arc<RecordingBuilds>, image_streams: Arc<FakeImageStreams>, working_dirs: Arc<FakeWorkingDirs>) -> Self {
        Self {
            builds,
            image_streams,
            working_dirs,
        }
    }

    /// Healthy cluster: public stable stream, source image in `/go/src/operator`
    pub fn healthy() -> Self {
        Self::new(
            RecordingBuilds::new(),
            FakeImageStreams::public("registry.ci.example.com/ci-op-test/stable"),
            FakeWorkingDirs::returning(Ok("/go/src/operator".to_string())),
        )
    }

    pub fn clients(&self) -> StepClients {
        StepClients {
            builds: self.builds.clone(),
            image_streams: self.image_streams.clone(),
            working_dirs: self.working_dirs.clone(),
        }
    }
}

pub fn test_environment() -> StepEnvironment {
    StepEnvironment::new(JobSpec::new(TEST_NAMESPACE).with_job("pull-ci-test", "1"))
}
