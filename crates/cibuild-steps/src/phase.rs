//! Run phases of a single step invocation
//!
//! `NotStarted -> ResolvingInputs -> GeneratingRecipe -> SubmittingBuild ->
//! Succeeded`, with `Failed` reachable from every active phase. Terminal
//! phases have no successors.

/// Phase of one `run` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Run has not begun
    NotStarted,
    /// Looking up the upstream image's working directory
    ResolvingInputs,
    /// Resolving pull specs and rendering the recipe
    GeneratingRecipe,
    /// Handing the build to the submitter
    SubmittingBuild,
    /// Build finished
    Succeeded,
    /// Run aborted
    Failed,
}

impl RunPhase {
    /// Whether no further transitions are allowed
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Illegal phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal run phase transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    /// Phase left
    pub from: RunPhase,
    /// Phase requested
    pub to: RunPhase,
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: RunPhase) -> Vec<RunPhase> {
    match from {
        RunPhase::NotStarted => vec![RunPhase::ResolvingInputs, RunPhase::Failed],
        RunPhase::ResolvingInputs => vec![RunPhase::GeneratingRecipe, RunPhase::Failed],
        RunPhase::GeneratingRecipe => vec![RunPhase::SubmittingBuild, RunPhase::Failed],
        RunPhase::SubmittingBuild => vec![RunPhase::Succeeded, RunPhase::Failed],
        RunPhase::Succeeded | RunPhase::Failed => vec![],
    }
}

/// Check a transition
pub fn validate_transition(from: RunPhase, to: RunPhase) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// Phase tracker owned by one run
#[derive(Debug)]
pub(crate) struct PhaseTracker<'a> {
    step: &'a str,
    current: RunPhase,
}

impl<'a> PhaseTracker<'a> {
    pub(crate) fn new(step: &'a str) -> Self {
        Self {
            step,
            current: RunPhase::NotStarted,
        }
    }

    pub(crate) fn current(&self) -> RunPhase {
        self.current
    }

    /// Move to `to`; illegal moves are logged and ignored
    pub(crate) fn advance(&mut self, to: RunPhase) {
        if let Err(e) = validate_transition(self.current, to) {
            tracing::error!("Step {}: {}", self.step, e);
            return;
        }
        tracing::debug!("Step {}: {:?} -> {:?}", self.step, self.current, to);
        self.current = to;
    }
}
