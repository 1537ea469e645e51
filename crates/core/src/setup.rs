//! Setup steps and the tracker that walks them.
//!
//! A fresh backend needs a handful of one-time bootstrap tasks before the app
//! works (enum types, tables, row-level security, RPC functions, seed data).
//! Each task is a [`SetupStep`]. Steps that can be verified carry a
//! [`StepProbe`]; the rest are closed by hand with
//! [`SetupTracker::mark_step_completed`].
//!
//! Status transitions for one run:
//!
//! ```text
//! Pending -> InProgress -> Completed
//!                       -> Failed
//! ```
//!
//! `reset` puts every step back to `Pending`. `mark_step_completed` jumps
//! straight to `Completed` from any status.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message recorded when a probe ran cleanly but the precondition is missing.
pub const NOT_SATISFIED: &str = "precondition not satisfied";

/// Error raised by a probe that could not reach a verdict.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProbeError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProbeError {
    /// A probe error with no underlying cause.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A probe error wrapping the error that caused it.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Check whether a setup step's precondition currently holds.
///
/// `Ok(false)` and `Err(_)` both leave the step `Failed`; the error text is
/// kept as the step's message.
#[async_trait]
pub trait StepProbe: Send + Sync {
    async fn check(&self) -> Result<bool, ProbeError>;
}

/// Status of a setup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Errors building a tracker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    /// Two steps share an id.
    #[error("duplicate setup step id: {0}")]
    DuplicateStep(String),
}

/// One setup task.
#[derive(Clone)]
pub struct SetupStep {
    id: String,
    title: String,
    description: String,
    status: StepStatus,
    message: Option<String>,
    probe: Option<Arc<dyn StepProbe>>,
    manual_instructions: String,
    sql: Option<String>,
}

impl SetupStep {
    /// A pending step with no probe.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            status: StepStatus::Pending,
            message: None,
            probe: None,
            manual_instructions: String::new(),
            sql: None,
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn StepProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    #[must_use]
    pub fn with_manual_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.manual_instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            message: self.message.clone(),
            has_probe: self.probe.is_some(),
            manual_instructions: self.manual_instructions.clone(),
            sql: self.sql.clone(),
        }
    }
}

impl fmt::Debug for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupStep")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("message", &self.message)
            .field("has_probe", &self.probe.is_some())
            .finish_non_exhaustive()
    }
}

/// Copy of a step's state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSnapshot {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    /// Outcome of the last failed probe, if any.
    pub message: Option<String>,
    /// Whether the step can be verified automatically.
    pub has_probe: bool,
    pub manual_instructions: String,
    pub sql: Option<String>,
}

/// Aggregate state of all steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupSummary {
    /// Steps in `Completed`, probed or manual.
    pub completed_count: usize,
    /// All steps.
    pub total_count: usize,
    /// First step, in order, that is not completed.
    pub current_step: Option<StepSnapshot>,
    pub all_completed: bool,
}

/// Ordered collection of setup steps.
///
/// The tracker is owned by one caller. Accessors return copies, never
/// references into the collection.
#[derive(Debug, Clone, Default)]
pub struct SetupTracker {
    steps: Vec<SetupStep>,
}

impl SetupTracker {
    /// Build a tracker over `steps`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DuplicateStep`] if two steps share an id.
    pub fn new(steps: Vec<SetupStep>) -> Result<Self, SetupError> {
        for (index, step) in steps.iter().enumerate() {
            if steps.iter().take(index).any(|earlier| earlier.id == step.id) {
                return Err(SetupError::DuplicateStep(step.id.clone()));
            }
        }
        Ok(Self { steps })
    }

    /// Snapshot of every step, in order.
    #[must_use]
    pub fn steps(&self) -> Vec<StepSnapshot> {
        self.steps.iter().map(SetupStep::snapshot).collect()
    }

    /// Snapshot of one step.
    #[must_use]
    pub fn step(&self, id: &str) -> Option<StepSnapshot> {
        self.find(id).map(SetupStep::snapshot)
    }

    /// First step that is not completed.
    #[must_use]
    pub fn current_step(&self) -> Option<StepSnapshot> {
        self.steps
            .iter()
            .find(|step| step.status != StepStatus::Completed)
            .map(SetupStep::snapshot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run one step's probe and record the outcome.
    ///
    /// Returns `true` only when the probe confirms the precondition. A step
    /// without a probe returns `false` and keeps its status. Probe errors
    /// are logged and recorded on the step, never returned.
    pub async fn test_step(&mut self, id: &str) -> bool {
        let Some(step) = self.steps.iter_mut().find(|step| step.id == id) else {
            tracing::warn!(step = %id, "Unknown setup step");
            return false;
        };

        let Some(probe) = step.probe.clone() else {
            tracing::debug!(step = %id, "Setup step has no probe, needs manual completion");
            return false;
        };

        step.status = StepStatus::InProgress;
        step.message = None;

        match probe.check().await {
            Ok(true) => {
                step.status = StepStatus::Completed;
                tracing::info!(step = %id, "Setup step verified");
                true
            }
            Ok(false) => {
                step.status = StepStatus::Failed;
                step.message = Some(NOT_SATISFIED.to_owned());
                tracing::info!(step = %id, "Setup step not satisfied");
                false
            }
            Err(e) => {
                step.status = StepStatus::Failed;
                step.message = Some(e.to_string());
                tracing::warn!(step = %id, error = %e, "Setup probe failed");
                false
            }
        }
    }

    /// Probe every step that has a probe, one at a time in order, then
    /// summarize.
    ///
    /// A failing step does not stop later steps from being probed, so the
    /// summary always reflects the backend as a whole.
    pub async fn check_all_steps(&mut self) -> SetupSummary {
        let probed: Vec<String> = self
            .steps
            .iter()
            .filter(|step| step.probe.is_some())
            .map(|step| step.id.clone())
            .collect();

        for id in &probed {
            self.test_step(id).await;
        }

        let summary = self.summary();
        tracing::info!(
            completed = summary.completed_count,
            total = summary.total_count,
            current = summary.current_step.as_ref().map(|step| step.id.as_str()),
            "Setup check finished"
        );
        summary
    }

    /// Aggregate state without running any probe.
    #[must_use]
    pub fn summary(&self) -> SetupSummary {
        let completed_count = self.completed_count();
        SetupSummary {
            completed_count,
            total_count: self.steps.len(),
            current_step: self.current_step(),
            all_completed: completed_count == self.steps.len(),
        }
    }

    /// Completed steps as a whole percentage of all steps, rounded half up.
    #[must_use]
    pub fn progress(&self) -> u8 {
        let total = self.steps.len();
        if total == 0 {
            return 0;
        }
        let percent = (200 * self.completed_count() + total) / (2 * total);
        u8::try_from(percent).unwrap_or(100)
    }

    /// Force a step to `Completed`, whatever its probe says.
    ///
    /// Returns `false` if no step has this id.
    pub fn mark_step_completed(&mut self, id: &str) -> bool {
        let Some(step) = self.steps.iter_mut().find(|step| step.id == id) else {
            tracing::warn!(step = %id, "Cannot complete unknown setup step");
            return false;
        };
        step.status = StepStatus::Completed;
        step.message = None;
        tracing::info!(step = %id, "Setup step marked completed");
        true
    }

    /// Put every step back to `Pending`.
    pub fn reset(&mut self) {
        for step in &mut self.steps {
            step.status = StepStatus::Pending;
            step.message = None;
        }
    }

    fn find(&self, id: &str) -> Option<&SetupStep> {
        self.steps.iter().find(|step| step.id == id)
    }

    fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Completed)
            .count()
    }
}
