//! Multi-step workflows exposed to the calling agent as single tool calls
//!
//! A workflow is an ordered list of steps. Each step waits for the target app
//! to catch up, then tries its candidates in order until one succeeds. A
//! required step that runs out of candidates aborts the workflow; whatever the
//! earlier steps did on screen stays done.

pub mod apps;
pub mod library;

use crate::errors::AutomationError;
use crate::readiness::{millis, Readiness};
use crate::Automation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub use apps::SocialApp;
pub use library::WorkflowCall;

/// One way of carrying out a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    OpenApp { package: String },
    ClickByText { text: String },
    TypeIntoField { hint: String, text: String },
    TypeFocused { text: String },
    PressEnter,
    Delay {
        #[serde(with = "millis")]
        duration: Duration,
    },
}

impl StepAction {
    pub fn open_app(package: impl Into<String>) -> Self {
        StepAction::OpenApp {
            package: package.into(),
        }
    }

    pub fn click(text: impl Into<String>) -> Self {
        StepAction::ClickByText { text: text.into() }
    }

    pub fn type_into(hint: impl Into<String>, text: impl Into<String>) -> Self {
        StepAction::TypeIntoField {
            hint: hint.into(),
            text: text.into(),
        }
    }

    pub fn type_focused(text: impl Into<String>) -> Self {
        StepAction::TypeFocused { text: text.into() }
    }

    async fn perform(&self, automation: &Automation) -> Result<(), AutomationError> {
        match self {
            StepAction::OpenApp { package } => automation.open_app(package),
            StepAction::ClickByText { text } => automation.click_by_text(text),
            StepAction::TypeIntoField { hint, text } => automation.type_into_field(hint, text),
            StepAction::TypeFocused { text } => automation.type_text(text),
            StepAction::PressEnter => automation.press_enter(),
            StepAction::Delay { duration } => {
                tokio::time::sleep(*duration).await;
                Ok(())
            }
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::OpenApp { package } => write!(f, "open {package}"),
            StepAction::ClickByText { text } => write!(f, "click '{text}'"),
            StepAction::TypeIntoField { hint, .. } => write!(f, "type into '{hint}'"),
            StepAction::TypeFocused { .. } => write!(f, "type into focused field"),
            StepAction::PressEnter => write!(f, "press enter"),
            StepAction::Delay { duration } => write!(f, "wait {duration:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// What the step is for, quoted in failure messages
    pub purpose: String,
    pub required: bool,
    /// Fallback chain, tried in order
    pub candidates: Vec<StepAction>,
    /// Heuristic wait before the step runs
    #[serde(with = "millis")]
    pub delay_before: Duration,
}

impl WorkflowStep {
    pub fn required(purpose: impl Into<String>) -> Self {
        Self {
            purpose: purpose.into(),
            required: true,
            candidates: Vec::new(),
            delay_before: Duration::ZERO,
        }
    }

    pub fn optional(purpose: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(purpose)
        }
    }

    pub fn candidate(mut self, action: StepAction) -> Self {
        self.candidates.push(action);
        self
    }

    pub fn candidates(mut self, actions: impl IntoIterator<Item = StepAction>) -> Self {
        self.candidates.extend(actions);
        self
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay_before = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
    /// Message returned when every required step succeeded
    pub summary: String,
}

impl Workflow {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            summary: summary.into(),
        }
    }

    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }
}

/// Outcome handed back to the calling agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub message: String,
}

impl WorkflowResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, WorkflowError>> for WorkflowResult {
    fn from(result: Result<String, WorkflowError>) -> Self {
        match result {
            Ok(summary) => WorkflowResult::ok(summary),
            Err(e) => WorkflowResult::failed(e.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Service unbound or no active window; retry later
    #[error("Automation unavailable: {0}")]
    Unavailable(String),

    /// A required step ran out of candidates
    #[error("Step {index} failed: could not {purpose} ({reason})")]
    StepFailed {
        index: usize,
        purpose: String,
        reason: String,
    },
}

/// Fixed delays compensating for the target app's asynchronous rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowTiming {
    #[serde(with = "millis")]
    pub app_launch: Duration,
    #[serde(with = "millis")]
    pub transition: Duration,
    #[serde(with = "millis")]
    pub composer_open: Duration,
    #[serde(with = "millis")]
    pub after_typing: Duration,
    pub readiness: Readiness,
}

impl Default for WorkflowTiming {
    fn default() -> Self {
        Self {
            app_launch: Duration::from_millis(3000),
            transition: Duration::from_millis(1500),
            composer_open: Duration::from_millis(1000),
            after_typing: Duration::from_millis(500),
            readiness: Readiness::FixedDelay,
        }
    }
}

impl WorkflowTiming {
    /// No waiting at all, for scripted backends
    pub fn immediate() -> Self {
        Self {
            app_launch: Duration::ZERO,
            transition: Duration::ZERO,
            composer_open: Duration::ZERO,
            after_typing: Duration::ZERO,
            readiness: Readiness::FixedDelay,
        }
    }
}

/// Runs workflows one at a time against the bound accessibility service.
///
/// Focus and window state are shared by every workflow, so runs are
/// serialized. There is no cancellation: a started workflow finishes or fails
/// on its own.
pub struct WorkflowEngine {
    automation: Automation,
    timing: WorkflowTiming,
    in_flight: Mutex<()>,
}

impl WorkflowEngine {
    pub fn new(automation: Automation) -> Self {
        Self::with_timing(automation, WorkflowTiming::default())
    }

    pub fn with_timing(automation: Automation, timing: WorkflowTiming) -> Self {
        Self {
            automation,
            timing,
            in_flight: Mutex::new(()),
        }
    }

    pub fn automation(&self) -> &Automation {
        &self.automation
    }

    pub fn timing(&self) -> &WorkflowTiming {
        &self.timing
    }

    pub async fn run(&self, workflow: &Workflow) -> WorkflowResult {
        let _guard = self.in_flight.lock().await;
        let span = info_span!("workflow", name = %workflow.name, run_id = %Uuid::new_v4());
        self.execute(workflow).instrument(span).await.into()
    }

    async fn execute(&self, workflow: &Workflow) -> Result<String, WorkflowError> {
        info!("Starting workflow with {} steps", workflow.steps.len());

        for (position, step) in workflow.steps.iter().enumerate() {
            let index = position + 1;
            self.timing
                .readiness
                .settle(&self.automation, step.delay_before)
                .await;

            match self.run_step(step).await {
                Ok(winner) => debug!("Step {} ({}) done via {}", index, step.purpose, winner),
                Err(StepError::Unavailable(reason)) => {
                    warn!("Step {} aborted, automation unavailable", index);
                    return Err(WorkflowError::Unavailable(reason));
                }
                Err(StepError::Exhausted(tried)) if step.required => {
                    warn!("Required step {} ({}) failed", index, step.purpose);
                    return Err(WorkflowError::StepFailed {
                        index,
                        purpose: step.purpose.clone(),
                        reason: format!("tried {tried}"),
                    });
                }
                Err(StepError::Exhausted(_)) => {
                    info!("Optional step {} ({}) skipped", index, step.purpose);
                }
            }
        }

        info!("Workflow completed");
        Ok(workflow.summary.clone())
    }

    async fn run_step(&self, step: &WorkflowStep) -> Result<String, StepError> {
        let mut tried = Vec::with_capacity(step.candidates.len());
        for candidate in &step.candidates {
            match candidate.perform(&self.automation).await {
                Ok(()) => return Ok(candidate.to_string()),
                Err(e) if e.is_unavailable() => return Err(StepError::Unavailable(e.to_string())),
                Err(e) => {
                    debug!("Candidate '{}' failed: {}", candidate, e);
                    tried.push(candidate.to_string());
                }
            }
        }
        let tried = if tried.is_empty() {
            "no candidates".to_string()
        } else {
            tried.join(", ")
        };
        Err(StepError::Exhausted(tried))
    }

    /// Reads the most recent `limit` passive text lines of the open screen.
    /// Never issues an action.
    pub async fn read_recent_messages(&self, limit: usize) -> WorkflowResult {
        let _guard = self.in_flight.lock().await;
        let snapshot = match self.automation.capture() {
            Ok(snapshot) => snapshot,
            Err(e) => return WorkflowResult::failed(e.to_string()),
        };

        let lines: Vec<&str> = snapshot.passive_text().map(|e| e.text.trim()).collect();
        if lines.is_empty() {
            return WorkflowResult::failed("No message text found on screen");
        }
        let recent = &lines[lines.len().saturating_sub(limit)..];
        WorkflowResult::ok(format!(
            "Last {} messages:\n{}",
            recent.len(),
            recent.join("\n")
        ))
    }
}

enum StepError {
    Unavailable(String),
    Exhausted(String),
}
