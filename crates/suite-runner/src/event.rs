//! Case progress events.
//!
//! [`CaseEvent`] is emitted on every case state transition when the runner is
//! built with a progress sender. Events are informational only; a full or
//! closed channel never changes a verdict.

use std::time::SystemTime;

use serde::Serialize;

use crate::types::{CaseState, DiagnosticKind};

/// A single case state transition.
#[derive(Debug, Clone, Serialize)]
pub struct CaseEvent {
    /// Event id
    pub id: String,
    /// Suite run this event belongs to
    pub run_id: String,
    /// Case name
    pub case: String,
    /// State entered
    pub state: CaseState,
    /// Failure class, set when `state` is `Failed`
    pub kind: Option<DiagnosticKind>,
    /// When the transition happened
    #[serde(skip)]
    pub at: SystemTime,
}

impl CaseEvent {
    /// Creates an event for a non-failure transition.
    pub fn new(run_id: impl Into<String>, case: impl Into<String>, state: CaseState) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            case: case.into(),
            state,
            kind: None,
            at: SystemTime::now(),
        }
    }

    /// Creates a `Failed` event carrying the failure class.
    pub fn failed(run_id: impl Into<String>, case: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::new(run_id, case, CaseState::Failed)
        }
    }

    /// Whether this is the last event for its case.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
