//! Overwrite policy for downloads that hit an existing local file
//!
//! The policy is scoped to one job. It starts out asking per file and
//! escalates for good once the caller picks one of the "all" answers.

use serde::{Deserialize, Serialize};

/// Answer to a single collision prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDecision {
    Overwrite,
    Skip,
    OverwriteAll,
    SkipAll,
    Cancel,
}

/// Job-scoped policy state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMode {
    /// Ask for every collision
    #[default]
    Ask,
    OverwriteAll,
    SkipAll,
}

/// What the transfer loop does with the colliding file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Remove the existing file and download over it
    Overwrite,
    /// Leave the existing file and move to the next target
    Skip,
    /// Stop the whole job
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct ConflictPolicy {
    mode: ConflictMode,
}

impl ConflictPolicy {
    pub fn new(mode: ConflictMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ConflictMode {
        self.mode
    }

    /// Action to take without asking, if the current mode settles it
    pub fn automatic(&self) -> Option<ConflictAction> {
        match self.mode {
            ConflictMode::Ask => None,
            ConflictMode::OverwriteAll => Some(ConflictAction::Overwrite),
            ConflictMode::SkipAll => Some(ConflictAction::Skip),
        }
    }

    /// Apply a caller's decision and return the resulting action
    ///
    /// Once in one of the "all" modes the decision is ignored.
    pub fn apply(&mut self, decision: ConflictDecision) -> ConflictAction {
        if let Some(action) = self.automatic() {
            return action;
        }
        match decision {
            ConflictDecision::Overwrite => ConflictAction::Overwrite,
            ConflictDecision::Skip => ConflictAction::Skip,
            ConflictDecision::OverwriteAll => {
                self.mode = ConflictMode::OverwriteAll;
                ConflictAction::Overwrite
            }
            ConflictDecision::SkipAll => {
                self.mode = ConflictMode::SkipAll;
                ConflictAction::Skip
            }
            ConflictDecision::Cancel => ConflictAction::Abort,
        }
    }
}
