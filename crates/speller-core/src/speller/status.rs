use serde::{Deserialize, Serialize};

/// Session status.
///
/// ```text
/// Ready -> Calibrating -> Idle <-> Testing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing has been trained yet.
    Ready,
    Calibrating,
    /// Trained; waiting for a test command.
    Idle,
    Testing,
}

/// The two fields external commands may change while a sequence runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionState {
    pub status: SessionStatus,
    /// Training target while calibrating, pending prediction while testing.
    pub target: Option<usize>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Ready,
            target: None,
        }
    }

    /// A prediction arrived during testing, or testing was stopped.
    pub fn interrupted(&self) -> bool {
        match self.status {
            SessionStatus::Testing => self.target.is_some(),
            SessionStatus::Idle => true,
            SessionStatus::Ready | SessionStatus::Calibrating => false,
        }
    }

    /// Ground truth for a flashed group; unknown while testing.
    pub fn includes_target(&self, group: &[usize]) -> Option<bool> {
        match self.status {
            SessionStatus::Testing => None,
            _ => Some(self.target.is_some_and(|t| group.contains(&t))),
        }
    }

    /// Move from `from` to `to`; returns false and changes nothing otherwise.
    pub fn transition(&mut self, from: SessionStatus, to: SessionStatus) -> bool {
        if self.status != from {
            return false;
        }
        self.status = to;
        true
    }
}
