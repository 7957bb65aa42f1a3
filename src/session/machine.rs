use serde::{Deserialize, Serialize};

/// Recording lifecycle state.
///
/// `Idle → Recording ⇄ Paused → Stopped`; any state may drop to `Error` on an
/// unrecoverable fault; `Stopped` and `Error` return to `Idle` only via an
/// explicit reset. UI actions are gated strictly by the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
    Stopped,
    Submitting,
    Error,
}

impl RecordingState {
    /// Whether a live capture handle may be held in this state
    pub fn is_active(self) -> bool {
        matches!(self, RecordingState::Recording | RecordingState::Paused)
    }

    pub fn can_start(self) -> bool {
        matches!(self, RecordingState::Idle)
    }

    pub fn can_pause(self) -> bool {
        matches!(self, RecordingState::Recording)
    }

    pub fn can_resume(self) -> bool {
        matches!(self, RecordingState::Paused)
    }

    pub fn can_stop(self) -> bool {
        self.is_active()
    }

    /// "Send" is available while capturing (stop-then-send) or once stopped
    /// with a finalized blob in hand.
    pub fn can_send(self, has_blob: bool) -> bool {
        self.is_active() || (self == RecordingState::Stopped && has_blob)
    }
}
