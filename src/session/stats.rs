use super::machine::RecordingState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a recording session's state, for status displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: RecordingState,

    /// When the current recording started, if one has
    pub started_at: Option<DateTime<Utc>>,

    /// Elapsed recording time in whole seconds; accrues only while recording,
    /// frozen while paused
    pub elapsed_secs: u64,

    /// Chunks accumulated so far (committed runs plus the current run)
    pub chunk_count: usize,

    /// Whether a finalized blob is retained for submission/resend
    pub has_blob: bool,
}

impl SessionStats {
    /// Elapsed time formatted as m:ss for the recorder timer display
    pub fn elapsed_display(&self) -> String {
        format!("{}:{:02}", self.elapsed_secs / 60, self.elapsed_secs % 60)
    }
}
