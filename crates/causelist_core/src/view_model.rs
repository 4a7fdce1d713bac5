use chrono::NaiveDate;

use crate::{Epoch, JobState, StatusSummary};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerView {
    pub state: JobState,
    pub epoch: Epoch,
    pub target_date: Option<NaiveDate>,
    pub last_extraction_count: u64,
    pub last_error: Option<String>,
    pub last_message: Option<String>,
    /// Informational only. A run that reports success after a stop request
    /// may have finished before the cancellation reached the upstream.
    pub stop_requested: bool,
    pub finished_runs: u64,
    /// Latest progress snapshot, replaced wholesale on every poll.
    pub logs: Vec<String>,
    pub status: Option<StatusSummary>,
}

impl ControllerView {
    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }
}
