use chrono::NaiveDate;

use crate::view_model::ControllerView;
use crate::TriggerOutcome;

/// Generation marker of one poller start. Results tagged with an older epoch
/// are stale.
pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Running,
}

/// What to do with a trigger request that arrives while a run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReentryPolicy {
    /// Start another upstream run under a new epoch.
    #[default]
    Allow,
    /// Refuse the request and report it as an error.
    Reject,
}

/// Aggregate scraper status as last reported by the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSummary {
    pub status: String,
    pub last_run: Option<String>,
    pub last_status: Option<String>,
    pub total_records: u64,
    pub last_extraction_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Job {
    pub(crate) state: JobState,
    pub(crate) target_date: Option<NaiveDate>,
    pub(crate) last_extraction_count: u64,
    pub(crate) last_error: Option<String>,
    pub(crate) last_message: Option<String>,
    pub(crate) stop_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerState {
    job: Job,
    epoch: Epoch,
    finished_runs: u64,
    logs: Vec<String>,
    status: Option<StatusSummary>,
    reentry: ReentryPolicy,
    dirty: bool,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reentry(reentry: ReentryPolicy) -> Self {
        Self {
            reentry,
            ..Self::default()
        }
    }

    pub fn view(&self) -> ControllerView {
        ControllerView {
            state: self.job.state,
            epoch: self.epoch,
            target_date: self.job.target_date,
            last_extraction_count: self.job.last_extraction_count,
            last_error: self.job.last_error.clone(),
            last_message: self.job.last_message.clone(),
            stop_requested: self.job.stop_requested,
            finished_runs: self.finished_runs,
            logs: self.logs.clone(),
            status: self.status.clone(),
        }
    }

    /// Returns whether anything visible changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn job_state(&self) -> JobState {
        self.job.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub(crate) fn reentry(&self) -> ReentryPolicy {
        self.reentry
    }

    /// True when a result tagged with `epoch` may still touch the display.
    pub(crate) fn is_current(&self, epoch: Epoch) -> bool {
        self.job.state == JobState::Running && self.epoch == epoch
    }

    pub(crate) fn begin_run(&mut self, target_date: Option<NaiveDate>) -> Epoch {
        self.epoch += 1;
        self.job.state = JobState::Running;
        self.job.target_date = target_date;
        self.job.last_error = None;
        self.job.last_message = None;
        self.job.stop_requested = false;
        self.logs.clear();
        self.dirty = true;
        self.epoch
    }

    pub(crate) fn finish_run(&mut self, outcome: &TriggerOutcome) {
        match outcome {
            TriggerOutcome::Completed {
                records_extracted,
                message,
            } => {
                self.job.last_extraction_count = *records_extracted;
                self.job.last_error = None;
                self.job.last_message = Some(message.clone().unwrap_or_else(|| {
                    format!("Scraper completed! Extracted {records_extracted} records.")
                }));
            }
            TriggerOutcome::Failed { message } => {
                self.job.last_error = Some(message.clone());
                self.job.last_message = None;
            }
        }
        self.job.state = JobState::Idle;
        self.finished_runs += 1;
        self.dirty = true;
    }

    /// Leaves Running without an upstream outcome (component teardown).
    pub(crate) fn abandon_run(&mut self) {
        self.job.state = JobState::Idle;
        self.dirty = true;
    }

    pub(crate) fn mark_stop_requested(&mut self) {
        if !self.job.stop_requested {
            self.job.stop_requested = true;
            self.dirty = true;
        }
    }

    pub(crate) fn set_error(&mut self, message: &str) {
        self.job.last_error = Some(message.to_owned());
        self.dirty = true;
    }

    pub(crate) fn replace_logs(&mut self, logs: Vec<String>) {
        if self.logs != logs {
            self.logs = logs;
            self.dirty = true;
        }
    }

    pub(crate) fn set_status(&mut self, status: StatusSummary) {
        if self.status.as_ref() != Some(&status) {
            self.status = Some(status);
            self.dirty = true;
        }
    }
}
