use chrono::NaiveDate;

use crate::{Epoch, StatusSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked to start an extraction run.
    TriggerRequested { target_date: Option<NaiveDate> },
    /// A call needed a session token and none was stored.
    LoginRequired,
    /// User asked to cancel the running extraction.
    StopRequested,
    /// The trigger call issued for `epoch` resolved.
    TriggerFinished { epoch: Epoch, outcome: TriggerOutcome },
    /// The cancellation call resolved. Errors are only logged.
    StopFinished { result: Result<(), String> },
    /// The poller timer of `epoch` fired.
    PollDue { epoch: Epoch },
    /// A progress snapshot fetched for `epoch` arrived.
    ProgressLoaded { epoch: Epoch, logs: Vec<String> },
    /// A progress fetch issued for `epoch` failed.
    ProgressFailed { epoch: Epoch, message: String },
    /// Aggregate status was reloaded.
    StatusRefreshed(StatusSummary),
    /// The owning component is going away.
    Teardown,
    /// Fallback for placeholder wiring.
    NoOp,
}

/// Interpreted result of a trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed {
        records_extracted: u64,
        message: Option<String>,
    },
    Failed {
        message: String,
    },
}
