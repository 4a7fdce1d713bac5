use chrono::NaiveDate;

use crate::Epoch;

/// Side effects requested by [`crate::update`]; executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the repeating progress timer for this epoch.
    StartPoller { epoch: Epoch },
    /// Cancel the progress timer of this epoch. Requests already issued run
    /// to completion; their results are dropped by the epoch check.
    StopPoller { epoch: Epoch },
    /// Issue one progress snapshot fetch on behalf of this epoch.
    FetchProgress { epoch: Epoch },
    /// POST the job trigger; the response comes back as `Msg::TriggerFinished`.
    SendTrigger {
        epoch: Epoch,
        target_date: Option<NaiveDate>,
    },
    /// POST the cancellation request. Fire-and-forget.
    SendStop,
    /// Reload the aggregate status after a run ends.
    RefreshStatus,
}
