use causelist_logging::{cl_debug, cl_info, cl_warn};

use crate::{ControllerState, Effect, JobState, Msg, ReentryPolicy, TriggerOutcome};

/// Error shown when a call needs a session token and none is stored.
pub const LOGIN_REQUIRED: &str = "Please login first";
/// Error shown when a trigger is refused under [`ReentryPolicy::Reject`].
pub const ALREADY_RUNNING: &str = "A scraper run is already in progress";

/// Pure update function: applies a message to state and returns any effects.
///
/// All job and poller bookkeeping happens here, serially, so the runtime never
/// needs a lock. Results carry the epoch they were issued under and are only
/// applied while that epoch is still the running one.
pub fn update(mut state: ControllerState, msg: Msg) -> (ControllerState, Vec<Effect>) {
    let effects = match msg {
        Msg::TriggerRequested { target_date } => {
            let mut effects = Vec::with_capacity(3);
            if state.job_state() == JobState::Running {
                match state.reentry() {
                    ReentryPolicy::Reject => {
                        cl_info!("Trigger refused: run of epoch {} in flight", state.epoch());
                        state.set_error(ALREADY_RUNNING);
                        return (state, Vec::new());
                    }
                    ReentryPolicy::Allow => {
                        cl_warn!(
                            "Trigger while epoch {} is running; starting a second upstream run",
                            state.epoch()
                        );
                        effects.push(Effect::StopPoller {
                            epoch: state.epoch(),
                        });
                    }
                }
            }
            let epoch = state.begin_run(target_date);
            cl_info!("Job running, epoch={} target_date={:?}", epoch, target_date);
            // The poller starts before the long-lived trigger call is awaited.
            effects.push(Effect::StartPoller { epoch });
            effects.push(Effect::SendTrigger { epoch, target_date });
            effects
        }
        Msg::LoginRequired => {
            state.set_error(LOGIN_REQUIRED);
            Vec::new()
        }
        Msg::StopRequested => {
            if state.job_state() == JobState::Running {
                state.mark_stop_requested();
            }
            vec![Effect::SendStop]
        }
        Msg::TriggerFinished { epoch, outcome } => {
            if !state.is_current(epoch) {
                cl_info!(
                    "Ignoring trigger result of epoch {} (current epoch {}, {:?})",
                    epoch,
                    state.epoch(),
                    state.job_state()
                );
                return (state, Vec::new());
            }
            match &outcome {
                TriggerOutcome::Completed {
                    records_extracted, ..
                } => cl_info!("Job epoch={} completed, records={}", epoch, records_extracted),
                TriggerOutcome::Failed { message } => {
                    cl_warn!("Job epoch={} failed: {}", epoch, message)
                }
            }
            state.finish_run(&outcome);
            vec![Effect::StopPoller { epoch }, Effect::RefreshStatus]
        }
        Msg::StopFinished { result } => {
            match result {
                Ok(()) => cl_debug!("Stop request acknowledged"),
                Err(message) => cl_warn!("Stop request failed (ignored): {}", message),
            }
            Vec::new()
        }
        Msg::PollDue { epoch } => {
            if state.is_current(epoch) {
                vec![Effect::FetchProgress { epoch }]
            } else {
                Vec::new()
            }
        }
        Msg::ProgressLoaded { epoch, logs } => {
            if state.is_current(epoch) {
                state.replace_logs(logs);
            } else {
                cl_debug!(
                    "Discarding stale progress snapshot of epoch {} ({} lines)",
                    epoch,
                    logs.len()
                );
            }
            Vec::new()
        }
        Msg::ProgressFailed { epoch, message } => {
            cl_debug!("Progress poll of epoch {} failed: {}", epoch, message);
            Vec::new()
        }
        Msg::StatusRefreshed(status) => {
            state.set_status(status);
            Vec::new()
        }
        Msg::Teardown => {
            if state.job_state() == JobState::Running {
                let epoch = state.epoch();
                state.abandon_run();
                vec![Effect::StopPoller { epoch }]
            } else {
                Vec::new()
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_due_for_idle_state_is_ignored() {
        let (state, effects) = update(ControllerState::new(), Msg::PollDue { epoch: 0 });
        assert_eq!(state.job_state(), JobState::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn stop_while_idle_still_sends_but_does_not_flag() {
        let (state, effects) = update(ControllerState::new(), Msg::StopRequested);
        assert_eq!(effects, vec![Effect::SendStop]);
        assert!(!state.view().stop_requested);
    }
}
