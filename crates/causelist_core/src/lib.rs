//! Causelist core: pure extraction-job state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{Msg, TriggerOutcome};
pub use state::{ControllerState, Epoch, JobState, ReentryPolicy, StatusSummary};
pub use update::{update, ALREADY_RUNNING, LOGIN_REQUIRED};
pub use view_model::ControllerView;
