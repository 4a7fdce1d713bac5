//! Runtime for the extraction job: executes core effects and feeds results back.
//!
//! One event-loop task owns the [`ControllerState`]; every network call and
//! the poller timer run as separate tasks that only send [`Msg`]s back into
//! the loop. State is therefore mutated serially and without locks. Requests
//! are never aborted; the poller timer is cancelled cooperatively and late
//! results are dropped by the epoch check in `causelist_core::update`.

use std::sync::Arc;
use std::time::Duration;

use causelist_core::{
    update, ControllerState, ControllerView, Effect, Epoch, Msg, ReentryPolicy, StatusSummary,
    TriggerOutcome,
};
use causelist_logging::{cl_debug, cl_info, cl_warn};
use chrono::NaiveDate;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::api::{ApiClient, ApiError};
use crate::models::{ScraperStatus, TriggerResponse};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub reentry: ReentryPolicy,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reentry: ReentryPolicy::Allow,
        }
    }
}

/// Receives every view that changed something visible.
pub trait DisplaySink: Send + Sync {
    fn render(&self, view: &ControllerView);
}

/// Sink that drops every view; for callers that only read [`JobController::view`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn render(&self, _view: &ControllerView) {}
}

/// How [`JobController::follow_run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    /// The trigger call resolved; the view carries its outcome.
    Finished(ControllerView),
    /// Interrupted again after the stop request, with the trigger still pending.
    Abandoned,
    /// The event loop is gone.
    Closed,
}

/// Handle to the job event loop.
pub struct JobController {
    msg_tx: mpsc::UnboundedSender<Msg>,
    view_rx: watch::Receiver<ControllerView>,
    api: ApiClient,
    shutdown: CancellationToken,
    _stop_on_drop: DropGuard,
    task: JoinHandle<()>,
}

impl JobController {
    /// Spawns the event loop on the current tokio runtime.
    pub fn spawn(api: ApiClient, settings: ControllerSettings, sink: Arc<dyn DisplaySink>) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let state = ControllerState::with_reentry(settings.reentry);
        let (view_tx, view_rx) = watch::channel(state.view());
        let shutdown = CancellationToken::new();

        let event_loop = EventLoop {
            state,
            api: api.clone(),
            settings,
            sink,
            msg_tx: msg_tx.clone(),
            view_tx,
            poller: None,
        };
        let task = tokio::spawn(event_loop.run(msg_rx, shutdown.clone()));

        Self {
            msg_tx,
            view_rx,
            api,
            _stop_on_drop: shutdown.clone().drop_guard(),
            shutdown,
            task,
        }
    }

    /// Starts a run. Without a stored token the call is not attempted and
    /// "Please login first" is surfaced instead.
    pub fn trigger(&self, target_date: Option<NaiveDate>) {
        if self.api.auth().has_token() {
            self.send(Msg::TriggerRequested { target_date });
        } else {
            self.send(Msg::LoginRequired);
        }
    }

    /// Best-effort cancellation. Local state is unaffected until the trigger resolves.
    pub fn stop(&self) {
        self.send(Msg::StopRequested);
    }

    pub fn view(&self) -> ControllerView {
        self.view_rx.borrow().clone()
    }

    /// Waits for the first published view satisfying `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&ControllerView) -> bool,
    ) -> Option<ControllerView> {
        self.view_rx
            .wait_for(predicate)
            .await
            .ok()
            .map(|view| view.clone())
    }

    /// Waits for the run counter to pass `finished_before`.
    ///
    /// The first interrupt sends a stop request and keeps waiting; a second
    /// one gives up, since the trigger call itself may never resolve.
    pub async fn follow_run(
        &mut self,
        finished_before: u64,
        interrupts: &mut mpsc::UnboundedReceiver<()>,
    ) -> RunEnd {
        let mut stop_sent = false;
        loop {
            tokio::select! {
                view = self.wait_for(|view| view.finished_runs > finished_before) => {
                    return view.map_or(RunEnd::Closed, RunEnd::Finished);
                }
                Some(()) = interrupts.recv() => {
                    if stop_sent {
                        cl_warn!("Second interrupt; no longer waiting for the run to end");
                        return RunEnd::Abandoned;
                    }
                    cl_warn!("Stop requested; waiting for the run to end (interrupt again to give up)");
                    self.stop();
                    stop_sent = true;
                }
            }
        }
    }

    /// Tears the component down: the poller stops and later results are ignored.
    pub async fn shutdown(self) -> ControllerView {
        self.send(Msg::Teardown);
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            cl_warn!("Job controller loop ended abnormally: {}", err);
        }
        let view = self.view_rx.borrow().clone();
        view
    }

    fn send(&self, msg: Msg) {
        if self.msg_tx.send(msg).is_err() {
            cl_warn!("Job controller loop is gone; message dropped");
        }
    }
}

struct Poller {
    epoch: Epoch,
    cancel: CancellationToken,
}

struct EventLoop {
    state: ControllerState,
    api: ApiClient,
    settings: ControllerSettings,
    sink: Arc<dyn DisplaySink>,
    msg_tx: mpsc::UnboundedSender<Msg>,
    view_tx: watch::Sender<ControllerView>,
    poller: Option<Poller>,
}

impl EventLoop {
    async fn run(mut self, mut msg_rx: mpsc::UnboundedReceiver<Msg>, shutdown: CancellationToken) {
        loop {
            let msg = tokio::select! {
                biased;
                msg = msg_rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    // Apply queued messages (including Teardown) before leaving.
                    while let Ok(msg) = msg_rx.try_recv() {
                        self.dispatch(msg);
                    }
                    break;
                }
            };
            self.dispatch(msg);
        }
        self.cancel_poller();
        cl_debug!("Job controller loop finished");
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            let view = state.view();
            self.sink.render(&view);
            self.view_tx.send_replace(view);
        }
        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartPoller { epoch } => self.start_poller(epoch),
            Effect::StopPoller { epoch } => {
                if self.poller.as_ref().is_some_and(|p| p.epoch == epoch) {
                    self.cancel_poller();
                }
            }
            Effect::FetchProgress { epoch } => {
                let api = self.api.clone();
                self.spawn_call(async move {
                    match api.progress().await {
                        Ok(snapshot) => Msg::ProgressLoaded {
                            epoch,
                            logs: snapshot.logs,
                        },
                        Err(err) => Msg::ProgressFailed {
                            epoch,
                            message: err.user_message(),
                        },
                    }
                });
            }
            Effect::SendTrigger { epoch, target_date } => {
                let api = self.api.clone();
                self.spawn_call(async move {
                    let outcome = trigger_outcome(api.trigger(target_date).await);
                    Msg::TriggerFinished { epoch, outcome }
                });
            }
            Effect::SendStop => {
                let api = self.api.clone();
                self.spawn_call(async move {
                    Msg::StopFinished {
                        result: api.stop().await.map_err(|err| err.user_message()),
                    }
                });
            }
            Effect::RefreshStatus => {
                let api = self.api.clone();
                self.spawn_call(async move {
                    match api.status().await {
                        Ok(status) => Msg::StatusRefreshed(status_summary(status)),
                        Err(err) => {
                            cl_warn!("Status refresh failed: {}", err);
                            Msg::NoOp
                        }
                    }
                });
            }
        }
    }

    fn start_poller(&mut self, epoch: Epoch) {
        self.cancel_poller();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let msg_tx = self.msg_tx.clone();
        let period = self.settings.poll_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if msg_tx.send(Msg::PollDue { epoch }).is_err() {
                            break;
                        }
                    }
                }
            }
            cl_debug!("Poller of epoch {} stopped", epoch);
        });

        cl_info!("Poller started, epoch={} interval={:?}", epoch, period);
        self.poller = Some(Poller { epoch, cancel });
    }

    fn cancel_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel.cancel();
        }
    }

    /// Runs one network call to completion and posts its result back to the loop.
    fn spawn_call<F>(&self, call: F)
    where
        F: std::future::Future<Output = Msg> + Send + 'static,
    {
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let msg = call.await;
            // The loop may already be gone; the result is then moot.
            let _ = msg_tx.send(msg);
        });
    }
}

/// Maps the trigger response onto success or failure, including in-band `status: "error"`.
pub fn trigger_outcome(result: Result<TriggerResponse, ApiError>) -> TriggerOutcome {
    match result {
        Ok(response) if response.is_failure() => TriggerOutcome::Failed {
            message: response
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "Failed to trigger scraper".to_string()),
        },
        Ok(response) => TriggerOutcome::Completed {
            records_extracted: response.records_extracted,
            message: None,
        },
        Err(err) => TriggerOutcome::Failed {
            message: err.user_message(),
        },
    }
}

fn status_summary(status: ScraperStatus) -> StatusSummary {
    StatusSummary {
        status: status.status,
        last_run: status.last_run,
        last_status: status.last_status,
        total_records: status.total_records,
        last_extraction_count: status.last_extraction_count,
    }
}
