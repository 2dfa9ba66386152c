//! Session monitor: the scoped owner of one tracker and its timers.
//!
//! SYSTEM CONTEXT
//! ==============
//! The presentation layer (countdown chip, warning modal, the `watch`
//! command) never touches the tracker. It receives `SessionEvent`s, reads
//! the latest `TrackerState` from a `watch` channel, and sends commands
//! (extend, logout) through a `SessionHandle`.
//!
//! DESIGN
//! ======
//! One actor task owns the `InactivityTracker` and is its only writer. Two
//! `RepeatingTask`s feed it `Tick` and `PollStatus` commands; network calls
//! run as children in a `JoinSet` and report back as outcomes, so neither a
//! slow status poll nor a slow renewal delays the countdown.
//!
//! Lifetime is scoped: reaching Expired stops both timers and ends the
//! actor, and dropping the `SessionHandle` aborts everything.
//!
//! The actor never waits on its observer. Events are queued with
//! `try_send`; an observer that stops reading loses events, never the
//! countdown.
//!
//! ORDERING
//! ========
//! Server snapshots always win over the local countdown. A status response
//! that was requested before a successful renewal landed is discarded, since
//! it describes the pre-renewal expiry.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::config::MonitorTiming;
use crate::error::SessionError;
use crate::net::SessionApi;
use crate::scheduler::RepeatingTask;
use crate::tracker::{InactivityTracker, ServerSessionSnapshot, SessionWindow, TrackerState};

/// Where the presentation layer sends the user once the session is gone.
pub const LOGIN_ROUTE: &str = "/admin/login";

const COMMAND_QUEUE_CAPACITY: usize = 32;
const EVENT_QUEUE_CAPACITY: usize = 64;
/// Queue slots kept free of `StateChanged` so transition events still fit
/// when the observer only reads the `watch` view.
const TRANSITION_HEADROOM: usize = 16;

// =============================================================================
// EVENTS
// =============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// The local countdown reached zero.
    CountdownElapsed,
    /// A status snapshot put the expiry in the past.
    ServerReportedExpired,
    /// The auth service answered 401.
    Unauthenticated,
    /// The user chose to log out now.
    LoggedOut,
}

/// Messages from the monitor to its presentation observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Any change to the tracker state. Skipped while the queue is nearly
    /// full; the `watch` view is authoritative.
    StateChanged(TrackerState),
    WarningStarted { remaining_secs: u32 },
    WarningCleared,
    Renewed,
    RenewalFailed(SessionError),
    StatusPollFailed(SessionError),
    Expired(ExpiryReason),
    /// Redirect target. Always follows `Expired`.
    Navigate(String),
}

// =============================================================================
// HANDLE
// =============================================================================

enum Command {
    Tick,
    PollStatus,
    Extend(oneshot::Sender<Result<(), SessionError>>),
    LogoutNow,
}

/// Read-only view plus command handle for one running monitor.
///
/// Dropping the handle tears the monitor down.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<TrackerState>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Latest tracker state.
    #[must_use]
    pub fn state(&self) -> TrackerState {
        *self.state.borrow()
    }

    /// A receiver that is notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Ask the server to extend the session and wait for the outcome.
    ///
    /// # Errors
    ///
    /// [`SessionError::RenewalInFlight`] if a previous call has not resolved,
    /// [`SessionError::MonitorStopped`] once the session has ended, otherwise
    /// the renewal failure itself. Failures leave the countdown untouched.
    pub async fn extend(&self) -> Result<(), SessionError> {
        self.extend_request().await
    }

    /// Same as [`extend`](Self::extend), but the returned future does not
    /// borrow the handle, so it can be spawned or polled alongside the event
    /// stream.
    pub fn extend_request(&self) -> impl Future<Output = Result<(), SessionError>> + Send + use<> {
        let commands = self.commands.clone();
        async move {
            let (reply_tx, reply_rx) = oneshot::channel();
            commands
                .send(Command::Extend(reply_tx))
                .await
                .map_err(|_| SessionError::MonitorStopped)?;
            reply_rx.await.map_err(|_| SessionError::MonitorStopped)?
        }
    }

    /// End the session immediately and navigate to the login route.
    ///
    /// # Errors
    ///
    /// [`SessionError::MonitorStopped`] if the session already ended.
    pub async fn logout_now(&self) -> Result<(), SessionError> {
        self.commands
            .send(Command::LogoutNow)
            .await
            .map_err(|_| SessionError::MonitorStopped)
    }

    /// Stop the monitor and wait until its task has exited.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            debug!("session monitor shut down");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// SPAWN
// =============================================================================

/// Start monitoring a freshly authenticated session.
///
/// Returns the command handle and the event stream for the presentation
/// layer. Must be called from within a tokio runtime.
pub fn spawn_session_monitor(
    api: Arc<dyn SessionApi>,
    clock: Arc<dyn Clock>,
    window: SessionWindow,
    timing: MonitorTiming,
) -> (SessionHandle, mpsc::Receiver<SessionEvent>) {
    let tracker = InactivityTracker::initialize(window);
    let (state_tx, state_rx) = watch::channel(tracker.state());
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

    info!(
        total_timeout_secs = window.total_timeout_secs(),
        warning_threshold_secs = window.warning_threshold_secs(),
        tick_ms = u64::try_from(timing.tick_interval.as_millis()).unwrap_or(u64::MAX),
        status_poll_secs = timing.status_poll_interval.as_secs(),
        "session monitor started"
    );

    let timers = Timers::start(&command_tx, timing);
    let monitor = Monitor {
        tracker,
        api,
        clock,
        state_tx,
        events: event_tx,
        inflight: JoinSet::new(),
        renewal_pending: false,
        status_pending: false,
        epoch: 0,
        last_tick: Instant::now(),
        tick_period: timing.tick_interval,
    };
    let task = tokio::spawn(monitor.run(command_rx, timers));

    (SessionHandle { commands: command_tx, state: state_rx, task: Some(task) }, event_rx)
}

/// The two repeating timers. Dropping this cancels both.
struct Timers {
    _tick: RepeatingTask,
    _poll: RepeatingTask,
}

impl Timers {
    fn start(commands: &mpsc::Sender<Command>, timing: MonitorTiming) -> Self {
        let tick = RepeatingTask::spawn("session-tick", timing.tick_interval, forward(commands, || Command::Tick));
        let poll_job = forward(commands, || Command::PollStatus);
        let poll = if timing.poll_on_start {
            RepeatingTask::spawn_immediate("session-status-poll", timing.status_poll_interval, poll_job)
        } else {
            RepeatingTask::spawn("session-status-poll", timing.status_poll_interval, poll_job)
        };
        Self { _tick: tick, _poll: poll }
    }
}

/// Timer job that pushes one command per firing. A full queue skips the
/// firing; a closed queue stops the timer.
fn forward(
    commands: &mpsc::Sender<Command>,
    make: fn() -> Command,
) -> impl FnMut() -> std::future::Ready<ControlFlow<()>> + Send + use<> {
    let commands = commands.clone();
    move || {
        let flow = match commands.try_send(make()) {
            Ok(()) => ControlFlow::Continue(()),
            Err(TrySendError::Full(_)) => {
                trace!("session command queue full; skipping timer firing");
                ControlFlow::Continue(())
            }
            Err(TrySendError::Closed(_)) => ControlFlow::Break(()),
        };
        std::future::ready(flow)
    }
}

// =============================================================================
// ACTOR
// =============================================================================

enum Outcome {
    Status { epoch: u64, result: Result<ServerSessionSnapshot, SessionError> },
    Renewal { result: Result<(), SessionError>, reply: oneshot::Sender<Result<(), SessionError>> },
}

struct Monitor {
    tracker: InactivityTracker,
    api: Arc<dyn SessionApi>,
    clock: Arc<dyn Clock>,
    state_tx: watch::Sender<TrackerState>,
    events: mpsc::Sender<SessionEvent>,
    inflight: JoinSet<Outcome>,
    renewal_pending: bool,
    status_pending: bool,
    /// Bumped on every successful renewal; status results from an older
    /// epoch are stale.
    epoch: u64,
    last_tick: Instant,
    tick_period: Duration,
}

impl Monitor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, timers: Timers) {
        loop {
            let flow = tokio::select! {
                Some(command) = commands.recv() => self.handle_command(command),
                Some(joined) = self.inflight.join_next(), if !self.inflight.is_empty() => match joined {
                    Ok(outcome) => self.handle_outcome(outcome),
                    Err(e) => {
                        warn!(error = %e, "session request task failed");
                        self.status_pending = false;
                        self.renewal_pending = false;
                        ControlFlow::Continue(())
                    }
                },
                else => ControlFlow::Break(()),
            };
            if flow.is_break() {
                break;
            }
        }
        drop(timers);
        self.inflight.abort_all();
        debug!("session monitor stopped");
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Tick => self.on_tick(),
            Command::PollStatus => {
                self.start_status_poll();
                ControlFlow::Continue(())
            }
            Command::Extend(reply) => {
                self.start_renewal(reply);
                ControlFlow::Continue(())
            }
            Command::LogoutNow => {
                info!("session ended by user");
                self.finish(ExpiryReason::LoggedOut)
            }
        }
    }

    fn on_tick(&mut self) -> ControlFlow<()> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;

        let prev = self.tracker.state();
        let next = self.tracker.advance(elapsed, self.tick_period);
        trace!(remaining_secs = next.remaining_secs, "session tick");
        self.publish(prev);

        if next.is_expired {
            info!("session countdown elapsed");
            return self.finish(ExpiryReason::CountdownElapsed);
        }
        ControlFlow::Continue(())
    }

    fn start_status_poll(&mut self) {
        if self.status_pending {
            debug!("session status poll still in flight; skipping");
            return;
        }
        self.status_pending = true;
        let api = Arc::clone(&self.api);
        let epoch = self.epoch;
        self.inflight.spawn(async move {
            let result = api.fetch_status().await;
            Outcome::Status { epoch, result }
        });
    }

    fn start_renewal(&mut self, reply: oneshot::Sender<Result<(), SessionError>>) {
        if self.renewal_pending {
            debug!("session renewal already in flight; rejecting duplicate");
            let _ = reply.send(Err(SessionError::RenewalInFlight));
            return;
        }
        self.renewal_pending = true;
        let api = Arc::clone(&self.api);
        self.inflight.spawn(async move {
            let result = api.extend_session().await;
            Outcome::Renewal { result, reply }
        });
    }

    fn handle_outcome(&mut self, outcome: Outcome) -> ControlFlow<()> {
        match outcome {
            Outcome::Status { epoch, result } => {
                self.status_pending = false;
                if epoch != self.epoch {
                    debug!(epoch, current = self.epoch, "discarding status fetched before renewal");
                    return ControlFlow::Continue(());
                }
                self.on_status(result)
            }
            Outcome::Renewal { result, reply } => {
                self.renewal_pending = false;
                self.on_renewal(result, reply)
            }
        }
    }

    fn on_status(&mut self, result: Result<ServerSessionSnapshot, SessionError>) -> ControlFlow<()> {
        match result {
            Ok(snapshot) => {
                let prev = self.tracker.state();
                let next = self.tracker.resynchronize(&snapshot, self.clock.now_utc());
                self.last_tick = Instant::now();
                if next.remaining_secs != prev.remaining_secs {
                    debug!(local = prev.remaining_secs, server = next.remaining_secs, "session resynchronized");
                }
                self.publish(prev);
                if next.is_expired {
                    info!(expires_at = %snapshot.expires_at, "server reports session expired");
                    return self.finish(ExpiryReason::ServerReportedExpired);
                }
                ControlFlow::Continue(())
            }
            Err(SessionError::AuthExpired) => {
                info!("session status unauthenticated");
                self.finish(ExpiryReason::Unauthenticated)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "session status poll failed; retrying next cycle");
                self.emit(SessionEvent::StatusPollFailed(e));
                ControlFlow::Continue(())
            }
        }
    }

    fn on_renewal(
        &mut self,
        result: Result<(), SessionError>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    ) -> ControlFlow<()> {
        match result {
            Ok(()) => {
                self.epoch += 1;
                let prev = self.tracker.state();
                let next = self.tracker.renew();
                self.last_tick = Instant::now();
                info!(remaining_secs = next.remaining_secs, "session renewed");
                self.publish(prev);
                self.emit(SessionEvent::Renewed);
                let _ = reply.send(Ok(()));
                ControlFlow::Continue(())
            }
            Err(SessionError::AuthExpired) => {
                let _ = reply.send(Err(SessionError::AuthExpired));
                info!("session renewal unauthenticated");
                self.finish(ExpiryReason::Unauthenticated)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "session renewal failed");
                self.emit(SessionEvent::RenewalFailed(e.clone()));
                let _ = reply.send(Err(e));
                ControlFlow::Continue(())
            }
        }
    }

    fn finish(&mut self, reason: ExpiryReason) -> ControlFlow<()> {
        let prev = self.tracker.state();
        if !prev.is_expired {
            self.tracker.expire();
            self.publish(prev);
        }
        self.emit(SessionEvent::Expired(reason));
        self.emit(SessionEvent::Navigate(LOGIN_ROUTE.to_string()));
        ControlFlow::Break(())
    }

    /// Push the current state to observers if it differs from `prev`.
    fn publish(&mut self, prev: TrackerState) {
        let next = self.tracker.state();
        if next == prev {
            return;
        }
        self.state_tx.send_replace(next);
        if self.events.capacity() > TRANSITION_HEADROOM {
            self.emit(SessionEvent::StateChanged(next));
        } else {
            trace!("session observer lagging; state change not queued");
        }

        if next.is_warning_active && !prev.is_warning_active {
            info!(remaining_secs = next.remaining_secs, "session warning started");
            self.emit(SessionEvent::WarningStarted { remaining_secs: next.remaining_secs });
        } else if prev.is_warning_active && !next.is_warning_active && !next.is_expired {
            self.emit(SessionEvent::WarningCleared);
        }
    }

    /// Queue an event without waiting on the observer. The actor keeps
    /// counting down whether or not anyone reads the stream.
    fn emit(&mut self, event: SessionEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(?event, "session event queue full; event dropped"),
            Err(TrySendError::Closed(_)) => trace!("session observer dropped"),
        }
    }
}
