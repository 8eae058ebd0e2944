//! Breakdown request status poller
//!
//! Polls a [`StatusSource`] for one request on a fixed cadence until the
//! request reaches a terminal state or the caller cancels.
//!
//! ## Loop
//! 1. Wait (initial delay before the first fetch, then the poll interval)
//! 2. Fetch the status and publish it on the session
//! 3. `ACCEPTED` fires `on_accepted`, `REFUSED`/`CANCELLED` fires
//!    `on_refused_or_cancelled`, and the loop ends
//! 4. Anything else, including fetch errors, goes back to 1
//!
//! Fetch errors never end the loop: the interval doubles as the retry cadence.
//! Only one fetch is ever in flight per session. Every iteration passes through
//! a suspension point, even with a zero interval.

mod cancellation;
mod session;
mod source;

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::status::{Classification, RequestId, RequestStatus, TerminalStates};

pub use cancellation::PollCancellation;
pub use session::{Finish, PollSession, SessionPhase};
pub use source::{status_source_fn, FnSource, StatusSource};

/// Default delay between the end of one fetch and the start of the next
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Timing and terminal-state rules for a poll session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Delay before the very first fetch (may be zero)
    pub initial_delay: Duration,
    pub terminal_states: TerminalStates,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            initial_delay: Duration::ZERO,
            terminal_states: TerminalStates::default(),
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_terminal_states(mut self, terminal_states: TerminalStates) -> Self {
        self.terminal_states = terminal_states;
        self
    }
}

/// How a poll session ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Payload of the fetch that reported acceptance
    Accepted(RequestStatus),
    RefusedOrCancelled(RequestStatus),
    /// Stopped by the caller before a terminal state was reached
    Cancelled,
}

impl PollOutcome {
    pub fn finish(&self) -> Finish {
        match self {
            PollOutcome::Accepted(_) => Finish::Accepted,
            PollOutcome::RefusedOrCancelled(_) => Finish::RefusedOrCancelled,
            PollOutcome::Cancelled => Finish::Cancelled,
        }
    }
}

/// Starts poll sessions with a shared configuration
#[derive(Debug, Clone, Default)]
pub struct StatusPoller {
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Start tracking `request_id` on the current tokio runtime
    ///
    /// `on_accepted` receives the full status of the accepting fetch (it
    /// carries the coordinates a tracking view needs). At most one of the two
    /// callbacks runs, at most once, and neither runs after a successful
    /// [`PollHandle::cancel`].
    ///
    /// # Panics
    /// If `request_id` is empty, or when called outside a tokio runtime.
    pub fn start<S, A, R>(
        &self,
        request_id: impl Into<RequestId>,
        source: S,
        on_accepted: A,
        on_refused_or_cancelled: R,
    ) -> PollHandle
    where
        S: StatusSource + 'static,
        A: FnOnce(RequestStatus) + Send + 'static,
        R: FnOnce() + Send + 'static,
    {
        let request_id = request_id.into();
        assert!(
            !request_id.is_empty(),
            "StatusPoller::start requires a non-empty request id"
        );

        let cancellation = PollCancellation::new();
        let (session_tx, session_rx) = watch::channel(PollSession::new(request_id.clone()));

        info!(
            request_id = %request_id,
            interval_ms = self.config.interval.as_millis() as u64,
            initial_delay_ms = self.config.initial_delay.as_millis() as u64,
            "StatusPoller: Starting"
        );

        let task = tokio::spawn(run_loop(
            self.config.clone(),
            request_id.clone(),
            source,
            on_accepted,
            on_refused_or_cancelled,
            cancellation.clone(),
            session_tx,
        ));

        PollHandle {
            request_id,
            cancellation,
            session: session_rx,
            task,
        }
    }
}

async fn run_loop<S, A, R>(
    config: PollConfig,
    request_id: RequestId,
    source: S,
    on_accepted: A,
    on_refused_or_cancelled: R,
    cancellation: PollCancellation,
    session_tx: watch::Sender<PollSession>,
) -> PollOutcome
where
    S: StatusSource,
    A: FnOnce(RequestStatus) + Send,
    R: FnOnce() + Send,
{
    let mut session = PollSession::new(request_id.clone());
    let mut delay = config.initial_delay;

    loop {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                return stop_cancelled(&mut session, &session_tx);
            }
            _ = pause(delay) => {}
        }
        if cancellation.is_cancelled() {
            return stop_cancelled(&mut session, &session_tx);
        }

        session.begin_fetch();
        session_tx.send_replace(session.clone());
        debug!(
            request_id = %request_id,
            attempt = session.fetch_count + 1,
            "StatusPoller: Fetching status"
        );

        let result = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                return stop_cancelled(&mut session, &session_tx);
            }
            result = source.fetch_status(&request_id) => result,
        };

        match result {
            Ok(status) => {
                debug!(request_id = %request_id, state = %status.state, "StatusPoller: Got status");
                session.record_success(status.clone());

                match config.terminal_states.classify(&status.state) {
                    Classification::Accepted => {
                        if !cancellation.begin_delivery() {
                            return stop_cancelled(&mut session, &session_tx);
                        }
                        info!(request_id = %request_id, "StatusPoller: Request accepted");
                        session_tx.send_replace(session.clone());
                        on_accepted(status.clone());
                        session.finish(Finish::Accepted);
                        session_tx.send_replace(session);
                        return PollOutcome::Accepted(status);
                    }
                    Classification::RefusedOrCancelled => {
                        if !cancellation.begin_delivery() {
                            return stop_cancelled(&mut session, &session_tx);
                        }
                        info!(
                            request_id = %request_id,
                            state = %status.state,
                            "StatusPoller: Request refused or cancelled"
                        );
                        session_tx.send_replace(session.clone());
                        on_refused_or_cancelled();
                        session.finish(Finish::RefusedOrCancelled);
                        session_tx.send_replace(session);
                        return PollOutcome::RefusedOrCancelled(status);
                    }
                    Classification::Continue => {
                        session_tx.send_replace(session.clone());
                    }
                }
            }
            Err(err) => {
                warn!(request_id = %request_id, error = %err, "StatusPoller: Fetch failed");
                session.record_failure(err);
                session_tx.send_replace(session.clone());
            }
        }

        delay = config.interval;
    }
}

/// Wait out `delay`. A zero delay still yields so a ready source cannot starve the runtime.
async fn pause(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        sleep(delay).await;
    }
}

fn stop_cancelled(
    session: &mut PollSession,
    session_tx: &watch::Sender<PollSession>,
) -> PollOutcome {
    info!(
        request_id = %session.request_id,
        fetches = session.fetch_count,
        "StatusPoller: Cancelled"
    );
    session.finish(Finish::Cancelled);
    session_tx.send_replace(session.clone());
    PollOutcome::Cancelled
}

/// Handle to a running poll session
///
/// Dropping the handle leaves the session running; use
/// [`PollHandle::cancel_on_drop`] to tie it to a scope.
pub struct PollHandle {
    request_id: RequestId,
    cancellation: PollCancellation,
    session: watch::Receiver<PollSession>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Stop polling before the next fetch
    ///
    /// Returns `false` if a terminal callback had already been claimed.
    pub fn cancel(&self) -> bool {
        self.cancellation.cancel()
    }

    /// Cancellation that can be moved elsewhere (signal handlers, UI scopes)
    pub fn cancellation(&self) -> PollCancellation {
        self.cancellation.clone()
    }

    /// Current snapshot of the session
    pub fn session(&self) -> PollSession {
        self.session.borrow().clone()
    }

    /// Receiver notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<PollSession> {
        self.session.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end
    pub async fn wait(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            // A panicking callback should surface to whoever waits on it
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => PollOutcome::Cancelled,
        }
    }

    /// Cancel the session when the returned guard is dropped
    pub fn cancel_on_drop(self) -> PollGuard {
        PollGuard { handle: self }
    }
}

/// Cancels its session on drop
pub struct PollGuard {
    handle: PollHandle,
}

impl std::ops::Deref for PollGuard {
    type Target = PollHandle;

    fn deref(&self) -> &PollHandle {
        &self.handle
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}
