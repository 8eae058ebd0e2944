//! Poll session state
//!
//! Owned and mutated only by the poll loop; readers get cloned snapshots.

use crate::error::FetchError;
use crate::status::{RequestId, RequestStatus};

/// How a finished session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Accepted,
    RefusedOrCancelled,
    /// Stopped by the caller, no callback fired
    Cancelled,
}

/// Where the poll loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Sleeping until the next fetch
    Waiting,
    /// A fetch is in flight
    Fetching,
    Finished(Finish),
}

/// Snapshot of one tracked request
#[derive(Debug, Clone, PartialEq)]
pub struct PollSession {
    pub request_id: RequestId,
    /// Last successfully fetched status
    pub last_known_status: Option<RequestStatus>,
    /// Last fetch failure, cleared by the next success
    pub last_error: Option<FetchError>,
    /// Completed fetches, successful or not
    pub fetch_count: u64,
    pub phase: SessionPhase,
}

impl PollSession {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            last_known_status: None,
            last_error: None,
            fetch_count: 0,
            phase: SessionPhase::Waiting,
        }
    }

    pub fn begin_fetch(&mut self) {
        self.phase = SessionPhase::Fetching;
    }

    pub fn record_success(&mut self, status: RequestStatus) {
        self.last_known_status = Some(status);
        self.last_error = None;
        self.fetch_count += 1;
        self.phase = SessionPhase::Waiting;
    }

    /// Record a failed fetch. The last known status stays visible.
    pub fn record_failure(&mut self, error: FetchError) {
        self.last_error = Some(error);
        self.fetch_count += 1;
        self.phase = SessionPhase::Waiting;
    }

    pub fn finish(&mut self, finish: Finish) {
        self.phase = SessionPhase::Finished(finish);
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.phase, SessionPhase::Finished(_))
    }
}
