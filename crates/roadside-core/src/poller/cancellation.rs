//! Cancellation support for status polling
//!
//! Allows stopping a poll loop from outside, and settles the race between a
//! caller cancelling and the loop delivering its terminal callback.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const DELIVERING: u8 = 2;

/// Wrapper around CancellationToken for a single poll session
///
/// The gate moves out of `RUNNING` exactly once: either to `CANCELLED` (caller
/// won) or to `DELIVERING` (a terminal state won). Whichever loses is a no-op.
#[derive(Debug, Clone)]
pub struct PollCancellation {
    token: CancellationToken,
    gate: Arc<AtomicU8>,
}

impl PollCancellation {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            gate: Arc::new(AtomicU8::new(RUNNING)),
        }
    }

    /// Cancel the session
    ///
    /// Returns `false` if a terminal callback had already been claimed, in
    /// which case cancelling has no effect on what gets delivered.
    pub fn cancel(&self) -> bool {
        let won = self
            .gate
            .compare_exchange(RUNNING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.token.cancel();
        won
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.load(Ordering::Acquire) == CANCELLED
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Claim the right to deliver the terminal callback
    pub(crate) fn begin_delivery(&self) -> bool {
        self.gate
            .compare_exchange(RUNNING, DELIVERING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for PollCancellation {
    fn default() -> Self {
        Self::new()
    }
}
