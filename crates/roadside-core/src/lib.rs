//! Roadside assistance request tracking
//!
//! Key components:
//! - `status` - Breakdown request status model and terminal-state rules
//! - `poller` - Fixed-cadence status poller with cancellation
//! - `client` - HTTP client for the breakdowns API
//! - `tracking` - Distance and ETA between a client and a request location
//! - `config` - TOML configuration with environment overrides

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod status;
pub mod tracking;

pub use client::{BreakdownsClient, CreateBreakdownRequest};
pub use config::TrackerConfig;
pub use error::{ConfigError, CoordinateError, FetchError};
pub use poller::{
    status_source_fn, Finish, PollCancellation, PollConfig, PollGuard, PollHandle,
    PollOutcome, PollSession, SessionPhase, StatusPoller, StatusSource,
};
pub use status::{Classification, RequestId, RequestState, RequestStatus, TerminalStates};
pub use tracking::{GeoPoint, TrackingSummary};
