//! Subcommand implementations

pub mod cancel;
pub mod garage;
pub mod list;
pub mod submit;
pub mod track;

use std::process::ExitCode;

use anyhow::Result;
use roadside_core::{BreakdownsClient, PollOutcome, TrackerConfig};
use tracing::debug;

/// Exit status when a garage refused or the request was cancelled server-side
pub const EXIT_REFUSED: u8 = 2;

/// Exit status after Ctrl-C, as shells report SIGINT
pub const EXIT_INTERRUPTED: u8 = 130;

pub fn exit_status(outcome: &PollOutcome) -> u8 {
    match outcome {
        PollOutcome::Accepted(_) => 0,
        PollOutcome::RefusedOrCancelled(_) => EXIT_REFUSED,
        PollOutcome::Cancelled => EXIT_INTERRUPTED,
    }
}

pub(crate) fn exit_code(outcome: &PollOutcome) -> ExitCode {
    ExitCode::from(exit_status(outcome))
}

pub(crate) fn client(config: &TrackerConfig) -> Result<BreakdownsClient> {
    let client = BreakdownsClient::new(&config.api)?;
    debug!(base_url = %client.base_url(), "Breakdowns API client ready");
    Ok(client)
}
