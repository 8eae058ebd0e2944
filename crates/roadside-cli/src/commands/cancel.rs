//! `roadside cancel`

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use roadside_core::{RequestId, TrackerConfig};

pub async fn run(config: &TrackerConfig, id: RequestId) -> Result<ExitCode> {
    if id.is_empty() {
        bail!("request id must not be empty");
    }

    let client = super::client(config)?;
    let status = client
        .cancel_breakdown(&id)
        .await
        .with_context(|| format!("cancelling request {id}"))?;

    println!("Request {} is now {}", status.id, status.state.label().to_lowercase());
    Ok(ExitCode::SUCCESS)
}
