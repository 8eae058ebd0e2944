//! Garage-side transitions: `roadside accept | refuse | complete`

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use roadside_core::{BreakdownsClient, FetchError, RequestId, TrackerConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GarageAction {
    Accept,
    Refuse { reason: Option<String> },
    Complete,
}

impl GarageAction {
    fn verb(&self) -> &'static str {
        match self {
            GarageAction::Accept => "accepting",
            GarageAction::Refuse { .. } => "refusing",
            GarageAction::Complete => "completing",
        }
    }
}

pub async fn run(config: &TrackerConfig, id: RequestId, action: GarageAction) -> Result<ExitCode> {
    if id.is_empty() {
        bail!("request id must not be empty");
    }

    let client = super::client(config)?;
    let message = apply(&client, &id, &action)
        .await
        .with_context(|| format!("{} request {id}", action.verb()))?;
    println!("{message}");
    Ok(ExitCode::SUCCESS)
}

async fn apply(
    client: &BreakdownsClient,
    id: &RequestId,
    action: &GarageAction,
) -> Result<String, FetchError> {
    let status = match action {
        GarageAction::Accept => client.accept_breakdown(id).await?,
        GarageAction::Refuse { reason } => {
            client.refuse_breakdown(id, reason.as_deref()).await?;
            return Ok(format!("Request {id} refused"));
        }
        GarageAction::Complete => client.complete_breakdown(id).await?,
    };
    Ok(format!(
        "Request {} is now {}",
        status.id,
        status.state.label().to_lowercase()
    ))
}
