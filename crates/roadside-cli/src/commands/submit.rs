//! `roadside submit`

use std::process::ExitCode;

use anyhow::{Context, Result};
use roadside_core::{CreateBreakdownRequest, GeoPoint, StatusPoller, TrackerConfig};
use tracing::info;

pub struct SubmitArgs {
    pub kind: String,
    pub lat: f64,
    pub lon: f64,
    pub description: Option<String>,
    pub vehicle: Option<String>,
    /// Track the new request after submitting
    pub track: bool,
}

impl SubmitArgs {
    fn request(&self) -> Result<(CreateBreakdownRequest, GeoPoint)> {
        let origin = GeoPoint::new(self.lat, self.lon)?;
        let kind = self.kind.trim();
        anyhow::ensure!(!kind.is_empty(), "breakdown type must not be empty");

        let request = CreateBreakdownRequest::new(kind.to_ascii_uppercase(), origin.lat, origin.lon)
            .with_description(self.description.clone().filter(|d| !d.trim().is_empty()))
            .with_vehicle(self.vehicle.clone());
        Ok((request, origin))
    }
}

pub async fn run(config: &TrackerConfig, args: SubmitArgs) -> Result<ExitCode> {
    let (request, origin) = args.request()?;
    let client = super::client(config)?;

    let created = client
        .create_breakdown(&request)
        .await
        .context("submitting breakdown request")?;
    info!(request_id = %created.id, "Breakdown request created");
    println!("Submitted request {} ({})", created.id, created.state.label());

    if !args.track {
        return Ok(ExitCode::SUCCESS);
    }

    let poller = StatusPoller::new(config.poll_config()?);
    let outcome = super::track::track(
        &poller,
        client,
        created.id,
        Some(origin),
        &mut std::io::stdout(),
    )
    .await?;
    Ok(super::exit_code(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(kind: &str, lat: f64) -> SubmitArgs {
        SubmitArgs {
            kind: kind.to_string(),
            lat,
            lon: 10.18,
            description: Some("  ".to_string()),
            vehicle: Some("veh-1".to_string()),
            track: false,
        }
    }

    #[test]
    fn test_builds_request() {
        let (request, origin) = args(" flat_tire ", 36.8).request().unwrap();
        assert_eq!(request.kind, "FLAT_TIRE");
        assert_eq!(request.description, None);
        assert_eq!(request.vehicle_id.as_deref(), Some("veh-1"));
        assert_eq!(origin, GeoPoint { lat: 36.8, lon: 10.18 });
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(args("BATTERY", 120.0).request().is_err());
        assert!(args("   ", 36.8).request().is_err());
    }
}
