mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use roadside_core::{GeoPoint, RequestId, RequestState, TrackerConfig};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use commands::garage::GarageAction;
use commands::submit::SubmitArgs;

/// Track roadside assistance (SOS) breakdown requests.
#[derive(Parser)]
#[command(name = "roadside", version, about = "Track roadside assistance requests")]
struct Cli {
    /// Config file (default: ~/.roadside/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Breakdowns API base URL, overrides config and environment
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a request until a garage accepts or refuses it
    Track {
        /// Request id
        id: String,
        /// Your position as LAT,LON, for distance and ETA once accepted
        #[arg(long, allow_hyphen_values = true)]
        from: Option<GeoPoint>,
    },

    /// Submit a new breakdown request, then track it
    Submit {
        /// Breakdown type (e.g. BATTERY, FLAT_TIRE, ENGINE)
        #[arg(long = "type")]
        kind: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        description: Option<String>,
        /// Vehicle id
        #[arg(long)]
        vehicle: Option<String>,
        /// Exit after submitting instead of tracking
        #[arg(long)]
        no_track: bool,
    },

    /// Cancel a request
    Cancel {
        /// Request id
        id: String,
    },

    /// List requests, optionally refreshing on the poll interval
    List {
        /// Only requests in this state (e.g. PENDING)
        #[arg(long, value_parser = parse_state)]
        status: Option<RequestState>,
        /// Keep refreshing until Ctrl-C
        #[arg(long)]
        watch: bool,
    },

    /// Accept a pending request (garage)
    Accept {
        /// Request id
        id: String,
    },

    /// Refuse a pending request (garage)
    Refuse {
        /// Request id
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Mark a request as completed (garage)
    Complete {
        /// Request id
        id: String,
    },
}

fn parse_state(raw: &str) -> Result<RequestState, String> {
    RequestState::parse_known(raw).ok_or_else(|| format!("unknown status '{raw}'"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "roadside=debug,roadside_core=debug"
    } else {
        "roadside=info,roadside_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = TrackerConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
        config.validate()?;
    }
    debug!(base_url = %config.api.base_url, "Loaded config");

    match cli.command {
        Commands::Track { id, from } => {
            commands::track::run(&config, RequestId::new(id), from).await
        }
        Commands::Submit {
            kind,
            lat,
            lon,
            description,
            vehicle,
            no_track,
        } => {
            let args = SubmitArgs {
                kind,
                lat,
                lon,
                description,
                vehicle,
                track: !no_track,
            };
            commands::submit::run(&config, args).await
        }
        Commands::Cancel { id } => commands::cancel::run(&config, RequestId::new(id)).await,
        Commands::List { status, watch } => commands::list::run(&config, status, watch).await,
        Commands::Accept { id } => {
            commands::garage::run(&config, RequestId::new(id), GarageAction::Accept).await
        }
        Commands::Refuse { id, reason } => {
            commands::garage::run(&config, RequestId::new(id), GarageAction::Refuse { reason }).await
        }
        Commands::Complete { id } => {
            commands::garage::run(&config, RequestId::new(id), GarageAction::Complete).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track_with_origin() {
        let cli = Cli::try_parse_from(["roadside", "track", "b1", "--from", "-33.9,18.4"]).unwrap();
        match cli.command {
            Commands::Track { id, from } => {
                assert_eq!(id, "b1");
                assert_eq!(from, Some(GeoPoint { lat: -33.9, lon: 18.4 }));
            }
            _ => panic!("expected track"),
        }
    }

    #[test]
    fn test_parse_submit() {
        let cli = Cli::try_parse_from([
            "roadside", "submit", "--type", "BATTERY", "--lat", "-1.5", "--lon", "36.8",
            "--no-track", "--api-url", "http://10.0.2.2:3000",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://10.0.2.2:3000"));
        match cli.command {
            Commands::Submit {
                kind, lat, no_track, ..
            } => {
                assert_eq!(kind, "BATTERY");
                assert_eq!(lat, -1.5);
                assert!(no_track);
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn test_parse_list_and_refuse() {
        let cli = Cli::try_parse_from(["roadside", "list", "--status", "pending", "--watch"]).unwrap();
        match cli.command {
            Commands::List { status, watch } => {
                assert_eq!(status, Some(RequestState::Pending));
                assert!(watch);
            }
            _ => panic!("expected list"),
        }
        assert!(Cli::try_parse_from(["roadside", "list", "--status", "ASSIGNED"]).is_err());

        let cli = Cli::try_parse_from(["roadside", "refuse", "b1", "--reason", "Too far"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Refuse { ref id, reason: Some(ref r) } if id == "b1" && r == "Too far"
        ));
    }

    #[test]
    fn test_rejects_bad_origin() {
        assert!(Cli::try_parse_from(["roadside", "track", "b1", "--from", "north"]).is_err());
        assert!(Cli::try_parse_from(["roadside", "track", "b1", "--from", "95,0"]).is_err());
    }
}
