//! `roadside list`

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use roadside_core::{RequestId, RequestState, RequestStatus, TrackerConfig};
use tokio::time::sleep;
use tracing::warn;

use crate::output::breakdown_table;

pub async fn run(
    config: &TrackerConfig,
    state: Option<RequestState>,
    watch: bool,
) -> Result<ExitCode> {
    let client = super::client(config)?;
    let interval = config.poll_config()?.interval;
    let mut shown = ListSnapshot::default();

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        match client.list_breakdowns(state.as_ref()).await {
            Ok(list) => {
                if shown.replace(&list) {
                    if watch {
                        println!("[{}]", Local::now().format("%H:%M:%S"));
                    }
                    println!("{}", breakdown_table(&list));
                }
            }
            Err(e) if watch => warn!("Could not refresh breakdown list: {}", e),
            Err(e) => return Err(e).context("listing breakdown requests"),
        }

        if !watch {
            return Ok(ExitCode::SUCCESS);
        }

        tokio::select! {
            biased;
            _ = &mut interrupt => return Ok(ExitCode::SUCCESS),
            _ = sleep(interval) => {}
        }
    }
}

/// Id and state of every listed request, to skip reprinting an unchanged list
#[derive(Debug, Default)]
struct ListSnapshot(Option<Vec<(RequestId, RequestState)>>);

impl ListSnapshot {
    /// Store `list`, returning whether it differs from the previous one
    fn replace(&mut self, list: &[RequestStatus]) -> bool {
        let next: Vec<_> = list.iter().map(|b| (b.id.clone(), b.state.clone())).collect();
        if self.0.as_ref() == Some(&next) {
            return false;
        }
        self.0 = Some(next);
        true
    }
}
