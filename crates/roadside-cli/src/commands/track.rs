//! `roadside track`

use std::io::Write;
use std::process::ExitCode;

use anyhow::{bail, Result};
use chrono::Local;
use roadside_core::{
    GeoPoint, PollOutcome, PollSession, RequestId, RequestStatus, StatusPoller, StatusSource,
    TrackerConfig,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::output::{accepted_message, refused_message, StatusPrinter};

pub async fn run(config: &TrackerConfig, id: RequestId, from: Option<GeoPoint>) -> Result<ExitCode> {
    let poller = StatusPoller::new(config.poll_config()?);
    let client = super::client(config)?;
    let outcome = track(&poller, client, id, from, &mut std::io::stdout()).await?;
    Ok(super::exit_code(&outcome))
}

/// Follow one request, printing status changes until it ends or Ctrl-C
///
/// The terminal message is written after the last status line.
pub async fn track<S, W>(
    poller: &StatusPoller,
    source: S,
    id: RequestId,
    from: Option<GeoPoint>,
    out: &mut W,
) -> Result<PollOutcome>
where
    S: StatusSource + 'static,
    W: Write,
{
    if id.is_empty() {
        bail!("request id must not be empty");
    }

    // Callbacks run on the poll task; hand their message back to this one
    let (message_tx, mut message_rx) = mpsc::unbounded_channel();
    let refused_tx = message_tx.clone();
    let accepted_id = id.clone();
    let refused_id = id.clone();

    let handle = poller.start(
        id,
        source,
        move |status: RequestStatus| {
            let _ = message_tx.send(accepted_message(&accepted_id, &status, from));
        },
        move || {
            let _ = refused_tx.send(refused_message(&refused_id));
        },
    );

    writeln!(
        out,
        "Tracking request {} every {}s (Ctrl-C to stop)",
        handle.request_id(),
        poller.config().interval.as_secs_f64()
    )?;

    let mut updates = handle.subscribe();
    let cancellation = handle.cancellation();
    let mut printer = StatusPrinter::default();

    let wait = handle.wait();
    tokio::pin!(wait);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupted = false;

    let outcome = loop {
        tokio::select! {
            biased;
            changed = updates.changed() => {
                if changed.is_err() {
                    // Poll task is gone; its outcome is ready
                    break (&mut wait).await;
                }
                let session = updates.borrow_and_update().clone();
                print_update(&mut printer, &session, out)?;
            }
            result = &mut interrupt, if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    debug!("Ctrl-C handler unavailable: {}", e);
                    continue;
                }
                if cancellation.cancel() {
                    info!("Interrupted, cancelling poller");
                }
            }
            outcome = &mut wait => break outcome,
        }
    };

    // Final snapshot may not have been seen yet
    let session = updates.borrow_and_update().clone();
    print_update(&mut printer, &session, out)?;

    while let Ok(message) = message_rx.try_recv() {
        writeln!(out, "{message}")?;
    }
    if matches!(outcome, PollOutcome::Cancelled) {
        writeln!(out, "Stopped tracking.")?;
    }
    Ok(outcome)
}

fn print_update<W: Write>(
    printer: &mut StatusPrinter,
    session: &PollSession,
    out: &mut W,
) -> std::io::Result<()> {
    match printer.update(session) {
        Some(line) => writeln!(out, "[{}] {}", Local::now().format("%H:%M:%S"), line),
        None => Ok(()),
    }
}
