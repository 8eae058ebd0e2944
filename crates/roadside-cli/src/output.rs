//! Console rendering for tracked requests

use roadside_core::{GeoPoint, PollSession, RequestId, RequestState, RequestStatus, TrackingSummary};

/// Turns session snapshots into status lines, skipping repeats
#[derive(Debug, Default)]
pub struct StatusPrinter {
    seen_fetches: u64,
    last_state: Option<RequestState>,
}

impl StatusPrinter {
    /// Line to print for this snapshot, if anything changed since the last one
    pub fn update(&mut self, session: &PollSession) -> Option<String> {
        if session.fetch_count == self.seen_fetches {
            return None;
        }
        self.seen_fetches = session.fetch_count;

        if let Some(err) = &session.last_error {
            return Some(format!(
                "Could not refresh status (attempt {}): {}",
                session.fetch_count, err
            ));
        }

        let status = session.last_known_status.as_ref()?;
        if self.last_state.as_ref() == Some(&status.state) {
            return None;
        }
        self.last_state = Some(status.state.clone());
        Some(format!("{:<12} {}", status.state.as_str(), status.state.label()))
    }
}

pub fn accepted_message(id: &RequestId, status: &RequestStatus, from: Option<GeoPoint>) -> String {
    let mut lines = vec![format!("Request {id} accepted, help is coming.")];

    if let Some(garage) = &status.assigned_to {
        lines.push(format!("  Assigned to: {garage}"));
    }

    let location = status
        .coordinates()
        .and_then(|(lat, lon)| GeoPoint::new(lat, lon).ok());
    match location {
        Some(location) => {
            lines.push(format!("  Location:    {location}"));
            if let Some(from) = from {
                lines.push(format!(
                    "  Distance:    {}",
                    TrackingSummary::between(from, location)
                ));
            }
        }
        None => lines.push("  Location:    not shared yet".to_string()),
    }

    lines.join("\n")
}

/// One row per request: id, state, type and age information
pub fn breakdown_table(list: &[RequestStatus]) -> String {
    if list.is_empty() {
        return "No breakdown requests.".to_string();
    }

    let width = list
        .iter()
        .map(|b| b.id.as_str().len())
        .max()
        .unwrap_or(0)
        .max(2);
    let mut lines = vec![format!("{:<width$}  {:<12}  {:<12}  CREATED", "ID", "STATUS", "TYPE")];
    for b in list {
        lines.push(format!(
            "{:<width$}  {:<12}  {:<12}  {}",
            b.id.as_str(),
            b.state.as_str(),
            b.kind.as_deref().unwrap_or("-"),
            b.created_at.as_deref().unwrap_or("-"),
        ));
    }
    lines.join("\n")
}

pub fn refused_message(id: &RequestId) -> String {
    format!("Request {id} was refused or cancelled. You can submit a new request.")
}
