//! Breakdown request status model
//!
//! The status payload returned by the breakdowns API and the rules that decide
//! when tracking a request is over.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque identifier of a breakdown (SOS) request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle tag of a breakdown request
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestState {
    /// Waiting for a garage to answer
    #[default]
    Pending,
    Accepted,
    Refused,
    /// Help is on the way
    InProgress,
    Completed,
    Cancelled,
    /// A tag this client does not know, kept verbatim for display
    Unrecognized(String),
}

impl RequestState {
    /// Known tags, in lifecycle order
    pub const KNOWN: [RequestState; 6] = [
        RequestState::Pending,
        RequestState::Accepted,
        RequestState::Refused,
        RequestState::InProgress,
        RequestState::Completed,
        RequestState::Cancelled,
    ];

    /// Parse a wire tag. Matching is case-insensitive; anything else is kept as-is.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "ACCEPTED" => Self::Accepted,
            "REFUSED" => Self::Refused,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    /// Parse a tag that must be one of the known states
    pub fn parse_known(raw: &str) -> Option<Self> {
        match Self::parse(raw) {
            Self::Unrecognized(_) => None,
            state => Some(state),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Refused => "REFUSED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Short human-readable label for status lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Waiting for a garage",
            Self::Accepted => "Accepted",
            Self::Refused => "Refused",
            Self::InProgress => "Help on the way",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Unrecognized(_) => "Unknown status",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RequestState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RequestState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A missing or null `status` means the backend has not moved the request yet
fn state_or_pending<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RequestState, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| RequestState::parse(&s)).unwrap_or_default())
}

/// Status of a breakdown request as returned by `GET /breakdowns/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestStatus {
    #[serde(alias = "_id")]
    pub id: RequestId,
    #[serde(rename = "status", default, deserialize_with = "state_or_pending")]
    pub state: RequestState,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Breakdown type (flat tire, battery, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Garage or agent handling the request
    #[serde(
        default,
        alias = "assignedTo",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<String>,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl RequestStatus {
    pub fn new(id: impl Into<RequestId>, state: RequestState) -> Self {
        Self {
            id: id.into(),
            state,
            latitude: None,
            longitude: None,
            kind: None,
            description: None,
            assigned_to: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Both coordinates, or None if either is missing
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// What a fetched state means for the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Accepted,
    RefusedOrCancelled,
    /// Keep polling
    Continue,
}

/// The states that end tracking.
///
/// Screens in the field disagree on this vocabulary, so it is configurable.
/// The default is the SOS waiting flow: `ACCEPTED` accepts, `REFUSED` and
/// `CANCELLED` refuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalStates {
    accepted: BTreeSet<RequestState>,
    refused: BTreeSet<RequestState>,
}

impl Default for TerminalStates {
    fn default() -> Self {
        Self::new(
            [RequestState::Accepted],
            [RequestState::Refused, RequestState::Cancelled],
        )
    }
}

impl TerminalStates {
    pub fn new(
        accepted: impl IntoIterator<Item = RequestState>,
        refused: impl IntoIterator<Item = RequestState>,
    ) -> Self {
        Self {
            accepted: accepted.into_iter().collect(),
            refused: refused.into_iter().collect(),
        }
    }

    pub fn classify(&self, state: &RequestState) -> Classification {
        if !state.is_recognized() {
            return Classification::Continue;
        }
        if self.accepted.contains(state) {
            Classification::Accepted
        } else if self.refused.contains(state) {
            Classification::RefusedOrCancelled
        } else {
            Classification::Continue
        }
    }

    /// First state listed as both accepting and refusing, if any
    pub fn overlap(&self) -> Option<&RequestState> {
        self.accepted.intersection(&self.refused).next()
    }
}
