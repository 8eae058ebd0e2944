//! Request and response bodies for the breakdowns API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::RequestStatus;

/// Body of `POST /breakdowns`
///
/// Never carries a user id: the backend takes the owner from the bearer token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBreakdownRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    /// Breakdown type (e.g. "BATTERY", "FLAT_TIRE")
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl CreateBreakdownRequest {
    pub fn new(kind: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            vehicle_id: None,
            kind: kind.into(),
            description: None,
            latitude,
            longitude,
        }
    }

    pub fn with_vehicle(mut self, vehicle_id: Option<String>) -> Self {
        self.vehicle_id = vehicle_id;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Single-breakdown responses come bare or wrapped depending on the endpoint
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BreakdownEnvelope {
    Wrapped { breakdown: RequestStatus },
    Data { data: RequestStatus },
    Bare(RequestStatus),
}

impl BreakdownEnvelope {
    pub(crate) fn into_status(self) -> RequestStatus {
        match self {
            BreakdownEnvelope::Wrapped { breakdown } => breakdown,
            BreakdownEnvelope::Data { data } => data,
            BreakdownEnvelope::Bare(status) => status,
        }
    }
}

/// Body of `PUT /breakdowns/{id}/refuse`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RefuseBody<'a> {
    pub reason: &'a str,
}

/// List responses: `{"data": [...]}`, `{"breakdowns": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BreakdownListEnvelope {
    Data { data: Vec<RequestStatus> },
    Breakdowns { breakdowns: Vec<RequestStatus> },
    Bare(Vec<RequestStatus>),
    /// `{"success": false}` and similar bodies without a list
    Other(Value),
}

impl BreakdownListEnvelope {
    pub(crate) fn into_statuses(self) -> Option<Vec<RequestStatus>> {
        match self {
            BreakdownListEnvelope::Data { data } => Some(data),
            BreakdownListEnvelope::Breakdowns { breakdowns } => Some(breakdowns),
            BreakdownListEnvelope::Bare(list) => Some(list),
            // No list at all (or a null one) means nothing matched
            BreakdownListEnvelope::Other(Value::Object(map))
                if ["data", "breakdowns"]
                    .iter()
                    .all(|key| map.get(*key).map_or(true, Value::is_null)) =>
            {
                Some(Vec::new())
            }
            BreakdownListEnvelope::Other(_) => None,
        }
    }
}
