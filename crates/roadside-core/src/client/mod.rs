//! Breakdowns API client
//!
//! Thin reqwest wrapper over the SOS endpoints:
//! - `GET  /breakdowns/{id}` - current status
//! - `GET  /breakdowns?status=` - list, optionally filtered by state
//! - `POST /breakdowns` - submit a new request
//! - `PUT  /breakdowns/{id}/cancel` - client-side cancellation
//! - `PUT  /breakdowns/{id}/accept`, `/refuse`, `/complete` - garage side

mod types;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::poller::StatusSource;
use crate::status::{RequestId, RequestState, RequestStatus};

pub use types::CreateBreakdownRequest;
use types::{BreakdownEnvelope, BreakdownListEnvelope, RefuseBody};

#[derive(Debug, Clone)]
pub struct BreakdownsClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl BreakdownsClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("roadside/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Self::with_http_client(&config.base_url, config.token.clone(), http)
    }

    /// Use a preconfigured reqwest client (proxies, TLS roots, ...)
    pub fn with_http_client(
        base_url: &str,
        token: Option<String>,
        http: reqwest::Client,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        debug!("BreakdownsClient: base URL {}", base_url);
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the current status of a request
    pub async fn get_breakdown(&self, id: &RequestId) -> Result<RequestStatus, FetchError> {
        let url = self.endpoint(&["breakdowns", id.as_str()])?;
        let response = self.send(self.request(Method::GET, url), id).await?;
        read_breakdown(response).await
    }

    /// Submit a new SOS request
    pub async fn create_breakdown(
        &self,
        request: &CreateBreakdownRequest,
    ) -> Result<RequestStatus, FetchError> {
        let url = self.endpoint(&["breakdowns"])?;
        debug!(kind = %request.kind, "BreakdownsClient: creating breakdown");
        let response = self
            .request(Method::POST, url)
            .json(request)
            .send()
            .await?;
        read_breakdown(response).await
    }

    /// List requests, optionally only those in `state`
    pub async fn list_breakdowns(
        &self,
        state: Option<&RequestState>,
    ) -> Result<Vec<RequestStatus>, FetchError> {
        let mut url = self.endpoint(&["breakdowns"])?;
        if let Some(state) = state {
            url.query_pairs_mut().append_pair("status", state.as_str());
        }
        let response = self.request(Method::GET, url).send().await?;
        let body = read_body(response).await?;

        serde_json::from_str::<BreakdownListEnvelope>(&body)
            .ok()
            .and_then(BreakdownListEnvelope::into_statuses)
            .ok_or_else(|| FetchError::Decode("expected a list of breakdowns".to_string()))
    }

    /// Cancel a request on behalf of its owner
    pub async fn cancel_breakdown(&self, id: &RequestId) -> Result<RequestStatus, FetchError> {
        self.transition(id, "cancel").await
    }

    /// Garage takes the request
    pub async fn accept_breakdown(&self, id: &RequestId) -> Result<RequestStatus, FetchError> {
        self.transition(id, "accept").await
    }

    /// Garage declines the request. The backend answers with a message, not the breakdown.
    pub async fn refuse_breakdown(
        &self,
        id: &RequestId,
        reason: Option<&str>,
    ) -> Result<(), FetchError> {
        let url = self.endpoint(&["breakdowns", id.as_str(), "refuse"])?;
        let mut request = self.request(Method::PUT, url);
        if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
            request = request.json(&RefuseBody { reason });
        }
        let response = self.send(request, id).await?;
        read_body(response).await.map(|_| ())
    }

    /// Garage marks the intervention as done
    pub async fn complete_breakdown(&self, id: &RequestId) -> Result<RequestStatus, FetchError> {
        self.transition(id, "complete").await
    }

    /// `PUT /breakdowns/{id}/{action}` returning the updated breakdown
    async fn transition(&self, id: &RequestId, action: &str) -> Result<RequestStatus, FetchError> {
        let url = self.endpoint(&["breakdowns", id.as_str(), action])?;
        debug!(request_id = %id, action, "BreakdownsClient: updating breakdown");
        let response = self.send(self.request(Method::PUT, url), id).await?;
        read_breakdown(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        let request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request about one breakdown, mapping 404 to `NotFound`
    async fn send(&self, request: RequestBuilder, id: &RequestId) -> Result<Response, FetchError> {
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(id.to_string()));
        }
        Ok(response)
    }
}

#[async_trait]
impl StatusSource for BreakdownsClient {
    async fn fetch_status(&self, request_id: &RequestId) -> Result<RequestStatus, FetchError> {
        self.get_breakdown(request_id).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid API base URL '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("API base URL must be http or https, got '{}'", url.scheme());
    }
    if url.cannot_be_a_base() {
        bail!("API base URL '{raw}' cannot have paths appended");
    }
    Ok(url)
}

async fn read_body(response: Response) -> Result<String, FetchError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let err = http_error(status, &body);
        warn!("Breakdowns API error: {}", err);
        return Err(err);
    }
    Ok(body)
}

async fn read_breakdown(response: Response) -> Result<RequestStatus, FetchError> {
    let body = read_body(response).await?;
    decode_breakdown(&body)
}

fn decode_breakdown(body: &str) -> Result<RequestStatus, FetchError> {
    serde_json::from_str::<BreakdownEnvelope>(body)
        .map(BreakdownEnvelope::into_status)
        .map_err(|e| FetchError::Decode(e.to_string()))
}

fn http_error(status: StatusCode, body: &str) -> FetchError {
    let message = extract_error_message(body)
        .or_else(|| {
            let body = body.trim();
            (!body.is_empty()).then(|| body.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    FetchError::Http {
        status: status.as_u16(),
        message,
    }
}

/// Pull a readable message out of a JSON error body
///
/// NestJS validation errors put an array of strings in `message`; hand-written
/// routes use a plain `error` string.
fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    for key in ["message", "error"] {
        match json.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if !parts.is_empty() {
                    return Some(parts.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::{PollConfig, PollOutcome, StatusPoller};
    use crate::status::RequestState;
    use std::io::Read;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Debug)]
    struct Recorded {
        method: String,
        url: String,
        auth: Option<String>,
        body: String,
    }

    /// Local breakdowns API answering with canned responses, in order
    struct MockApi {
        base_url: String,
        requests: mpsc::Receiver<Recorded>,
    }

    impl MockApi {
        fn serve(responses: Vec<(u16, &'static str)>) -> Self {
            let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
            let port = server.server_addr().to_ip().unwrap().port();
            let (tx, rx) = mpsc::channel();

            std::thread::spawn(move || {
                for (status, body) in responses {
                    let Ok(mut request) = server.recv() else {
                        return;
                    };
                    let mut req_body = String::new();
                    let _ = request.as_reader().read_to_string(&mut req_body);
                    let auth = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.to_string());
                    let _ = tx.send(Recorded {
                        method: request.method().to_string(),
                        url: request.url().to_string(),
                        auth,
                        body: req_body,
                    });

                    let response = tiny_http::Response::from_string(body)
                        .with_status_code(status)
                        .with_header(
                            tiny_http::Header::from_bytes(
                                &b"Content-Type"[..],
                                &b"application/json"[..],
                            )
                            .unwrap(),
                        );
                    let _ = request.respond(response);
                }
            });

            Self {
                base_url: format!("http://127.0.0.1:{port}"),
                requests: rx,
            }
        }

        fn client(&self, token: Option<&str>) -> BreakdownsClient {
            let http = reqwest::Client::builder().no_proxy().build().unwrap();
            BreakdownsClient::with_http_client(&self.base_url, token.map(String::from), http)
                .unwrap()
        }

        fn next_request(&self) -> Recorded {
            self.requests
                .recv_timeout(Duration::from_secs(5))
                .unwrap()
        }
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let http = reqwest::Client::new();
        let client =
            BreakdownsClient::with_http_client("https://sos.example.com/api/", None, http.clone())
                .unwrap();
        assert_eq!(client.base_url().path(), "/api/");
        let url = client.endpoint(&["breakdowns", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://sos.example.com/api/breakdowns/a%2Fb");

        let client =
            BreakdownsClient::with_http_client("http://localhost:3000", None, http).unwrap();
        let url = client.endpoint(&["breakdowns", "42", "cancel"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/breakdowns/42/cancel");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let http = reqwest::Client::new();
        assert!(BreakdownsClient::with_http_client("localhost:3000", None, http.clone()).is_err());
        assert!(BreakdownsClient::with_http_client("ftp://host", None, http.clone()).is_err());
        assert!(BreakdownsClient::with_http_client("not a url", None, http).is_err());
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"statusCode":400,"message":["type must be a string","latitude is required"]}"#),
            Some("type must be a string; latitude is required".to_string())
        );
        assert_eq!(
            extract_error_message(r#"{"error":"Cannot cancel a completed breakdown"}"#),
            Some("Cannot cancel a completed breakdown".to_string())
        );
        assert_eq!(
            extract_error_message(r#"{"message":"","error":"Conflict"}"#),
            Some("Conflict".to_string())
        );
        assert_eq!(extract_error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_http_error_fallbacks() {
        let err = http_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.to_string(), "HTTP 502: upstream down");

        let err = http_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    }

    #[test]
    fn test_decode_wrapped_and_bare() {
        let bare = decode_breakdown(r#"{"_id":"b1","status":"PENDING"}"#).unwrap();
        assert_eq!(bare.id.as_str(), "b1");

        let wrapped = decode_breakdown(
            r#"{"message":"Breakdown cancelled successfully","breakdown":{"_id":"b1","status":"CANCELLED"}}"#,
        )
        .unwrap();
        assert_eq!(wrapped.state, RequestState::Cancelled);

        let data = decode_breakdown(r#"{"data":{"id":"b1","status":"in_progress"}}"#).unwrap();
        assert_eq!(data.state, RequestState::InProgress);

        assert!(matches!(
            decode_breakdown(r#"{"ok":true}"#),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_create_request_body() {
        let request = CreateBreakdownRequest::new("BATTERY", 36.8, 10.18)
            .with_description(Some("Won't start".into()));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "BATTERY",
                "description": "Won't start",
                "latitude": 36.8,
                "longitude": 10.18
            })
        );
    }

    #[tokio::test]
    async fn test_get_breakdown_sends_token() {
        let api = MockApi::serve(vec![(
            200,
            r#"{"_id":"b1","status":"accepted","latitude":36.8,"longitude":10.18}"#,
        )]);
        let client = api.client(Some("jwt-123"));

        let status = client.get_breakdown(&RequestId::new("b1")).await.unwrap();
        assert_eq!(status.state, RequestState::Accepted);
        assert_eq!(status.coordinates(), Some((36.8, 10.18)));

        let recorded = api.next_request();
        assert_eq!(recorded.method, "GET");
        assert_eq!(recorded.url, "/breakdowns/b1");
        assert_eq!(recorded.auth.as_deref(), Some("Bearer jwt-123"));
    }

    #[tokio::test]
    async fn test_get_breakdown_errors() {
        let api = MockApi::serve(vec![
            (404, r#"{"message":"Breakdown not found"}"#),
            (500, r#"{"error":"Failed to load breakdown"}"#),
            (200, "not json"),
        ]);
        let client = api.client(None);
        let id = RequestId::new("b1");

        assert_eq!(
            client.get_breakdown(&id).await,
            Err(FetchError::NotFound("b1".into()))
        );
        assert_eq!(
            client.get_breakdown(&id).await,
            Err(FetchError::Http {
                status: 500,
                message: "Failed to load breakdown".into()
            })
        );
        assert!(matches!(
            client.get_breakdown(&id).await,
            Err(FetchError::Decode(_))
        ));
        assert!(api.next_request().auth.is_none());
    }

    #[tokio::test]
    async fn test_create_and_cancel() {
        let api = MockApi::serve(vec![
            (201, r#"{"_id":"new-1","status":"PENDING","type":"FLAT_TIRE"}"#),
            (
                200,
                r#"{"message":"Breakdown cancelled successfully","breakdown":{"_id":"new-1","status":"CANCELLED"}}"#,
            ),
        ]);
        let client = api.client(Some("jwt"));

        let created = client
            .create_breakdown(&CreateBreakdownRequest::new("FLAT_TIRE", 36.0, 10.0))
            .await
            .unwrap();
        assert_eq!(created.id.as_str(), "new-1");
        let post = api.next_request();
        assert_eq!((post.method.as_str(), post.url.as_str()), ("POST", "/breakdowns"));
        assert!(!post.body.contains("userId"));
        assert!(post.body.contains("\"type\":\"FLAT_TIRE\""));

        let cancelled = client.cancel_breakdown(&created.id).await.unwrap();
        assert_eq!(cancelled.state, RequestState::Cancelled);
        let put = api.next_request();
        assert_eq!((put.method.as_str(), put.url.as_str()), ("PUT", "/breakdowns/new-1/cancel"));
    }

    #[tokio::test]
    async fn test_list_breakdowns_envelopes() {
        let api = MockApi::serve(vec![
            (200, r#"{"data":[{"_id":"a","status":"PENDING"},{"_id":"b","status":"PENDING"}]}"#),
            (200, r#"{"breakdowns":[{"_id":"c","status":"ACCEPTED"}]}"#),
            (200, r#"[{"_id":"d","status":"COMPLETED"}]"#),
            (200, r#"{"success":true,"data":null}"#),
            (200, r#""nope""#),
        ]);
        let client = api.client(Some("jwt"));

        let pending = client
            .list_breakdowns(Some(&RequestState::Pending))
            .await
            .unwrap();
        let ids: Vec<&str> = pending.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(api.next_request().url, "/breakdowns?status=PENDING");

        let accepted = client.list_breakdowns(None).await.unwrap();
        assert_eq!(accepted[0].state, RequestState::Accepted);
        assert_eq!(api.next_request().url, "/breakdowns");

        assert_eq!(client.list_breakdowns(None).await.unwrap().len(), 1);
        assert!(client.list_breakdowns(None).await.unwrap().is_empty());
        assert!(matches!(
            client.list_breakdowns(None).await,
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_garage_transitions() {
        let api = MockApi::serve(vec![
            (200, r#"{"_id":"b1","status":"ACCEPTED","assignedTo":"garage-7"}"#),
            (200, r#"{"message":"Breakdown refused"}"#),
            (200, r#"{"message":"Breakdown refused"}"#),
            (200, r#"{"data":{"_id":"b1","status":"COMPLETED"}}"#),
            (409, r#"{"message":"Breakdown is not pending"}"#),
        ]);
        let client = api.client(Some("garage-jwt"));
        let id = RequestId::new("b1");

        let accepted = client.accept_breakdown(&id).await.unwrap();
        assert_eq!(accepted.assigned_to.as_deref(), Some("garage-7"));
        let put = api.next_request();
        assert_eq!((put.method.as_str(), put.url.as_str()), ("PUT", "/breakdowns/b1/accept"));

        client.refuse_breakdown(&id, Some(" too far ")).await.unwrap();
        let put = api.next_request();
        assert_eq!(put.url, "/breakdowns/b1/refuse");
        assert_eq!(put.body, r#"{"reason":"too far"}"#);

        client.refuse_breakdown(&id, Some("")).await.unwrap();
        assert!(api.next_request().body.is_empty());

        let completed = client.complete_breakdown(&id).await.unwrap();
        assert_eq!(completed.state, RequestState::Completed);
        assert_eq!(api.next_request().url, "/breakdowns/b1/complete");

        assert_eq!(
            client.accept_breakdown(&id).await,
            Err(FetchError::Http {
                status: 409,
                message: "Breakdown is not pending".into()
            })
        );
    }

    #[tokio::test]
    async fn test_poller_over_http() {
        let api = MockApi::serve(vec![
            (200, r#"{"_id":"b7","status":"PENDING"}"#),
            (502, "bad gateway"),
            (200, r#"{"_id":"b7","status":"ACCEPTED","latitude":1.0,"longitude":2.0}"#),
        ]);
        let poller = StatusPoller::new(PollConfig::default().with_interval(Duration::from_millis(10)));
        let (tx, rx) = tokio::sync::oneshot::channel();

        let handle = poller.start(
            "b7",
            api.client(None),
            move |status| {
                let _ = tx.send(status);
            },
            || panic!("refused callback must not fire"),
        );
        let mut updates = handle.subscribe();
        let outcome = handle.wait().await;

        let accepted = rx.await.unwrap();
        assert_eq!(outcome, PollOutcome::Accepted(accepted.clone()));
        assert_eq!(accepted.coordinates(), Some((1.0, 2.0)));

        let last = updates.borrow_and_update().clone();
        assert_eq!(last.fetch_count, 3);
        assert!(last.last_error.is_none());
    }
}
