//! Status sources
//!
//! The poller's only collaborator: something that can fetch the current status
//! of a request by id.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::error::FetchError;
use crate::status::{RequestId, RequestStatus};

/// Fetches the current status of a breakdown request
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, request_id: &RequestId) -> Result<RequestStatus, FetchError>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn fetch_status(&self, request_id: &RequestId) -> Result<RequestStatus, FetchError> {
        (**self).fetch_status(request_id).await
    }
}

/// Status source backed by an async closure
pub struct FnSource<F>(F);

/// Wrap an async closure as a [`StatusSource`]
pub fn status_source_fn<F, Fut>(f: F) -> FnSource<F>
where
    F: Fn(RequestId) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RequestStatus, FetchError>> + Send,
{
    FnSource(f)
}

#[async_trait]
impl<F, Fut> StatusSource for FnSource<F>
where
    F: Fn(RequestId) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RequestStatus, FetchError>> + Send,
{
    async fn fetch_status(&self, request_id: &RequestId) -> Result<RequestStatus, FetchError> {
        (self.0)(request_id.clone()).await
    }
}
