//! Waiting on the platform's asynchronous requests.
//!
//! Most mutating calls answer immediately with a `status` link; the work
//! itself is queued. These helpers poll those links one at a time until
//! each request reaches a terminal state.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::clc::{
    client::ClcClient,
    error::ClcError,
    models::{Link, OperationHandle, OperationStatus, RequestStatus, RequestStatusResponse, Server},
};

/// Outcome of waiting on a batch of status links
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl RequestSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ClcClient {
    /// Current state of a single queued request
    pub async fn request_status(&self, status_link: &Link) -> Result<RequestStatus, ClcError> {
        let response: RequestStatusResponse = self.get(&status_link.href).await?;
        Ok(response.status)
    }

    /// Poll one status link until it succeeds or fails
    pub async fn wait_for_request(&self, status_link: &Link) -> Result<RequestStatus, ClcError> {
        let deadline = Instant::now() + self.config().wait_timeout;
        self.wait_for_request_until(status_link, deadline).await
    }

    async fn wait_for_request_until(
        &self,
        status_link: &Link,
        deadline: Instant,
    ) -> Result<RequestStatus, ClcError> {
        let id = status_link
            .id
            .clone()
            .unwrap_or_else(|| status_link.href.clone());

        loop {
            let status = self.request_status(status_link).await?;
            debug!(request = %id, ?status, "request status");
            if status.is_terminal() {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(ClcError::WaitTimeout {
                    what: format!("request {id}"),
                    seconds: self.config().wait_timeout.as_secs(),
                });
            }
            sleep(self.config().poll_interval).await;
        }
    }

    /// Wait on every status link in turn. The wait timeout bounds the
    /// whole batch, not each link.
    pub async fn wait_for_requests(&self, links: &[Link]) -> Result<RequestSummary, ClcError> {
        let deadline = Instant::now() + self.config().wait_timeout;
        let mut summary = RequestSummary::default();
        for link in links {
            let id = link.id.clone().unwrap_or_else(|| link.href.clone());
            match self.wait_for_request_until(link, deadline).await? {
                RequestStatus::Succeeded => summary.succeeded.push(id),
                _ => {
                    warn!(request = %id, "request failed");
                    summary.failed.push(id);
                }
            }
        }
        info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            "requests complete"
        );
        Ok(summary)
    }

    /// Wait on status links and turn any failure into an error
    pub async fn complete_requests(&self, links: &[Link]) -> Result<(), ClcError> {
        let summary = self.wait_for_requests(links).await?;
        if summary.all_succeeded() {
            return Ok(());
        }
        let id = summary.failed.into_iter().next().unwrap_or_default();
        Err(ClcError::RequestFailed { id })
    }

    /// Poll an experimental-API operation until it finishes
    pub async fn wait_for_operation(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationStatus, ClcError> {
        let deadline = Instant::now() + self.config().wait_timeout;
        loop {
            let status: OperationStatus = self.get(&handle.uri).await?;
            debug!(operation = %handle.operation_id, status = ?status.status, "operation status");
            match status.status {
                RequestStatus::Succeeded => return Ok(status),
                RequestStatus::Failed => {
                    return Err(ClcError::RequestFailed {
                        id: handle.operation_id.clone(),
                    })
                }
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(ClcError::WaitTimeout {
                    what: format!("operation {}", handle.operation_id),
                    seconds: self.config().wait_timeout.as_secs(),
                });
            }
            sleep(self.config().poll_interval).await;
        }
    }

    /// Fetch a freshly created server by UUID.
    ///
    /// The server record appears some time after the create request is
    /// accepted, so 404s are retried with a doubling backoff.
    pub async fn find_server_by_uuid_with_retry(&self, uuid: &str) -> Result<Server, ClcError> {
        let attempts = self.config().lookup_attempts.max(1);
        let mut backoff = self.config().lookup_backoff;

        for attempt in 1..=attempts {
            match self.get_server_by_uuid(uuid).await {
                Ok(server) => return Ok(server),
                Err(e) if e.is_not_found() && attempt < attempts => {
                    warn!(uuid = %uuid, attempt, ?backoff, "server not yet visible, retrying");
                    sleep(backoff).await;
                    backoff = next_backoff(backoff);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClcError::NotFound(format!("server with uuid {uuid}")))
    }
}

fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2)
}
