//! Bounded calls to remote collaborators.
//!
//! Every call the engine makes to the escrow custodian, the notification sink,
//! or the blob store goes through [`call_with_timeout`], so a slow remote can
//! never leave an operation hanging. Expiry and remote failures both surface
//! as [`ExternalServiceError`], which callers treat as retryable.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Remote collaborators the engine talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalService {
    /// Value-custody service holding task budgets.
    EscrowCustodian,
    /// Fire-and-forget notification delivery.
    NotificationSink,
    /// Attachment byte storage.
    BlobStore,
}

impl ExternalService {
    /// Returns a stable name for logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EscrowCustodian => "escrow custodian",
            Self::NotificationSink => "notification sink",
            Self::BlobStore => "blob store",
        }
    }
}

impl fmt::Display for ExternalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a call to a remote collaborator.
#[derive(Debug, Clone, Error)]
pub enum ExternalServiceError {
    /// The call did not finish within its deadline.
    #[error("{service} call timed out after {timeout_ms} ms")]
    Timeout {
        /// Service that was called.
        service: ExternalService,
        /// Deadline that expired.
        timeout_ms: u64,
    },

    /// The remote reported a failure.
    #[error("{service} call failed: {source}")]
    Failed {
        /// Service that was called.
        service: ExternalService,
        /// Underlying failure.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl ExternalServiceError {
    /// Returns the service that failed.
    #[must_use]
    pub const fn service(&self) -> ExternalService {
        match self {
            Self::Timeout { service, .. } | Self::Failed { service, .. } => *service,
        }
    }

    /// Returns `true` when the call expired rather than failed.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Awaits `call` for at most `timeout`.
///
/// # Errors
///
/// Returns [`ExternalServiceError::Timeout`] when the deadline expires and
/// [`ExternalServiceError::Failed`] when the call itself returns an error.
pub async fn call_with_timeout<T, E>(
    service: ExternalService,
    timeout: Duration,
    call: impl Future<Output = Result<T, E>>,
) -> Result<T, ExternalServiceError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ExternalServiceError::Failed {
            service,
            source: Arc::new(err),
        }),
        Err(_elapsed) => Err(ExternalServiceError::Timeout {
            service,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
