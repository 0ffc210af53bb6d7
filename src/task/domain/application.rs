//! Worker applications (bids) on open tasks.

use super::{ApplicationId, ParseStatusError, PayoutAddress, TaskDomainError, TaskId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Awaiting the requester's decision.
    Pending,
    /// Chosen by the requester.
    Approved,
    /// Not chosen.
    Rejected,
}

impl ApplicationStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for ApplicationStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A worker's bid to perform a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    id: ApplicationId,
    task_id: TaskId,
    worker_id: UserId,
    worker_name: String,
    proposal: Option<String>,
    payout_address: Option<PayoutAddress>,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Application {
    /// Creates a pending application.
    #[must_use]
    pub fn submit(
        task_id: TaskId,
        worker_id: UserId,
        worker_name: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ApplicationId::new(),
            task_id,
            worker_id,
            worker_name: worker_name.into(),
            proposal: None,
            payout_address: None,
            status: ApplicationStatus::Pending,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Attaches a free-text proposal; blank text is ignored.
    #[must_use]
    pub fn with_proposal(mut self, proposal: impl Into<String>) -> Self {
        let text = proposal.into().trim().to_owned();
        self.proposal = (!text.is_empty()).then_some(text);
        self
    }

    /// Attaches a payout address at submission time.
    #[must_use]
    pub fn with_payout_address(mut self, address: PayoutAddress) -> Self {
        self.payout_address = Some(address);
        self
    }

    /// Returns the application identifier.
    #[must_use]
    pub const fn id(&self) -> ApplicationId {
        self.id
    }

    /// Returns the task the application targets.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the applying worker.
    #[must_use]
    pub const fn worker_id(&self) -> &UserId {
        &self.worker_id
    }

    /// Returns the worker display name.
    #[must_use]
    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Returns the proposal text, if any.
    #[must_use]
    pub fn proposal(&self) -> Option<&str> {
        self.proposal.as_deref()
    }

    /// Returns the payout address, if attached.
    #[must_use]
    pub const fn payout_address(&self) -> Option<&PayoutAddress> {
        self.payout_address.as_ref()
    }

    /// Returns the application status.
    #[must_use]
    pub const fn status(&self) -> ApplicationStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Attaches or replaces the payout address.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidApplicationTransition`] once the
    /// application was rejected.
    pub fn attach_payout_address(
        &mut self,
        address: PayoutAddress,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if self.status == ApplicationStatus::Rejected {
            return Err(TaskDomainError::InvalidApplicationTransition {
                application_id: self.id,
                from: self.status,
                to: self.status,
            });
        }
        self.payout_address = Some(address);
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Marks a pending application as approved.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidApplicationTransition`] unless the
    /// application is pending.
    pub fn approve(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.decide(ApplicationStatus::Approved, clock)
    }

    /// Marks a pending application as rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidApplicationTransition`] unless the
    /// application is pending.
    pub fn reject(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.decide(ApplicationStatus::Rejected, clock)
    }

    fn decide(
        &mut self,
        target: ApplicationStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if self.status != ApplicationStatus::Pending {
            return Err(TaskDomainError::InvalidApplicationTransition {
                application_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = clock.utc();
        Ok(())
    }
}
