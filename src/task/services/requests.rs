//! Request payloads and result values for task lifecycle operations.

use crate::task::domain::{Application, ApplicationId, Task, TaskId};
use chrono::{DateTime, Utc};

/// Request payload for posting a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub(super) requester_id: String,
    pub(super) requester_name: Option<String>,
    pub(super) title: String,
    pub(super) description: String,
    pub(super) category: Option<String>,
    pub(super) tags: Vec<String>,
    pub(super) required_skills: Vec<String>,
    pub(super) budget_minor_units: u64,
    pub(super) currency: String,
    pub(super) deadline: DateTime<Utc>,
}

impl CreateTaskRequest {
    /// Creates a request with the required posting fields.
    #[must_use]
    pub fn new(
        requester_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        budget_minor_units: u64,
        currency: impl Into<String>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            requester_name: None,
            title: title.into(),
            description: description.into(),
            category: None,
            tags: Vec::new(),
            required_skills: Vec::new(),
            budget_minor_units,
            currency: currency.into(),
            deadline,
        }
    }

    /// Sets the requester display name; defaults to the requester id.
    #[must_use]
    pub fn with_requester_name(mut self, name: impl Into<String>) -> Self {
        self.requester_name = Some(name.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Sets the required skills.
    #[must_use]
    pub fn with_required_skills(mut self, skills: impl IntoIterator<Item = String>) -> Self {
        self.required_skills = skills.into_iter().collect();
        self
    }
}

/// Request payload for a worker applying to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    pub(super) task_id: TaskId,
    pub(super) worker_id: String,
    pub(super) worker_name: Option<String>,
    pub(super) proposal: Option<String>,
    pub(super) payout_address: Option<String>,
}

impl ApplyRequest {
    /// Creates an application request.
    #[must_use]
    pub fn new(task_id: TaskId, worker_id: impl Into<String>) -> Self {
        Self {
            task_id,
            worker_id: worker_id.into(),
            worker_name: None,
            proposal: None,
            payout_address: None,
        }
    }

    /// Sets the worker display name; defaults to the worker id.
    #[must_use]
    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = Some(name.into());
        self
    }

    /// Sets the proposal text.
    #[must_use]
    pub fn with_proposal(mut self, proposal: impl Into<String>) -> Self {
        self.proposal = Some(proposal.into());
        self
    }

    /// Sets the payout address up front.
    #[must_use]
    pub fn with_payout_address(mut self, address: impl Into<String>) -> Self {
        self.payout_address = Some(address.into());
        self
    }
}

/// Outcome of selecting an applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The accepted task.
    pub task: Task,
    /// The approved application.
    pub application: Application,
    /// Sibling applications rejected by this call.
    pub rejected: Vec<ApplicationId>,
    /// Sibling applications still pending after a partial fan-out failure.
    ///
    /// Re-issuing the same selection finishes the fan-out.
    pub unresolved: usize,
}

/// Outcome of a commission reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Approved tasks examined.
    pub examined: usize,
    /// Commission records written by this pass.
    pub recorded: usize,
    /// Tasks whose record could not be written.
    pub failed: usize,
}
