//! Per-task message channel between requester and selected worker.

use super::{
    error::{MessagingError, MessagingResult},
    requests::{AttachmentUpload, PostMessageRequest},
};
use crate::config::{ConfigError, EngineConfig};
use crate::external::{ExternalService, call_with_timeout};
use crate::message::{
    domain::{AttachmentRef, Message, MessageDraft, MessageLimits, SenderRole},
    ports::{BlobStore, MessageRepository},
};
use crate::notification::{
    domain::{Notification, RecipientRole},
    outbox::Outbox,
    ports::NotificationSink,
};
use crate::task::{
    domain::{Task, TaskId, TaskStatus, UserId},
    ports::TaskRepository,
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Messaging service.
///
/// Attachment bytes go to the blob store before the message is appended, so
/// a stored message never points at a missing upload.
#[derive(Clone)]
pub struct MessagingService<T, M, B, N, C>
where
    T: TaskRepository,
    M: MessageRepository,
    B: BlobStore,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    tasks: Arc<T>,
    messages: Arc<M>,
    blobs: Arc<B>,
    notifier: Arc<N>,
    clock: Arc<C>,
    limits: MessageLimits,
    call_timeout: Duration,
}

impl<T, M, B, N, C> MessagingService<T, M, B, N, C>
where
    T: TaskRepository,
    M: MessageRepository,
    B: BlobStore,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    /// Creates a service with default limits.
    #[must_use]
    pub fn new(
        tasks: Arc<T>,
        messages: Arc<M>,
        blobs: Arc<B>,
        notifier: Arc<N>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            tasks,
            messages,
            blobs,
            notifier,
            clock,
            limits: MessageLimits::default(),
            call_timeout: EngineConfig::default().external_call_timeout(),
        }
    }

    /// Applies messaging limits and the external call timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration fails
    /// validation.
    pub fn with_config(mut self, config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.limits = config.messaging.limits();
        self.call_timeout = config.external_call_timeout();
        Ok(self)
    }

    /// Posts a message, uploading its attachments first.
    ///
    /// The counterpart is notified once the message is stored.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::TaskNotFound`] for an unknown task,
    /// [`MessagingError::InvalidState`] while the task is still open,
    /// [`MessagingError::Forbidden`] when the sender is not the party named by
    /// the role, [`MessagingError::Validation`] for an empty or oversized
    /// message, and [`MessagingError::ExternalService`] when an upload fails.
    pub async fn post_message(&self, request: PostMessageRequest) -> MessagingResult<Message> {
        let task = self.load_task(request.task_id).await?;
        ensure_channel_open(&task)?;
        ensure_party(&task, &request.sender_id, request.sender_role, "post a message")?;

        self.limits.check_body(request.body.trim())?;
        self.limits
            .check_attachment_count(request.attachments.len())?;
        for upload in &request.attachments {
            self.limits
                .check_attachment(&upload.file_name, &upload.content_type, upload.bytes.len())?;
        }

        let mut attachments = Vec::with_capacity(request.attachments.len());
        for upload in &request.attachments {
            attachments.push(self.upload(upload).await?);
        }

        let message = Message::post(
            MessageDraft {
                task_id: task.id(),
                sender_id: request.sender_id,
                sender_role: request.sender_role,
                body: request.body,
                attachments,
            },
            &self.limits,
            &*self.clock,
        )?;
        self.messages.append(&message).await?;
        info!(
            task_id = %task.id(),
            message_id = %message.id(),
            sender = %message.sender_id(),
            role = %message.sender_role(),
            attachments = message.attachments().len(),
            "message posted"
        );

        let mut outbox = Outbox::new();
        if let Some(notice) = new_message_notice(&task, &message) {
            outbox.push(notice);
        }
        outbox.dispatch(&*self.notifier, self.call_timeout).await;
        Ok(message)
    }

    /// Lists a task's messages ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::TaskNotFound`] for an unknown task.
    pub async fn list_messages(&self, task_id: TaskId) -> MessagingResult<Vec<Message>> {
        self.load_task(task_id).await?;
        Ok(self.messages.list_by_task(task_id).await?)
    }

    /// Marks every message from the reader's counterpart as read.
    ///
    /// Returns the number of messages changed.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::Forbidden`] unless the reader is the
    /// requester or the selected worker.
    pub async fn mark_messages_read(
        &self,
        task_id: TaskId,
        reader: &UserId,
    ) -> MessagingResult<usize> {
        let task = self.load_task(task_id).await?;
        let reader_role = if task.is_requester(reader) {
            SenderRole::Requester
        } else if task.is_selected_worker(reader) {
            SenderRole::Worker
        } else {
            return Err(MessagingError::Forbidden {
                user: reader.clone(),
                task_id,
                action: "read messages",
            });
        };
        let changed = self
            .messages
            .mark_read(task_id, reader_role.counterpart())
            .await?;
        debug!(task_id = %task_id, reader = %reader, changed, "messages marked read");
        Ok(changed)
    }

    async fn upload(&self, upload: &AttachmentUpload) -> MessagingResult<AttachmentRef> {
        let url = call_with_timeout(
            ExternalService::BlobStore,
            self.call_timeout,
            self.blobs
                .upload(&upload.file_name, &upload.content_type, &upload.bytes),
        )
        .await?;
        let size_bytes = u64::try_from(upload.bytes.len()).unwrap_or(u64::MAX);
        Ok(AttachmentRef::new(
            url,
            upload.file_name.as_str(),
            upload.content_type.as_str(),
            size_bytes,
        )?)
    }

    async fn load_task(&self, task_id: TaskId) -> MessagingResult<Task> {
        self.tasks
            .find_task(task_id)
            .await?
            .ok_or(MessagingError::TaskNotFound(task_id))
    }
}

fn ensure_channel_open(task: &Task) -> MessagingResult<()> {
    if task.status() == TaskStatus::Open {
        return Err(MessagingError::InvalidState {
            task_id: task.id(),
            status: task.status(),
        });
    }
    Ok(())
}

fn ensure_party(
    task: &Task,
    user: &UserId,
    role: SenderRole,
    action: &'static str,
) -> MessagingResult<()> {
    let is_party = match role {
        SenderRole::Requester => task.is_requester(user),
        SenderRole::Worker => task.is_selected_worker(user),
    };
    if is_party {
        return Ok(());
    }
    Err(MessagingError::Forbidden {
        user: user.clone(),
        task_id: task.id(),
        action,
    })
}

/// Addresses the party on the other side of the channel.
fn new_message_notice(task: &Task, message: &Message) -> Option<Notification> {
    let (recipient, role) = match message.sender_role() {
        SenderRole::Requester => (
            task.selected_worker()?.worker_id.clone(),
            RecipientRole::Worker,
        ),
        SenderRole::Worker => (task.requester_id().clone(), RecipientRole::Requester),
    };
    Some(Notification::about_task(
        task.id(),
        recipient,
        role,
        "New message",
        format!(
            "{} sent a message about \"{}\".",
            message.sender_id(),
            task.listing().title()
        ),
    ))
}
