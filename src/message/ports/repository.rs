//! Repository port for the append-only message log.

use crate::message::{
    domain::{Message, SenderRole},
    error::MessageRepositoryError,
};
use crate::task::domain::TaskId;
use async_trait::async_trait;

/// Result type for message repository operations.
pub type MessageRepositoryResult<T> = Result<T, MessageRepositoryError>;

/// Port for message persistence.
///
/// Implementations must ensure:
/// - Message IDs are unique across the system
/// - Messages are never edited or deleted; only the read flag changes
/// - Concurrent appends to one task are all retained
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Appends a message to its task's log.
    ///
    /// # Errors
    ///
    /// Returns [`MessageRepositoryError::DuplicateMessage`] when the
    /// identifier is already stored.
    async fn append(&self, message: &Message) -> MessageRepositoryResult<()>;

    /// Returns the task's messages ordered by creation time.
    ///
    /// Messages with equal timestamps keep their append order.
    async fn list_by_task(&self, task_id: TaskId) -> MessageRepositoryResult<Vec<Message>>;

    /// Marks every unread message sent in `sender_role` as read.
    ///
    /// Returns the number of messages changed.
    async fn mark_read(
        &self,
        task_id: TaskId,
        sender_role: SenderRole,
    ) -> MessageRepositoryResult<usize>;
}
