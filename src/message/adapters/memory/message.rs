//! In-memory implementation of the `MessageRepository` port.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::message::{
    domain::{Message, MessageId, SenderRole},
    error::MessageRepositoryError,
    ports::repository::{MessageRepository, MessageRepositoryResult},
};
use crate::task::domain::TaskId;

#[derive(Debug, Default)]
struct MessageLog {
    by_task: HashMap<TaskId, Vec<Message>>,
    ids: HashSet<MessageId>,
}

/// In-memory implementation of [`MessageRepository`].
///
/// Each task's log is kept in append order; listing sorts it stably by
/// creation time.
///
/// # Example
///
/// ```
/// use gigflow::message::adapters::memory::InMemoryMessageRepository;
///
/// let repo = InMemoryMessageRepository::new();
/// assert_eq!(repo.len(), 0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryMessageRepository {
    log: Arc<RwLock<MessageLog>>,
}

impl InMemoryMessageRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored messages.
    ///
    /// Returns `0` if the internal lock is poisoned. For error-propagating
    /// access, use the repository trait methods instead.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.read().map(|guard| guard.ids.len()).unwrap_or(0)
    }

    /// Returns `true` if no messages are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> MessageRepositoryResult<RwLockReadGuard<'_, MessageLog>> {
        self.log.read().map_err(|err| {
            MessageRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> MessageRepositoryResult<RwLockWriteGuard<'_, MessageLog>> {
        self.log.write().map_err(|err| {
            MessageRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: &Message) -> MessageRepositoryResult<()> {
        let mut log = self.write()?;
        if !log.ids.insert(message.id()) {
            return Err(MessageRepositoryError::DuplicateMessage(message.id()));
        }
        log.by_task
            .entry(message.task_id())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_by_task(&self, task_id: TaskId) -> MessageRepositoryResult<Vec<Message>> {
        let log = self.read()?;
        let mut messages = log.by_task.get(&task_id).cloned().unwrap_or_default();
        messages.sort_by_key(Message::created_at);
        Ok(messages)
    }

    async fn mark_read(
        &self,
        task_id: TaskId,
        sender_role: SenderRole,
    ) -> MessageRepositoryResult<usize> {
        let mut log = self.write()?;
        let mut changed = 0_usize;
        if let Some(messages) = log.by_task.get_mut(&task_id) {
            for message in messages
                .iter_mut()
                .filter(|message| message.sender_role() == sender_role)
            {
                if message.mark_read() {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}
