//! Port contracts for the messaging channel.

pub mod blob;
pub mod repository;

pub use blob::{BlobError, BlobResult, BlobStore};
pub use repository::{MessageRepository, MessageRepositoryResult};
