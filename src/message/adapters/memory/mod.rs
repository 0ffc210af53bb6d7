//! In-memory adapters for the message log and blob store.

mod blob;
mod message;

pub use blob::InMemoryBlobStore;
pub use message::InMemoryMessageRepository;
