//! Messaging channel between a task's requester and its selected worker.
//!
//! Each task has an append-only message log. Attachment bytes are stored by
//! an external blob store and messages carry only references to them.
//!
//! # Architecture
//!
//! - **Domain**: [`domain::Message`], [`domain::AttachmentRef`], [`domain::SenderRole`]
//! - **Ports**: [`ports::MessageRepository`], [`ports::BlobStore`]
//! - **Adapters**: [`adapters::memory::InMemoryMessageRepository`], [`adapters::memory::InMemoryBlobStore`]
//! - **Services**: [`services::MessagingService`]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
