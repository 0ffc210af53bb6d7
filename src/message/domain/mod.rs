//! Domain types for the messaging channel.
//!
//! Messages are append-only: once posted only their read flag changes.

mod attachment;
mod ids;
mod message;

pub use attachment::{AttachmentRef, MessageLimits};
pub use ids::MessageId;
pub use message::{Message, MessageDraft, ParseSenderRoleError, SenderRole};
