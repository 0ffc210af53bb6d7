//! Application services for the messaging channel.

mod channel;
mod error;
mod requests;

pub use channel::MessagingService;
pub use error::{MessagingError, MessagingResult};
pub use requests::{AttachmentUpload, PostMessageRequest};
