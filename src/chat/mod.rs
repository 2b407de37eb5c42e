// Chat module for tripchat
// Everything needed to page a trip conversation in from the server and keep it
// in order for the screen: loading, accumulating, scrolling and the draft box.

use thiserror::Error;

pub mod accumulator;
pub mod compose;
pub mod loader;
pub mod markup;
pub mod scroll;
pub mod session;

pub use accumulator::append_page;
pub use compose::Composer;
pub use loader::{ConversationLoader, HttpLoader, LoaderOptions};
pub use scroll::ViewScroller;
pub use session::{fetch_and_apply, ApplyOutcome, ChatSession, LoadState, LoadTicket};

/// Errors raised while loading a page of the conversation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Transport-level failure (DNS, connect, timeout, reset...)
    #[error("Request for page {page} failed: {reason}")]
    Fetch { page: u32, reason: String },

    /// Server answered with a non-success status
    #[error("Server returned HTTP {status} for page {page}")]
    Status { page: u32, status: u16 },

    /// Body did not have the expected shape
    #[error("Malformed response for page {page}: {reason}")]
    Parse { page: u32, reason: String },
}

impl ChatError {
    /// Page index the failed request was for
    pub fn page(&self) -> u32 {
        match self {
            ChatError::Fetch { page, .. }
            | ChatError::Status { page, .. }
            | ChatError::Parse { page, .. } => *page,
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Fetch { .. } => true,
            ChatError::Status { status, .. } => *status >= 500 || *status == 429,
            ChatError::Parse { .. } => false,
        }
    }
}
