// Re-export needed modules for testing
pub mod chat;  // Loading, accumulating and scrolling the conversation
pub mod config;
pub mod models;

// Re-export main types for convenience
pub use chat::{ChatError, ChatSession, ConversationLoader, HttpLoader};
pub use models::*;
