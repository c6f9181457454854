//! Terminal chat client for a retrieval-augmented document Q&A service.

pub mod app;
pub mod client;
pub mod config;
pub mod conversation;
pub mod debounce;
pub mod draft;
pub mod error;
pub mod handler;
pub mod logging;
pub mod reveal;
pub mod session;
pub mod state;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use client::{ChatClient, ChatDispatcher, Document, QueryResponse, UploadResponse};
pub use config::Config;
pub use conversation::Conversation;
pub use error::ChatError;
pub use session::{ChatSession, SessionEvent};
pub use state::{ChatRole, Message, MessageId};
