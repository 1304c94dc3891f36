//! Core domain types and traits for toolchat.
//!
//! This crate defines the value objects and seams the rest of the system
//! is built around: conversation turns, the LLM provider trait, the tool
//! trait and registry, the shared cancellation flag, and the execution
//! status record consumed by status displays.

pub mod cancel;
pub mod error;
pub mod history;
pub mod message;
pub mod outcome;
pub mod provider;
pub mod status;
pub mod tool;

pub use cancel::CancelFlag;
pub use error::{Error, ProviderError, Result, ToolError};
pub use history::{HistoryStore, MemoryHistoryStore};
pub use message::{ConversationId, Role, Turn};
pub use outcome::DispatchOutcome;
pub use provider::{ChatRequest, ChatResponse, Provider, StreamChunk, Usage};
pub use status::{ExecutionState, ExecutionStatus, ExecutionStatusHandle};
pub use tool::{Tool, ToolDescriptor, ToolRegistry};
