//! # Chatloom Core
//!
//! Domain types, traits, and error definitions for the chatloom streaming
//! inference pipeline. This crate defines the domain model that the pipeline
//! and transport crates implement against.
//!
//! ## Design Philosophy
//!
//! The external collaborators of the pipeline (the provider transport, the
//! tool catalog, and the tool invoker) are defined as traits here.
//! Implementations live in their respective crates. This enables:
//! - Swapping transports via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod tool;
pub mod transport;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{PipelineError, Result, ToolError, TransportError};
pub use event::{Completion, StreamEvent};
pub use tool::{
    ResolvedToolCall, Tool, ToolCallSignal, ToolCatalog, ToolContent, ToolDefinition, ToolInvoker,
    ToolRegistry, ToolResult,
};
pub use transport::{
    FormattedRole, FormattedTurn, GenerateRequest, ProviderToolSchema, RawChunk, Transport,
    TurnPart,
};
pub use turn::{ChatTurn, ContentPart, TurnContent, TurnRole};
