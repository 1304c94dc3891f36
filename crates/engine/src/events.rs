//! Events emitted by streaming engine runs.

use serde::{Deserialize, Serialize};

/// One event in a streamed engine run.
///
/// `Chunk` content is forwarded verbatim from the provider; command
/// lines and results are additionally surfaced as their own events so a
/// front end can render them distinctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A raw content delta from the model
    Chunk { content: String },

    /// A detected command line, after the reply finished streaming
    CommandLine { line: String },

    /// The rendered result of a dispatched command
    CommandResult { output: String },

    /// The run finished; carries the full accumulated response
    Done { full_response: String },

    /// A terminal error, already rendered user-readable
    Error { message: String },
}
