//! The iteration engine: command parsing, dispatch, prompt composition,
//! and the model round-trip loop that ties them together.

pub mod composer;
pub mod dispatcher;
pub mod engine;
pub mod events;
pub mod parser;
pub mod policy;

pub use composer::PromptComposer;
pub use dispatcher::Dispatcher;
pub use engine::{Engine, STOPPED_TEXT};
pub use events::EngineEvent;
pub use parser::{CommandInvocation, CommandSyntax, ParseError};
pub use policy::{KeywordSummaryPolicy, NeverSummarize, SummaryPolicy};
