//! LLM provider implementations.
//!
//! The only concrete provider is [`OpenAiCompatProvider`], which covers
//! DeepSeek, OpenAI, OpenRouter, Ollama, vLLM, and any other endpoint
//! speaking the OpenAI chat-completions dialect.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
