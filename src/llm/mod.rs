//! LLM integration for chainforge.
//!
//! This module provides the conversation/request/response model, the
//! [`LlmProvider`] trait, an HTTP client for OpenAI-compatible
//! chat-completion APIs, and the bounded retry-with-backoff wrapper used by
//! the prompt dispatcher.
//!
//! ```ignore
//! use chainforge::llm::{
//!     generate_with_retry, GenerationRequest, HttpLlmClient, Message, RetryPolicy,
//! };
//!
//! let client = HttpLlmClient::from_env()?;
//! let request = GenerationRequest::new(
//!     "",
//!     vec![
//!         Message::system("You are a smart contract developer."),
//!         Message::user("Write an ERC-20 token."),
//!     ],
//! );
//! let response = generate_with_retry(&client, request, &RetryPolicy::default()).await?;
//! ```

pub mod client;

pub use client::{
    generate_with_retry, Choice, GenerationRequest, GenerationResponse, HttpLlmClient,
    LlmProvider, Message, RetryPolicy, Usage,
};
