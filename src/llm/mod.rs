//! Remote completion endpoint access.

pub mod client;

pub use client::{AgentClient, CompletionClient, DEFAULT_AGENT_ID, DEFAULT_ENDPOINT};
