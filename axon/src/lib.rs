//! Axon: persona retrieval-augmented chat.
//!
//! Documents uploaded for a persona are chunked, embedded and stored in a
//! persona-scoped vector table. Questions are answered by retrieving the
//! persona's most similar chunks and prompting a chat model with them, the
//! persona's cached attributes and the recent conversation.

pub mod api;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod migration;
pub mod models;
pub mod processing;
pub mod services;

pub use error::{AxonError, Result};
