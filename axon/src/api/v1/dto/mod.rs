//! v1 API Data Transfer Objects.
//!
//! These types define the wire format for the v1 REST API. They are separate
//! from the domain models in `src/models/` and handle conversion into them.

pub mod chat;
pub mod common;
pub mod ingest;

pub use chat::*;
pub use ingest::*;
