pub mod chat;
pub mod health;
pub mod ingest;
pub mod personas;

pub use health::health_check;
