mod chunker;
mod fingerprint;
mod loader;

pub use chunker::TextChunker;
pub use fingerprint::{chunk_hash, fingerprint};
pub use loader::DocumentLoader;
