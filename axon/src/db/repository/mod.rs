mod fingerprints;
mod personas;
mod vectors;

pub use fingerprints::FingerprintRepository;
pub use personas::{PersonaCacheRepository, PersonaRepository};
pub use vectors::VectorRepository;
