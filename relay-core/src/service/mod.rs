//! Collaborators consulted by the validator pipeline

pub mod account;
pub mod domain;
pub mod signature;

pub use account::{AccountResolver, MemoryAccountResolver, RedisAccountResolver};
pub use domain::{DomainVerifier, MemoryDomainVerifier, WellKnownDomainVerifier};
pub use signature::{Ed25519Verifier, SignatureVerifier};
