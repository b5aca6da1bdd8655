//! Key material: the `KeyProvider` capability set and its concrete
//! ECDSA/P-256 implementation.

pub mod signer;

pub use signer::{verify, CryptoError, EcdsaKeyPair, KeyProvider};
