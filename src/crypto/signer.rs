//! ECDSA/P-256 key provider: the concrete key material implementation.
//!
//! The curve and digest are pinned as a consensus parameter, not a
//! configurable choice — every node must agree on the signature scheme
//! for `validate_signature` to mean the same thing everywhere.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePublicKey, EncodePublicKey};
use p256::SecretKey;
use rand_core::OsRng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("malformed private key material")]
    MalformedPrivateKey,
}

/// The key material capability set: generate, export/import the private
/// key, read the public key as hex, and sign. Verification is a free
/// function below since it only needs the public key, not a whole
/// keypair.
pub trait KeyProvider {
    fn generate() -> Self
    where
        Self: Sized;

    /// Compact SEC1 DER encoding of the private key.
    fn export_private(&self) -> Vec<u8>;

    fn import_private(der: &[u8]) -> Result<Self, CryptoError>
    where
        Self: Sized;

    /// SubjectPublicKeyInfo (SPKI) DER encoding of the public key, hex.
    fn public_key_hex(&self) -> String;

    fn sign(&self, content: &[u8]) -> Vec<u8>;
}

/// ECDSA over NIST P-256 with SHA-256 as the message digest.
pub struct EcdsaKeyPair {
    signing_key: SigningKey,
}

impl KeyProvider for EcdsaKeyPair {
    fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    fn export_private(&self) -> Vec<u8> {
        let secret: SecretKey = self.signing_key.clone().into();
        secret
            .to_sec1_der()
            .expect("a valid P-256 secret key always encodes to SEC1 DER")
            .to_bytes()
            .to_vec()
    }

    fn import_private(der: &[u8]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_sec1_der(der).map_err(|_| CryptoError::MalformedPrivateKey)?;
        Ok(Self {
            signing_key: SigningKey::from(secret),
        })
    }

    fn public_key_hex(&self) -> String {
        let verifying_key = VerifyingKey::from(&self.signing_key);
        let der = verifying_key
            .to_public_key_der()
            .expect("a valid P-256 public key always encodes to SPKI DER");
        hex::encode(der.as_bytes())
    }

    fn sign(&self, content: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(content);
        signature.to_bytes().to_vec()
    }
}

/// Verify `signature` over `content` against the SPKI-hex-encoded public
/// key `public_key_hex`. `false` on any malformed input; this function
/// never panics or raises across the boundary.
pub fn verify(public_key_hex: &str, content: &[u8], signature: &[u8]) -> bool {
    let Ok(der) = hex::decode(public_key_hex) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_public_key_der(&der) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(content, &signature).is_ok()
}
