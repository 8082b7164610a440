//! The sign-bytes collaborator interface used by Export's signed-PDF
//! operation (§4.8, §6). The concrete signing primitive is out of scope
//! (§1); this crate defines the trait plus one reference Ed25519
//! implementation, the way the repository layer ships one reference
//! storage adapter despite persistence also being out of scope.

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("malformed signature bytes")]
    MalformedSignature,
}

/// A byte-signing collaborator. Implementations may be hardware-backed,
/// KMS-backed, or (as here) a local keypair.
pub trait ByteSigner: Send + Sync {
    fn sign(&self, bytes: &[u8]) -> Vec<u8>;
    fn public_key(&self) -> Vec<u8>;
}

/// A verifier paired with a [`ByteSigner`]'s public key.
pub trait ByteVerifier {
    fn verify(&self, bytes: &[u8], signature: &[u8]) -> Result<(), SignError>;
}

pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    pub fn from_bytes(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl ByteSigner for Ed25519Signer {
    fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        self.signing_key.sign(bytes).to_bytes().to_vec()
    }

    fn public_key(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }
}

impl ByteVerifier for VerifyingKey {
    fn verify(&self, bytes: &[u8], signature: &[u8]) -> Result<(), SignError> {
        let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| SignError::MalformedSignature)?;
        let signature = Signature::from_bytes(&sig_bytes);
        ed25519_dalek::Verifier::verify(self, bytes, &signature)
            .map_err(|_| SignError::VerificationFailed)
    }
}
