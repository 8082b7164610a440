//! Checksumming and the sign-bytes interface consumed by Export.

pub mod sign;
pub mod signing;

pub use sign::{ByteSigner, ByteVerifier, Ed25519Signer, SignError};
pub use signing::sha256_hex;
