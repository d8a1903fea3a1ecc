// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Crypto Primitives Adapter
//!
//! Thin adapter over the protocol's cryptographic primitives:
//!
//! - SHA-256 as the protocol hash ([`hash`])
//! - Ed25519 signing and verification over hex-encoded keys and signatures
//! - The address derivation used for validators and applications
//! - The node's own keypair, loaded from (or generated into) a seed file
//!
//! Public keys, signatures, hashes, and addresses all travel through the
//! wire formats as lowercase hex strings; this module owns the decoding.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Raw Ed25519 public key size in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Raw Ed25519 signature size in bytes.
pub const SIGNATURE_SIZE: usize = 64;
/// Address size in bytes (truncated public key digest).
pub const ADDRESS_SIZE: usize = 20;

/// Errors from key handling and signature verification.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("invalid signature length: expected {SIGNATURE_SIZE} bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("malformed public key")]
    MalformedKey,

    #[error("signature verification failed")]
    VerificationFailed,
}

/// SHA-256 digest of `data`.
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the address for a raw 32-byte public key: the lowercase hex of the
/// first 20 bytes of its SHA-256 digest.
pub fn address_of(public_key: &[u8]) -> String {
    hex::encode(&hash(public_key)[..ADDRESS_SIZE])
}

/// Decode a hex public key into its raw 32 bytes.
pub fn decode_public_key(public_key_hex: &str) -> Result<[u8; PUBLIC_KEY_SIZE], CryptoError> {
    let bytes =
        hex::decode(public_key_hex).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength {
            expected: PUBLIC_KEY_SIZE,
            got: v.len(),
        })
}

/// Decode a hex signature into its raw 64 bytes.
pub fn decode_signature(signature_hex: &str) -> Result<[u8; SIGNATURE_SIZE], CryptoError> {
    let bytes =
        hex::decode(signature_hex).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::InvalidSignatureLength(v.len()))
}

/// Verify a hex signature by a hex public key over `digest`.
pub fn verify(
    public_key_hex: &str,
    signature_hex: &str,
    digest: &[u8],
) -> Result<(), CryptoError> {
    let key_bytes = decode_public_key(public_key_hex)?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|_| CryptoError::MalformedKey)?;
    let signature = Signature::from_bytes(&decode_signature(signature_hex)?);
    verifying_key
        .verify(digest, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// The node's own Ed25519 keypair.
///
/// The private seed is stored locally in a 32-byte file and never leaves the
/// process; the public key identifies this servicer in sessions and proofs.
#[derive(Clone)]
pub struct NodeKeys {
    signing_key: SigningKey,
}

impl NodeKeys {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a keypair from a raw 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Load the keypair from a seed file, or generate and save one if the
    /// file does not exist.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            let keys = Self::generate();
            keys.save(path)?;
            Ok(keys)
        }
    }

    /// Load the keypair from a 32-byte seed file.
    ///
    /// Seed bytes are wiped from memory once the key is constructed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(fs::read(path)?);
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_SIZE,
                got: bytes.len(),
            });
        }
        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&bytes);
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Save the private seed to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CryptoError> {
        let mut file = fs::File::create(path)?;
        file.write_all(self.signing_key.as_bytes())?;
        Ok(())
    }

    /// The node's public key as lowercase hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    /// The node's address (truncated public-key digest, lowercase hex).
    pub fn address(&self) -> String {
        address_of(self.signing_key.verifying_key().as_bytes())
    }

    /// Sign a digest, returning the signature as lowercase hex.
    pub fn sign(&self, digest: &[u8]) -> String {
        hex::encode(self.signing_key.sign(digest).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable() {
        assert_eq!(hash(b"foo"), hash(b"foo"));
        assert_ne!(hash(b"foo"), hash(b"bar"));
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = NodeKeys::generate();
        let digest = hash(b"relay body");
        let sig = keys.sign(&digest);
        assert!(verify(&keys.public_key_hex(), &sig, &digest).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let keys = NodeKeys::generate();
        let other = NodeKeys::generate();
        let digest = hash(b"relay body");
        let sig = keys.sign(&digest);
        assert!(matches!(
            verify(&other.public_key_hex(), &sig, &digest),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn verify_rejects_tampered_digest() {
        let keys = NodeKeys::generate();
        let sig = keys.sign(&hash(b"original"));
        assert!(verify(&keys.public_key_hex(), &sig, &hash(b"tampered")).is_err());
    }

    #[test]
    fn address_is_20_bytes_of_hex() {
        let keys = NodeKeys::generate();
        let addr = keys.address();
        assert_eq!(addr.len(), ADDRESS_SIZE * 2);
        assert!(addr.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn decode_rejects_bad_lengths() {
        assert!(matches!(
            decode_public_key("abcd"),
            Err(CryptoError::InvalidKeyLength { got: 2, .. })
        ));
        assert!(matches!(
            decode_signature("abcd"),
            Err(CryptoError::InvalidSignatureLength(2))
        ));
        assert!(decode_public_key("zz").is_err());
    }

    #[test]
    fn keys_roundtrip_through_seed_file() {
        let path = std::env::temp_dir().join(format!("node-key-{}", std::process::id()));
        let keys = NodeKeys::generate();
        keys.save(&path).unwrap();

        let loaded = NodeKeys::load(&path).unwrap();
        assert_eq!(keys.public_key_hex(), loaded.public_key_hex());

        let again = NodeKeys::load_or_generate(&path).unwrap();
        assert_eq!(keys.public_key_hex(), again.public_key_hex());
        std::fs::remove_file(&path).ok();
    }
}
