// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! RSA-2048 keypairs and AES-256 symmetric keys, plus the PKCS#1 v1.5
//! sign/verify/encrypt/decrypt operations the Sealer, Verifier and
//! Decryptor build on.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use ring::rand::{SecureRandom, SystemRandom};
use rsa::pkcs1v15::{Signature as Pkcs1v15Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::signature::{Signer, Verifier as _};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// Cryptographic key errors. Deliberately opaque: callers act on the
/// variant, never on RSA/ASN.1 internals.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key generation or parameter error.
    #[error("key generation failed")]
    Generation,
    /// Public key was not valid SPKI DER/base64.
    #[error("invalid public key encoding")]
    InvalidPublicKey,
    /// Signature was malformed (wrong length/encoding).
    #[error("invalid signature encoding")]
    InvalidSignature,
    /// Signing operation failed.
    #[error("signing failed")]
    Sign,
    /// Verification failed (signature does not match).
    #[error("signature verification failed")]
    Verify,
    /// RSA encryption failed.
    #[error("encryption failed")]
    Encrypt,
    /// RSA decryption failed.
    #[error("decryption failed")]
    Decrypt,
    /// Base64 decoding failed.
    #[error("invalid base64")]
    Base64,
}

const RSA_BITS: usize = 2048;

/// An RSA-2048 keypair used for signing (station) or unwrapping (tallier).
pub struct RsaKeypair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl RsaKeypair {
    /// Generate a fresh RSA-2048 keypair.
    pub fn generate() -> Result<Self, KeyError> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_BITS).map_err(|_| KeyError::Generation)?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// This keypair's public half, X.509 SubjectPublicKeyInfo, base64-encoded.
    pub fn public_key_spki_b64(&self) -> Result<String, KeyError> {
        encode_public_key(&self.public)
    }

    /// Sign `msg` with RSASSA-PKCS1-v1_5 / SHA-256.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError> {
        let signing_key = SigningKey::<Sha256>::new(self.private.clone());
        let signature: Pkcs1v15Signature = signing_key.try_sign(msg).map_err(|_| KeyError::Sign)?;
        Ok(signature.to_vec())
    }

    /// Decrypt ciphertext produced by [`encrypt_for`] under this keypair's public key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.private
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|_| KeyError::Decrypt)
    }

    /// Load a PKCS#8 DER-encoded keypair from `path` if it exists, or
    /// generate and persist a fresh one. Mirrors the teacher's
    /// load-or-create keystore pattern.
    pub fn load_or_generate(path: &Path) -> Result<Self, KeyError> {
        if path.exists() {
            let der = fs::read(path).map_err(|_| KeyError::Generation)?;
            let private = RsaPrivateKey::from_pkcs8_der(&der).map_err(|_| KeyError::InvalidPublicKey)?;
            let public = RsaPublicKey::from(&private);
            return Ok(Self { private, public });
        }

        let keypair = Self::generate()?;
        let doc = keypair.private.to_pkcs8_der().map_err(|_| KeyError::Generation)?;
        atomic_write_private(path, doc.as_bytes())?;
        Ok(keypair)
    }
}

fn set_private_perms_best_effort(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn atomic_write_private(path: &Path, bytes: &[u8]) -> Result<(), KeyError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|_| KeyError::Generation)?;
    }
    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");
    {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .map_err(|_| KeyError::Generation)?;
        f.write_all(bytes).map_err(|_| KeyError::Generation)?;
        let _ = f.sync_all();
    }
    set_private_perms_best_effort(&tmp);
    fs::rename(&tmp, path).map_err(|_| KeyError::Generation)?;
    set_private_perms_best_effort(path);
    Ok(())
}

/// Parse a base64-encoded X.509 SubjectPublicKeyInfo RSA public key.
pub fn parse_public_key_spki_b64(spki_b64: &str) -> Result<RsaPublicKey, KeyError> {
    let der = STANDARD.decode(spki_b64.trim()).map_err(|_| KeyError::Base64)?;
    RsaPublicKey::from_public_key_der(&der).map_err(|_| KeyError::InvalidPublicKey)
}

fn encode_public_key(key: &RsaPublicKey) -> Result<String, KeyError> {
    let doc = key.to_public_key_der().map_err(|_| KeyError::Generation)?;
    Ok(STANDARD.encode(doc.as_bytes()))
}

/// Verify an RSASSA-PKCS1-v1_5 / SHA-256 signature against a raw public key.
pub fn verify(pubkey: &RsaPublicKey, msg: &[u8], signature: &[u8]) -> Result<(), KeyError> {
    let sig = Pkcs1v15Signature::try_from(signature).map_err(|_| KeyError::InvalidSignature)?;
    let verifying_key = VerifyingKey::<Sha256>::new(pubkey.clone());
    verifying_key.verify(msg, &sig).map_err(|_| KeyError::Verify)
}

/// RSA-PKCS#1-v1.5 encrypt `plaintext` (used to wrap a station's AES key
/// under the tallier's public key).
pub fn encrypt_for(pubkey: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
    pubkey
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(|_| KeyError::Encrypt)
}

/// A station's AES-256 symmetric key. Zeroized on drop.
pub struct AesKey(pub Zeroizing<[u8; 32]>);

impl AesKey {
    /// Generate a fresh, cryptographically random AES-256 key.
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; 32];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| KeyError::Generation)?;
        Ok(Self(Zeroizing::new(bytes)))
    }

    /// Wrap bytes as an `AesKey` (e.g. after RSA-unwrapping them).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Load the raw key bytes from `path`. Errors if the file is absent or
    /// not exactly 32 bytes, unlike [`Self::load_or_generate`], because a
    /// preregistered station key must already exist out-of-band.
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let bytes = fs::read(path).map_err(|_| KeyError::Generation)?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self::from_bytes(array))
    }

    /// Load the raw key bytes from `path` if present, or generate and
    /// persist a fresh key.
    pub fn load_or_generate(path: &Path) -> Result<Self, KeyError> {
        if path.exists() {
            let bytes = fs::read(path).map_err(|_| KeyError::Generation)?;
            let array: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
            return Ok(Self::from_bytes(array));
        }
        let key = Self::generate()?;
        atomic_write_private(path, key.as_bytes())?;
        Ok(key)
    }
}

impl Clone for AesKey {
    fn clone(&self) -> Self {
        Self(Zeroizing::new(*self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = RsaKeypair::generate().expect("keygen");
        let msg = b"hello ballot";
        let sig = kp.sign(msg).expect("sign");
        verify(&kp.public, msg, &sig).expect("verify");
    }

    #[test]
    fn tampered_signature_fails() {
        let kp = RsaKeypair::generate().expect("keygen");
        let msg = b"hello ballot";
        let mut sig = kp.sign(msg).expect("sign");
        sig[0] ^= 0xFF;
        assert!(verify(&kp.public, msg, &sig).is_err());
    }

    #[test]
    fn rsa_wrap_unwrap_round_trip() {
        let kp = RsaKeypair::generate().expect("keygen");
        let aes = AesKey::generate().expect("aes keygen");
        let wrapped = encrypt_for(&kp.public, aes.as_bytes()).expect("wrap");
        let unwrapped = kp.decrypt(&wrapped).expect("unwrap");
        assert_eq!(unwrapped.as_slice(), aes.as_bytes().as_slice());
    }

    #[test]
    fn spki_b64_round_trip() {
        let kp = RsaKeypair::generate().expect("keygen");
        let b64 = kp.public_key_spki_b64().expect("encode");
        let parsed = parse_public_key_spki_b64(&b64).expect("parse");
        assert_eq!(parsed, kp.public);
    }

    #[test]
    fn load_or_generate_persists_and_reloads_the_same_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("signing.key");
        let first = RsaKeypair::load_or_generate(&path).expect("generate");
        let second = RsaKeypair::load_or_generate(&path).expect("reload");
        assert_eq!(first.public, second.public);
    }

    #[test]
    fn aes_key_load_or_generate_persists_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("aes.key");
        let first = AesKey::load_or_generate(&path).expect("generate");
        let second = AesKey::load_or_generate(&path).expect("reload");
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn aes_key_load_rejects_a_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("aes.key");
        assert!(AesKey::load(&path).is_err());
    }

    #[test]
    fn aes_key_load_reads_back_a_persisted_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("aes.key");
        let generated = AesKey::load_or_generate(&path).expect("generate");
        let loaded = AesKey::load(&path).expect("load");
        assert_eq!(generated.as_bytes(), loaded.as_bytes());
    }
}
