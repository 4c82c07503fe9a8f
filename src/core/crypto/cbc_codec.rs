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

//! AES-256-CBC(PKCS7) sealed-payload codec: `IV(16) || ciphertext`.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_LEN: usize = 16;

/// Sealed-payload codec errors.
#[derive(Debug, Error)]
pub enum CbcError {
    /// Random IV generation failed.
    #[error("iv generation failed")]
    Rng,
    /// Payload shorter than the IV, or padding did not validate.
    #[error("malformed sealed payload")]
    Malformed,
}

/// Encrypt `plaintext` under `key` with a fresh random IV, returning `IV || ciphertext`.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, CbcError> {
    let mut iv = [0u8; IV_LEN];
    SystemRandom::new().fill(&mut iv).map_err(|_| CbcError::Rng)?;

    let ciphertext = Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Split `sealed` into its IV and ciphertext, then decrypt under `key`.
pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, CbcError> {
    if sealed.len() < IV_LEN {
        return Err(CbcError::Malformed);
    }
    let (iv, ciphertext) = sealed.split_at(IV_LEN);
    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CbcError::Malformed)
}
