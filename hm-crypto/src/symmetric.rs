//! AES/ECB/PKCS7 body encryption
//!
//! ECB has no IV, so equal plaintexts under one key give equal
//! ciphertexts. The backend only speaks this mode; keys are single-use per
//! request, which is what keeps it tolerable.

use crate::error::{CryptoError, Result};
use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;

/// Length of a generated key, in alphanumeric characters (= bytes)
pub const AES_KEY_CHARS: usize = 16;

/// Raw AES key bytes
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey(Vec<u8>);

impl SymmetricKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// never print key material
impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey({} bytes)", self.0.len())
    }
}

/// Random string over `[A-Za-z0-9]`
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Fresh per-request key: the UTF-8 bytes of a 16 character random string
pub fn generate_aes_key() -> SymmetricKey {
    SymmetricKey(random_string(AES_KEY_CHARS).into_bytes())
}

pub fn encode_base64(key: &SymmetricKey) -> String {
    STANDARD.encode(&key.0)
}

pub fn decode_base64(encoded: &str) -> Result<SymmetricKey> {
    STANDARD
        .decode(encoded.trim())
        .map(SymmetricKey)
        .map_err(|e| CryptoError::Config(format!("invalid base64 key: {e}")))
}

fn invalid_key(e: cipher::InvalidLength) -> CryptoError {
    CryptoError::Config(format!("cipher init failed: {e}"))
}

fn unsupported_key_len(len: usize) -> CryptoError {
    CryptoError::Config(format!("AES key must be 16, 24 or 32 bytes, got {len}"))
}

/// Encrypt and return base64 ciphertext
pub fn encrypt_with_aes(plaintext: &str, key: &SymmetricKey) -> Result<String> {
    let msg = plaintext.as_bytes();
    let ciphertext = match key.len() {
        16 => ecb::Encryptor::<Aes128>::new_from_slice(key.as_bytes())
            .map_err(invalid_key)?
            .encrypt_padded_vec_mut::<Pkcs7>(msg),
        24 => ecb::Encryptor::<Aes192>::new_from_slice(key.as_bytes())
            .map_err(invalid_key)?
            .encrypt_padded_vec_mut::<Pkcs7>(msg),
        32 => ecb::Encryptor::<Aes256>::new_from_slice(key.as_bytes())
            .map_err(invalid_key)?
            .encrypt_padded_vec_mut::<Pkcs7>(msg),
        n => return Err(unsupported_key_len(n)),
    };
    Ok(STANDARD.encode(ciphertext))
}

/// Decrypt base64 ciphertext back to the UTF-8 plaintext
pub fn decrypt_with_aes(ciphertext: &str, key: &SymmetricKey) -> Result<String> {
    let data = STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CryptoError::Decrypt(format!("base64 decode failed: {e}")))?;

    let unpadded = match key.len() {
        16 => ecb::Decryptor::<Aes128>::new_from_slice(key.as_bytes())
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(&data),
        24 => ecb::Decryptor::<Aes192>::new_from_slice(key.as_bytes())
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(&data),
        32 => ecb::Decryptor::<Aes256>::new_from_slice(key.as_bytes())
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(&data),
        n => return Err(unsupported_key_len(n)),
    }
    .map_err(|_| CryptoError::Decrypt("bad padding (wrong key or corrupted data)".into()))?;

    String::from_utf8(unpadded)
        .map_err(|_| CryptoError::Decrypt("decrypted data is not valid UTF-8".into()))
}
