//! Transport encryption helpers
//!
//! Per-request AES keys (ECB/PKCS7, base64 ciphertext) and RSA PKCS#1 v1.5
//! key wrapping, wire compatible with the console backend.

mod asymmetric;
mod error;
mod symmetric;

pub use asymmetric::{decrypt_with_private_key, encrypt_with_public_key};
pub use error::{CryptoError, Result};
pub use symmetric::{
    AES_KEY_CHARS, SymmetricKey, decode_base64, decrypt_with_aes, encode_base64,
    encrypt_with_aes, generate_aes_key, random_string,
};
