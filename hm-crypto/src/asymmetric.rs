use crate::error::{CryptoError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

/// Keys come either PEM armoured or as the bare base64 body that the
/// frontend env files carry.
enum KeyText {
    Pem(String),
    Der(Vec<u8>),
}

fn read_key_text(key: &str, what: &str) -> Result<KeyText> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(CryptoError::Config(format!("{what} is empty")));
    }
    if trimmed.starts_with("-----BEGIN") {
        return Ok(KeyText::Pem(trimmed.to_string()));
    }
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map(KeyText::Der)
        .map_err(|e| CryptoError::Config(format!("{what} is not valid base64: {e}")))
}

fn parse_public_key(key: &str) -> Result<RsaPublicKey> {
    let parsed = match read_key_text(key, "RSA public key")? {
        // SPKI first, PKCS#1 as fallback
        KeyText::Pem(pem) => RsaPublicKey::from_public_key_pem(&pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(&pem))
            .ok(),
        KeyText::Der(der) => RsaPublicKey::from_public_key_der(&der)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
            .ok(),
    };
    parsed.ok_or_else(|| CryptoError::Config("Invalid RSA public key".into()))
}

fn parse_private_key(key: &str) -> Result<RsaPrivateKey> {
    let parsed = match read_key_text(key, "RSA private key")? {
        KeyText::Pem(pem) => RsaPrivateKey::from_pkcs8_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
            .ok(),
        KeyText::Der(der) => RsaPrivateKey::from_pkcs8_der(&der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der))
            .ok(),
    };
    parsed.ok_or_else(|| CryptoError::Config("Invalid RSA private key".into()))
}

/// Encrypt with an RSA public key (PKCS#1 v1.5), base64 output
pub fn encrypt_with_public_key(plaintext: &str, public_key: &str) -> Result<String> {
    let public_key = parse_public_key(public_key)?;

    let mut rng = rand::thread_rng();
    let enc_data = public_key
        .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(|e| CryptoError::Config(format!("RSA encryption failed: {e}")))?;

    Ok(STANDARD.encode(enc_data))
}

/// Decrypt base64 ciphertext with an RSA private key (PKCS#1 v1.5)
pub fn decrypt_with_private_key(ciphertext: &str, private_key: &str) -> Result<String> {
    let private_key = parse_private_key(private_key)?;

    let data = STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CryptoError::Decrypt(format!("base64 decode failed: {e}")))?;

    let plain = private_key
        .decrypt(Pkcs1v15Encrypt, &data)
        .map_err(|e| CryptoError::Decrypt(format!("RSA decryption failed: {e}")))?;

    String::from_utf8(plain)
        .map_err(|_| CryptoError::Decrypt("decrypted data is not valid UTF-8".into()))
}
