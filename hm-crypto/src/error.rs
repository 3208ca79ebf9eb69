use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Missing or unusable key material
    #[error("Crypto config error: {0}")]
    Config(String),
    /// Ciphertext does not match the key, or is not valid ciphertext at all
    #[error("Decrypt error: {0}")]
    Decrypt(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
