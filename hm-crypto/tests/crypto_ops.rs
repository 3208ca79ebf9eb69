use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hm_crypto::{
    CryptoError, SymmetricKey, decode_base64, decrypt_with_aes, decrypt_with_private_key,
    encode_base64, encrypt_with_aes, encrypt_with_public_key, generate_aes_key,
};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

fn rsa_keypair() -> (String, String, RsaPublicKey) {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 1024).expect("Failed to generate RSA key");
    let public = RsaPublicKey::from(&private);
    let public_pem = public.to_public_key_pem(LineEnding::LF).unwrap();
    let private_pem = private.to_pkcs8_pem(LineEnding::LF).unwrap().as_str().to_string();
    (public_pem, private_pem, public)
}

#[test]
fn test_aes_round_trip_with_fresh_keys() {
    let long = "x".repeat(1000);
    let samples = [
        "",
        "hello",
        "{\"username\":\"admin\",\"password\":\"admin123\"}",
        "多字节 UTF-8 内容 ✓",
        long.as_str(),
    ];
    for plain in samples {
        let key = generate_aes_key();
        let ct = encrypt_with_aes(plain, &key).expect("Encryption failed");
        assert_eq!(decrypt_with_aes(&ct, &key).expect("Decryption failed"), plain);
    }
}

#[test]
fn test_aes_ecb_is_deterministic() {
    // Known weak point: no IV, so the same key and plaintext repeat.
    let key = SymmetricKey::from_bytes(b"0123456789abcdef".to_vec());
    let a = encrypt_with_aes("same body", &key).unwrap();
    let b = encrypt_with_aes("same body", &key).unwrap();
    assert_eq!(a, b);

    // Identical 16-byte blocks encrypt to identical ciphertext blocks
    let ct = STANDARD
        .decode(encrypt_with_aes(&"A".repeat(32), &key).unwrap())
        .unwrap();
    assert_eq!(ct[0..16], ct[16..32]);
}

#[test]
fn test_aes_wrong_key_never_yields_plaintext() {
    let right = SymmetricKey::from_bytes(b"0123456789abcdef".to_vec());
    let wrong = SymmetricKey::from_bytes(b"fedcba9876543210".to_vec());
    let ct = encrypt_with_aes("{\"code\":200}", &right).unwrap();
    let result = decrypt_with_aes(&ct, &wrong);
    assert_ne!(result.ok().as_deref(), Some("{\"code\":200}"));
}

#[test]
fn test_base64_key_round_trip() {
    for _ in 0..32 {
        let key = generate_aes_key();
        assert_eq!(decode_base64(&encode_base64(&key)).unwrap(), key);
    }
    let odd = SymmetricKey::from_bytes(vec![0u8, 255, 7, 128, 1]);
    assert_eq!(decode_base64(&encode_base64(&odd)).unwrap(), odd);
}

#[test]
fn test_rsa_wraps_aes_key() {
    let (public_pem, private_pem, public) = rsa_keypair();

    // Request side: RSA(base64(aesKey))
    let key = generate_aes_key();
    let wrapped = encrypt_with_public_key(&encode_base64(&key), &public_pem).expect("Encryption failed");
    let unwrapped = decrypt_with_private_key(&wrapped, &private_pem).expect("Decryption failed");
    assert_eq!(decode_base64(&unwrapped).unwrap(), key);

    // PKCS#1 PEM public key is accepted too
    let pkcs1_pem = public.to_pkcs1_pem(LineEnding::LF).unwrap();
    let wrapped = encrypt_with_public_key("hi", &pkcs1_pem).unwrap();
    assert_eq!(decrypt_with_private_key(&wrapped, &private_pem).unwrap(), "hi");

    // Bare base64 DER, the way env files carry it
    let der_b64 = STANDARD.encode(public.to_public_key_der().unwrap().as_bytes());
    let wrapped = encrypt_with_public_key("hi again", &der_b64).unwrap();
    assert_eq!(
        decrypt_with_private_key(&wrapped, &private_pem).unwrap(),
        "hi again"
    );
}

#[test]
fn test_rsa_missing_keys() {
    assert!(matches!(
        encrypt_with_public_key("payload", ""),
        Err(CryptoError::Config(_))
    ));
    assert!(matches!(
        decrypt_with_private_key("cGF5bG9hZA==", "not a key"),
        Err(CryptoError::Config(_))
    ));
}
