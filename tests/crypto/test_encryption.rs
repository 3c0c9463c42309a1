// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Secure channel tests: text and file envelopes

use secure_text_stats::crypto::{
    decrypt, decrypt_file, derive_shared_key, encrypt, encrypt_file, CryptoError, KeyPair,
    SharedSecret,
};

fn secret() -> SharedSecret {
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    derive_shared_key(&a.private_bytes(), &b.public_bytes()).unwrap()
}

#[test]
fn test_text_survives_channel() {
    let key = secret();
    let text = "Quarterly numbers look great 📈, ship it!";
    let sealed = encrypt(text, &key).unwrap();
    assert_ne!(sealed, text);
    assert_eq!(decrypt(&sealed, &key).unwrap(), text);
}

#[test]
fn test_fresh_nonce_per_message() {
    let key = secret();
    let a = encrypt("same text", &key).unwrap();
    let b = encrypt("same text", &key).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_wrong_key_fails_authentication() {
    let sealed = encrypt("hello", &secret()).unwrap();
    let err = decrypt(&sealed, &secret()).unwrap_err();
    assert!(matches!(err, CryptoError::DecryptionFailed { .. }));
}

#[test]
fn test_tampered_file_rejected() {
    let key = secret();
    let mut envelope = encrypt_file(b"msg\nhello\n", &key).unwrap();
    let last = envelope.len() - 1;
    envelope[last] ^= 0x01;
    assert!(decrypt_file(&envelope, &key).is_err());
}

#[test]
fn test_short_and_malformed_input() {
    let key = secret();
    assert!(decrypt_file(&[0u8; 10], &key).is_err());
    assert!(decrypt("%%% not base64 %%%", &key).is_err());
}

#[test]
fn test_empty_and_large_files() {
    let key = secret();

    let empty = encrypt_file(b"", &key).unwrap();
    assert!(decrypt_file(&empty, &key).unwrap().is_empty());

    let large: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
    let sealed = encrypt_file(&large, &key).unwrap();
    assert_eq!(decrypt_file(&sealed, &key).unwrap(), large);
}
