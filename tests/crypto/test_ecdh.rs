// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Key agreement tests
//!
//! Both sides of an exchange must arrive at the same 32-byte secret, and
//! malformed key material must be rejected with `InvalidKeyMaterial`.

use secure_text_stats::crypto::{derive_shared_key, derive_shared_key_hex, CryptoError, KeyPair};

#[test]
fn test_both_sides_agree() {
    let client = KeyPair::generate();
    let server = KeyPair::generate();

    let on_client = derive_shared_key(&client.private_bytes(), &server.public_bytes()).unwrap();
    let on_server = derive_shared_key(&server.private_bytes(), &client.public_bytes()).unwrap();

    assert_eq!(on_client, on_server);
    assert_eq!(on_client.as_bytes().len(), 32);
}

#[test]
fn test_deterministic_for_same_inputs() {
    let a = KeyPair::generate();
    let b = KeyPair::generate();

    let first = derive_shared_key_hex(&a.private_hex(), &b.public_hex()).unwrap();
    let second = derive_shared_key_hex(&a.private_hex(), &b.public_hex()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_different_pairs_give_different_secrets() {
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    let c = KeyPair::generate();

    let ab = derive_shared_key(&a.private_bytes(), &b.public_bytes()).unwrap();
    let ac = derive_shared_key(&a.private_bytes(), &c.public_bytes()).unwrap();
    assert_ne!(ab, ac);
}

#[test]
fn test_hex_accepts_0x_prefix() {
    let a = KeyPair::generate();
    let b = KeyPair::generate();

    let plain = derive_shared_key_hex(&a.private_hex(), &b.public_hex()).unwrap();
    let prefixed =
        derive_shared_key_hex(&format!("0x{}", a.private_hex()), &b.public_hex()).unwrap();
    assert_eq!(plain, prefixed);
}

#[test]
fn test_invalid_key_material() {
    let a = KeyPair::generate();

    let err = derive_shared_key_hex("not-hex", &a.public_hex()).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidKeyMaterial { .. }));

    let err = derive_shared_key(&a.private_bytes(), &[0x02; 12]).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidKeyMaterial { .. }));

    // Right length, not on the curve
    let mut bogus = vec![0x02];
    bogus.extend_from_slice(&[0xff; 32]);
    let err = derive_shared_key(&a.private_bytes(), &bogus).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidKeyMaterial { .. }));

    let err = derive_shared_key(&[0u8; 32], &a.public_bytes()).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidKeyMaterial { .. }));
}

#[test]
fn test_key_pair_hex_round_trip() {
    let pair = KeyPair::generate();
    let restored = KeyPair::from_private_hex(&pair.private_hex()).unwrap();
    assert_eq!(pair.public_hex(), restored.public_hex());
    assert_eq!(pair.public_bytes().len(), 33);
}
