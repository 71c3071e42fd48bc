//! Property-based tests for the symmetric layer and the envelope format.
//!
//! RSA key generation is too slow to run per case, so wrap/unwrap properties share one key pair.

use std::sync::OnceLock;

use proptest::prelude::*;

use crate::cipher::{decrypt_body, encrypt_body, generate_session_key, unwrap_session_key, wrap_session_key};
use crate::envelope::Envelope;
use crate::identity::IdentityKeyPair;

fn shared_pair() -> &'static IdentityKeyPair {
    static PAIR: OnceLock<IdentityKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| IdentityKeyPair::generate().expect("key generation failed"))
}

proptest! {
    /// Any text survives encrypt then decrypt under the same key.
    #[test]
    fn body_round_trip(plaintext in any::<String>()) {
        let key = generate_session_key().unwrap();
        let (nonce, ciphertext) = encrypt_body(&plaintext, &key).unwrap();
        prop_assert_eq!(decrypt_body(&nonce, &ciphertext, &key).unwrap(), plaintext);
    }

    /// Same text, same key, different nonce and ciphertext every time.
    #[test]
    fn encryption_is_not_deterministic(plaintext in ".{0,64}") {
        let key = generate_session_key().unwrap();
        let (n1, c1) = encrypt_body(&plaintext, &key).unwrap();
        let (n2, c2) = encrypt_body(&plaintext, &key).unwrap();
        prop_assert_ne!(n1, n2);
        prop_assert_ne!(c1, c2);
    }

    /// A flipped bit in the block before the last lands in the padding block. With a block-aligned plaintext that block
    /// is sixteen 0x10 bytes, and xor 0x01 can never turn it into valid padding.
    #[test]
    fn tampered_padding_block_is_rejected(blocks in 1usize..8, byte in 0usize..16, fill in "[a-z]{1}") {
        let plaintext = fill.repeat(blocks * 16);
        let key = generate_session_key().unwrap();
        let (nonce, mut ciphertext) = encrypt_body(&plaintext, &key).unwrap();
        let target = ciphertext.len() - 32 + byte;
        ciphertext[target] ^= 0x01;
        prop_assert!(decrypt_body(&nonce, &ciphertext, &key).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Fresh session keys unwrap to themselves.
    #[test]
    fn wrap_round_trip(_seed in any::<u64>()) {
        let pair = shared_pair();
        let key = generate_session_key().unwrap();
        let wrapped = wrap_session_key(&key, pair.public_key()).unwrap();
        prop_assert_eq!(unwrap_session_key(&wrapped, pair.private_key()).unwrap(), key);
    }

    /// Any single flipped byte in a wrapped key breaks OAEP decoding.
    #[test]
    fn tampered_wrap_is_rejected(index in 0usize..256, mask in 1u8..=255) {
        let pair = shared_pair();
        let key = generate_session_key().unwrap();
        let mut wrapped = wrap_session_key(&key, pair.public_key()).unwrap();
        wrapped[index] ^= mask;
        prop_assert!(unwrap_session_key(&wrapped, pair.private_key()).is_err());
    }
}

proptest! {
    /// Every field, including arbitrary binary payloads, survives serialize then parse.
    #[test]
    fn envelope_round_trip(
        sender in "[0-9a-f]{1,100}",
        recipient in "[0-9a-f]{1,100}",
        wrapped in prop::collection::vec(any::<u8>(), 0..300),
        nonce in prop::collection::vec(any::<u8>(), 0..32),
        ciphertext in prop::collection::vec(any::<u8>(), 0..500),
        timestamp in any::<String>(),
    ) {
        let envelope = Envelope::build_at(&sender, &recipient, &wrapped, &nonce, &ciphertext, &timestamp);
        let parsed = Envelope::parse(&envelope.serialize().unwrap()).unwrap();
        prop_assert_eq!(parsed, envelope);
    }
}
