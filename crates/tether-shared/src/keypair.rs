//! The local identity capability.
//!
//! Key generation and on-disk persistence belong to the embedding
//! application; the core only consumes the [`Keypair`] trait. The keypair
//! becomes available asynchronously at startup, so consumers hold a
//! [`KeypairWatch`] and either skip work while it is empty (discovery) or
//! await it (connecting).

use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use tokio::sync::watch;

use crate::digest::key_fingerprint;

/// What the core needs from the long-lived local identity.
pub trait Keypair: Send + Sync {
    /// Colon-separated uppercase SHA-1 fingerprint of the public key DER.
    fn fingerprint(&self) -> &str;

    /// Public key in PEM form, as sent to the phone during pairing.
    fn public_key_pem(&self) -> &str;

    /// Sign arbitrary bytes with the private key.
    fn sign(&self, data: &[u8]) -> Vec<u8>;
}

pub type SharedKeypair = Arc<dyn Keypair>;

/// Observer half of the keypair availability cell.
pub type KeypairWatch = watch::Receiver<Option<SharedKeypair>>;

/// Create the keypair availability cell. The embedding application keeps
/// the sender and publishes the keypair once it has been loaded or
/// generated; the core components share the receiver.
pub fn keypair_channel() -> (watch::Sender<Option<SharedKeypair>>, KeypairWatch) {
    watch::channel(None)
}

/// Block until the keypair has been published.
pub async fn wait_for_keypair(watch: &mut KeypairWatch) -> Option<SharedKeypair> {
    let guard = watch.wait_for(Option::is_some).await.ok()?;
    guard.clone()
}

// ASN.1 SubjectPublicKeyInfo prefix for an Ed25519 key (RFC 8410).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Ed25519-backed [`Keypair`] implementation.
#[derive(Clone)]
pub struct EdKeypair {
    signing_key: SigningKey,
    fingerprint: String,
    public_pem: String,
}

impl EdKeypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Restore a keypair from its 32-byte secret seed.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(secret))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let der = spki_der(&signing_key);
        let fingerprint = key_fingerprint(&der);
        let public_pem = pem_wrap("PUBLIC KEY", &der);
        Self {
            signing_key,
            fingerprint,
            public_pem,
        }
    }

    /// Raw secret seed, for the embedding application to persist.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.signing_key.as_bytes()
    }

    /// Public key as SubjectPublicKeyInfo DER, the input to the fingerprint.
    pub fn public_key_der(&self) -> Vec<u8> {
        spki_der(&self.signing_key)
    }

    /// Verifying key, for tests that check signatures.
    pub fn verifying_key(&self) -> ed25519_dalek::VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl Keypair for EdKeypair {
    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn public_key_pem(&self) -> &str {
        &self.public_pem
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.signing_key.sign(data).to_bytes().to_vec()
    }
}

fn spki_der(signing_key: &SigningKey) -> Vec<u8> {
    let mut der = Vec::with_capacity(ED25519_SPKI_PREFIX.len() + 32);
    der.extend_from_slice(&ED25519_SPKI_PREFIX);
    der.extend_from_slice(signing_key.verifying_key().as_bytes());
    der
}

fn pem_wrap(label: &str, der: &[u8]) -> String {
    let body = BASE64_STANDARD.encode(der);
    let mut pem = format!("-----BEGIN {label}-----\n");
    for chunk in body.as_bytes().chunks(64) {
        pem.push_str(std::str::from_utf8(chunk).expect("base64 output is ascii"));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {label}-----\n"));
    pem
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    #[test]
    fn test_keypair_roundtrip() {
        let kp = EdKeypair::generate();
        let restored = EdKeypair::from_secret_bytes(kp.secret_bytes());
        assert_eq!(kp.fingerprint(), restored.fingerprint());
        assert_eq!(kp.public_key_pem(), restored.public_key_pem());
    }

    #[test]
    fn test_sign_verifies() {
        let kp = EdKeypair::generate();
        let sig_bytes = kp.sign(b"challenge text");
        let sig = Signature::from_slice(&sig_bytes).unwrap();
        assert!(kp.verifying_key().verify(b"challenge text", &sig).is_ok());
    }

    #[test]
    fn test_pem_shape() {
        let kp = EdKeypair::generate();
        let pem = kp.public_key_pem();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\n"));
        assert!(pem.ends_with("-----END PUBLIC KEY-----\n"));
    }

    #[test]
    fn test_fingerprint_covers_der() {
        let kp = EdKeypair::generate();
        assert_eq!(
            kp.fingerprint(),
            crate::digest::key_fingerprint(&kp.public_key_der())
        );
    }

    #[tokio::test]
    async fn test_keypair_channel_waits() {
        let (tx, mut rx) = keypair_channel();
        assert!(rx.borrow().is_none());

        let kp: SharedKeypair = Arc::new(EdKeypair::generate());
        let fingerprint = kp.fingerprint().to_string();
        tx.send(Some(kp)).unwrap();

        let got = wait_for_keypair(&mut rx).await.unwrap();
        assert_eq!(got.fingerprint(), fingerprint);
    }
}
