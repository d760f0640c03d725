use base64::prelude::{Engine as _, BASE64_STANDARD};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Human-readable fingerprint of a public key: SHA-1 over the DER bytes,
/// rendered as colon-separated uppercase hex pairs. Shown to the user for
/// confirmation and broadcast as the discovery beacon payload.
pub fn key_fingerprint(public_key_der: &[u8]) -> String {
    let digest = Sha1::digest(public_key_der);
    let hex = hex::encode_upper(digest);
    hex.as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).expect("hex output is ascii"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Identity of the remote end of a secure channel: base64 of SHA-256 over
/// the raw certificate it presented. Binding the handshake challenge to
/// this value ties the challenge to the specific channel instance.
pub fn server_id(certificate_der: &[u8]) -> String {
    BASE64_STANDARD.encode(Sha256::digest(certificate_der))
}
