use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC-SHA256 of the request body.
///
/// The signature always covers the serialized bytes *before* gzip
/// framing; the server verifies it against the decompressed body.
pub const SIGNATURE_HEADER: &str = "HashSHA256";

/// Signs `body` with the shared secret, returning the hex digest.
pub fn sign(body: &[u8], key: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex signature over `body` in constant time.
///
/// A malformed hex string verifies as false rather than erroring; the
/// caller treats every failure the same way (reject the request).
pub fn verify(body: &[u8], key: &str, signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_matches_known_vector() {
        // RFC-style HMAC-SHA256 test vector.
        let signature = sign(b"The quick brown fox jumps over the lazy dog", "key");
        assert_eq!(
            signature,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn verify_accepts_own_signature() {
        let body = br#"[{"id":"Alloc","type":"gauge","value":22.2}]"#;
        let signature = sign(body, "k1");
        assert!(verify(body, "k1", &signature));
    }

    #[test]
    fn verify_rejects_other_key() {
        let body = b"payload";
        let signature = sign(body, "k1");
        assert!(!verify(body, "k2", &signature));
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let signature = sign(b"payload", "k1");
        assert!(!verify(b"payload!", "k1", &signature));
    }

    #[test]
    fn verify_rejects_malformed_hex() {
        assert!(!verify(b"payload", "k1", "not-hex"));
        assert!(!verify(b"payload", "k1", ""));
    }
}
