use ring::hmac;

/// Computes HMAC-SHA256 over `payload` and returns it as lowercase hex
pub fn sign(payload: &str, key: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let tag = hmac::sign(&key, payload.as_bytes());
    hex::encode(tag.as_ref())
}

/// Checks a hex signature produced by [`sign`].
///
/// The comparison is constant-time; malformed hex is simply a mismatch.
pub fn verify(payload: &str, signature: &str, key: &[u8]) -> bool {
    let Ok(tag) = hex::decode(signature.trim()) else {
        return false;
    };

    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::verify(&key, payload.as_bytes(), &tag).is_ok()
}
