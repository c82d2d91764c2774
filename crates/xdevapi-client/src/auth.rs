//! Authentication payloads.

use sha2::{Digest, Sha256};

use crate::error::Error;

/// Length of the nonce sent by the server for `SHA256_MEMORY`.
pub const NONCE_LENGTH: usize = 20;

/// `PLAIN` auth data: `schema \0 user \0 password`.
pub fn plain_auth_data(schema: &str, user: &str, password: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(schema.len() + user.len() + password.len() + 2);
    data.extend_from_slice(schema.as_bytes());
    data.push(0);
    data.extend_from_slice(user.as_bytes());
    data.push(0);
    data.extend_from_slice(password.as_bytes());
    data
}

/// `SHA256_MEMORY` response to a server nonce: `schema \0 user \0 hex(scramble)`.
///
/// The scramble is `SHA256(password) XOR SHA256(SHA256(SHA256(password)) || nonce)`.
pub fn sha256_memory_response(schema: &str, user: &str, password: &str, nonce: &[u8]) -> Result<Vec<u8>, Error> {
    if nonce.len() != NONCE_LENGTH {
        return Err(Error::Authentication(format!(
            "expected a {}-byte nonce, got {} bytes",
            NONCE_LENGTH,
            nonce.len()
        )));
    }

    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);

    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(nonce);
    let mixed = hasher.finalize();

    let scramble: Vec<u8> = stage1.iter().zip(mixed.iter()).map(|(a, b)| a ^ b).collect();

    let mut data = Vec::with_capacity(schema.len() + user.len() + 2 + scramble.len() * 2);
    data.extend_from_slice(schema.as_bytes());
    data.push(0);
    data.extend_from_slice(user.as_bytes());
    data.push(0);
    data.extend_from_slice(hex::encode(scramble).as_bytes());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_layout() {
        assert_eq!(plain_auth_data("shop", "app", "pw"), b"shop\0app\0pw".to_vec());
        assert_eq!(plain_auth_data("", "root", ""), b"\0root\0".to_vec());
    }

    #[test]
    fn test_sha256_memory_layout() {
        let nonce = [7u8; NONCE_LENGTH];
        let data = sha256_memory_response("", "root", "secret", &nonce).unwrap();

        let parts: Vec<&[u8]> = data.split(|b| *b == 0).collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], b"");
        assert_eq!(parts[1], b"root");
        assert_eq!(parts[2].len(), 64);
        assert!(parts[2].iter().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sha256_memory_is_verifiable() {
        // The server holds SHA256(SHA256(password)) and recovers stage1 from the scramble.
        let nonce: Vec<u8> = (0..NONCE_LENGTH as u8).collect();
        let data = sha256_memory_response("db", "u", "pa55", &nonce).unwrap();
        let scramble = hex::decode(&data[5..]).unwrap();

        let stored = Sha256::digest(Sha256::digest(b"pa55"));
        let mut hasher = Sha256::new();
        hasher.update(stored);
        hasher.update(&nonce);
        let mixed = hasher.finalize();

        let stage1: Vec<u8> = scramble.iter().zip(mixed.iter()).map(|(a, b)| a ^ b).collect();
        assert_eq!(Sha256::digest(&stage1), stored);
    }

    #[test]
    fn test_bad_nonce() {
        let err = sha256_memory_response("", "root", "pw", b"short").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }
}
