use sha2::{Digest, Sha256};
use uuid::Uuid;

const HASH_ROUNDS: u32 = 10_000;
const TOKEN_LENGTH: usize = 40;

pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new_salt() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Iterated, salted SHA-256 of the password as lowercase hex.
    pub fn hash(password: &str, salt: &str) -> String {
        let mut digest = Sha256::new()
            .chain_update(salt.as_bytes())
            .chain_update(b":")
            .chain_update(password.as_bytes())
            .finalize();

        for _ in 1..HASH_ROUNDS {
            digest = Sha256::new()
                .chain_update(salt.as_bytes())
                .chain_update(digest)
                .finalize();
        }

        hex::encode(digest)
    }

    pub fn verify(password: &str, salt: &str, expected_hash: &str) -> bool {
        constant_time_eq(
            Self::hash(password, salt).as_bytes(),
            expected_hash.as_bytes(),
        )
    }
}

/// Opaque 40 hex character API token.
pub fn generate_token() -> String {
    let digest = Sha256::new()
        .chain_update(Uuid::new_v4().as_bytes())
        .chain_update(Uuid::new_v4().as_bytes())
        .finalize();
    let mut token = hex::encode(digest);
    token.truncate(TOKEN_LENGTH);
    token
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
