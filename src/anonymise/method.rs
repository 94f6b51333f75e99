use crate::AnonymiseError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Namespace for name-based UUID identifiers
const UUID_NAMESPACE: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_123456789012);

/// How anonymous identifiers are derived from user names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnonymiseMethod {
    /// `user_` + leading hex digits of SHA-256(name, seed)
    #[default]
    Hash,
    /// `user_` + random alphanumerics drawn from an RNG seeded by (name, seed)
    RandomString,
    /// `user_` + leading hex digits of a name-based UUID
    Uuid,
    /// `user_` + zero-padded first-seen counter
    Sequential,
    /// Leading decimal digits of SHA-256(name, seed), zero padded
    Numeric,
}

impl AnonymiseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::RandomString => "random_string",
            Self::Uuid => "uuid",
            Self::Sequential => "sequential",
            Self::Numeric => "numeric",
        }
    }
}

impl fmt::Display for AnonymiseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnonymiseMethod {
    type Err = AnonymiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(Self::Hash),
            "random_string" => Ok(Self::RandomString),
            "uuid" => Ok(Self::Uuid),
            "sequential" => Ok(Self::Sequential),
            "numeric" => Ok(Self::Numeric),
            other => Err(AnonymiseError::UnknownMethod(other.to_string())),
        }
    }
}

fn salted_digest(name: &str, seed: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(seed.to_string().as_bytes());
    hasher.finalize().into()
}

pub(super) fn hash_id(name: &str, seed: u64, id_length: usize) -> String {
    let hex = hex::encode(salted_digest(name, seed));
    format!("user_{}", &hex[..id_length.min(hex.len())])
}

pub(super) fn random_string_id(name: &str, seed: u64, id_length: usize) -> String {
    let digest = salted_digest(name, seed);
    let mut rng = StdRng::from_seed(digest);
    let id: String = (0..id_length)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("user_{}", id)
}

pub(super) fn uuid_id(name: &str, seed: u64, id_length: usize) -> String {
    let salted = format!("{}{}", name, seed);
    let uuid = Uuid::new_v5(&UUID_NAMESPACE, salted.as_bytes());
    let simple = uuid.simple().to_string();
    format!("user_{}", &simple[..id_length.min(simple.len())])
}

pub(super) fn sequential_id(counter: u64, id_length: usize) -> String {
    format!("user_{:0width$}", counter, width = id_length)
}

pub(super) fn numeric_id(name: &str, seed: u64, id_length: usize) -> String {
    let digest = salted_digest(name, seed);
    let mut high = [0u8; 16];
    high.copy_from_slice(&digest[..16]);
    let digits = u128::from_be_bytes(high).to_string();
    let prefix = &digits[..id_length.min(digits.len())];
    format!("{:0>width$}", prefix, width = id_length)
}
