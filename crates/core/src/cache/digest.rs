//! Cache key derivation.

use sha2::{Digest, Sha256};

/// Compute the cache digest for a fully built upstream URL.
///
/// The key depends on nothing but the URL string, so distinct owners,
/// repositories, branches or paths always land in distinct entries.
pub fn digest_of(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}
