//! Disk-backed cache for upstream responses.
//!
//! Each cached URL owns two flat files in the cache directory, both named by
//! the SHA-256 digest of the URL:
//!
//! - `<digest>.bin` holds the response body verbatim
//! - `<digest>.json` holds the metadata record (timestamp, status, content type)
//!
//! There is no index. Presence is checked by deriving both file names from
//! the digest. Entries are overwritten wholesale on every successful fetch and
//! are never deleted, so the directory grows with the number of distinct URLs
//! served.

pub mod digest;
pub mod store;

pub use crate::Error;

pub use digest::digest_of;
pub use store::{CacheEntry, CacheMeta, CacheStore, SaveOutcome};
