//! Error types shared across the bidder.

use thiserror::Error;

/// Errors surfaced by the bidder.
///
/// A "no bid" outcome is not an error: it is reported through
/// [`Decision::folder_id`](crate::decision::Decision) being `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BidderError {
    /// The catalog loader failed; the previously published catalog stays live.
    #[error("catalog reload failed: {0}")]
    Reload(String),

    /// Loaded rows violate a catalog invariant.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// A cache backend failed to store or load.
    #[error("cache backend error: {0}")]
    CacheIo(String),

    /// Nothing is stored under the key.
    #[error("cache miss for key '{key}'")]
    CacheMiss { key: String },

    /// The key is already taken in a write-once store.
    #[error("key '{key}' already exists")]
    KeyCollision { key: String },

    /// The random id issuer ran out of attempts.
    #[error("no free recall handle after {attempts} attempts: {last}")]
    IdExhausted { attempts: usize, last: Box<BidderError> },

    /// Encoding or decoding a stored value failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Configuration could not be read or is out of range.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BidderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_names_last_failure() {
        let err = BidderError::IdExhausted {
            attempts: 7,
            last: Box::new(BidderError::KeyCollision {
                key: "42".to_string(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("7 attempts"));
        assert!(msg.contains("key '42' already exists"));
    }
}
