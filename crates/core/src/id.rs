//! Trace and segment identifiers
//!
//! Identifiers follow the wire shape used by distributed-tracing backends:
//! a trace ID is `1-xxxxxxxx-yyyyyyyyyyyyyyyyyyyyyyyy` (version, epoch
//! seconds as 8 hex chars, 24 hex chars of randomness) and a segment ID is
//! 16 hex chars. Both are immutable once created.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The only trace ID version this crate understands.
pub const TRACE_ID_VERSION: u8 = 1;

/// Errors that can occur when parsing an identifier
#[derive(Error, Debug)]
pub enum IdParseError {
    #[error("Invalid trace ID format")]
    InvalidFormat,
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),
    #[error("Invalid timestamp field")]
    InvalidTimestamp,
    #[error("Invalid random field")]
    InvalidRandom,
    #[error("Invalid segment ID")]
    InvalidSegmentId,
}

/// Identifier of a single end-to-end trace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TraceId {
    epoch: u32,
    unique: [u8; 12],
}

impl TraceId {
    /// Create a new trace ID stamped with the current epoch second
    pub fn generate() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        let mut unique = [0u8; 12];
        let (hash1, hash2) = pseudo_random_pair(now.as_nanos());
        unique[..8].copy_from_slice(&hash1.to_be_bytes());
        unique[8..].copy_from_slice(&hash2.to_be_bytes()[..4]);

        Self {
            epoch: now.as_secs() as u32,
            unique,
        }
    }

    /// Epoch second at which this trace started
    pub fn epoch_seconds(&self) -> u32 {
        self.epoch
    }

    /// The 96-bit unique portion of the ID
    pub fn unique(&self) -> &[u8; 12] {
        &self.unique
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:x}-{:08x}-{}",
            TRACE_ID_VERSION,
            self.epoch,
            hex::encode(self.unique)
        )
    }
}

impl FromStr for TraceId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Format: version-epoch-random
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3 {
            return Err(IdParseError::InvalidFormat);
        }

        let version = u8::from_str_radix(parts[0], 16)
            .map_err(|_| IdParseError::UnsupportedVersion(parts[0].to_string()))?;
        if version != TRACE_ID_VERSION {
            return Err(IdParseError::UnsupportedVersion(format!("{version:x}")));
        }

        // Epoch is exactly 8 hex chars
        if parts[1].len() != 8 {
            return Err(IdParseError::InvalidTimestamp);
        }
        let epoch =
            u32::from_str_radix(parts[1], 16).map_err(|_| IdParseError::InvalidTimestamp)?;

        // Random portion is exactly 24 hex chars = 12 bytes
        if parts[2].len() != 24 {
            return Err(IdParseError::InvalidRandom);
        }
        let unique_vec = hex::decode(parts[2]).map_err(|_| IdParseError::InvalidRandom)?;
        let mut unique = [0u8; 12];
        unique.copy_from_slice(&unique_vec);

        if unique.iter().all(|&b| b == 0) {
            return Err(IdParseError::InvalidRandom);
        }

        Ok(Self { epoch, unique })
    }
}

/// Identifier of the active segment/span within a trace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentId([u8; 8]);

impl SegmentId {
    /// Create a new random segment ID
    pub fn generate() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        let (hash1, _) = pseudo_random_pair(now.as_nanos().wrapping_add(1));
        Self(hash1.to_le_bytes())
    }

    /// Raw bytes of the ID
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for SegmentId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(IdParseError::InvalidSegmentId);
        }
        let bytes_vec = hex::decode(s).map_err(|_| IdParseError::InvalidSegmentId)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&bytes_vec);

        if bytes.iter().all(|&b| b == 0) {
            return Err(IdParseError::InvalidSegmentId);
        }

        Ok(Self(bytes))
    }
}

/// Generate two pseudo-random words from a time seed plus thread identity.
///
/// Identifier quality only needs uniqueness across threads and calls, not
/// cryptographic strength; the tracing core owns real ID minting.
fn pseudo_random_pair(seed: u128) -> (u64, u64) {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);
    let hash1 = hasher.finish();

    hasher = DefaultHasher::new();
    hash1.hash(&mut hasher);
    seed.wrapping_add(1).hash(&mut hasher);
    let hash2 = hasher.finish();

    (hash1, hash2)
}
