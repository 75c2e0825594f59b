//! Content digests with streaming support.
//!
//! # Overview
//!
//! [`digest`] consumes a [`ByteSource`] front to back in fixed-size chunks
//! and produces a 256-bit [`Digest`]. Memory use is bounded by the chunk
//! size regardless of input length. SHA-256 is the default so digests match
//! cache files written by earlier tooling; BLAKE3 is available when speed
//! matters more than compatibility.
//!
//! # Example
//!
//! ```
//! use changecache::digest::{digest, BufferSource, DigestAlgorithm};
//!
//! let d = digest(&mut BufferSource::new(b"Hello World!\n"), DigestAlgorithm::Sha256).unwrap();
//! assert_eq!(
//!     d.to_string(),
//!     "03ba204e50d126e4674c005e04d82e84c21366780af1f43bd54a37816b6ab340"
//! );
//! ```

pub mod source;

use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

pub use source::{BufferSource, ByteSource, FileSource, StreamSource};

/// Read buffer size for streaming digests (64KB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Length of a digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Hash function used to fingerprint content.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::Blake3 => f.write_str("blake3"),
        }
    }
}

/// Fixed-length content fingerprint.
///
/// Rendered and persisted as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Parse a hex string, accepting either case.
    pub fn from_hex(hex: &str) -> Result<Self, ParseDigestError> {
        if hex.len() != DIGEST_LEN * 2 {
            return Err(ParseDigestError::Length(hex.len()));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        for (i, pair) in hex.as_bytes().chunks_exact(2).enumerate() {
            let hi = hex_value(pair[0]).ok_or(ParseDigestError::InvalidChar(i * 2))?;
            let lo = hex_value(pair[1]).ok_or(ParseDigestError::InvalidChar(i * 2 + 1))?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Error returned when a string is not a valid hex digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDigestError {
    /// Wrong number of characters.
    #[error("expected {} hex characters, got {0}", DIGEST_LEN * 2)]
    Length(usize),
    /// A character outside `[0-9a-fA-F]`.
    #[error("invalid hex character at position {0}")]
    InvalidChar(usize),
}

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({:02x}{:02x}{:02x}{:02x}..)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

enum Engine {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Engine {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finish(self) -> Digest {
        let mut bytes = [0u8; DIGEST_LEN];
        match self {
            Self::Sha256(h) => bytes.copy_from_slice(&h.finalize()),
            Self::Blake3(h) => bytes = *h.finalize().as_bytes(),
        }
        Digest(bytes)
    }
}

/// Digest a byte source to completion.
///
/// The source is read once, in order. Interrupted reads are retried; any
/// other read error aborts and no digest is produced.
///
/// # Arguments
///
/// * `source` - The content, consumed in [`CHUNK_SIZE`] pieces
/// * `algorithm` - Hash function to apply
///
/// # Returns
///
/// The digest of every byte the source yielded before reporting end of input.
///
/// # Errors
///
/// Returns the first I/O error reported by the source.
///
/// # Example
///
/// ```
/// use changecache::digest::{digest, digest_bytes, DigestAlgorithm, StreamSource};
/// use std::io::Cursor;
///
/// let mut source = StreamSource::new(Cursor::new(b"abc".to_vec()));
/// let d = digest(&mut source, DigestAlgorithm::Blake3)?;
/// assert_eq!(d, digest_bytes(b"abc", DigestAlgorithm::Blake3));
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn digest<S: ByteSource + ?Sized>(
    source: &mut S,
    algorithm: DigestAlgorithm,
) -> io::Result<Digest> {
    let mut engine = Engine::new(algorithm);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match source.read_chunk(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        engine.update(&buf[..n]);
        total += n as u64;
    }

    let d = engine.finish();
    log::trace!("Digested {} bytes with {}: {}", total, algorithm, d);
    Ok(d)
}

/// Digest an in-memory buffer.
#[must_use]
pub fn digest_bytes(data: &[u8], algorithm: DigestAlgorithm) -> Digest {
    let mut engine = Engine::new(algorithm);
    engine.update(data);
    engine.finish()
}
