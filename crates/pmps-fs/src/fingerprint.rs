//! SHA-256 content fingerprints
//!
//! A fingerprint is the digest of the full byte content together with the
//! exact byte count observed while streaming it. The size is never taken from
//! file metadata. Digests render in the canonical `sha256:<hex>` format.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::{Error, Result};

/// Prefix for all digests rendered by this module
const PREFIX: &str = "sha256:";

const CHUNK_SIZE: usize = 64 * 1024;

/// A SHA-256 digest over a complete byte stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without the `sha256:` prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First twelve hex characters, for compact tables.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidDigest {
            value: s.to_string(),
        };
        let hex = s.strip_prefix(PREFIX).unwrap_or(s);
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(invalid());
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Digest plus the byte length observed while hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub digest: Digest,
    pub size: u64,
}

/// Fingerprint an in-memory buffer.
pub fn fingerprint_bytes(content: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(content);
    Fingerprint {
        digest: Digest(hasher.finalize().into()),
        size: content.len() as u64,
    }
}

/// Fingerprint a byte stream, reading it to the end.
///
/// When `expected_len` is given, a stream that ends at any other length is
/// rejected. A read failure part way through is reported as
/// [`Error::IncompleteRead`]; a partial digest is never returned.
pub fn fingerprint_reader<R: Read>(mut reader: R, expected_len: Option<u64>) -> Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut size: u64 = 0;

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
                size += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::IncompleteRead {
                    received: size,
                    expected: expected_len,
                    message: e.to_string(),
                });
            }
        }
    }

    if let Some(expected) = expected_len
        && expected != size
    {
        return Err(Error::IncompleteRead {
            received: size,
            expected: Some(expected),
            message: "stream length does not match announced length".to_string(),
        });
    }

    Ok(Fingerprint {
        digest: Digest(hasher.finalize().into()),
        size,
    })
}

/// Fingerprint a local file by streaming its contents.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    fingerprint_reader(file, None)
}
