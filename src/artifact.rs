//! Versioned on-disk envelope for trained models
//!
//! An artifact is a bincode-encoded [`ArtifactHeader`] followed by the
//! bincode-encoded payload. The header carries a magic tag, the format
//! version, the payload kind, the fingerprint of the model's feature layout
//! and a SHA-256 digest of the payload bytes, so a file written by a
//! different format or truncated on disk is rejected with
//! [`EvalSenseError::IncompatibleArtifact`] rather than half-loaded.
//!
//! Writes go to a sibling temp file that is renamed over the target, so
//! readers see either the old model or the new one.

use crate::error::{EvalSenseError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use bincode::Options;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MAGIC: [u8; 4] = *b"EVSN";
pub const FORMAT_VERSION: u32 = 1;

/// Magic tag plus little-endian format version, stable across format versions
const PREFIX_LEN: usize = 8;

/// What a payload decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Sentiment,
    BatchAnomaly,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Sentiment => write!(f, "sentiment"),
            ArtifactKind::BatchAnomaly => write!(f, "batch-anomaly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub kind: ArtifactKind,
    /// Feature-layout fingerprint supplied by the model (vocabulary hash etc.)
    pub fingerprint: String,
    /// Hex SHA-256 of the encoded payload
    pub payload_digest: String,
    pub created_at: DateTime<Utc>,
}

fn digest_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Encode `payload` under a fresh header and atomically replace `path`
pub fn write_artifact<T: Serialize>(
    path: &Path,
    kind: ArtifactKind,
    fingerprint: &str,
    payload: &T,
) -> Result<ArtifactHeader> {
    let body = bincode::serialize(payload)?;
    let header = ArtifactHeader {
        magic: MAGIC,
        format_version: FORMAT_VERSION,
        kind,
        fingerprint: fingerprint.to_string(),
        payload_digest: digest_hex(&body),
        created_at: Utc::now(),
    };

    let mut bytes = bincode::serialize(&header)?;
    bytes.extend_from_slice(&body);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    std::fs::write(&tmp, &bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    info!("Saved {} artifact to {:?} ({} bytes)", kind, path, bytes.len());
    Ok(header)
}

/// Read and verify an artifact of the expected kind
pub fn read_artifact<T: DeserializeOwned>(path: &Path, expected: ArtifactKind) -> Result<(ArtifactHeader, T)> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(EvalSenseError::ArtifactNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    if bytes.len() < PREFIX_LEN || bytes[..4] != MAGIC {
        return Err(EvalSenseError::IncompatibleArtifact(format!(
            "{:?} is not an evalsense artifact",
            path
        )));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..PREFIX_LEN]);
    let format_version = u32::from_le_bytes(version);
    if format_version != FORMAT_VERSION {
        return Err(EvalSenseError::IncompatibleArtifact(format!(
            "format version {} in {:?}, expected {}",
            format_version, path, FORMAT_VERSION
        )));
    }

    // Length prefixes inside the header may not claim more than the file holds
    let mut cursor = Cursor::new(bytes.as_slice());
    let header: ArtifactHeader = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(bytes.len() as u64)
        .deserialize_from(&mut cursor)
        .map_err(|e| EvalSenseError::IncompatibleArtifact(format!("unreadable header in {:?}: {}", path, e)))?;

    if header.kind != expected {
        return Err(EvalSenseError::IncompatibleArtifact(format!(
            "{:?} holds a {} model, expected {}",
            path, header.kind, expected
        )));
    }

    let body = &bytes[cursor.position() as usize..];
    if digest_hex(body) != header.payload_digest {
        return Err(EvalSenseError::IncompatibleArtifact(format!(
            "payload fingerprint mismatch in {:?}",
            path
        )));
    }

    let payload: T = bincode::deserialize(body)
        .map_err(|e| EvalSenseError::IncompatibleArtifact(format!("undecodable payload in {:?}: {}", path, e)))?;

    debug!("Loaded {} artifact from {:?} (created {})", header.kind, path, header.created_at);
    Ok((header, payload))
}

/// Fail unless a decoded model reproduces the fingerprint recorded at save time
pub fn verify_fingerprint(header: &ArtifactHeader, actual: &str) -> Result<()> {
    if header.fingerprint != actual {
        return Err(EvalSenseError::IncompatibleArtifact(format!(
            "{} fingerprint {} does not match recorded {}",
            header.kind, actual, header.fingerprint
        )));
    }
    Ok(())
}

/// Hex SHA-256 of arbitrary bytes, for models building their own fingerprint
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    digest_hex(bytes)
}
