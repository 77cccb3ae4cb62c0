//! Cached artifacts and their on-disk encoding.
//!
//! Every artifact file starts with a 4-byte little-endian header length, then
//! a bincode-encoded [`ArtifactHeader`] (magic bytes, format version and a
//! payload checksum), then the payload.

use bytes::Bytes;
use kiln_common::{CacheOutputType, ContentHash};
use kiln_graph::GraphTarget;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a kiln cache artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"KILN";

/// Current artifact format version. Increment on breaking changes to
/// the header or payload format.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A built product stored under a target's cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Artifact name, unique per cache key.
    pub name: String,
    /// Payload bytes.
    pub data: Bytes,
}

impl Artifact {
    /// Creates an artifact.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Name under which a target's artifact is stored, e.g. `Core.xcframework`.
pub fn artifact_name(target: &GraphTarget, output_type: CacheOutputType) -> String {
    format!("{}.{}", target.name, output_type.as_str())
}

/// Rejects names that would escape the hash directory or be hidden.
pub(crate) fn validate_name(name: &str) -> Result<(), CacheError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(CacheError::InvalidArtifactName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Header prepended to every stored artifact for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"KILN"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// kiln version that produced this artifact.
    pub kiln_version: String,

    /// Content hash of the payload data (for integrity checks).
    pub checksum: ContentHash,
}

/// Encodes a payload with its header.
pub(crate) fn encode(data: &[u8]) -> Result<Vec<u8>, CacheError> {
    let header = ArtifactHeader {
        magic: ARTIFACT_MAGIC,
        format_version: ARTIFACT_FORMAT_VERSION,
        kiln_version: env!("CARGO_PKG_VERSION").to_string(),
        checksum: ContentHash::from_bytes(data),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(data);
    Ok(output)
}

/// Decodes a stored artifact, returning `None` for anything that does not
/// validate: truncated data, wrong magic, another format version or a
/// checksum mismatch.
pub(crate) fn decode(raw: &[u8]) -> Option<&[u8]> {
    if raw.len() < 4 {
        return None;
    }
    let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
    if raw.len() < 4 + header_len {
        return None;
    }

    let header_bytes = &raw[4..4 + header_len];
    let (header, _): (ArtifactHeader, usize) =
        bincode::serde::decode_from_slice(header_bytes, bincode::config::standard()).ok()?;
    if header.magic != ARTIFACT_MAGIC || header.format_version != ARTIFACT_FORMAT_VERSION {
        return None;
    }

    let payload = &raw[4 + header_len..];
    (ContentHash::from_bytes(payload) == header.checksum).then_some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(header: &ArtifactHeader, payload: &[u8]) -> Vec<u8> {
        let header_bytes =
            bincode::serde::encode_to_vec(header, bincode::config::standard()).unwrap();
        let mut output = Vec::new();
        output.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(payload);
        output
    }

    fn header(magic: [u8; 4], format_version: u32, payload: &[u8]) -> ArtifactHeader {
        ArtifactHeader {
            magic,
            format_version,
            kiln_version: "0.1.0".to_string(),
            checksum: ContentHash::from_bytes(payload),
        }
    }

    #[test]
    fn encoded_payload_decodes() {
        let encoded = encode(b"framework bytes").unwrap();
        assert_eq!(decode(&encoded), Some(&b"framework bytes"[..]));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode(b"AB").is_none());
        assert!(decode(b"garbage data").is_none());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let raw = with_header(&header(*b"BAAD", ARTIFACT_FORMAT_VERSION, b"data"), b"data");
        assert!(decode(&raw).is_none());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let raw = with_header(&header(ARTIFACT_MAGIC, 999, b"data"), b"data");
        assert!(decode(&raw).is_none());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let header = header(ARTIFACT_MAGIC, ARTIFACT_FORMAT_VERSION, b"data");
        let raw = with_header(&header, b"tampered");
        assert!(decode(&raw).is_none());
    }

    #[test]
    fn names_are_validated() {
        assert!(validate_name("Core.xcframework").is_ok());
        for bad in ["", ".hidden", "../escape", "a/b", "a\\b"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn artifact_names_include_output_type() {
        let core = GraphTarget::new("/work/App", "Core");
        assert_eq!(artifact_name(&core, CacheOutputType::Xcframework), "Core.xcframework");
        assert_eq!(
            artifact_name(&core, CacheOutputType::XcframeworkSimulator),
            "Core.xcframework-simulator"
        );
    }
}
