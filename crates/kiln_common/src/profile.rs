//! Cache profiles and output types: the build variants a cache key distinguishes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named build variant whose settings participate in every target hash.
///
/// Two otherwise identical targets built with different profiles produce
/// different artifacts, so they must never share a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheProfile {
    /// Profile name, e.g. `"default"` or `"release"`.
    pub name: String,
    /// Build configuration used to produce artifacts.
    pub configuration: String,
    /// Architectures artifacts are built for.
    #[serde(default)]
    pub architectures: Vec<String>,
    /// Extra build settings applied when building artifacts.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl CacheProfile {
    /// Creates a profile with no architectures or extra settings.
    pub fn new(name: impl Into<String>, configuration: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: configuration.into(),
            architectures: Vec::new(),
            settings: BTreeMap::new(),
        }
    }
}

/// Kind of artifact stored for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CacheOutputType {
    /// An xcframework with device and simulator slices.
    #[serde(rename = "xcframework")]
    Xcframework,
    /// An xcframework with the device slice only.
    #[serde(rename = "xcframework-device")]
    XcframeworkDevice,
    /// An xcframework with the simulator slice only.
    #[serde(rename = "xcframework-simulator")]
    XcframeworkSimulator,
}

impl CacheOutputType {
    /// Discriminator string appended to every target hash.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheOutputType::Xcframework => "xcframework",
            CacheOutputType::XcframeworkDevice => "xcframework-device",
            CacheOutputType::XcframeworkSimulator => "xcframework-simulator",
        }
    }
}

impl fmt::Display for CacheOutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised output type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cache output type '{0}' (expected xcframework, xcframework-device or xcframework-simulator)")]
pub struct ParseOutputTypeError(pub String);

impl FromStr for CacheOutputType {
    type Err = ParseOutputTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xcframework" => Ok(CacheOutputType::Xcframework),
            "xcframework-device" | "device" => Ok(CacheOutputType::XcframeworkDevice),
            "xcframework-simulator" | "simulator" => Ok(CacheOutputType::XcframeworkSimulator),
            other => Err(ParseOutputTypeError(other.to_string())),
        }
    }
}
