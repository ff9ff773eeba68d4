//! Persistence gateway - where descriptors are loaded from and saved to
//!
//! The engine only knows this trait. Storage backends live in the
//! `annotation_store` crate or in the host application.

use crate::{Descriptor, EngineError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

fn segment_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^/\x00-\x1f\x7f]{1,256}$").ok())
        .as_ref()
}

fn valid_segment(segment: &str) -> bool {
    segment_pattern().is_some_and(|re| re.is_match(segment))
}

/// Identifies one container: a document plus an optional section within it.
///
/// Both parts are opaque host strings; they only have to be non-empty and
/// free of `/` and control characters. Serialized as `document` or
/// `document/section`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerKey {
    document: String,
    section: Option<String>,
}

impl ContainerKey {
    /// Create a key, validating both parts
    pub fn new(document: &str, section: Option<&str>) -> Result<Self> {
        if !valid_segment(document) {
            return Err(EngineError::InvalidContainerKey(document.to_string()));
        }
        if let Some(section) = section {
            if !valid_segment(section) {
                return Err(EngineError::InvalidContainerKey(section.to_string()));
            }
        }
        Ok(Self {
            document: document.to_string(),
            section: section.map(str::to_string),
        })
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section {
            Some(section) => write!(f, "{}/{}", self.document, section),
            None => f.write_str(&self.document),
        }
    }
}

impl FromStr for ContainerKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((document, section)) => Self::new(document, Some(section)),
            None => Self::new(s, None),
        }
    }
}

impl TryFrom<String> for ContainerKey {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ContainerKey> for String {
    fn from(key: ContainerKey) -> Self {
        key.to_string()
    }
}

/// Errors reported by a persistence backend
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

/// Storage for the descriptors of each container.
///
/// Methods take `&self` so implementations can be shared between sessions;
/// use interior mutability (`RwLock`, `Mutex`) for state.
pub trait PersistenceGateway: Send + Sync {
    /// All descriptors saved for a container, empty if none were ever saved
    fn load(&self, key: &ContainerKey) -> std::result::Result<Vec<Descriptor>, GatewayError>;

    /// Replace the saved descriptors of a container
    fn save(&self, key: &ContainerKey, descriptors: &[Descriptor]) -> std::result::Result<(), GatewayError>;

    /// Forget a container entirely
    fn discard(&self, key: &ContainerKey) -> std::result::Result<(), GatewayError> {
        self.save(key, &[])
    }
}
