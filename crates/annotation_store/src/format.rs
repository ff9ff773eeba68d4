//! On-disk format for a container's descriptors

use crate::{Result, StoreError};
use annotation_engine::{ContainerKey, Descriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File format version
pub const FORMAT_VERSION: u32 = 1;

/// File extension for annotation files
pub const FILE_EXTENSION: &str = "annotations.json";

/// File header for format identification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: String,
    pub version: u32,
    pub container_key: ContainerKey,
    pub modified: DateTime<Utc>,
}

impl FileHeader {
    pub const MAGIC: &'static str = "TEXT-ANNOTATIONS";

    pub fn new(container_key: ContainerKey) -> Self {
        Self {
            magic: Self::MAGIC.to_string(),
            version: FORMAT_VERSION,
            container_key,
            modified: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == Self::MAGIC && self.version <= FORMAT_VERSION
    }
}

/// Complete file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationFile {
    pub header: FileHeader,
    pub descriptors: Vec<Descriptor>,
}

/// Serialize a container's descriptors as pretty JSON
pub fn serialize(key: &ContainerKey, descriptors: &[Descriptor]) -> Result<String> {
    let file = AnnotationFile {
        header: FileHeader::new(key.clone()),
        descriptors: descriptors.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Parse a file written by [`serialize`], checking it belongs to `key`
pub fn deserialize(key: &ContainerKey, json: &str) -> Result<Vec<Descriptor>> {
    let file: AnnotationFile = serde_json::from_str(json)?;

    if !file.header.is_valid() {
        return Err(StoreError::InvalidFormat(format!(
            "Invalid or unsupported format version: {}",
            file.header.version
        )));
    }
    if &file.header.container_key != key {
        return Err(StoreError::InvalidFormat(format!(
            "File belongs to {}, not {}",
            file.header.container_key, key
        )));
    }

    Ok(file.descriptors)
}
