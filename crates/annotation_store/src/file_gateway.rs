//! JSON file persistence gateway
//!
//! One file per container under a base directory. The file name is the
//! percent-encoded container key, so `doc/part-1` is stored as
//! `doc%2Fpart-1.annotations.json`.

use crate::{deserialize, serialize, Result, FILE_EXTENSION};
use annotation_engine::{ContainerKey, Descriptor, GatewayError, PersistenceGateway};
use std::path::{Path, PathBuf};

/// Stores each container's descriptors as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    dir: PathBuf,
}

impl JsonFileGateway {
    /// Use `dir` as the base directory; it is created on the first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding a container's descriptors
    pub fn path_for(&self, key: &ContainerKey) -> PathBuf {
        let name = urlencoding::encode(&key.to_string()).into_owned();
        self.dir.join(format!("{}.{}", name, FILE_EXTENSION))
    }

    /// Read a container's descriptors; a missing file is an empty list
    pub fn read(&self, key: &ContainerKey) -> Result<Vec<Descriptor>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&path)?;
        deserialize(key, &json)
    }

    /// Write a container's descriptors, replacing the previous file
    pub fn write(&self, key: &ContainerKey, descriptors: &[Descriptor]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serialize(key, descriptors)?;

        // Write beside the target, then rename over it
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        tracing::trace!(path = %path.display(), count = descriptors.len(), "annotations written");
        Ok(())
    }

    /// Delete a container's file if it exists
    pub fn remove(&self, key: &ContainerKey) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl PersistenceGateway for JsonFileGateway {
    fn load(&self, key: &ContainerKey) -> std::result::Result<Vec<Descriptor>, GatewayError> {
        Ok(self.read(key)?)
    }

    fn save(&self, key: &ContainerKey, descriptors: &[Descriptor]) -> std::result::Result<(), GatewayError> {
        Ok(self.write(key, descriptors)?)
    }

    fn discard(&self, key: &ContainerKey) -> std::result::Result<(), GatewayError> {
        Ok(self.remove(key)?)
    }
}
