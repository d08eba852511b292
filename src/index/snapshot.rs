//! On-disk persistence for [`FlatIndex`].
//!
//! The layout is a JSON document carrying the metric, the established
//! dimension, and every entry, so `load(save(index))` answers queries
//! identically to the original.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use super::flat::FlatIndex;
use super::{IndexEntry, Metric};
use crate::types::VellumError;

/// Serializable image of a [`FlatIndex`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub metric: Metric,
    pub dimension: Option<usize>,
    pub entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Writes a snapshot of this index to `path`, creating parent
    /// directories as needed.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), VellumError> {
        let path = path.as_ref();
        let serialized = serde_json::to_vec(&self.snapshot())
            .map_err(|err| VellumError::Storage(err.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, serialized).await?;
        tracing::debug!(path = %path.display(), entries = self.len(), "index snapshot saved");
        Ok(())
    }

    /// Rebuilds an index from a snapshot previously written by
    /// [`save`](Self::save).
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, VellumError> {
        let data = fs::read(path.as_ref()).await?;
        let snapshot: IndexSnapshot =
            serde_json::from_slice(&data).map_err(|err| VellumError::Storage(err.to_string()))?;
        Self::from_snapshot(snapshot)
    }
}
