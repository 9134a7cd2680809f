//! Save a label volume, drop all in-memory state, reload it from disk and
//! check what came back

use crate::error::{Result, RoundTripError};
use crate::scene::{Scene, SceneNode};
use crate::storage::{FileFormat, LabelStore, StorageDescriptor};
use crate::types::VolumeClass;
use crate::utils::is_plain_file_name;
use crate::volume::VolumeImage;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of a successful save
#[derive(Debug, Clone)]
pub struct SavedLabel {
    pub descriptor: StorageDescriptor,
    /// Fully qualified path captured from the descriptor
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Drives the write/clear/reload/verify sequence over a store and a scene
pub struct RoundTripPersistor<'a> {
    store: &'a dyn LabelStore,
    scene: &'a dyn Scene,
    output_dir: PathBuf,
    format: FileFormat,
}

impl<'a> RoundTripPersistor<'a> {
    pub fn new(
        store: &'a dyn LabelStore,
        scene: &'a dyn Scene,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            store,
            scene,
            output_dir: output_dir.as_ref().to_path_buf(),
            format: FileFormat::default(),
        }
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    /// Bind a fresh descriptor to `label` and write it.
    ///
    /// Any store error, or a write reporting zero bytes, is a
    /// [`RoundTripError::WriteFailed`]. So is a volume name that would not
    /// land directly inside the output directory; nothing is written then.
    pub async fn save(&self, label: &VolumeImage) -> Result<SavedLabel> {
        if !is_plain_file_name(label.name()) {
            return Err(RoundTripError::WriteFailed {
                path: self.output_dir.clone(),
                reason: format!("'{}' is not a plain file name", label.name()),
            });
        }

        let descriptor = StorageDescriptor::new(label.name(), &self.output_dir, self.format);
        let path = descriptor.full_path();
        info!(file = %descriptor.file_name(), "created storage descriptor");

        let bytes_written = self
            .store
            .write_image(label, &descriptor)
            .await
            .map_err(|e| RoundTripError::WriteFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if bytes_written == 0 {
            return Err(RoundTripError::WriteFailed {
                path,
                reason: "store reported zero bytes written".to_string(),
            });
        }

        info!(path = %path.display(), bytes = bytes_written, "saved label volume");
        Ok(SavedLabel {
            descriptor,
            path,
            bytes_written,
        })
    }

    /// Clear the scene, load the saved file back into it and find the entity
    /// named `expected_name`.
    ///
    /// The clear always happens first so the lookup can only see what was
    /// parsed from disk.
    pub async fn reload(&self, saved: &SavedLabel, expected_name: &str) -> Result<SceneNode> {
        info!(path = %saved.path.display(), "clearing scene before reload");
        self.scene.clear();

        let loaded = self
            .store
            .load_label_image(&saved.path)
            .await
            .map_err(|e| RoundTripError::ReloadFailed {
                path: saved.path.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| RoundTripError::ReloadFailed {
                path: saved.path.clone(),
                reason: "load returned no entity".to_string(),
            })?;

        info!(loaded = %loaded.summary(), "reloaded label file");
        self.scene.add(loaded);

        self.scene
            .lookup(expected_name)
            .ok_or_else(|| RoundTripError::IdentityNotFound(expected_name.to_string()))
    }

    /// Check that the reloaded entity is classified as a label volume
    pub fn verify(&self, saved: &SavedLabel, node: &SceneNode) -> Result<()> {
        let observed = node.volume.read().class();
        if observed != VolumeClass::Label {
            return Err(RoundTripError::ClassificationMismatch {
                path: saved.path.clone(),
                observed,
            });
        }
        Ok(())
    }

    /// Save, clear, reload and verify in one go
    pub async fn round_trip(&self, label: &VolumeImage) -> Result<(SavedLabel, SceneNode)> {
        let saved = self.save(label).await?;
        let node = self.reload(&saved, label.name()).await?;
        self.verify(&saved, &node)?;
        Ok((saved, node))
    }
}
