use std::path::{Path, PathBuf};

use crate::{
    compose::image_output_path,
    error::{ForgeError, ForgeResult},
    metadata::{MetadataRecord, RecordParams, synthesize},
    model::{Combination, LayerSet},
};

/// Output path for the metadata document of the combination at `index`,
/// mirroring the image file naming.
pub fn metadata_output_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{index}.json"))
}

/// Write one record as pretty-printed JSON named by its ordinal.
pub fn write_record(dir: &Path, index: u64, record: &MetadataRecord) -> ForgeResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ForgeError::publish(format!("create metadata dir '{}': {e}", dir.display()))
    })?;
    let path = metadata_output_path(dir, index);
    let json = serde_json::to_vec_pretty(record)
        .map_err(|e| ForgeError::publish(format!("serialize record {index}: {e}")))?;
    std::fs::write(&path, json)
        .map_err(|e| ForgeError::publish(format!("write '{}': {e}", path.display())))?;
    Ok(path)
}

/// Write a whole batch, indices contiguous from 0 in input order.
#[tracing::instrument(skip(records), fields(count = records.len()))]
pub fn write_all(dir: &Path, records: &[MetadataRecord]) -> ForgeResult<Vec<PathBuf>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| write_record(dir, index as u64, record))
        .collect()
}

/// The remote pinning boundary. Implementations take an asset and return a
/// content-addressed locator for it; network-backed stores plug in here,
/// the engine itself stays offline.
pub trait AssetStore {
    fn put_image(&mut self, index: u64, path: &Path) -> ForgeResult<String>;
    fn put_record(&mut self, index: u64, record: &MetadataRecord) -> ForgeResult<String>;
}

/// Store that "pins" into a local directory: images are copied, records
/// are written as JSON, and the locator is the destination path.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for DirStore {
    fn put_image(&mut self, index: u64, path: &Path) -> ForgeResult<String> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            ForgeError::publish(format!("create store dir '{}': {e}", self.root.display()))
        })?;
        let dest = image_output_path(&self.root, index);
        std::fs::copy(path, &dest).map_err(|e| {
            ForgeError::publish(format!(
                "copy '{}' to '{}': {e}",
                path.display(),
                dest.display()
            ))
        })?;
        Ok(dest.to_string_lossy().into_owned())
    }

    fn put_record(&mut self, index: u64, record: &MetadataRecord) -> ForgeResult<String> {
        let path = write_record(&self.root, index, record)?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Publish an already-rendered collection: for each combination, store its
/// image, synthesize the record with the returned locator as the image
/// URI, store the record. Returns (index, record locator) pairs in order.
///
/// Expects the images to exist under `images_dir` named by ordinal, i.e.
/// the output of `compose::render_all` on the same combination sequence.
#[tracing::instrument(skip(set, combinations, params, store), fields(count = combinations.len()))]
pub fn publish_collection(
    set: &LayerSet,
    combinations: &[Combination],
    params: &RecordParams,
    images_dir: &Path,
    store: &mut dyn AssetStore,
) -> ForgeResult<Vec<(u64, String)>> {
    let mut published = Vec::with_capacity(combinations.len());
    for (i, combination) in combinations.iter().enumerate() {
        let index = i as u64;
        let image_path = image_output_path(images_dir, index);
        let image_locator = store.put_image(index, &image_path)?;

        let mut record_params = params.clone();
        record_params.image = image_locator;
        let record = synthesize(set, combination, index, &record_params)?;

        let locator = store.put_record(index, &record)?;
        tracing::debug!(index, %locator, "published combination");
        published.push((index, locator));
    }
    Ok(published)
}
