use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{
    error::{ForgeError, ForgeResult},
    model::{Candidate, Layer, LayerSet},
};

/// One layer declaration: a trait name and the directory holding its
/// candidate images. Declaration order becomes the LayerSet order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub dir: PathBuf,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }
}

/// Raw weight annotations, keyed by layer name then candidate base file
/// name (extension included). Candidates without an entry fall back to the
/// model's default-weight rule.
pub type WeightTable = BTreeMap<String, BTreeMap<String, f64>>;

pub fn read_weight_table(path: &Path) -> ForgeResult<WeightTable> {
    let bytes = std::fs::read(path).map_err(|e| {
        ForgeError::discovery(format!("read weight table '{}': {e}", path.display()))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ForgeError::discovery(format!("parse weight table '{}': {e}", path.display()))
    })
}

/// Build a LayerSet from layer directories, all candidates at the default
/// weight.
pub fn discover(specs: &[LayerSpec]) -> ForgeResult<LayerSet> {
    discover_weighted(specs, &WeightTable::new())
}

/// Build a LayerSet from layer directories, annotating candidates from the
/// weight table. File listing is sorted by name so a layer's candidate
/// order is stable across runs and platforms.
#[tracing::instrument(skip(specs, weights), fields(layers = specs.len()))]
pub fn discover_weighted(specs: &[LayerSpec], weights: &WeightTable) -> ForgeResult<LayerSet> {
    let mut set = LayerSet::default();
    for spec in specs {
        let layer_weights = weights.get(&spec.name);
        let mut candidates = Vec::new();
        for path in list_files(&spec.dir)? {
            let base = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    ForgeError::discovery(format!("unreadable file name in '{}'", path.display()))
                })?
                .to_string();
            let raw = layer_weights.and_then(|w| w.get(&base)).copied();
            let reference = path.to_string_lossy().into_owned();
            candidates.push(Candidate::weighted(reference, raw));
        }
        tracing::debug!(layer = %spec.name, candidates = candidates.len(), "discovered layer");
        set.push(Layer::new(&spec.name, candidates))?;
    }
    Ok(set)
}

fn list_files(dir: &Path) -> ForgeResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ForgeError::discovery(format!("read layer dir '{}': {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            ForgeError::discovery(format!("read layer dir '{}': {e}", dir.display()))
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
