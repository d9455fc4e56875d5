#![forbid(unsafe_code)]

pub mod compose;
pub mod discover;
pub mod error;
pub mod generate;
pub mod metadata;
pub mod model;
pub mod publish;

pub use discover::{LayerSpec, WeightTable};
pub use error::{ForgeError, ForgeResult};
pub use generate::{Policy, generate, generate_exhaustive, generate_uniform, generate_weighted};
pub use metadata::{Attribute, MetadataRecord, RecordParams, synthesize, synthesize_all};
pub use model::{Candidate, Combination, Layer, LayerSet};
pub use publish::{AssetStore, DirStore};
