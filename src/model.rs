use crate::error::{ForgeError, ForgeResult};

/// One selectable asset inside a layer.
///
/// The weight only matters to weighted-random generation. Weight
/// normalization is a single rule applied here at construction time: a
/// missing or non-positive raw weight becomes 1.0. Selection code never
/// re-interprets raw weights.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candidate {
    pub reference: String,
    pub weight: f64,
}

impl Candidate {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            weight: 1.0,
        }
    }

    /// Build a candidate from a raw weight annotation, applying the
    /// "missing or <= 0 means 1" normalization rule.
    pub fn weighted(reference: impl Into<String>, raw_weight: Option<f64>) -> Self {
        let weight = match raw_weight {
            Some(w) if w > 0.0 => w,
            _ => 1.0,
        };
        Self {
            reference: reference.into(),
            weight,
        }
    }
}

/// A named trait category with its ordered candidate assets.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub name: String,
    pub candidates: Vec<Candidate>,
}

impl Layer {
    pub fn new(name: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            name: name.into(),
            candidates,
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.candidates.iter().map(|c| c.weight).sum()
    }
}

/// An ordered set of layers. Insertion order is the trait iteration order
/// used for compositing and metadata attributes; it is preserved, never
/// re-sorted.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct LayerSet {
    layers: Vec<Layer>,
}

impl LayerSet {
    pub fn new(layers: Vec<Layer>) -> ForgeResult<Self> {
        let mut set = Self::default();
        for layer in layers {
            set.push(layer)?;
        }
        Ok(set)
    }

    pub fn push(&mut self, layer: Layer) -> ForgeResult<()> {
        if self.layers.iter().any(|l| l.name == layer.name) {
            return Err(ForgeError::invalid_argument(format!(
                "duplicate layer name '{}'",
                layer.name
            )));
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Size of the exhaustive Cartesian product, without generating it.
    /// Callers should consult this before exhaustive generation since the
    /// product grows combinatorially; the generator itself does not cap it.
    pub fn combination_count(&self) -> u128 {
        self.layers
            .iter()
            .map(|l| l.candidates.len() as u128)
            .product()
    }

    /// Every layer must have at least one candidate for any selection to
    /// be possible. Reports the first offending layer by name.
    pub fn validate_for_selection(&self) -> ForgeResult<()> {
        for layer in &self.layers {
            if layer.candidates.is_empty() {
                return Err(ForgeError::empty_layer(&layer.name));
            }
        }
        Ok(())
    }
}

/// One full trait assignment: exactly one chosen candidate reference per
/// layer in the originating LayerSet. Entries keep the order in which the
/// generator inserted them; consumers that need the display order iterate
/// the LayerSet and look entries up by name.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Combination {
    entries: Vec<(String, String)>,
}

impl Combination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: impl Into<String>, reference: impl Into<String>) {
        self.entries.push((layer.into(), reference.into()));
    }

    pub fn get(&self, layer: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == layer)
            .map(|(_, r)| r.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r.as_str()))
    }
}
