use rand::Rng;

use crate::{
    error::{ForgeError, ForgeResult},
    model::{Candidate, Combination, Layer, LayerSet},
};

/// How to select candidates when producing combinations.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub enum Policy {
    /// Full Cartesian product across all layers, weights ignored.
    Exhaustive,
    /// `count` independent draws, roulette-wheel per layer.
    Weighted { count: u64 },
    /// `count` independent draws, uniform per layer, weights ignored.
    Uniform { count: u64 },
}

/// Unified entry point. Exhaustive generation never touches the random
/// source; the random policies draw only from `rng`, so a seeded rng makes
/// the whole call deterministic.
#[tracing::instrument(skip(set, rng), fields(layers = set.len()))]
pub fn generate<R: Rng>(set: &LayerSet, policy: Policy, rng: &mut R) -> ForgeResult<Vec<Combination>> {
    match policy {
        Policy::Exhaustive => generate_exhaustive(set),
        Policy::Weighted { count } => generate_weighted(set, count, rng),
        Policy::Uniform { count } => generate_uniform(set, count, rng),
    }
}

/// Node in the partial-combination arena. `parent` points at the partial
/// this one extends; walking parents back to the root recovers the chosen
/// candidate index per layer.
#[derive(Clone, Copy, Debug)]
struct PartialNode {
    parent: Option<usize>,
    candidate_index: usize,
}

/// Full Cartesian product in layer declaration order.
///
/// Output order is lexicographic over (layer order, candidate order) with
/// the last-declared layer varying fastest. The expansion is iterative: an
/// arena of partial records plus an explicit work stack, so layer count
/// never translates into call depth.
///
/// An empty LayerSet yields an empty sequence; a layer with no candidates
/// is an error (the product would silently collapse to zero otherwise).
pub fn generate_exhaustive(set: &LayerSet) -> ForgeResult<Vec<Combination>> {
    if set.is_empty() {
        return Ok(Vec::new());
    }
    set.validate_for_selection()?;

    let layers = set.layers();
    let mut arena: Vec<PartialNode> = Vec::new();
    // (arena node that ends the partial, depth = layers already chosen)
    let mut stack: Vec<(Option<usize>, usize)> = vec![(None, 0)];
    let mut out = Vec::new();

    while let Some((node, depth)) = stack.pop() {
        if depth == layers.len() {
            out.push(materialize(layers, &arena, node));
            continue;
        }

        let layer = &layers[depth];
        // Push in reverse so the stack pops candidates in declaration
        // order, keeping the output lexicographic.
        for candidate_index in (0..layer.candidates.len()).rev() {
            arena.push(PartialNode {
                parent: node,
                candidate_index,
            });
            stack.push((Some(arena.len() - 1), depth + 1));
        }
    }

    tracing::debug!(combinations = out.len(), "exhaustive generation complete");
    Ok(out)
}

fn materialize(layers: &[Layer], arena: &[PartialNode], tail: Option<usize>) -> Combination {
    let mut chosen = Vec::with_capacity(layers.len());
    let mut cursor = tail;
    while let Some(idx) = cursor {
        let node = arena[idx];
        chosen.push(node.candidate_index);
        cursor = node.parent;
    }
    chosen.reverse();

    let mut comb = Combination::new();
    for (layer, candidate_index) in layers.iter().zip(chosen) {
        comb.insert(&layer.name, &layer.candidates[candidate_index].reference);
    }
    comb
}

/// `count` independent weighted-random draws. Each draw selects one
/// candidate per layer by roulette wheel over the layer's weights;
/// selections are independent across layers and across draws, and repeats
/// are expected (no de-duplication).
#[tracing::instrument(skip(set, rng), fields(layers = set.len()))]
pub fn generate_weighted<R: Rng>(
    set: &LayerSet,
    count: u64,
    rng: &mut R,
) -> ForgeResult<Vec<Combination>> {
    validate_random_request(set, count)?;

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut comb = Combination::new();
        for layer in set.layers() {
            let candidate = pick_weighted(layer, rng)?;
            comb.insert(&layer.name, &candidate.reference);
        }
        out.push(comb);
    }
    Ok(out)
}

/// `count` independent uniform-random draws, weights ignored.
#[tracing::instrument(skip(set, rng), fields(layers = set.len()))]
pub fn generate_uniform<R: Rng>(
    set: &LayerSet,
    count: u64,
    rng: &mut R,
) -> ForgeResult<Vec<Combination>> {
    validate_random_request(set, count)?;

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut comb = Combination::new();
        for layer in set.layers() {
            let idx = rng.gen_range(0..layer.candidates.len());
            comb.insert(&layer.name, &layer.candidates[idx].reference);
        }
        out.push(comb);
    }
    Ok(out)
}

fn validate_random_request(set: &LayerSet, count: u64) -> ForgeResult<()> {
    if count == 0 {
        return Err(ForgeError::invalid_argument("count must be >= 1"));
    }
    if set.is_empty() {
        return Err(ForgeError::invalid_argument(
            "layer set is empty, nothing to select",
        ));
    }
    set.validate_for_selection()
}

/// Roulette-wheel selection: draw uniformly in [0, total weight) and take
/// the first candidate whose cumulative weight reaches the draw.
fn pick_weighted<'a, R: Rng>(layer: &'a Layer, rng: &mut R) -> ForgeResult<&'a Candidate> {
    let total = layer.total_weight();
    if !(total > 0.0) {
        return Err(ForgeError::zero_weight_layer(&layer.name));
    }

    let draw = rng.gen_range(0.0..total);
    let mut accumulated = 0.0;
    for candidate in &layer.candidates {
        accumulated += candidate.weight;
        if accumulated >= draw {
            return Ok(candidate);
        }
    }
    // Floating-point accumulation can undershoot `total` by one ulp; the
    // draw then belongs to the final candidate.
    layer
        .candidates
        .last()
        .ok_or_else(|| ForgeError::empty_layer(&layer.name))
}
