use std::path::Path;

use crate::{
    error::{ForgeError, ForgeResult},
    model::{Combination, LayerSet},
};

/// One trait pair in the off-chain metadata document.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

/// Off-chain metadata for one combination. Field order here is the JSON
/// field order. `animation_url` is omitted from the document when absent,
/// never serialized as an empty string.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    pub external_url: String,
    pub attributes: Vec<Attribute>,
    pub properties: serde_json::Value,
}

/// Presentation inputs shared by every record in a batch. `properties` is
/// an opaque passthrough; the engine never interprets its shape.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RecordParams {
    pub image: String,
    pub description: String,
    pub external_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    pub properties: serde_json::Value,
}

/// Map one combination to its metadata record.
///
/// Attributes follow the LayerSet's declared layer order regardless of the
/// combination's internal entry order; one attribute per layer, trait_type
/// = layer name, value = the candidate reference's base name with the
/// directory prefix and file extension stripped. Repeatable: identical
/// inputs produce byte-identical records.
pub fn synthesize(
    set: &LayerSet,
    combination: &Combination,
    index: u64,
    params: &RecordParams,
) -> ForgeResult<MetadataRecord> {
    let mut attributes = Vec::with_capacity(set.len());
    for layer in set.layers() {
        let reference = combination.get(&layer.name).ok_or_else(|| {
            ForgeError::invalid_argument(format!(
                "combination is missing layer '{}'",
                layer.name
            ))
        })?;
        attributes.push(Attribute {
            trait_type: layer.name.clone(),
            value: trait_value(reference)?,
        });
    }

    Ok(MetadataRecord {
        name: format!("#{index}"),
        description: params.description.clone(),
        image: params.image.clone(),
        animation_url: params.animation_url.clone(),
        external_url: params.external_url.clone(),
        attributes,
        properties: params.properties.clone(),
    })
}

/// Synthesize a whole batch with contiguous 0-based indices matching the
/// input order. The index in each record is the same ordinal the renderer
/// uses for the image file name.
#[tracing::instrument(skip(set, combinations, params), fields(count = combinations.len()))]
pub fn synthesize_all(
    set: &LayerSet,
    combinations: &[Combination],
    params: &RecordParams,
) -> ForgeResult<Vec<MetadataRecord>> {
    combinations
        .iter()
        .enumerate()
        .map(|(index, comb)| synthesize(set, comb, index as u64, params))
        .collect()
}

/// Derive the display value for a candidate reference: final path segment
/// with the file extension removed. Downstream consumers treat attribute
/// values as required display strings, so a reference that yields nothing
/// is an error rather than a blank value.
fn trait_value(reference: &str) -> ForgeResult<String> {
    let stem = Path::new(reference)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    if stem.is_empty() {
        return Err(ForgeError::malformed_candidate(format!(
            "'{reference}' has no usable file name segment"
        )));
    }
    Ok(stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candidate, Layer};

    fn example_set() -> LayerSet {
        LayerSet::new(vec![
            Layer::new(
                "background",
                vec![
                    Candidate::new("images/back/a.png"),
                    Candidate::new("images/back/b.png"),
                ],
            ),
            Layer::new("outfit", vec![Candidate::new("images/outfit/x.png")]),
        ])
        .unwrap()
    }

    fn example_params() -> RecordParams {
        RecordParams {
            image: "https://example.com/6908.png".to_string(),
            description: "an example description".to_string(),
            external_url: "https://example.com".to_string(),
            animation_url: None,
            properties: serde_json::json!({
                "files": [{ "type": "image/png", "url": "https://example.com/6908.png" }],
            }),
        }
    }

    #[test]
    fn record_matches_the_reference_example() {
        let set = example_set();
        let mut comb = Combination::new();
        comb.insert("background", "images/back/b.png");
        comb.insert("outfit", "images/outfit/x.png");

        let record = synthesize(&set, &comb, 3, &example_params()).unwrap();
        assert_eq!(record.name, "#3");
        assert_eq!(
            record.attributes,
            [
                Attribute {
                    trait_type: "background".to_string(),
                    value: "b".to_string(),
                },
                Attribute {
                    trait_type: "outfit".to_string(),
                    value: "x".to_string(),
                },
            ]
        );
    }

    #[test]
    fn attribute_order_follows_layer_declaration_order() {
        let set = example_set();
        // Entries inserted in reverse of the declared layer order.
        let mut comb = Combination::new();
        comb.insert("outfit", "images/outfit/x.png");
        comb.insert("background", "images/back/a.png");

        let record = synthesize(&set, &comb, 0, &example_params()).unwrap();
        let traits: Vec<&str> = record
            .attributes
            .iter()
            .map(|a| a.trait_type.as_str())
            .collect();
        assert_eq!(traits, ["background", "outfit"]);
    }

    #[test]
    fn synthesis_is_idempotent_to_the_byte() {
        let set = example_set();
        let mut comb = Combination::new();
        comb.insert("background", "images/back/a.png");
        comb.insert("outfit", "images/outfit/x.png");
        let params = example_params();

        let a = serde_json::to_string(&synthesize(&set, &comb, 5, &params).unwrap()).unwrap();
        let b = serde_json::to_string(&synthesize(&set, &comb, 5, &params).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn absent_animation_url_is_omitted_from_json() {
        let set = example_set();
        let mut comb = Combination::new();
        comb.insert("background", "images/back/a.png");
        comb.insert("outfit", "images/outfit/x.png");

        let record = synthesize(&set, &comb, 0, &example_params()).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("animation_url"));

        let mut params = example_params();
        params.animation_url = Some("https://example.com/a.mp4".to_string());
        let record = synthesize(&set, &comb, 0, &params).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"animation_url\":\"https://example.com/a.mp4\""));
    }

    #[test]
    fn missing_layer_in_combination_is_rejected() {
        let set = example_set();
        let mut comb = Combination::new();
        comb.insert("background", "images/back/a.png");

        let err = synthesize(&set, &comb, 0, &example_params()).unwrap_err();
        assert!(err.to_string().contains("missing layer 'outfit'"));
    }

    #[test]
    fn malformed_reference_fails_instead_of_blank_value() {
        let set = LayerSet::new(vec![Layer::new(
            "background",
            vec![Candidate::new("images/back/")],
        )])
        .unwrap();
        let mut comb = Combination::new();
        comb.insert("background", "");

        let err = synthesize(&set, &comb, 0, &example_params()).unwrap_err();
        assert!(matches!(err, ForgeError::MalformedCandidate(_)));
    }

    #[test]
    fn batch_indices_are_contiguous_from_zero() {
        let set = example_set();
        let mut c0 = Combination::new();
        c0.insert("background", "images/back/a.png");
        c0.insert("outfit", "images/outfit/x.png");
        let mut c1 = Combination::new();
        c1.insert("background", "images/back/b.png");
        c1.insert("outfit", "images/outfit/x.png");

        let records = synthesize_all(&set, &[c0, c1], &example_params()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["#0", "#1"]);
    }

    #[test]
    fn trait_value_strips_directory_and_extension() {
        assert_eq!(trait_value("images/back/a.png").unwrap(), "a");
        assert_eq!(trait_value("b.png").unwrap(), "b");
        assert_eq!(trait_value("plain").unwrap(), "plain");
        assert!(trait_value("").is_err());
    }
}
