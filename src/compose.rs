use std::path::{Path, PathBuf};

use crate::{
    error::{ForgeError, ForgeResult},
    model::{Combination, LayerSet},
};

/// Output path for the rendered image of the combination at `index`. The
/// ordinal is the same one the metadata record carries, so image and
/// metadata files stay aligned by construction.
pub fn image_output_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{index}.png"))
}

/// Composite one combination: each chosen candidate is opened as an image
/// and stacked in LayerSet declaration order, first layer as the base
/// canvas, the rest overlaid at the origin.
pub fn render_combination(
    set: &LayerSet,
    combination: &Combination,
    out_path: &Path,
) -> ForgeResult<()> {
    let mut layers = set.layers().iter();
    let base_layer = layers.next().ok_or_else(|| {
        ForgeError::render("cannot composite a combination over an empty layer set")
    })?;

    let mut canvas = open_layer(combination, &base_layer.name)?.into_rgba8();
    for layer in layers {
        let overlay = open_layer(combination, &layer.name)?.into_rgba8();
        image::imageops::overlay(&mut canvas, &overlay, 0, 0);
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ForgeError::render(format!("create output dir '{}': {e}", parent.display()))
        })?;
    }
    canvas
        .save_with_format(out_path, image::ImageFormat::Png)
        .map_err(|e| ForgeError::render(format!("write png '{}': {e}", out_path.display())))?;
    Ok(())
}

/// Render a whole batch, one PNG per combination named by its 0-based
/// position in the input sequence. Returns the written paths in order.
#[tracing::instrument(skip(set, combinations), fields(count = combinations.len()))]
pub fn render_all(
    set: &LayerSet,
    combinations: &[Combination],
    out_dir: &Path,
) -> ForgeResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(combinations.len());
    for (index, combination) in combinations.iter().enumerate() {
        let out_path = image_output_path(out_dir, index as u64);
        render_combination(set, combination, &out_path)?;
        tracing::debug!(index, path = %out_path.display(), "rendered combination");
        written.push(out_path);
    }
    Ok(written)
}

fn open_layer(combination: &Combination, layer_name: &str) -> ForgeResult<image::DynamicImage> {
    let reference = combination.get(layer_name).ok_or_else(|| {
        ForgeError::render(format!("combination is missing layer '{layer_name}'"))
    })?;
    image::open(reference)
        .map_err(|e| ForgeError::render(format!("open layer image '{reference}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candidate, Layer};

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "layerforge_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    fn write_px(path: &Path, rgba: [u8; 4]) {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
        img.save_with_format(path, image::ImageFormat::Png).unwrap();
    }

    #[test]
    fn overlay_order_follows_layer_declaration() {
        let tmp = temp_dir("compose_order");
        std::fs::create_dir_all(&tmp).unwrap();
        let base = tmp.join("base.png");
        let top = tmp.join("top.png");
        write_px(&base, [255, 0, 0, 255]);
        write_px(&top, [0, 255, 0, 255]);

        let set = LayerSet::new(vec![
            Layer::new("background", vec![Candidate::new(base.to_string_lossy())]),
            Layer::new("outfit", vec![Candidate::new(top.to_string_lossy())]),
        ])
        .unwrap();
        let mut comb = Combination::new();
        comb.insert("background", base.to_string_lossy());
        comb.insert("outfit", top.to_string_lossy());

        let out = tmp.join("0.png");
        render_combination(&set, &comb, &out).unwrap();

        let rendered = image::open(&out).unwrap().into_rgba8();
        // The later-declared layer wins where it is opaque.
        assert_eq!(rendered.get_pixel(0, 0).0, [0, 255, 0, 255]);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn batch_output_is_named_by_ordinal() {
        let tmp = temp_dir("compose_batch");
        std::fs::create_dir_all(&tmp).unwrap();
        let a = tmp.join("a.png");
        write_px(&a, [1, 2, 3, 255]);

        let set = LayerSet::new(vec![Layer::new(
            "background",
            vec![Candidate::new(a.to_string_lossy())],
        )])
        .unwrap();
        let mut comb = Combination::new();
        comb.insert("background", a.to_string_lossy());

        let out_dir = tmp.join("out");
        let written = render_all(&set, &[comb.clone(), comb], &out_dir).unwrap();
        assert_eq!(written, [out_dir.join("0.png"), out_dir.join("1.png")]);
        assert!(written.iter().all(|p| p.exists()));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn missing_layer_image_is_an_error() {
        let set = LayerSet::new(vec![Layer::new(
            "background",
            vec![Candidate::new("nope.png")],
        )])
        .unwrap();
        let mut comb = Combination::new();
        comb.insert("background", "/nonexistent/nope.png");

        let err = render_combination(&set, &comb, Path::new("/tmp/never.png")).unwrap_err();
        assert!(matches!(err, ForgeError::Render(_)));
    }
}
