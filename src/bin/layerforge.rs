use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::{SeedableRng as _, rngs::StdRng};

use layerforge::{
    DirStore, LayerSet, LayerSpec, Policy, RecordParams, compose, discover, generate, metadata,
    publish,
};

#[derive(Parser, Debug)]
#[command(name = "layerforge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show layer sizes and the exhaustive combination count without generating.
    Plan(PlanArgs),
    /// Generate combinations, render PNGs and write metadata JSON.
    Generate(GenerateArgs),
    /// Generate, render, and publish images + metadata through a local store.
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
struct LayerArgs {
    /// Layer as name=dir; repeat per layer, order is the stacking and
    /// trait order.
    #[arg(long = "layer", value_parser = parse_layer_spec, required = true)]
    layers: Vec<LayerSpec>,

    /// JSON weight table keyed by layer name then candidate file name.
    #[arg(long)]
    weights: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Generation policy.
    #[arg(long, value_enum, default_value_t = PolicyChoice::Exhaustive)]
    policy: PolicyChoice,

    /// Number of combinations to draw (required for weighted/uniform).
    #[arg(long)]
    count: Option<u64>,

    /// Seed for the random policies; omitted means a fresh OS seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Keep only the first N combinations.
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Directory for rendered PNGs.
    #[arg(long, default_value = "imagesOutput")]
    images_out: PathBuf,

    /// Directory for metadata JSON files.
    #[arg(long, default_value = "json")]
    json_out: PathBuf,

    /// Skip rendering.
    #[arg(long)]
    no_images: bool,

    /// Skip metadata emission.
    #[arg(long)]
    no_json: bool,
}

#[derive(Args, Debug)]
struct MetadataArgs {
    /// Primary image URI placed in each record (replaced by the store
    /// locator when publishing).
    #[arg(long, default_value = "")]
    image_uri: String,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "")]
    external_url: String,

    #[arg(long)]
    animation_url: Option<String>,

    /// JSON file with the opaque properties passthrough.
    #[arg(long)]
    properties: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    layers: LayerArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    layers: LayerArgs,

    #[command(flatten)]
    selection: SelectionArgs,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    metadata: MetadataArgs,
}

#[derive(Args, Debug)]
struct PublishArgs {
    #[command(flatten)]
    layers: LayerArgs,

    #[command(flatten)]
    selection: SelectionArgs,

    #[command(flatten)]
    metadata: MetadataArgs,

    /// Directory for rendered PNGs (inputs to the store).
    #[arg(long, default_value = "imagesOutput")]
    images_out: PathBuf,

    /// Store directory receiving published images and records.
    #[arg(long)]
    store: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyChoice {
    Exhaustive,
    Weighted,
    Uniform,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Generate(args) => cmd_generate(args),
        Command::Publish(args) => cmd_publish(args),
    }
}

fn parse_layer_spec(s: &str) -> Result<LayerSpec, String> {
    let (name, dir) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=dir, got '{s}'"))?;
    if name.is_empty() || dir.is_empty() {
        return Err(format!("expected name=dir, got '{s}'"));
    }
    Ok(LayerSpec::new(name, dir))
}

fn load_layer_set(args: &LayerArgs) -> anyhow::Result<LayerSet> {
    let set = match &args.weights {
        Some(path) => {
            let table = discover::read_weight_table(path)
                .with_context(|| format!("load weight table '{}'", path.display()))?;
            discover::discover_weighted(&args.layers, &table)?
        }
        None => discover::discover(&args.layers)?,
    };
    Ok(set)
}

fn resolve_policy(args: &SelectionArgs) -> anyhow::Result<Policy> {
    match args.policy {
        PolicyChoice::Exhaustive => Ok(Policy::Exhaustive),
        PolicyChoice::Weighted => {
            let count = args.count.context("--policy weighted requires --count")?;
            Ok(Policy::Weighted { count })
        }
        PolicyChoice::Uniform => {
            let count = args.count.context("--policy uniform requires --count")?;
            Ok(Policy::Uniform { count })
        }
    }
}

fn record_params(args: &MetadataArgs) -> anyhow::Result<RecordParams> {
    let properties = match &args.properties {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read properties '{}'", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse properties '{}'", path.display()))?
        }
        None => serde_json::Value::Null,
    };
    Ok(RecordParams {
        image: args.image_uri.clone(),
        description: args.description.clone(),
        external_url: args.external_url.clone(),
        animation_url: args.animation_url.clone(),
        properties,
    })
}

fn generate_combinations(
    set: &LayerSet,
    selection: &SelectionArgs,
) -> anyhow::Result<Vec<layerforge::Combination>> {
    let policy = resolve_policy(selection)?;

    if matches!(policy, Policy::Exhaustive) {
        let size = set.combination_count();
        eprintln!("exhaustive product size: {size}");
    }

    let mut rng = match selection.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut combinations = generate(set, policy, &mut rng)?;
    if let Some(limit) = selection.limit {
        combinations.truncate(limit);
    }
    Ok(combinations)
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let set = load_layer_set(&args.layers)?;
    for layer in set.layers() {
        println!("{}: {} candidates", layer.name, layer.candidates.len());
    }
    println!("exhaustive combinations: {}", set.combination_count());
    Ok(())
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let set = load_layer_set(&args.layers)?;
    let combinations = generate_combinations(&set, &args.selection)?;
    eprintln!("generated {} combinations", combinations.len());

    if !args.output.no_images {
        let written = compose::render_all(&set, &combinations, &args.output.images_out)?;
        eprintln!("rendered {} images to {}", written.len(), args.output.images_out.display());
    }

    if !args.output.no_json {
        let params = record_params(&args.metadata)?;
        let records = metadata::synthesize_all(&set, &combinations, &params)?;
        let written = publish::write_all(&args.output.json_out, &records)?;
        eprintln!("wrote {} metadata files to {}", written.len(), args.output.json_out.display());
    }

    Ok(())
}

fn cmd_publish(args: PublishArgs) -> anyhow::Result<()> {
    let set = load_layer_set(&args.layers)?;
    let combinations = generate_combinations(&set, &args.selection)?;

    compose::render_all(&set, &combinations, &args.images_out)?;

    let params = record_params(&args.metadata)?;
    let mut store = DirStore::new(&args.store);
    let published = publish::publish_collection(
        &set,
        &combinations,
        &params,
        &args.images_out,
        &mut store,
    )?;

    for (index, locator) in &published {
        println!("{index} -> {locator}");
    }
    eprintln!("published {} items to {}", published.len(), args.store.display());
    Ok(())
}
