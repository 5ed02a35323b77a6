use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use metablock::MetablockError;
use metablock::block::BlockCollection;
use metablock::config::MetablockConfig;
use metablock::pruning::refine;
use metablock::weighting::WeightingScheme;

/// Prunes a block collection down to a high-precision comparison set.
#[derive(Parser, Debug)]
#[command(name = "metablock", version)]
struct Args {
    /// Block collection JSON file: { num_entities, dataset_limit, blocks }
    #[arg(long)]
    input: PathBuf,

    /// Edge-weighting scheme
    #[arg(long, value_enum)]
    scheme: WeightingScheme,

    /// Pruned blocks are written here as JSON
    #[arg(long)]
    output: PathBuf,

    /// Also dump the retained pairs with their scores
    #[arg(long)]
    pairs_out: Option<PathBuf>,

    /// Override the derived per-entity cardinality bound
    #[arg(long)]
    top_k: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("metablock: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), MetablockError> {
    let input = fs::read_to_string(&args.input)?;
    let collection: BlockCollection = serde_json::from_str(&input)?;
    info!(
        blocks = collection.blocks.len(),
        num_entities = collection.num_entities,
        dataset_limit = collection.dataset_limit,
        "loaded block collection"
    );

    let mut config = MetablockConfig::new(
        args.scheme,
        collection.num_entities,
        collection.dataset_limit,
    );
    if let Some(top_k) = args.top_k {
        config = config.with_cardinality(top_k);
    }

    let output = refine(&collection.blocks, &config)?;

    fs::write(&args.output, serde_json::to_string_pretty(&output.blocks)?)?;
    info!(
        blocks = output.blocks.len(),
        retained = output.pairs.len(),
        path = %args.output.display(),
        "wrote pruned blocks"
    );

    if let Some(pairs_path) = &args.pairs_out {
        let pairs: Vec<(u32, u32, f64)> = output.pairs.iter().collect();
        fs::write(pairs_path, serde_json::to_string_pretty(&pairs)?)?;
        info!(path = %pairs_path.display(), "wrote retained pairs");
    }

    Ok(())
}
