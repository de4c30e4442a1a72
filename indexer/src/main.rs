use anyhow::Result;
use blogsearch_core::cluster::DEFAULT_SEED;
use blogsearch_core::persist::{load_json, ArtifactPaths};
use blogsearch_core::pipeline::{build_search_index, build_similarity, build_tag_categories};
use blogsearch_core::{shared_analyzer, CategoryRules, Tokenizer};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build search and recommendation artifacts for the blog", long_about = None)]
struct Cli {
    /// Directory holding posts.json and tags.json
    #[arg(long, global = true, default_value = "./data")]
    input_dir: PathBuf,
    /// Directory receiving the generated JSON artifacts
    #[arg(long, global = true, default_value = "./public/data")]
    output_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inverted index, search records and build manifest
    SearchIndex,
    /// Tag relatedness matrix and related posts
    Similarity,
    /// Tag clustering and category assignment
    TagCategories {
        /// Seed for the label propagation visiting order
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u32,
        /// JSON file overriding the built-in category seed tags
        #[arg(long)]
        category_seeds: Option<PathBuf>,
    },
    /// Every step, in order
    All {
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u32,
        #[arg(long)]
        category_seeds: Option<PathBuf>,
    },
}

fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        tracing::error!("build step failed: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = ArtifactPaths::new(&cli.input_dir, &cli.output_dir);
    match cli.command {
        Commands::SearchIndex => search_index(&paths),
        Commands::Similarity => build_similarity(&paths),
        Commands::TagCategories { seed, category_seeds } => tag_categories(&paths, seed, category_seeds),
        Commands::All { seed, category_seeds } => {
            search_index(&paths)?;
            build_similarity(&paths)?;
            tag_categories(&paths, seed, category_seeds)
        }
    }
}

fn search_index(paths: &ArtifactPaths) -> Result<()> {
    let tokenizer = Tokenizer::new(shared_analyzer()?);
    build_search_index(paths, &tokenizer)?;
    Ok(())
}

fn tag_categories(paths: &ArtifactPaths, seed: u32, category_seeds: Option<PathBuf>) -> Result<()> {
    let rules = match category_seeds {
        Some(path) => load_json::<CategoryRules>(&path)?,
        None => CategoryRules::default(),
    };
    let categories = build_tag_categories(paths, &rules, seed)?;
    tracing::info!(tags = categories.len(), "tag categories built");
    Ok(())
}
