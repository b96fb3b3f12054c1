use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use judge_core::config::{expand_path, Config, DataSettings, Settings};
use judge_core::{split_atomic, split_detailed, split_rules, BatchedLoader, Passage, PassageSink};
use judge_embed::embedder_from_settings;
use judge_vector::{LancePassageSearch, LancePassageSink};

mod progress;
mod report;

use progress::ProgressSink;

#[derive(Parser)]
#[command(name = "judge")]
#[command(about = "Load MTG cards and comprehensive rules into a passage store and search it")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Corpus {
    /// MTGJSON atomic cards: name -> printings
    Atomic,
    /// MTGJSON card list with a document-level rulings list
    Detailed,
    /// Comprehensive rules text
    Rules,
}

#[derive(Subcommand)]
enum Commands {
    /// Split one file and load its passages into the store
    Load {
        corpus: Corpus,
        path: PathBuf,
        /// Label stored as each passage's source (defaults to the path)
        #[arg(long)]
        source: Option<String>,
    },
    /// Load the configured atomic card file, the detailed card file when one
    /// is configured, then the rules file
    LoadAll,
    /// Print the passages of one file as JSON lines
    Dump {
        corpus: Corpus,
        path: PathBuf,
        #[arg(long)]
        source: Option<String>,
    },
    /// Retrieve the passages closest to a question
    Search {
        question: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

type PassageStream = Box<dyn Iterator<Item = judge_core::Result<Passage>>>;

fn open_corpus(corpus: Corpus, path: &Path, source: &str, settings: &Settings) -> anyhow::Result<PassageStream> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let passages: PassageStream = match corpus {
        Corpus::Atomic => Box::new(split_atomic(file, source)?),
        Corpus::Detailed => Box::new(split_detailed(file, source)?),
        Corpus::Rules => {
            let rules = split_rules(file, source, settings.rules.paragraph_separator)?;
            Box::new(rules.map(Ok::<_, judge_core::Error>))
        }
    };
    Ok(passages)
}

/// Files `load-all` reads, in load order.
fn load_all_plan(data: &DataSettings) -> Vec<(Corpus, PathBuf)> {
    let mut plan = vec![(Corpus::Atomic, expand_path(&data.atomic_path))];
    if let Some(detailed) = &data.detailed_path {
        plan.push((Corpus::Detailed, expand_path(detailed)));
    }
    plan.push((Corpus::Rules, expand_path(&data.rules_path)));
    plan
}

fn open_sink(settings: &Settings) -> anyhow::Result<LancePassageSink> {
    let embedder = embedder_from_settings(&settings.embedding)?;
    LancePassageSink::open(&expand_path(&settings.store.db_path), &settings.store.table, embedder)
}

fn load_into<S: PassageSink>(sink: S, corpus: Corpus, path: &Path, source: &str, settings: &Settings) -> anyhow::Result<S> {
    let passages = open_corpus(corpus, path, source, settings)?;
    let mut loader = BatchedLoader::new(ProgressSink::new(sink, source)?).with_batch_size(settings.loader.batch_size);
    let stats = loader.load(passages)?;
    info!(source, passages = stats.passages, batches = stats.batches, "Loaded file");
    Ok(loader.into_sink().finish())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;

    match cli.command {
        Commands::Load { corpus, path, source } => {
            let source = source.unwrap_or_else(|| path.display().to_string());
            load_into(open_sink(&settings)?, corpus, &path, &source, &settings)?;
        }
        Commands::LoadAll => {
            let mut sink = open_sink(&settings)?;
            for (corpus, path) in load_all_plan(&settings.data) {
                sink = load_into(sink, corpus, &path, &path.display().to_string(), &settings)?;
            }
            info!(rows = sink.rows_written(), "Finished loading cards and rules");
        }
        Commands::Dump { corpus, path, source } => {
            let source = source.unwrap_or_else(|| path.display().to_string());
            for passage in open_corpus(corpus, &path, &source, &settings)? {
                println!("{}", serde_json::to_string(&passage?)?);
            }
        }
        Commands::Search { question, limit } => {
            let embedder = embedder_from_settings(&settings.embedding)?;
            let search = LancePassageSearch::open(&expand_path(&settings.store.db_path), &settings.store.table, embedder)?;
            let hits = search.search(&question, limit)?;
            report::print_hits(&question, &hits);
        }
    }
    Ok(())
}
