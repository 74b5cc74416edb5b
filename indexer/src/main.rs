use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sift_core::persist::{build_artifacts, clear_artifacts, IndexPaths};
use sift_core::thesaurus::CancelFlag;
use sift_core::{CollectionConfig, Document, TextConfig};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the retrieval artifacts of a document collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every artifact from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Artifact root directory
        #[arg(long)]
        output: String,
        /// Collection name; artifacts go to <output>/<collection>
        #[arg(long)]
        collection: String,
        /// Skip unicode folding and punctuation normalization
        #[arg(long, default_value_t = false)]
        no_normalize: bool,
        /// Keep stopwords in the token stream
        #[arg(long, default_value_t = false)]
        keep_stopwords: bool,
        /// Disable stemming
        #[arg(long, default_value_t = false)]
        no_stem: bool,
        /// Delete existing artifacts before building
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, collection, no_normalize, keep_stopwords, no_stem, force } => {
            let text = TextConfig { normalize: !no_normalize, remove_stopwords: !keep_stopwords, stem: !no_stem };
            let config = CollectionConfig::new(&output, &collection).with_text(text);
            build_collection(Path::new(&input), &config, force)
        }
    }
}

fn build_collection(input: &Path, config: &CollectionConfig, force: bool) -> Result<()> {
    let paths = IndexPaths::for_collection(config);
    if force {
        clear_artifacts(&paths)?;
        tracing::info!(root = %paths.root.display(), "cleared existing artifacts");
    }

    let mut docs = Vec::new();
    for file in input_files(input)? {
        let before = docs.len();
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
        tracing::debug!(file = %file.display(), docs = docs.len() - before, "read input file");
    }
    docs.sort_by_key(|d| d.id);
    tracing::info!(num_docs = docs.len(), "ingested documents");

    let meta = build_artifacts(config, &docs, &CancelFlag::new())
        .with_context(|| format!("building artifacts under {}", paths.root.display()))?;
    tracing::info!(num_docs = meta.num_docs, num_terms = meta.num_terms, root = %paths.root.display(), "index build complete");
    Ok(())
}

fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input path {} does not exist", input.display());
    }
    Ok(files)
}

fn read_jsonl(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: Document = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), n + 1))?;
        docs.push(doc);
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing {}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                docs.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => docs.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "skipping input that is neither an object nor an array"),
    }
    Ok(())
}
