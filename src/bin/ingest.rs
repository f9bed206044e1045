//! Batch document ingestion CLI
//!
//! Scans a directory for supported documents, skips chunks the index
//! already holds, and uploads the rest. Exit status is non-zero only when
//! a file failed outright; a fully deduplicated re-run exits cleanly.

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use intra_rag::config::RagConfig;
use intra_rag::ingestion::{DeleteScope, IngestReport, Ingestor};
use intra_rag::providers::{OpenAiClient, QdrantStore};

#[derive(Parser)]
#[command(
    name = "intra-rag-ingest",
    about = "Ingest internal documents into the vector index"
)]
struct Args {
    /// Directory to scan for documents
    #[arg(default_value = "data")]
    dir: PathBuf,

    /// Comma-separated file extensions to pick up (defaults from config)
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Department that owns these documents
    #[arg(long)]
    department: Option<i64>,

    /// Mark the documents as common to all departments
    #[arg(long)]
    common: bool,

    /// Delete this source path from the index instead of ingesting.
    /// Scoped by --department when given, the common pool otherwise.
    #[arg(long)]
    delete_source: Option<String>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intra_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = RagConfig::load_or_default(args.config.as_deref())?;

    let client = Arc::new(OpenAiClient::new(&config.llm, config.vector_db.vector_size)?);
    let store = Arc::new(QdrantStore::new(&config.vector_db)?);
    let ingestor = Ingestor::new(&config, client, store);

    if let Some(source) = args.delete_source {
        let scope = match args.department {
            Some(id) => DeleteScope::Department(id),
            None => DeleteScope::Common,
        };
        let deleted = ingestor.delete_by_source(&source, scope).await?;
        println!("{} chunks deleted for {}", style(deleted).bold(), source);
        return Ok(());
    }

    let extensions = args
        .extensions
        .unwrap_or_else(|| config.ingestion.extensions.clone());

    let mut files: Vec<PathBuf> = WalkDir::new(&args.dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .map_or(false, |ext| extensions.iter().any(|want| *want == ext))
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    if files.is_empty() {
        println!(
            "{} no matching documents under {}",
            style("warning:").yellow().bold(),
            args.dir.display()
        );
        return Ok(());
    }

    // One snapshot per batch; every file below dedups against it.
    let existing: HashSet<String> = ingestor.existing_ids().await?;
    println!(
        "{} existing chunks in the index",
        style(existing.len()).bold()
    );

    let bar = ProgressBar::new(files.len() as u64).with_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .expect("static progress template"),
    );

    let mut report = IngestReport::default();
    for path in files {
        bar.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        match ingestor
            .upsert_file(&path, args.department, args.common, &existing)
            .await
        {
            Ok(written) => {
                report.files_processed += 1;
                report.new_chunks += written;
            }
            Err(e) => {
                bar.println(format!(
                    "{} {}: {}",
                    style("failed").red().bold(),
                    path.display(),
                    e
                ));
                report.files_failed += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("\n{}", style("Ingestion summary").bold());
    println!("  files processed: {}", report.files_processed);
    println!("  files failed:    {}", report.files_failed);
    println!("  new chunks:      {}", report.new_chunks);

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
