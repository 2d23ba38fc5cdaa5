use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use ragdb_core::config::{resolve_with_base, Config};
use ragdb_core::loader::DocumentKind;
use ragdb_core::traits::Embedder;
use ragdb_embed::get_default_embedder;
use ragdb_retrieval::{Collection, IngestSource};
use ragdb_vector::JsonSnapshotStore;

#[derive(Parser)]
#[command(name = "ragdb")]
#[command(about = "Local document retrieval: ingest files, query by meaning", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Override storage.snapshot_path
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Use the hash embedder instead of loading a model
    #[arg(long, global = true)]
    fake: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Add files, or every supported file under a directory
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the chunks closest to `text`
    Query {
        text: String,
        #[arg(short, long)]
        k: Option<usize>,
        /// Emit JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    Stats,
    /// Drop every chunk and the snapshot
    Clear,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load_from(&cli.config_dir).context("loading configuration")?;
    let mut settings = config.settings()?;
    if cli.fake {
        settings.embedding.use_fake = true;
    }
    let snapshot_path = match &cli.snapshot {
        Some(p) => p.clone(),
        None => resolve_with_base(&cli.config_dir, &settings.storage.snapshot_path),
    };
    let default_k = settings.query.default_k;

    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    tracing::info!(embedder = embedder.id(), snapshot = %snapshot_path.display(), "opening collection");
    let collection = Collection::open(embedder, Box::new(JsonSnapshotStore::new(&snapshot_path)), (&settings).into())?;

    match cli.command {
        Command::Ingest { paths } => ingest(&collection, &paths)?,
        Command::Query { text, k, json } => {
            let hits = collection.query(&text, k.unwrap_or(default_k))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No results.");
            } else {
                for (rank, hit) in hits.iter().enumerate() {
                    let c = &hit.chunk;
                    println!("{}. [{:.4}] {} #{} (id {})", rank + 1, hit.score, c.source, c.sequence_index, c.id);
                    println!("   {}", preview(&c.text, 200));
                }
            }
        }
        Command::Stats => println!("{}", serde_json::to_string_pretty(&collection.stats())?),
        Command::Clear => {
            collection.clear()?;
            println!("Knowledge base cleared.");
        }
    }
    collection.close()?;
    Ok(())
}

fn ingest(collection: &Collection, paths: &[PathBuf]) -> anyhow::Result<()> {
    let files = collect_files(paths);
    if files.is_empty() {
        println!("No supported files (extensions: {}).", DocumentKind::SUPPORTED_EXTENSIONS.join(", "));
        return Ok(());
    }
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let (mut chunks, mut skipped) = (0usize, 0usize);
    for path in &files {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        pb.set_message(name.clone());
        match collection.ingest(IngestSource::Path(path.clone()), &name) {
            Ok(report) => chunks += report.chunks_created,
            Err(e) if e.is_client_error() => {
                skipped += 1;
                pb.println(format!("skipped {}: {e}", path.display()));
            }
            Err(e) => {
                pb.abandon();
                return Err(e).with_context(|| format!("ingesting {}", path.display()));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    println!("Ingested {} files ({chunks} chunks), skipped {skipped}.", files.len() - skipped);
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    DocumentKind::from_path(path).is_ok()
}

fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in paths {
        if root.is_dir() {
            files.extend(
                WalkDir::new(root)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file() && is_supported(e.path()))
                    .map(|e| e.into_path()),
            );
        } else {
            // explicit files go through so unsupported ones are reported
            files.push(root.clone());
        }
    }
    files
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}...", &flat[..i]),
        None => flat,
    }
}
