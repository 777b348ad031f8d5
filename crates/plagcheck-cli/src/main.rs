use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use plagcheck_bibstore::BibDatabase;
use plagcheck_core::config_file::{self, ConfigFile};
use plagcheck_core::{
    BibliographicStore, Config, Document, Embedder, HttpEmbedder, ProgressEvent,
};
use plagcheck_ingest::{DocumentFormat, DocumentSource, Normalizer};
use plagcheck_parsing::NormalizeOptions;
use plagcheck_reporting::{ExportFormat, SubmissionReport};

mod output;

use output::ColorMode;

const DEFAULT_EMBED_MODEL: &str = "all-MiniLM-L6-v2";

/// Sentence-level plagiarism and citation checker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a submission against reference documents
    Check {
        /// Submission path or URL (.txt, .pdf, .docx)
        submission: String,

        /// Reference document paths or URLs
        references: Vec<String>,

        /// Also compare against every supported file in this directory
        #[arg(long)]
        corpus_dir: Option<PathBuf>,

        /// Similarity at or above which a match is exact
        #[arg(long)]
        exact_threshold: Option<f64>,

        /// Similarity at or above which a match is partial
        #[arg(long)]
        match_threshold: Option<f64>,

        /// Reference documents compared concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// SQLite bibliographic store consulted during citation checks
        #[arg(long)]
        bib_db: Option<PathBuf>,

        /// OpenAI-compatible embeddings API root (default: local all-MiniLM-L6-v2)
        #[arg(long)]
        embed_url: Option<String>,

        /// Embedding model: sent to the embeddings API, or loaded locally
        #[arg(long)]
        embed_model: Option<String>,

        /// Report format: json, markdown or text
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave the submission's own references section out of the comparison
        #[arg(long)]
        exclude_references: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Dry run: print the normalized sentences of a document
    Sentences {
        /// Path or URL
        source: String,

        /// Print unmerged source lines instead of sentences
        #[arg(long)]
        raw: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Manage the bibliographic store
    Bib {
        #[command(subcommand)]
        command: BibCommand,
    },
}

#[derive(Subcommand, Debug)]
enum BibCommand {
    /// Record a resource and its authors
    Add {
        /// Path to the SQLite store (created if missing)
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        title: String,

        /// Publication date, e.g. 2020 or 2020-05-01
        #[arg(long)]
        date: Option<String>,

        /// Author name; repeat for several authors
        #[arg(long = "author", required = true)]
        authors: Vec<String>,
    },

    /// List the author-year keys the store yields
    Keys {
        #[arg(long)]
        db: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = config_file::load_config();

    match cli.command {
        Command::Check {
            submission,
            references,
            corpus_dir,
            exact_threshold,
            match_threshold,
            workers,
            bib_db,
            embed_url,
            embed_model,
            format,
            output,
            exclude_references,
            no_color,
        } => {
            let mut config = Config::default();
            file_config.apply_to(&mut config);
            if let Some(t) = exact_threshold {
                config.exact_threshold = t;
            }
            if let Some(t) = match_threshold {
                config.match_threshold = t;
            }
            if let Some(n) = workers {
                config.num_workers = n;
            }
            config.validate()?;

            let opts = CheckOptions {
                bib_db,
                embed_url,
                embed_model,
                format,
                output,
                exclude_references,
                no_color,
            };
            check(submission, references, corpus_dir, config, &file_config, opts).await
        }
        Command::Sentences {
            source,
            raw,
            no_color,
        } => sentences(&source, raw, no_color, &file_config).await,
        Command::Bib { command } => bib(command),
    }
}

struct CheckOptions {
    bib_db: Option<PathBuf>,
    embed_url: Option<String>,
    embed_model: Option<String>,
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
    exclude_references: bool,
    no_color: bool,
}

fn build_normalizer(file_config: &ConfigFile) -> Normalizer {
    let mut options = NormalizeOptions::default();
    if let Some(n) = file_config
        .normalizer
        .as_ref()
        .and_then(|n| n.segment_min_words)
    {
        options.segment_min_words = n;
    }
    Normalizer::new().with_options(options)
}

/// Remote embeddings when a URL is configured, the local model otherwise.
async fn build_embedder(
    embed_url: Option<String>,
    embed_model: Option<String>,
    file_config: &ConfigFile,
    timeout: Duration,
) -> anyhow::Result<Arc<dyn Embedder>> {
    let section = file_config.embedding.clone().unwrap_or_default();

    // Resolve configuration: CLI flags > env vars > config file > defaults
    let url = embed_url
        .or_else(|| std::env::var("PLAGCHECK_EMBED_URL").ok())
        .or(section.url);
    let model = embed_model
        .or(section.model)
        .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string());

    match url {
        Some(url) => {
            let api_key = std::env::var("PLAGCHECK_EMBED_KEY").ok().or(section.api_key);
            tracing::info!(url = %url, model = %model, "using remote embeddings");
            let mut embedder = HttpEmbedder::new(url, model)
                .with_api_key(api_key)
                .with_timeout(timeout);
            if let Some(batch) = section.batch_size {
                embedder = embedder.with_batch_size(batch);
            }
            Ok(Arc::new(embedder))
        }
        None => load_local_embedder(model, section.cache_dir.map(PathBuf::from)).await,
    }
}

#[cfg(feature = "local-embeddings")]
async fn load_local_embedder(
    model: String,
    cache_dir: Option<PathBuf>,
) -> anyhow::Result<Arc<dyn Embedder>> {
    use plagcheck_core::FastEmbedder;

    let embedder =
        tokio::task::spawn_blocking(move || FastEmbedder::from_name(&model, cache_dir)).await??;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "local-embeddings"))]
async fn load_local_embedder(
    _model: String,
    _cache_dir: Option<PathBuf>,
) -> anyhow::Result<Arc<dyn Embedder>> {
    anyhow::bail!(
        "No embeddings service configured and local embeddings are not compiled in. \
         Pass --embed-url or build with the `local-embeddings` feature."
    )
}

fn open_bib_store(
    bib_db: Option<PathBuf>,
    file_config: &ConfigFile,
) -> anyhow::Result<Option<Arc<dyn BibliographicStore>>> {
    let path = bib_db
        .or_else(|| std::env::var("PLAGCHECK_BIB_DB").ok().map(PathBuf::from))
        .or_else(|| {
            file_config
                .bibliography
                .as_ref()
                .and_then(|b| b.db_path.as_ref())
                .map(PathBuf::from)
        });
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        anyhow::bail!(
            "Bibliographic store not found at {}. Create it with: plagcheck bib add --db {} ...",
            path.display(),
            path.display()
        );
    }
    let db = BibDatabase::open(&path)?;
    let store: Arc<dyn BibliographicStore> = Arc::new(Mutex::new(db));
    Ok(Some(store))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Supported files directly inside `dir`, sorted by path. `skip` (the
/// submission) is left out so a document is never compared with itself.
fn scan_corpus_dir(dir: &Path, skip: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentFormat::from_extension)
            .is_some();
        if !supported {
            continue;
        }
        if let Some(skip) = skip
            && same_file(&path, skip)
        {
            tracing::debug!(path = %path.display(), "skipping submission in corpus directory");
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files
        .into_iter()
        .map(|p| p.display().to_string())
        .collect())
}

fn format_for_path(path: &Path) -> ExportFormat {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|e| e.parse().ok())
        .unwrap_or_default()
}

/// `path` with the format's extension added when it has none.
fn report_path(path: &Path, format: ExportFormat) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(format.extension())
    }
}

async fn check(
    submission: String,
    mut references: Vec<String>,
    corpus_dir: Option<PathBuf>,
    mut config: Config,
    file_config: &ConfigFile,
    opts: CheckOptions,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    if let Some(ref dir) = corpus_dir {
        let submission_path = match DocumentSource::parse(&submission) {
            DocumentSource::Path(p) => Some(p),
            _ => None,
        };
        let found = scan_corpus_dir(dir, submission_path.as_deref())?;
        tracing::info!(dir = %dir.display(), files = found.len(), "scanned corpus directory");
        references.extend(found);
    }
    if references.is_empty() {
        anyhow::bail!("No reference documents given (pass paths/URLs or --corpus-dir)");
    }

    config.bib_store = open_bib_store(opts.bib_db, file_config)?;
    let embedder = build_embedder(
        opts.embed_url,
        opts.embed_model,
        file_config,
        config.embed_timeout(),
    )
    .await?;

    let color = ColorMode(!opts.no_color && opts.output.is_none() && opts.format.is_none());
    let mut writer: Box<dyn Write> = Box::new(std::io::stdout());

    let normalizer = build_normalizer(file_config);
    let submission_source = DocumentSource::parse(&submission);
    let submitted = if opts.exclude_references {
        normalizer.load_body(&submission_source).await
    } else {
        normalizer.load(&submission_source).await
    };

    let mut reference_docs: Vec<Document> = Vec::with_capacity(references.len());
    for reference in &references {
        reference_docs.push(normalizer.load(&DocumentSource::parse(reference)).await);
    }

    // The load summary goes to stderr when stdout carries a machine-readable report.
    {
        let loaded: Vec<(String, usize)> = reference_docs
            .iter()
            .map(|d| (d.name.clone(), d.sentences.len()))
            .collect();
        let mut summary_out: Box<dyn Write> = if opts.format.is_some() && opts.output.is_none() {
            Box::new(std::io::stderr())
        } else {
            Box::new(std::io::stdout())
        };
        output::print_load_summary(
            &mut summary_out,
            &submitted.name,
            submitted.sentences.len(),
            &loaded,
            color,
        )?;
    }

    let total = reference_docs.len();
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let progress_cb = {
        let bar = bar.clone();
        move |event: ProgressEvent| match event {
            ProgressEvent::Started { reference, .. } => bar.set_message(reference),
            ProgressEvent::Completed { .. } => bar.inc(1),
            ProgressEvent::Failed {
                reference, error, ..
            } => {
                bar.println(format!("  skipped {}: {}", reference, error));
                bar.inc(1);
            }
            ProgressEvent::Cancelled { .. } => bar.inc(1),
        }
    };

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let run = plagcheck_core::compare_corpus(
        submitted.clone(),
        reference_docs,
        embedder,
        config,
        progress_cb,
        cancel.clone(),
    )
    .await;
    bar.finish_and_clear();
    let comparisons = run?;

    if cancel.is_cancelled() {
        tracing::warn!(
            completed = comparisons.len(),
            total,
            "run cancelled, report covers completed references only"
        );
    }

    let results: Vec<_> = comparisons.iter().map(|c| c.result.clone()).collect();
    let report = plagcheck_core::aggregate(&results, &submitted.sentences, &submitted.name);
    let submission_report = SubmissionReport {
        aggregate: &report,
        comparisons: &comparisons,
    };
    let failed = total - comparisons.len();

    if let Some(ref path) = opts.output {
        let format = opts.format.unwrap_or_else(|| format_for_path(path));
        let path = report_path(path, format);
        plagcheck_reporting::export_report(&submission_report, format, &path)?;
        output::print_summary(&mut writer, &report, failed, color)?;
        writeln!(writer, "\n{} report written to {}", format.label(), path.display())?;
    } else if let Some(format) = opts.format {
        let rendered = plagcheck_reporting::render(&submission_report, format)?;
        writeln!(writer, "{}", rendered)?;
    } else {
        output::print_comparisons(&mut writer, &comparisons, color)?;
        output::print_summary(&mut writer, &report, failed, color)?;
    }

    Ok(())
}

async fn sentences(
    source: &str,
    raw: bool,
    no_color: bool,
    file_config: &ConfigFile,
) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);
    let mut writer: Box<dyn Write> = Box::new(std::io::stdout());

    let normalizer = build_normalizer(file_config);
    let source = DocumentSource::parse(source);
    let lines = if raw {
        normalizer.try_raw_lines(&source).await?
    } else {
        normalizer.load(&source).await.sentences
    };
    output::print_lines(&mut writer, &source.name(), &lines, raw, color)?;
    Ok(())
}

fn bib(command: BibCommand) -> anyhow::Result<()> {
    match command {
        BibCommand::Add {
            db,
            title,
            date,
            authors,
        } => {
            let store = BibDatabase::open(&db)?;
            let authors: Vec<&str> = authors.iter().map(String::as_str).collect();
            let id = store.add_resource(&title, date.as_deref(), &authors)?;
            let stats = store.stats()?;
            println!(
                "Added resource {} to {} ({} resources, {} authors)",
                id,
                db.display(),
                stats.resources,
                stats.authors
            );
        }
        BibCommand::Keys { db } => {
            if !db.exists() {
                anyhow::bail!("Bibliographic store not found at {}", db.display());
            }
            let store = BibDatabase::open(&db)?;
            let mut keys: Vec<String> = store.fetch_reference_keys()?.into_iter().collect();
            keys.sort();
            for key in &keys {
                println!("{}", key);
            }
            tracing::info!(keys = keys.len(), "listed reference keys");
        }
    }
    Ok(())
}
