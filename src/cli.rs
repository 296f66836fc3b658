use crate::{
    batch::{self, CutGroup},
    classifier::CommandClassifier,
    config::Config,
    cut,
    extract::{LopdfExtractor, SelectionMode},
    folder::FolderProcessor,
    report::ProcessResponse,
    splitter::Splitter,
    store::{self, SourcePdf},
    usage::sink_from_config,
    util::{ensure_dir, looks_like_url, unix_timestamp},
    worker::FolderWorker,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "docsplit")]
#[command(about = "Split combined PDF scans into one file per document, accounting for every page")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./docsplit.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the page count of a PDF (0 if unreadable).
    Pages {
        #[arg(long)]
        input: PathBuf,
    },
    /// Classify and reconcile a PDF without writing any files.
    Plan {
        #[arg(long)]
        input: PathBuf,
    },
    /// Split every multi-page PDF in a folder.
    Process {
        #[arg(long)]
        folder: PathBuf,
        /// Correlation id; defaults to the current unix timestamp.
        #[arg(long)]
        correlation_id: Option<String>,
        /// Where `file_<id>.json` is written.
        #[arg(long)]
        response_dir: Option<PathBuf>,
    },
    /// Cut one page range out of a PDF.
    Cut {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        start: u32,
        #[arg(long)]
        end: u32,
    },
    /// Apply grouped cut instructions from a JSON file.
    BatchCut {
        #[arg(long)]
        request: PathBuf,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    if cfg.global.dump_effective_config {
        let raw = toml::to_string(&cfg).unwrap_or_default();
        info!("effective config:\n{raw}");
    }

    match &args.cmd {
        Command::Pages { input } => pages(&cfg, input),
        Command::Plan { input } => plan(&cfg, input),
        Command::Process {
            folder,
            correlation_id,
            response_dir,
        } => process(&cfg, folder, correlation_id.as_deref(), response_dir.as_deref()),
        Command::Cut { input, start, end } => cut_cmd(&cfg, input, *start, *end),
        Command::BatchCut { request } => batch_cut(&cfg, request),
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    for candidate in ["docsplit.toml", "docsplit.example.toml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Config::load(&p);
        }
    }
    Ok(Config::default())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Stdout carries command results, so log lines go to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(PathBuf::from(&cfg.paths.log_dir).join("docsplit.log"))
}

fn extractor(cfg: &Config) -> Result<LopdfExtractor> {
    let mode = SelectionMode::parse(&cfg.splitting.page_selection)?;
    Ok(LopdfExtractor::new(mode))
}

fn pages(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(cfg, input)?;
    let count = store::page_count(input);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "page_count": count,
        }))?
    );
    Ok(())
}

fn plan(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(cfg, input)?;
    let splitter = Splitter::new(cfg, CommandClassifier::new(cfg)?, extractor(cfg)?);
    let source = SourcePdf::open(input)?;
    let (buckets, confidence, usage) = splitter.plan(&source)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "total_pages": source.page_count(),
            "confidence": confidence,
            "buckets": buckets,
            "usage": usage,
        }))?
    );
    Ok(())
}

fn process(
    cfg: &Config,
    folder: &Path,
    correlation_id: Option<&str>,
    response_dir: Option<&Path>,
) -> Result<()> {
    let correlation_id = correlation_id.map(str::to_string).unwrap_or_else(unix_timestamp);

    let response = if cfg.security.reject_url_inputs && looks_like_url(&folder.display().to_string()) {
        ProcessResponse::failure(format!("URL inputs are disabled: {}", folder.display()))
    } else {
        match build_processor(cfg) {
            Ok(processor) => {
                let mut worker = FolderWorker::spawn(processor);
                worker.submit(folder, correlation_id.as_str())?;
                let response = worker.wait_for(&correlation_id)?;
                worker.shutdown()?;
                response
            }
            Err(err) => ProcessResponse::failure(format!("{err:#}")),
        }
    };

    if cfg.output.write_response_file {
        let dir = response_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&cfg.paths.response_dir));
        ensure_dir(&dir)?;
        let path = dir.join(format!("{}{correlation_id}.json", cfg.output.response_file_prefix));
        std::fs::write(&path, serde_json::to_string_pretty(&response)?)
            .with_context(|| format!("writing response: {}", path.display()))?;
        info!("response written to {}", path.display());
    }

    if cfg.global.print_summary {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    if let ProcessResponse::Error { error, .. } = &response {
        warn!("folder pass {correlation_id} failed");
        return Err(anyhow!("folder pass {correlation_id} failed: {error}"));
    }
    Ok(())
}

fn build_processor(cfg: &Config) -> Result<FolderProcessor<CommandClassifier, LopdfExtractor>> {
    let splitter = Splitter::new(cfg, CommandClassifier::new(cfg)?, extractor(cfg)?);
    Ok(FolderProcessor::new(cfg, splitter, sink_from_config(cfg)))
}

fn cut_cmd(cfg: &Config, input: &Path, start: u32, end: u32) -> Result<()> {
    validate_input(cfg, input)?;
    let path = cut::cut(&extractor(cfg)?, input, start, end)
        .with_context(|| format!("cutting {}", input.display()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "status": "success",
            "cut_pdf_path": path,
            "original_pdf_path": input,
            "pages_extracted": format!("{start}-{end}"),
            "message": format!("Successfully cut PDF from page {start} to {end}"),
        }))?
    );
    Ok(())
}

fn batch_cut(cfg: &Config, request: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(request)
        .with_context(|| format!("reading batch request: {}", request.display()))?;
    let groups: Vec<CutGroup> =
        serde_json::from_str(&raw).with_context(|| "parsing batch request JSON")?;
    let outcome = batch::run(&extractor(cfg)?, &groups);
    info!(
        "batch cut: {} written, {} errors, {} deleted",
        outcome.split_pdf_array.len(),
        outcome.errors.len(),
        outcome.deleted.len()
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    if let Some(ext) = input.extension().and_then(|s| s.to_str()) {
        if !ext.eq_ignore_ascii_case("pdf") {
            return Err(anyhow!("input is not a PDF: {}", input.display()));
        }
    } else {
        warn!("input has no extension; assuming PDF: {}", input.display());
    }

    Ok(())
}
