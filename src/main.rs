//! tagsweep command line tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tagsweep_bulk::{
    BulkEdit, BulkMode, BulkMutationCoordinator, BulkOptions, EntityKind, OperationResult,
    RelationField,
};
use tagsweep_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig, ValidationResult};
use tagsweep_remote::{HttpTransport, RemoteExecutor};
use tagsweep_workqueue::ProgressReporter;

#[derive(Parser)]
#[command(name = "tagsweep")]
#[command(about = "Bulk relationship edits for media-cataloging servers")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "TAGSWEEP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add, remove or set related ids on many records
    Apply(ApplyArgs),
    /// Load and check the configuration
    Validate,
}

#[derive(Args)]
struct ApplyArgs {
    /// Record type: scenes, images, galleries or performers
    #[arg(long)]
    kind: EntityKind,

    /// Relation to edit: tags, performers or galleries
    #[arg(long)]
    field: RelationField,

    /// add, remove or set
    #[arg(long)]
    mode: BulkMode,

    /// Related ids, comma separated
    #[arg(long, value_delimiter = ',')]
    related: Vec<String>,

    /// Record ids, comma separated
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,

    /// File with one record id per line
    #[arg(long)]
    ids_file: Option<PathBuf>,

    /// Override server.endpoint
    #[arg(long, env = "TAGSWEEP_ENDPOINT")]
    endpoint: Option<String>,

    /// Override server.api_key
    #[arg(long, env = "TAGSWEEP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override queue.concurrency
    #[arg(long)]
    concurrency: Option<usize>,

    /// Override bulk.batch_size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Override queue.retry_count
    #[arg(long)]
    retry_count: Option<u32>,

    /// Write the record ids of failed chunks to this file
    #[arg(long)]
    failed_out: Option<PathBuf>,

    /// Print the chunk plan without sending anything
    #[arg(long)]
    dry_run: bool,
}

impl ApplyArgs {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.server.endpoint = endpoint.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.server.api_key = Some(api_key.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.queue.concurrency = concurrency;
        }
        if let Some(batch_size) = self.batch_size {
            config.bulk.batch_size = batch_size;
        }
        if let Some(retry_count) = self.retry_count {
            config.queue.retry_count = retry_count;
        }
    }
}

/// Install the console layer and, when configured, a non-blocking file layer.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("log file has no name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = logging
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!logging.json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn report_validation(result: &ValidationResult) {
    for warning in &result.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        tracing::error!("{}: {}", error.path, error.message);
    }
}

/// Read record ids, one per line. Blank lines and `#` comments are skipped.
fn read_ids(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read ids file {}", path.display()))?;
    Ok(parse_ids(&content))
}

fn parse_ids(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

fn print_summary(result: &OperationResult) {
    println!(
        "chunks: {} succeeded, {} failed ({} aborted) of {}",
        result.succeeded_chunks,
        result.failed_chunks.len(),
        result.aborted_chunks(),
        result.total_chunks
    );
    println!(
        "records: {} acknowledged, ~{} processed",
        result.acknowledged_items, result.processed_item_estimate
    );
    println!("elapsed: {:.1?}", result.elapsed);
    for failure in &result.failed_chunks {
        println!(
            "  batch {}/{} ({} records): {}",
            failure.metadata.batch_index + 1,
            failure.metadata.total_batches,
            failure.request.ids.len(),
            failure.error
        );
    }
}

async fn run_apply(mut config: Config, args: ApplyArgs) -> anyhow::Result<()> {
    args.apply_overrides(&mut config);
    let validation = ConfigValidator::validate(&config)?;
    report_validation(&validation);
    validation.into_result()?;

    let mut record_ids = args.ids.clone();
    if let Some(path) = &args.ids_file {
        record_ids.extend(read_ids(path)?);
    }
    if record_ids.is_empty() {
        bail!("no record ids given, use --ids or --ids-file");
    }

    let edit = BulkEdit::new(args.kind, args.field, args.mode)
        .with_records(record_ids)
        .with_related(args.related.clone());

    let mut transport = HttpTransport::new(config.server.endpoint.clone());
    if let Some(api_key) = &config.server.api_key {
        transport = transport.with_api_key(api_key.clone());
    }
    let executor = Arc::new(RemoteExecutor::new(Arc::new(transport), config.executor.clone()));

    let options = BulkOptions {
        batch_size: config.bulk.batch_size,
        queue: config.queue.clone(),
    };
    let reporter = Arc::new(ProgressReporter::new(format!("{} {}", edit.kind, edit.field)));
    let coordinator = BulkMutationCoordinator::new(executor, options)?.with_observer(reporter);

    if args.dry_run {
        let plan = coordinator.plan(&edit)?;
        println!(
            "{} {} on {} {} record(s) in {} chunk(s) via {}",
            edit.mode,
            edit.field,
            edit.record_ids.len(),
            edit.kind,
            plan.len(),
            config.server.endpoint
        );
        for (index, chunk) in plan.iter().enumerate() {
            let request = chunk.to_remote_request();
            println!(
                "  batch {}/{}: {} record(s), first {}, {}",
                index + 1,
                plan.len(),
                chunk.ids.len(),
                chunk.ids.first().map(String::as_str).unwrap_or("-"),
                request.operation_name
            );
        }
        return Ok(());
    }

    let job = coordinator.start(&edit)?;
    let aborter = job.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, rejecting chunks that have not started");
            aborter.abort();
        }
    });

    let result = job.wait().await;
    interrupt.abort();
    print_summary(&result);

    if let Some(path) = &args.failed_out {
        let ids = result.failed_record_ids();
        let mut content = ids.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        std::fs::write(path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!("Wrote {} failed record id(s) to {}", ids.len(), path.display());
    }

    if !result.is_success() {
        bail!(
            "{} of {} chunk(s) failed",
            result.failed_chunks.len(),
            result.total_chunks
        );
    }
    Ok(())
}

fn run_validate(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let validation = ConfigValidator::validate(config)?;
    report_validation(&validation);

    let source = path
        .map(|p| p.display().to_string())
        .or_else(|| {
            ConfigLoader::default_path()
                .filter(|p| p.exists())
                .map(|p| p.display().to_string())
        })
        .unwrap_or_else(|| "built-in defaults".to_string());

    validation.into_result()?;
    println!("{}: ok", source);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    let _guard = init_tracing(&config.logging)?;

    match cli.command {
        Commands::Apply(args) => run_apply(config, args).await,
        Commands::Validate => run_validate(&config, cli.config.as_deref()),
    }
}
