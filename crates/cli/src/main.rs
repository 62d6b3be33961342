//! pipedeps CLI - resolve the upstream inputs of a production task.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pipedeps_core::{normalize_task_type, DependencyRecord, SourceCategory, TaskId};
use pipedeps_execution::{DependencyResolver, Resolution, ResolverConfig, RuleTable};
use pipedeps_storage::JsonGateway;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pipedeps")]
#[command(about = "Resolve upstream dependencies of pipeline tasks", long_about = None)]
struct Cli {
    /// Data directory with entities/, tasks/, versions/, ...
    #[arg(long, env = "PIPEDEPS_DATA", default_value = ".pipedeps", global = true)]
    data: PathBuf,

    /// JSON rule file replacing the built-in pipeline rules
    #[arg(long, env = "PIPEDEPS_RULES", global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a task-type label
    Normalize {
        /// Raw label, e.g. 002_Modeling
        label: String,
    },
    /// Show the active rule table
    Rules,
    /// Resolve the dependencies of a task
    Resolve {
        /// Task ID
        id: String,
        /// Linked-asset lookups in flight at once
        #[arg(long, env = "PIPEDEPS_CONCURRENCY", default_value = "8")]
        concurrency: usize,
        /// Per-branch timeout in milliseconds
        #[arg(long, env = "PIPEDEPS_TIMEOUT_MS")]
        timeout_ms: Option<u64>,
        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize { label } => {
            let key = normalize_task_type(&label)?;
            println!("{}", key);
        }
        Commands::Rules => {
            let rules = load_rules(cli.rules.as_ref()).await?;
            println!("Rules ({})", rules.len());
            for (task_type, rule) in rules.iter() {
                let mut line = format!("  {:<10} <- [{}]", task_type.as_str(), join(&rule.upstream_chain));
                if rule.needs_linked_assets {
                    line.push_str(&format!(" + linked assets [{}]", join(&rule.asset_preference_chain)));
                }
                println!("{}", line);
            }
        }
        Commands::Resolve { id, concurrency, timeout_ms, json } => {
            let task_id: TaskId = id.parse().map_err(|_| anyhow::anyhow!("Invalid task ID: {}", id))?;
            let rules = load_rules(cli.rules.as_ref()).await?;
            let gateway = JsonGateway::open(&cli.data)
                .await
                .with_context(|| format!("Failed to open data directory {}", cli.data.display()))?;

            let Some(task) = gateway.load_task(task_id).await? else {
                println!("Task not found");
                return Ok(());
            };

            let mut config = ResolverConfig::default().with_max_concurrency(concurrency);
            if let Some(ms) = timeout_ms {
                config = config.with_branch_timeout(Duration::from_millis(ms));
            }
            let resolver = DependencyResolver::new(gateway).with_rules(rules).with_config(config);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, abandoning lookups");
                    on_interrupt.cancel();
                }
            });

            let resolution = resolver.resolve_with_cancel(&task, &cancel).await?;
            info!("Resolved task {} ({})", task.id, task.content);

            if json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else {
                print_resolution(&resolution);
            }
        }
    }

    Ok(())
}

async fn load_rules(path: Option<&PathBuf>) -> Result<RuleTable> {
    match path {
        Some(path) => RuleTable::load(path)
            .await
            .with_context(|| format!("Failed to load rules from {}", path.display())),
        None => Ok(RuleTable::pipeline()),
    }
}

fn print_resolution(resolution: &Resolution) {
    println!("Task {} ({})", resolution.task, resolution.task_type);
    println!("Total dependencies: {}", resolution.records.len());

    for category in [SourceCategory::UpstreamTask, SourceCategory::AssetDependency] {
        println!("{} ({})", category, resolution.count(category));
        for record in resolution.records.iter().filter(|r| r.category == category) {
            print_record(record);
        }
    }

    if !resolution.warnings.is_empty() {
        println!("Warnings ({})", resolution.warnings.len());
        for failure in &resolution.warnings {
            println!("  ! {}", failure);
        }
    }
}

fn print_record(record: &DependencyRecord) {
    println!(
        "  {} | {} | {} (v{}, {:?})",
        record.entity.code, record.task.step, record.version.code, record.version.sequence, record.version.status,
    );
    if let Some(note) = record.note() {
        println!("    note: {}", note);
    }
    for file in &record.published_files {
        println!("    published: {} [{}] {}", file.filename, format_size(file.size), file.path_token);
    }
    for attachment in &record.attachments {
        println!("    attachment: {} [{}] {:?}", attachment.filename, format_size(attachment.size), attachment.media_kind);
    }
}

fn join(chain: &[pipedeps_core::TaskType]) -> String {
    chain.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
}

fn format_size(size: Option<u64>) -> String {
    match size {
        Some(bytes) if bytes >= 1 << 20 => format!("{:.1} MB", bytes as f64 / (1u64 << 20) as f64),
        Some(bytes) if bytes >= 1 << 10 => format!("{:.1} KB", bytes as f64 / (1u64 << 10) as f64),
        Some(bytes) => format!("{} B", bytes),
        None => "size unknown".to_string(),
    }
}
