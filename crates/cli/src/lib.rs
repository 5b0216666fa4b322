use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use layout_engine::LayoutSync;
use layout_protocol::{
    serialize_json, serialize_json_pretty, AssetDb, ImportOptions, MemoryHost, PositionRecord,
    ReconcileReport, SceneHost, SceneNode,
};
use layout_records::{load_records, GroupKey, Grouping};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod bridge;
mod config;

pub use bridge::EditorBridge;
pub use config::{BridgeConfig, ImportDefaults, LayoutConfig, DEFAULT_CONFIG_FILE};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serialize_json_pretty(value)
    } else {
        serialize_json(value)
    }
}

#[derive(Parser)]
#[command(name = "csv-layout")]
#[command(about = "Place and update scene nodes from a CSV layout", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (default: ./csv-layout.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a CSV layout to the open scene
    Import(ImportArgs),

    /// Parse a CSV layout and print its records and groups
    Parse(ParseArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// CSV file to apply
    csv: PathBuf,

    /// Create nodes missing from the scene
    #[arg(long)]
    auto_create: bool,

    /// Leave positions of existing nodes untouched
    #[arg(long)]
    no_position: bool,

    /// Folder of images to copy into the project and bind as sprites
    #[arg(long)]
    images: Option<PathBuf>,

    /// Destination folder for images (must be inside <project>/assets)
    #[arg(long)]
    target: Option<PathBuf>,

    /// Project root (default: current directory)
    #[arg(long)]
    project: Option<PathBuf>,

    /// Copy images flat into the target instead of mirroring subfolders
    #[arg(long)]
    flatten: bool,

    /// Skip the sibling ordering pass
    #[arg(long)]
    no_order: bool,

    /// Preferred parent for root-level records
    #[arg(long)]
    anchor: Option<String>,

    /// Work offline against a scene snapshot (JSON node tree) instead of the editor
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Write the resulting scene tree here (offline mode only)
    #[arg(long, requires = "scene")]
    scene_out: Option<PathBuf>,

    /// Editor bridge address, e.g. 127.0.0.1:7460 (env: CSV_LAYOUT_BRIDGE_ADDR)
    #[arg(long)]
    bridge: Option<String>,

    /// Per-request timeout for the editor bridge
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pretty-print JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ParseArgs {
    /// CSV file to parse
    csv: PathBuf,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct ParseOutput<'a> {
    records: &'a [PositionRecord],
    groups: Vec<GroupOutput<'a>>,
}

#[derive(Serialize)]
struct GroupOutput<'a> {
    /// `null` for records hanging off the anchor.
    parent: Option<&'a str>,
    children: Vec<&'a str>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = LayoutConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Import(args) => run_import(args, config).await?,
        Commands::Parse(args) => run_parse(args).await?,
    }

    Ok(())
}

async fn run_parse(args: ParseArgs) -> Result<()> {
    let records = load_records(&args.csv).await?;
    let grouping = Grouping::from_records(&records);
    let groups = grouping
        .iter()
        .map(|(key, children)| GroupOutput {
            parent: match key {
                GroupKey::Root => None,
                GroupKey::Path(path) => Some(path.as_str()),
            },
            children: children.iter().map(|record| record.name.as_str()).collect(),
        })
        .collect();

    print_stdout(&to_json(
        &ParseOutput {
            records: &records,
            groups,
        },
        args.pretty,
    )?)
}

fn import_options(args: &ImportArgs, defaults: &ImportDefaults) -> Result<ImportOptions> {
    let project = match args.project.clone().or_else(|| defaults.project.clone()) {
        Some(project) => project,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };
    let target = args
        .target
        .clone()
        .or_else(|| defaults.images_target.clone())
        .map(|target| {
            if target.is_relative() {
                project.join(target)
            } else {
                target
            }
        });

    Ok(ImportOptions {
        auto_create: args.auto_create || defaults.auto_create,
        update_position: defaults.update_position && !args.no_position,
        import_images: args.images.is_some(),
        images_source_folder: args.images.clone(),
        images_target_folder: target,
        project_path: project,
        keep_structure: defaults.keep_structure && !args.flatten,
        enforce_order: defaults.enforce_order && !args.no_order,
    })
}

async fn run_import(args: ImportArgs, mut config: LayoutConfig) -> Result<()> {
    if let Some(addr) = &args.bridge {
        config.bridge.addr = addr.clone();
    }
    if let Some(ms) = args.timeout_ms {
        config.bridge.timeout_ms = ms;
    }

    let options = import_options(&args, &config.import)?;
    if options.import_images && options.images_target_folder.is_none() {
        log::warn!("--images given without --target; images will not be imported");
    }
    let anchor = args
        .anchor
        .clone()
        .unwrap_or_else(|| config.import.anchor.clone());

    let offline = match &args.scene {
        Some(path) => Some(Arc::new(load_snapshot(path)?)),
        None => None,
    };
    let (host, assets): (Arc<dyn SceneHost>, Arc<dyn AssetDb>) = match &offline {
        Some(memory) => {
            let host: Arc<dyn SceneHost> = memory.clone();
            let assets: Arc<dyn AssetDb> = memory.clone();
            (host, assets)
        }
        None => {
            log::info!("Using editor bridge at {}", config.bridge.addr);
            let bridge = Arc::new(EditorBridge::new(
                config.bridge.addr.clone(),
                config.bridge.timeout(),
            ));
            let host: Arc<dyn SceneHost> = bridge.clone();
            let assets: Arc<dyn AssetDb> = bridge;
            (host, assets)
        }
    };

    let sync = LayoutSync::new(host, assets)
        .with_settle(config.settle.clone())
        .with_binding(config.binding.clone())
        .with_anchor_name(anchor);
    let report = sync.import_csv(&args.csv, &options).await;

    if let (Some(memory), Some(out)) = (&offline, &args.scene_out) {
        let tree = serialize_json_pretty(&memory.snapshot())?;
        tokio::fs::write(out, tree)
            .await
            .with_context(|| format!("Cannot write scene to {}", out.display()))?;
    }

    print_stdout(&to_json(&report, args.pretty)?)?;
    if !report.success {
        anyhow::bail!("{}", failure_message(&report));
    }
    Ok(())
}

fn failure_message(report: &ReconcileReport) -> &str {
    report.message.as_deref().unwrap_or("import failed")
}

fn load_snapshot(path: &Path) -> Result<MemoryHost> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read scene snapshot {}", path.display()))?;
    let root: SceneNode = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid scene snapshot {}", path.display()))?;
    Ok(MemoryHost::from_snapshot(&root))
}
