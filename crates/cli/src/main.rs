mod discover;
mod output;
mod settings;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use hotspot_core::emit::PrefixRewrite;
use hotspot_core::manager::HotspotManager;
use hotspot_core::parsers;
use hotspot_core::report::HotspotSort;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Report which functions in a source file were hot during a load test.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    /// Settings file (JSON, optionally under a `codewindProfiling` key).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hot functions in one source file
    Report {
        /// Source file on disk
        file: PathBuf,

        /// Directory searched for projects with load-test results
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Use this project instead of searching the workspace
        #[arg(long)]
        project: Option<PathBuf>,

        /// Use this results directory instead of the project's newest one
        #[arg(long)]
        results: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Leave out per-caller breakdowns
        #[arg(long)]
        no_callers: bool,
    },
    /// Summary of the call tree built from one results directory
    Stats {
        results: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SortArg {
    FirstSeen,
    Percentage,
    Line,
}

impl From<SortArg> for HotspotSort {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::FirstSeen => HotspotSort::FirstSeen,
            SortArg::Percentage => HotspotSort::Percentage,
            SortArg::Line => HotspotSort::Line,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeStats {
    nodes: usize,
    files: usize,
    max_depth: u32,
    total_ticks: u64,
    root_self_ticks: u64,
}

/// Log to stderr so JSON on stdout stays clean. Other crates stay at warn.
fn init_logging(verbose: &Verbosity<WarnLevel>) {
    const CRATES: &[&str] = &["hotspot", "hotspot_core"];
    let level = verbose.tracing_level_filter();
    let allowlist: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    let filter = EnvFilter::new(format!("warn,{}", allowlist.join(",")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.verbose);

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Report {
            file,
            workspace,
            project,
            results,
            format,
            sort,
            no_callers,
        } => {
            if let Some(sort) = sort {
                settings.report.sort = sort.into();
            }
            if no_callers {
                settings.report.related_information = false;
            }
            let request = ReportRequest {
                file: &file,
                workspace: &workspace,
                project: project.as_deref(),
                results: results.as_deref(),
            };
            report(&mut out, &settings, &request, format)
        }
        Commands::Stats { results, format } => stats(&mut out, &results, format),
    }
}

struct ReportRequest<'a> {
    file: &'a Path,
    workspace: &'a Path,
    project: Option<&'a Path>,
    results: Option<&'a Path>,
}

fn report(out: &mut dyn Write, settings: &Settings, request: &ReportRequest<'_>, format: Format) -> Result<()> {
    let file = std::path::absolute(request.file)
        .with_context(|| format!("resolving {}", request.file.display()))?;
    let display = file.display().to_string();

    let diagnostics = if !settings.show_profiling {
        info!("profiling display is switched off");
        Vec::new()
    } else if let Some((project, results)) = locate(settings, request, &file)? {
        let Some(app_file) = discover::app_path(&file, &project, &settings.app_root) else {
            bail!("{} is not inside project {}", file.display(), project.display());
        };
        info!(results = %results.display(), app_file = %app_file, "reporting hot spots");
        let rewrite = PrefixRewrite::new(settings.app_root.clone(), discover::project_prefix(&project));
        HotspotManager::new(settings.report.clone()).diagnostics_for_file(&results, &app_file, &rewrite)
    } else {
        Vec::new()
    };

    match format {
        Format::Text => output::write_text(out, &display, &diagnostics)?,
        Format::Json => output::write_json(out, &diagnostics)?,
    }
    Ok(())
}

/// Project and results directory for `file`, or `None` (logged) when the
/// file has no profiling data.
fn locate(settings: &Settings, request: &ReportRequest<'_>, file: &Path) -> Result<Option<(PathBuf, PathBuf)>> {
    let project = match request.project {
        Some(p) => std::path::absolute(p)?,
        None => {
            let workspace = std::path::absolute(request.workspace)?;
            let projects = discover::find_project_folders(&workspace, &settings.profiling_folder);
            match discover::project_for_file(&projects, file) {
                Some(p) => p.to_path_buf(),
                None => {
                    warn!(file = %file.display(), "file is not in a project with load-test results");
                    return Ok(None);
                }
            }
        }
    };

    let results = match request.results {
        Some(r) => Some(r.to_path_buf()),
        None => discover::latest_results(&project, &settings.profiling_folder),
    };
    Ok(results.map(|r| (project, r)))
}

fn stats(out: &mut dyn Write, results: &Path, format: Format) -> Result<()> {
    let tree = parsers::load_tree(results)?;
    let stats = TreeStats {
        nodes: tree.len(),
        files: tree.file_count(),
        max_depth: tree.max_depth(),
        total_ticks: tree.total_ticks(),
        root_self_ticks: tree.root().self_ticks,
    };
    match format {
        Format::Json => output::write_json(out, &stats)?,
        Format::Text => {
            writeln!(out, "nodes:       {}", stats.nodes)?;
            writeln!(out, "files:       {}", stats.files)?;
            writeln!(out, "max depth:   {}", stats.max_depth)?;
            writeln!(out, "total ticks: {}", stats.total_ticks)?;
            writeln!(out, "root ticks:  {}", stats.root_self_ticks)?;
        }
    }
    Ok(())
}
