// Target-specific transitive dependency split (mio/crossterm stack) is accepted for now.
#![allow(clippy::multiple_crate_versions)]

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use minus::{ExitStrategy, Pager, page_all};
use terrace_domain::{Node, NodeId, OrderReport};
use terrace_engine::{
    BuildOptions, DEFAULT_MAX_PARALLEL, LoadedGraph, WalkDirection, WalkOptions,
    build_graph_for_path, validate_path,
};
use terrace_report::{
    ColorChoice, OutputFormat, RenderOptions, render_order, render_validation, render_walk,
};
use tracing::Level;
use tracing_subscriber::fmt;

mod error;

pub use error::{CliError, SimulatedFailure};

#[derive(Debug, Parser)]
#[command(
    name = "terrace",
    about = "Dependency graph engine for declarative infrastructure configuration"
)]
struct Cli {
    #[command(flatten)]
    render: RenderFlags,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check a configuration for duplicate declarations and dependency cycles.
    Validate {
        #[command(flatten)]
        input: InputArgs,
        /// Report references that do not resolve to any declaration.
        #[arg(long)]
        strict: bool,
    },
    /// Print the dependency-first execution order.
    Order {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the graph in Graphviz DOT format.
    Graph {
        #[command(flatten)]
        input: InputArgs,
        /// Drop edges implied by longer dependency paths.
        #[arg(long)]
        reduce: bool,
        /// Restrict output to these nodes and their dependencies.
        #[arg(long = "target", value_name = "ID")]
        targets: Vec<String>,
    },
    /// Walk the graph without touching anything, reporting each node.
    Walk {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long)]
        parallel: bool,
        #[arg(long, default_value_t = DEFAULT_MAX_PARALLEL)]
        max_parallel: usize,
        /// Visit dependents before their dependencies.
        #[arg(long)]
        reverse: bool,
        /// Pretend the visit of this node fails.
        #[arg(long = "fail", value_name = "ID")]
        fail: Vec<String>,
    },
}

#[derive(Debug, Clone, Args)]
struct InputArgs {
    /// A JSON configuration document or a folder of them.
    path: PathBuf,
    /// Module path the documents belong to; empty for the root module.
    #[arg(long, default_value = "")]
    module: String,
}

impl InputArgs {
    fn load(&self, options: BuildOptions) -> std::result::Result<LoadedGraph, CliError> {
        Ok(build_graph_for_path(&self.path, &self.module, options)?)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Args)]
struct RenderFlags {
    #[arg(long, global = true, value_enum, default_value_t = ColorArg::Auto)]
    color: ColorArg,
    #[arg(long, global = true, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,
    /// Log debug events to stderr and list input documents.
    #[arg(long, global = true)]
    verbose: bool,
}

impl RenderFlags {
    fn render_options(&self, input: &InputArgs) -> RenderOptions {
        RenderOptions {
            color: self.color.into(),
            verbose: self.verbose,
            target: Some(input.path.display().to_string()),
            module: Some(input.module.clone()),
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

impl From<ColorArg> for ColorChoice {
    fn from(value: ColorArg) -> Self {
        match value {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Run the CLI using process arguments.
///
/// # Errors
///
/// Returns an error when argument parsing fails (excluding help/version) or command
/// execution fails.
pub fn run() -> std::result::Result<i32, CliError> {
    run_from(std::env::args_os())
}

fn run_from<I, T>(args: I) -> std::result::Result<i32, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(error.into()),
        },
    };
    init_tracing(cli.render.verbose);

    let format: OutputFormat = cli.render.format.into();
    match cli.command {
        Commands::Validate { input, strict } => {
            let report = validate_path(
                &input.path,
                &input.module,
                BuildOptions {
                    strict_references: strict,
                },
            )?;
            let rendered =
                render_validation(&report, format, &cli.render.render_options(&input))?;
            emit_output(&rendered, format);
            Ok(i32::from(!report.valid))
        }
        Commands::Order { input } => {
            let loaded = input.load(BuildOptions::default())?;
            let report = OrderReport {
                order: loaded.graph.topological_sort()?,
                stats: loaded.graph.stats(),
                documents: loaded.documents,
            };
            let rendered = render_order(&report, format, &cli.render.render_options(&input))?;
            emit_output(&rendered, format);
            Ok(0)
        }
        Commands::Graph {
            input,
            reduce,
            targets,
        } => {
            let loaded = input.load(BuildOptions::default())?;
            let mut graph = loaded.graph;
            for target in &targets {
                if !graph.has_node(target) {
                    tracing::warn!(id = %target, "unknown target ignored");
                }
            }
            if !targets.is_empty() {
                graph = graph.subgraph(&targets);
            }
            if reduce {
                graph = graph.transitive_reduction();
            }
            println!("{}", graph.to_dot());
            Ok(0)
        }
        Commands::Walk {
            input,
            parallel,
            max_parallel,
            reverse,
            fail,
        } => {
            let loaded = input.load(BuildOptions::default())?;
            let failing: BTreeSet<NodeId> = fail.into_iter().map(NodeId::from).collect();
            let mut options = WalkOptions::new().on_error(|node: &Node, error: &SimulatedFailure| {
                tracing::debug!(node = %node.id, %error, "continuing after failure");
            });
            if parallel {
                options = options.parallel(max_parallel);
            }
            if reverse {
                options = options.direction(WalkDirection::Reverse);
            }

            let summary = loaded.graph.walk(|node| dry_run(node, &failing), options)?;
            let rendered = render_walk(&summary, format, &cli.render.render_options(&input))?;
            emit_output(&rendered, format);
            Ok(i32::from(summary.has_failures() || !summary.skipped.is_empty()))
        }
    }
}

fn dry_run(node: &Node, failing: &BTreeSet<NodeId>) -> std::result::Result<(), SimulatedFailure> {
    if failing.contains(&node.id) {
        return Err(SimulatedFailure {
            node: node.id.clone(),
        });
    }
    tracing::info!(node = %node.id, kind = %node.kind(), location = %node.location, "visited");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let max_level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn emit_output(rendered: &str, format: OutputFormat) {
    if format == OutputFormat::Text && should_use_pager() && page_output(rendered).is_ok() {
        return;
    }

    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
}

fn should_use_pager() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_PAGER").is_none()
}

fn page_output(rendered: &str) -> std::result::Result<(), minus::MinusError> {
    let pager = Pager::new();
    pager.set_exit_strategy(ExitStrategy::PagerQuit)?;
    pager.set_text(rendered)?;
    page_all(pager)
}
