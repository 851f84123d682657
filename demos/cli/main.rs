#![allow(dead_code)]

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use factory_layout_solver::graph::{MachineNode, MaterialEdge, ProductionGraph};
use factory_layout_solver::model::StreamItem;
use factory_layout_solver::{LayoutSolver, SolverConfig};
use futures::StreamExt;
use log::warn;
use owo_colors::OwoColorize;

#[derive(Parser)]
struct Cli {
    /// Maximum bounding-box iterations to try before giving up.
    #[arg(long, default_value_t = 50)]
    max_iterations: u32,
    /// Per-attempt SAT solver timeout, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,
    /// A TOML `SolverConfig` profile; fields present there override the
    /// `--max-iterations`/`--timeout-ms` defaults above.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generates a synthetic linear production chain sized to roughly fill a
    /// `width x height` area, for quick smoke-testing.
    Rect { width: usize, height: usize },
    /// Loads a production graph from a small textual format: one line per
    /// node as `id:kind:label`, one line per edge as `id:from->to:item:belts`.
    File { path: PathBuf },
}

fn parse_or_readline() -> anyhow::Result<Cli> {
    if std::env::args_os().len() > 1 {
        return Ok(Cli::parse());
    }

    let mut cmd = Cli::command().no_binary_name(true);

    println!("No CLI arguments were provided");
    println!("Specify arguments via stdin:");
    println!("{}", cmd.render_long_help());

    std::io::stdout().flush().context("could not write to stdout")?;
    let mut buffer = String::new();
    std::io::stdin().read_line(&mut buffer).context("could not read stdin")?;

    let args = shlex::split(buffer.trim()).context("invalid quoting")?;
    let matches = cmd.try_get_matches_from(args).context("failed to parse args")?;

    Cli::from_arg_matches(&matches).context("failed to parse args")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let run_timestamp = chrono::Utc::now().format(r"%y%m%d_%H%M%S");
    println!("run {run_timestamp}");

    let args = parse_or_readline()?;

    let graph = match args.cmd {
        Command::Rect { width, height } => synthetic_chain(width, height),
        Command::File { path } => load_graph_from_file(&path)?,
    };

    let config = match &args.config {
        Some(path) => {
            let toml_str = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            SolverConfig::from_toml_str(&toml_str)?
        }
        None => SolverConfig {
            max_iterations: args.max_iterations,
            timeout_ms_per_attempt: args.timeout_ms,
            ..Default::default()
        },
    };

    let solver = LayoutSolver::new();
    let mut session = solver.solve(&graph, config)?;

    let cancel_token = session.cancel_token();
    if let Err(err) = ctrlc::set_handler({
        let mut is_repeat = false;
        move || {
            if is_repeat {
                warn!("Aborting immediately");
                std::process::exit(-1);
            }
            is_repeat = true;
            warn!("Stopping...");
            cancel_token.cancel();
        }
    }) {
        warn!("Failed to set interrupt handler! {}", err);
    }

    while let Some(item) = session.next().await {
        match item {
            StreamItem::Attempt(attempt) => {
                println!(
                    "attempt {:>3} ({:>3}x{:<3}) {}",
                    attempt.iteration,
                    attempt.width,
                    attempt.height,
                    format!("{:?}", attempt.status).to_ascii_lowercase().red()
                );
            }
            StreamItem::Solution(solution) => {
                let status_str = format!("{:?}", solution.status).to_ascii_lowercase();
                let colored = if solution.status.is_sat() {
                    status_str.green().to_string()
                } else if solution.status.is_unsat() {
                    status_str.red().to_string()
                } else {
                    status_str.yellow().to_string()
                };
                println!(
                    "solution: {colored} bounds {}x{} in {}ms ({} placements, {} belt segments)",
                    solution.bounds.width,
                    solution.bounds.height,
                    solution.elapsed_ms,
                    solution.placements.len(),
                    solution.segments.len(),
                );
                for p in &solution.placements {
                    println!("  {} at ({}, {}) {}x{}", p.node_id, p.x, p.y, p.w, p.h);
                }
            }
        }
    }

    Ok(())
}

/// Builds a straight-line chain of machines, cycling through the catalog's
/// non-conveyor kinds, with enough nodes to roughly cover `width * height`
/// cells at their average footprint.
fn synthetic_chain(width: usize, height: usize) -> ProductionGraph {
    use factory_layout_solver::catalog::{BuildingKind, footprint};

    let kinds = [
        BuildingKind::Crusher,
        BuildingKind::Grinder,
        BuildingKind::Refinery,
        BuildingKind::Molder,
        BuildingKind::Filler,
    ];
    let avg_area: usize = kinds.iter().map(|&k| footprint(k).area()).sum::<usize>() / kinds.len();
    let node_count = ((width * height) / avg_area.max(1)).clamp(1, 32);

    let nodes: Vec<_> = (0..node_count)
        .map(|i| {
            let kind = kinds[i % kinds.len()];
            MachineNode { id: format!("n{i}"), label: format!("{} {i}", kind.as_str()), kind }
        })
        .collect();

    let edges: Vec<_> = (0..node_count.saturating_sub(1))
        .map(|i| MaterialEdge {
            id: format!("e{i}"),
            from_id: format!("n{i}"),
            to_id: format!("n{}", i + 1),
            item: "item".to_string(),
            belts: new_zealand::nz!(1),
        })
        .collect();

    ProductionGraph {
        id: "synthetic".to_string(),
        target_product: "item".to_string(),
        target_belts: 1,
        nodes,
        edges,
    }
}

fn load_graph_from_file(path: &PathBuf) -> anyhow::Result<ProductionGraph> {
    println!(
        "Opening file {}",
        path.canonicalize().context("failed to canonicalize path")?.as_os_str().to_string_lossy()
    );

    let file_str = std::fs::read_to_string(path).context("Failed to read file")?;

    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for (line_no, line) in file_str.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.contains("->") {
            edges.push(parse_edge_line(line_no, line)?);
        } else {
            nodes.push(parse_node_line(line_no, line)?);
        }
    }

    Ok(ProductionGraph {
        id: "from_file".to_string(),
        target_product: String::new(),
        target_belts: 0,
        nodes,
        edges,
    })
}

fn parse_node_line(line_no: usize, line: &str) -> anyhow::Result<MachineNode> {
    let mut parts = line.splitn(3, ':');
    let id = parts.next().filter(|s| !s.is_empty()).with_context(|| format!("line {line_no}: missing node id"))?;
    let kind_str = parts.next().with_context(|| format!("line {line_no}: missing building kind"))?;
    let label = parts.next().unwrap_or(id);

    let kind = factory_layout_solver::catalog::BuildingKind::from_str(kind_str)
        .with_context(|| format!("line {line_no}: unrecognized building kind {kind_str:?}"))?;

    Ok(MachineNode { id: id.to_string(), label: label.to_string(), kind })
}

fn parse_edge_line(line_no: usize, line: &str) -> anyhow::Result<MaterialEdge> {
    let mut parts = line.splitn(4, ':');
    let id = parts.next().filter(|s| !s.is_empty()).with_context(|| format!("line {line_no}: missing edge id"))?;
    let endpoints = parts.next().with_context(|| format!("line {line_no}: missing edge endpoints"))?;
    let item = parts.next().with_context(|| format!("line {line_no}: missing item name"))?;
    let belts_str = parts.next().with_context(|| format!("line {line_no}: missing belt count"))?;

    let (from_id, to_id) = endpoints
        .split_once("->")
        .with_context(|| format!("line {line_no}: edge endpoints must be \"from->to\""))?;
    let belts: usize = belts_str
        .parse()
        .with_context(|| format!("line {line_no}: belt count {belts_str:?} is not a number"))?;
    let belts = NonZeroUsize::new(belts)
        .with_context(|| format!("line {line_no}: belt count must be at least 1"))?;

    if from_id.is_empty() || to_id.is_empty() {
        bail!("line {line_no}: edge endpoints must not be empty");
    }

    Ok(MaterialEdge {
        id: id.to_string(),
        from_id: from_id.to_string(),
        to_id: to_id.to_string(),
        item: item.to_string(),
        belts,
    })
}
