//! CLI command implementations.

use anyhow::{anyhow, bail, Context};
use apexflow_core::{keys, AstNode, VertexId, VertexKind};
use apexflow_engine::{
    ApexPath, ApexPathWalker, EngineConfig, NoopSymbolProvider, PathError, PathExpander,
    PathIdGenerator, RecordingVisitor, WalkOutcome, WorkerContext, CONFIG_DIR,
};
use apexflow_graph::{synthesis, GraphBuilder, GraphStore, ProgramGraph, VertexQuery};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

type Result<T> = anyhow::Result<T>;

const STORE_DIR: &str = "graph.db";

fn store_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(STORE_DIR)
}

/// Write the default configuration.
pub fn init(root: &Path) -> Result<()> {
    let path = EngineConfig::path_in(root);
    if path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }
    let written = EngineConfig::default().save(root)?;
    println!("{} Wrote {}", "✓".green(), written.display());
    println!("  Run {} to build the graph", "apexflow index <files>".cyan());
    Ok(())
}

fn read_ast(path: &Path) -> Result<(String, AstNode)> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let ast: AstNode =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((name, ast))
}

/// Ingests AST files and persists the result.
pub fn index(root: &Path, files: &[PathBuf], library: &[PathBuf], output: Option<&Path>) -> Result<()> {
    println!("{}", "Building graph...".cyan());
    let start = Instant::now();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));

    let mut builder = GraphBuilder::new();
    for path in library {
        spinner.set_message(format!("Library {}", path.display()));
        let (name, ast) = read_ast(path)?;
        builder.ingest_library_file(&name, ast)?;
    }
    for path in files {
        spinner.set_message(format!("Ingesting {}", path.display()));
        let (name, ast) = read_ast(path)?;
        builder.ingest_user_file(&name, ast)?;
    }
    let output_graph = builder.finish();
    spinner.finish_and_clear();

    let stats = output_graph.graph.stats();
    println!(
        "{} Ingested {} files ({} vertices, {} flow edges) in {}ms",
        "✓".green(),
        stats.files.to_string().cyan(),
        stats.vertex_count.to_string().cyan(),
        stats.cfg_edge_count,
        start.elapsed().as_millis()
    );

    print_diagnostics(&output_graph.diagnostics);

    let store = GraphStore::open(store_path(root))?;
    store.save(&output_graph.graph, &output_graph.diagnostics)?;

    if let Some(out_path) = output {
        export_graph(&output_graph.graph, out_path)?;
    }
    Ok(())
}

fn print_diagnostics(diagnostics: &[apexflow_core::Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!("\n{} {} diagnostics:", "⚠".yellow(), diagnostics.len());
    for diagnostic in diagnostics.iter().take(10) {
        println!("  {}", diagnostic.to_string().red());
    }
    if diagnostics.len() > 10 {
        println!("  ... and {} more", diagnostics.len() - 10);
    }
}

fn load(root: &Path) -> Result<(ProgramGraph, EngineConfig)> {
    let config = EngineConfig::load(root)?;
    let store = GraphStore::open(store_path(root))?;
    let graph = store
        .load_graph()?
        .ok_or_else(|| anyhow!("no graph stored, run `apexflow index` first"))?;
    Ok((graph, config))
}

/// Splits `Class.method`. Inner class names keep their dots.
fn split_method_spec(spec: &str) -> Result<(&str, &str)> {
    match spec.rsplit_once('.') {
        Some((class, method)) if !class.is_empty() && !method.is_empty() => Ok((class, method)),
        _ => bail!("expected Class.method, got `{}`", spec),
    }
}

fn find_methods(graph: &ProgramGraph, spec: &str) -> Result<Vec<VertexId>> {
    let (class, method) = split_method_spec(spec)?;
    let found = graph.query(
        &VertexQuery::kind(VertexKind::Method)
            .eq_ignore_case(keys::DEFINING_TYPE, class)
            .eq_ignore_case(keys::NAME, method),
    );
    if found.is_empty() {
        bail!("no method {}", spec);
    }
    Ok(found)
}

/// User methods with a body, other than synthesized static initialization.
fn entry_methods(graph: &ProgramGraph) -> Vec<VertexId> {
    graph
        .query(&VertexQuery::kind(VertexKind::Method).user_only())
        .into_iter()
        .filter(|id| {
            let Some(method) = graph.vertex(*id) else {
                return false;
            };
            let is_static_init = method.bool_property(keys::STATIC_BLOCK_METHOD)
                || method.bool_property(keys::STATIC_BLOCK_INVOKER)
                || method.name() == Some(synthesis::STATIC_INITIALIZER);
            !is_static_init && !graph.children_of_kind(*id, VertexKind::BlockStatement).is_empty()
        })
        .collect()
}

fn method_label(graph: &ProgramGraph, method: VertexId) -> String {
    graph
        .vertex(method)
        .map(|v| {
            format!(
                "{}.{}",
                v.defining_type().unwrap_or("?"),
                v.name().unwrap_or("?")
            )
        })
        .unwrap_or_else(|| method.to_string())
}

/// List the paths of a method.
pub fn paths(root: &Path, spec: &str) -> Result<()> {
    let (graph, config) = load(root)?;
    let graph = Arc::new(graph);
    let methods = find_methods(&graph, spec)?;
    let mut ctx = WorkerContext::new(graph.clone(), PathIdGenerator::new(), config)?;

    for method in methods {
        let paths = PathExpander::new(&mut ctx).expand(method)?;
        println!(
            "{} {} ({} paths)",
            "Method".cyan().bold(),
            method_label(&graph, method),
            paths.len()
        );
        for path in &paths {
            println!("  {}", describe(path));
        }
    }
    Ok(())
}

fn describe(path: &ApexPath) -> String {
    let mut flags = Vec::new();
    if path.ends_in_exception() {
        flags.push("throws".red().to_string());
    }
    if path.is_recursion_terminated() {
        flags.push("recursion".yellow().to_string());
    }
    format!(
        "{} {} vertices, {} calls, {} sub-paths {}",
        path.stable_id().to_string().cyan(),
        path.vertices().len(),
        path.invocable_paths().len(),
        path.tree_size() - 1,
        flags.join(" ")
    )
}

/// Result of walking every path of one method.
#[derive(Debug, Default, Serialize)]
pub struct WalkSummary {
    pub method: String,
    pub paths: usize,
    pub completed: usize,
    pub thrown: usize,
    pub cancelled: usize,
    pub recursions: usize,
    pub visited: usize,
    pub dml: usize,
}

/// Expands and walks one entry method on its own worker.
fn walk_entry(
    graph: Arc<ProgramGraph>,
    ids: PathIdGenerator,
    config: EngineConfig,
    method: VertexId,
) -> std::result::Result<WalkSummary, PathError> {
    let label = method_label(&graph, method);
    let mut ctx = WorkerContext::new(graph, ids, config)?;
    let paths = PathExpander::new(&mut ctx).expand(method)?;

    let mut summary = WalkSummary {
        method: label,
        paths: paths.len(),
        ..Default::default()
    };
    for path in &paths {
        let mut symbols = NoopSymbolProvider;
        let mut rules = RecordingVisitor::new();
        let outcome = ApexPathWalker::new(ctx.graph(), ctx.cancellation.clone(), &mut symbols, &mut rules)
            .walk(path)?;
        match outcome {
            WalkOutcome::Completed => summary.completed += 1,
            WalkOutcome::TerminatedByThrow { .. } => summary.thrown += 1,
            WalkOutcome::Cancelled => summary.cancelled += 1,
        }
        summary.recursions += rules.recursions.len();
        summary.visited += rules.visited.len();
        summary.dml += rules.dml_count;
    }
    Ok(summary)
}

/// Walk entry methods in parallel, one worker per method.
pub async fn walk(root: &Path, spec: Option<&str>, json: bool) -> Result<()> {
    let (graph, config) = load(root)?;
    let methods = match spec {
        Some(spec) => find_methods(&graph, spec)?,
        None => entry_methods(&graph),
    };
    let graph = Arc::new(graph);
    let ids = PathIdGenerator::new();
    let semaphore = Arc::new(Semaphore::new(config.worker_threads.max(1)));
    info!(
        "Walking {} methods on {} workers",
        methods.len(),
        config.worker_threads.max(1)
    );

    let progress = ProgressBar::new(methods.len() as u64);
    progress.set_style(ProgressStyle::default_bar().template("{bar:40.cyan} {pos}/{len} {msg}")?);

    let mut handles = Vec::with_capacity(methods.len());
    for method in methods {
        let permit = semaphore.clone().acquire_owned().await?;
        let graph = graph.clone();
        let ids = ids.clone();
        let config = config.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            walk_entry(graph, ids, config, method)
        }));
    }

    let mut summaries = Vec::with_capacity(handles.len());
    for handle in handles {
        let summary = handle.await??;
        progress.set_message(summary.method.clone());
        progress.inc(1);
        summaries.push(summary);
    }
    progress.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    for summary in &summaries {
        println!(
            "{} {} paths, {} completed, {} throw, {} recursive calls, {} vertices visited",
            summary.method.cyan(),
            summary.paths,
            summary.completed,
            summary.thrown.to_string().red(),
            summary.recursions.to_string().yellow(),
            summary.visited
        );
    }
    println!("{} Walked {} methods", "✓".green(), summaries.len());
    Ok(())
}

fn export_graph(graph: &ProgramGraph, path: &Path) -> Result<()> {
    let vertices: Vec<_> = graph.vertices().collect();
    let export = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "stats": graph.stats(),
        "vertices": vertices,
        "edges": graph.export_edges(),
    });
    fs::write(path, serde_json::to_string_pretty(&export)?)?;
    println!("{} Exported to {}", "✓".green(), path.display());
    Ok(())
}

/// Export the stored graph to JSON.
pub fn export(root: &Path, output: &Path) -> Result<()> {
    let (graph, _) = load(root)?;
    export_graph(&graph, output)
}

/// Show graph statistics and stored diagnostics.
pub fn status(root: &Path) -> Result<()> {
    if !EngineConfig::path_in(root).exists() && !store_path(root).exists() {
        println!("{} Apexflow not initialized in this directory", "✗".red());
        println!("  Run {} to initialize", "apexflow init".cyan());
        return Ok(());
    }
    let config = EngineConfig::load(root)?;
    let store = GraphStore::open(store_path(root))?;

    println!("{}", "Apexflow Status".cyan().bold());
    println!();
    match store.load_graph()? {
        Some(graph) => {
            let stats = graph.stats();
            println!("  {} {}", "Files:".dimmed(), stats.files);
            println!("  {} {}", "Vertices:".dimmed(), stats.vertex_count);
            println!("  {} {}", "Edges:".dimmed(), stats.edge_count);
            println!("  {} {}", "Flow edges:".dimmed(), stats.cfg_edge_count);
            println!("  {} {}", "Entry methods:".dimmed(), entry_methods(&graph).len());
        }
        None => println!("  {} none stored", "Graph:".dimmed()),
    }
    println!("  {} {}", "Max paths:".dimmed(), config.max_paths_per_method);
    println!("  {} {}", "Just-in-time:".dimmed(), config.just_in_time);
    println!("  {} {}", "Workers:".dimmed(), config.worker_threads);
    print_diagnostics(&store.load_diagnostics()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_ast(dir: &Path, name: &str, ast: &AstNode) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(ast).unwrap()).unwrap();
        path
    }

    fn sample() -> AstNode {
        AstNode::user_class("Account")
            .child(
                AstNode::method("save", 0).child(AstNode::block(vec![
                    AstNode::call_statement("validate", vec![]),
                ])),
            )
            .child(AstNode::method("validate", 0).child(AstNode::block(vec![])))
    }

    #[test]
    fn test_split_method_spec() {
        assert_eq!(split_method_spec("A.m").unwrap(), ("A", "m"));
        assert_eq!(split_method_spec("Outer.Inner.m").unwrap(), ("Outer.Inner", "m"));
        assert!(split_method_spec("m").is_err());
        assert!(split_method_spec("A.").is_err());
    }

    #[test]
    fn test_index_then_load() {
        let dir = tempdir().unwrap();
        let file = write_ast(dir.path(), "Account.cls.json", &sample());
        index(dir.path(), &[file], &[], None).unwrap();

        let (graph, config) = load(dir.path()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(find_methods(&graph, "account.SAVE").unwrap().len(), 1);
        assert!(find_methods(&graph, "Account.missing").is_err());
        // save, validate and the synthesized constructor
        assert_eq!(entry_methods(&graph).len(), 3);
    }

    #[test]
    fn test_walk_entry_summary() {
        let mut builder = GraphBuilder::new();
        builder.ingest_user_file("Account.cls", sample()).unwrap();
        let graph = Arc::new(builder.finish().graph);
        let save = find_methods(&graph, "Account.save").unwrap()[0];

        let summary = walk_entry(graph, PathIdGenerator::new(), EngineConfig::default(), save).unwrap();
        assert_eq!(summary.method, "Account.save");
        assert_eq!(summary.paths, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.recursions, 0);
        assert!(summary.visited > 0);
    }

    #[test]
    fn test_load_without_index_fails() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path()).is_err());
    }
}
