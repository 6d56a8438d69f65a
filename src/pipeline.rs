//! End-to-end analysis: clone → parse → graph → orderings → report.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use reqwest::Url;
use thiserror::Error;
use tracing::info;

use crate::analyzer::repository::RepositoryParser;
use crate::graph::{self, Graph};
use crate::models::{AnalysisStats, AnalyzeRequest, AnalyzeResponse, CodeComponent, ComponentInfo, ComponentKind};
use crate::repo_loader::clone_repo;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid repository URL: {0}")]
    InvalidUrl(String),
    #[error(
        "No components found in repository. Make sure it contains Python, JavaScript, TypeScript or Java files."
    )]
    NoComponents,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub save_json: bool,
    pub include_source: bool,
    pub output_dir: PathBuf,
    pub clone_dir: Option<PathBuf>,
    pub source_preview_chars: usize,
}

/// Parsed components plus everything derived from them.
#[derive(Debug)]
pub struct Analysis {
    pub components: BTreeMap<String, CodeComponent>,
    /// Dependency graph with cycles already broken.
    pub graph: Graph,
    pub topological_order: Vec<String>,
    pub dfs_order: Vec<String>,
    pub stats: AnalysisStats,
}

/// Accepts absolute `http`/`https` URLs with a host and returns the
/// normalized form.
pub fn validate_repo_url(raw: &str) -> Result<String, AnalysisError> {
    let url = Url::parse(raw.trim()).map_err(|e| AnalysisError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AnalysisError::InvalidUrl(format!(
            "{raw}: scheme must be http or https"
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(AnalysisError::InvalidUrl(format!("{raw}: missing host")));
    }

    Ok(url.to_string())
}

/// `https://github.com/org/project.git/` → `project`
pub fn extract_repo_name(repo_url: &str) -> String {
    let trimmed = repo_url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}

/// Runs the analysis on a directory that is already on disk.
pub fn analyze_checkout(path: &Path) -> Result<Analysis, AnalysisError> {
    info!(path = %path.display(), "parsing repository");
    let components = RepositoryParser::new(path)?.parse()?;
    if components.is_empty() {
        return Err(AnalysisError::NoComponents);
    }

    info!(components = components.len(), "building dependency graph");
    let graph = graph::resolve_cycles(&graph::build_graph(&components));

    info!("calculating orderings");
    let topological_order = graph::topological_sort(&graph);
    let dfs_order = graph::dependency_first_dfs(&graph);
    let stats = calculate_stats(&components);

    Ok(Analysis {
        components,
        graph,
        topological_order,
        dfs_order,
        stats,
    })
}

/// Full service flow for one `POST /analyze` request. Blocking.
pub fn analyze_repository(
    request: &AnalyzeRequest,
    options: &AnalysisOptions,
) -> Result<AnalyzeResponse, AnalysisError> {
    let repo_url = validate_repo_url(&request.repo_url)?;

    let checkout = clone_repo(&repo_url, options.clone_dir.as_deref())?;
    let analysis = analyze_checkout(checkout.path())?;

    let options = AnalysisOptions {
        save_json: request.save_json,
        include_source: request.include_source,
        ..options.clone()
    };
    Ok(build_response(&repo_url, &analysis, &options)?)
}

/// Assemble the API response and, if requested, persist the components map.
pub fn build_response(
    repo_url: &str,
    analysis: &Analysis,
    options: &AnalysisOptions,
) -> Result<AnalyzeResponse> {
    let components = components_map(analysis, options);
    let formatted_output = format_analysis_output(
        &analysis.components,
        &analysis.graph,
        &analysis.dfs_order,
        &analysis.topological_order,
    );

    let output_file = if options.save_json {
        let path = save_analysis_json(&components, &extract_repo_name(repo_url), &options.output_dir)?;
        info!(file = %path.display(), "results saved");
        Some(path.display().to_string())
    } else {
        None
    };

    let message = match &output_file {
        Some(file) => format!("Analysis complete. Results saved to {file}"),
        None => "Analysis complete.".to_string(),
    };

    info!(
        total = analysis.stats.total_components,
        functions = analysis.stats.functions,
        classes = analysis.stats.classes,
        methods = analysis.stats.methods,
        global_variables = analysis.stats.global_variables,
        "analysis complete"
    );

    Ok(AnalyzeResponse {
        success: true,
        repo_url: repo_url.to_string(),
        timestamp: iso_timestamp(),
        stats: analysis.stats.clone(),
        components,
        topological_order: analysis.topological_order.clone(),
        dfs_order: analysis.dfs_order.clone(),
        dag: dag_lists(&analysis.graph),
        formatted_output,
        output_file,
        message,
    })
}

pub fn iso_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub fn calculate_stats(components: &BTreeMap<String, CodeComponent>) -> AnalysisStats {
    let mut stats = AnalysisStats {
        total_components: components.len(),
        functions: 0,
        classes: 0,
        methods: 0,
        global_variables: 0,
        components_with_docstrings: 0,
        components_without_docstrings: 0,
        total_dependencies: 0,
        max_dependencies: 0,
        avg_dependencies: 0.0,
    };

    for comp in components.values() {
        match comp.kind {
            ComponentKind::Function => stats.functions += 1,
            ComponentKind::Class => stats.classes += 1,
            ComponentKind::Method => stats.methods += 1,
            ComponentKind::GlobalVariable => stats.global_variables += 1,
        }

        if comp.has_docstring {
            stats.components_with_docstrings += 1;
        } else {
            stats.components_without_docstrings += 1;
        }

        let deps = comp.depends_on.len();
        stats.total_dependencies += deps;
        stats.max_dependencies = stats.max_dependencies.max(deps);
    }

    if !components.is_empty() {
        let avg = stats.total_dependencies as f64 / components.len() as f64;
        stats.avg_dependencies = (avg * 100.0).round() / 100.0;
    }

    stats
}

pub fn component_info(comp: &CodeComponent, include_source: bool, preview_chars: usize) -> ComponentInfo {
    let source_code = comp
        .source_code
        .as_deref()
        .filter(|s| include_source && !s.is_empty())
        .map(|s| truncate_source(s, preview_chars));

    ComponentInfo {
        id: comp.id.clone(),
        language: comp.language,
        kind: comp.kind,
        file_path: comp.file_path.clone(),
        module_path: comp.module_path.clone(),
        depends_on: comp.depends_on.iter().cloned().collect(),
        start_line: comp.start_line,
        end_line: comp.end_line,
        has_docstring: comp.has_docstring,
        docstring: comp.docstring.clone(),
        source_code,
    }
}

fn truncate_source(source: &str, max_chars: usize) -> String {
    match source.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &source[..cut]),
        None => source.to_string(),
    }
}

pub fn components_map(analysis: &Analysis, options: &AnalysisOptions) -> BTreeMap<String, ComponentInfo> {
    analysis
        .components
        .iter()
        .map(|(id, comp)| {
            (
                id.clone(),
                component_info(comp, options.include_source, options.source_preview_chars),
            )
        })
        .collect()
}

pub fn dag_lists(graph: &Graph) -> BTreeMap<String, Vec<String>> {
    graph
        .iter()
        .map(|(id, deps)| (id.clone(), deps.iter().cloned().collect()))
        .collect()
}

/// Plain-text report: component ids, DAG edges, then both orderings.
pub fn format_analysis_output(
    components: &BTreeMap<String, CodeComponent>,
    graph: &Graph,
    dfs_order: &[String],
    topo_order: &[String],
) -> String {
    let mut lines = Vec::new();

    lines.push("Components:".to_string());
    lines.extend(components.keys().map(|id| format!("  {id}")));

    lines.push("DAG:".to_string());
    for (id, deps) in graph.iter().filter(|(_, deps)| !deps.is_empty()) {
        let targets: Vec<String> = deps.iter().map(|d| format!("'{d}'")).collect();
        lines.push(format!("{id} -> [{}]", targets.join(", ")));
    }

    lines.push("Dependency-first DFS order:".to_string());
    lines.extend(dfs_order.iter().cloned());

    lines.push("Topological Order:".to_string());
    lines.extend(topo_order.iter().cloned());

    lines.join("\n")
}

pub fn save_analysis_json(
    components: &BTreeMap<String, ComponentInfo>,
    repo_name: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let file_name = format!("{}_{}.json", repo_name, Local::now().format("%Y%m%d_%H%M%S"));
    let path = output_dir.join(file_name);
    let json = serde_json::to_string_pretty(components)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

/// Writes `ir.json` (components) and `dag.json` (adjacency lists) into `out_dir`.
pub fn export_artifacts(
    components: &BTreeMap<String, ComponentInfo>,
    graph: &Graph,
    out_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let ir_path = out_dir.join("ir.json");
    std::fs::write(&ir_path, serde_json::to_string_pretty(components)?)?;

    let dag_path = out_dir.join("dag.json");
    std::fs::write(&dag_path, serde_json::to_string_pretty(&dag_lists(graph))?)?;

    Ok((ir_path, dag_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;
    use tempfile::TempDir;

    const APP: &str = r#"DEBUG = True


class Store:
    """Keeps items."""

    def __init__(self):
        self.items = []

    def add(self, item):
        self.items.append(item)
        return self._log(item)

    def _log(self, item):
        return item


def main():
    store = Store()
    store.add(DEBUG)
"#;

    fn options(dir: &Path) -> AnalysisOptions {
        AnalysisOptions {
            save_json: true,
            include_source: true,
            output_dir: dir.to_path_buf(),
            clone_dir: None,
            source_preview_chars: 500,
        }
    }

    fn checkout() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app.py"), APP).unwrap();
        dir
    }

    #[test]
    fn test_validate_repo_url() {
        assert_eq!(
            validate_repo_url("https://github.com/org/project").unwrap(),
            "https://github.com/org/project"
        );
        assert!(validate_repo_url("http://example.com/x.git").is_ok());
        assert!(matches!(
            validate_repo_url("ftp://example.com/repo"),
            Err(AnalysisError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_repo_url("not a url"),
            Err(AnalysisError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_extract_repo_name() {
        assert_eq!(extract_repo_name("https://github.com/org/project"), "project");
        assert_eq!(extract_repo_name("https://github.com/org/project.git"), "project");
        assert_eq!(extract_repo_name("https://github.com/org/project/"), "project");
    }

    #[test]
    fn test_empty_checkout_has_no_components() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "nothing here").unwrap();
        assert!(matches!(
            analyze_checkout(dir.path()),
            Err(AnalysisError::NoComponents)
        ));
    }

    #[test]
    fn test_analyze_checkout_orders_dependencies_first() {
        let dir = checkout();
        let analysis = analyze_checkout(dir.path()).unwrap();

        assert_eq!(analysis.stats.total_components, 6);
        assert_eq!(analysis.stats.classes, 1);
        assert_eq!(analysis.stats.methods, 3);
        assert_eq!(analysis.stats.functions, 1);
        assert_eq!(analysis.stats.global_variables, 1);
        assert_eq!(analysis.stats.components_with_docstrings, 1);

        let pos = |id: &str| {
            analysis
                .topological_order
                .iter()
                .position(|x| x == id)
                .unwrap()
        };
        assert!(pos("app.Store") < pos("app.main"));
        assert!(pos("app.DEBUG") < pos("app.main"));
        assert_eq!(analysis.topological_order.len(), 6);
        assert_eq!(analysis.dfs_order.last().map(String::as_str), Some("app.main"));
    }

    #[test]
    fn test_calculate_stats_average() {
        let mut components = BTreeMap::new();
        for (id, deps) in [("m.a", 1), ("m.b", 0), ("m.c", 1)] {
            let mut c = CodeComponent::new(id.into(), Language::Python, ComponentKind::Function, "m.py", "m");
            for i in 0..deps {
                c.depends_on.insert(format!("x{i}"));
            }
            components.insert(id.to_string(), c);
        }

        let stats = calculate_stats(&components);
        assert_eq!(stats.total_dependencies, 2);
        assert_eq!(stats.max_dependencies, 1);
        assert_eq!(stats.avg_dependencies, 0.67);
        assert_eq!(stats.components_without_docstrings, 3);
    }

    #[test]
    fn test_truncate_source_counts_chars() {
        assert_eq!(truncate_source("abc", 5), "abc");
        assert_eq!(truncate_source("abcdef", 3), "abc...");
        assert_eq!(truncate_source("ééééé", 2), "éé...");
    }

    #[test]
    fn test_format_analysis_output_sections() {
        let dir = checkout();
        let analysis = analyze_checkout(dir.path()).unwrap();
        let text = format_analysis_output(
            &analysis.components,
            &analysis.graph,
            &analysis.dfs_order,
            &analysis.topological_order,
        );

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Components:");
        assert_eq!(lines[1], "  app.DEBUG");
        assert!(lines.contains(&"app.main -> ['app.DEBUG', 'app.Store']"));

        let dag = lines.iter().position(|l| *l == "DAG:").unwrap();
        let dfs = lines.iter().position(|l| *l == "Dependency-first DFS order:").unwrap();
        let topo = lines.iter().position(|l| *l == "Topological Order:").unwrap();
        assert!(dag < dfs && dfs < topo);
        assert_eq!(lines.len(), topo + 1 + analysis.topological_order.len());
    }

    #[test]
    fn test_build_response_saves_json() {
        let dir = checkout();
        let out = TempDir::new().unwrap();
        let analysis = analyze_checkout(dir.path()).unwrap();

        let response =
            build_response("https://github.com/org/shop.git", &analysis, &options(out.path())).unwrap();

        let saved = PathBuf::from(response.output_file.clone().unwrap());
        let name = saved.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("shop_") && name.ends_with(".json"));
        assert_eq!(
            response.message,
            format!("Analysis complete. Results saved to {}", saved.display())
        );

        let on_disk: BTreeMap<String, ComponentInfo> =
            serde_json::from_str(&std::fs::read_to_string(&saved).unwrap()).unwrap();
        assert_eq!(on_disk, response.components);
        assert!(response.components["app.main"].source_code.is_some());
    }

    #[test]
    fn test_build_response_without_saving_or_source() {
        let dir = checkout();
        let out = TempDir::new().unwrap();
        let analysis = analyze_checkout(dir.path()).unwrap();
        let opts = AnalysisOptions {
            save_json: false,
            include_source: false,
            ..options(out.path())
        };

        let response = build_response("https://github.com/org/shop", &analysis, &opts).unwrap();
        assert_eq!(response.output_file, None);
        assert_eq!(response.message, "Analysis complete.");
        assert!(response.components.values().all(|c| c.source_code.is_none()));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_export_artifacts() {
        let dir = checkout();
        let out = TempDir::new().unwrap();
        let analysis = analyze_checkout(dir.path()).unwrap();
        let components = components_map(&analysis, &options(out.path()));

        let (ir, dag) = export_artifacts(&components, &analysis.graph, out.path()).unwrap();
        let dag: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&std::fs::read_to_string(dag).unwrap()).unwrap();
        assert_eq!(dag["app.main"], vec!["app.DEBUG", "app.Store"]);
        assert!(ir.ends_with("ir.json"));
    }
}
