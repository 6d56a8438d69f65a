use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde_json::Number;

use crate::client::{Tab, ViewState};
use crate::models::{AnalysisResult, AnalysisStats, ComponentKind};
use crate::pipeline::Analysis;

/// Full client screen: header, error banner, summary counters with the
/// status banner, tab bar and the selected panel.
pub fn render_view(state: &ViewState) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "\n {} v{}",
        "repo-depgraph".bold(),
        env!("CARGO_PKG_VERSION")
    );
    if !state.url.is_empty() {
        let _ = writeln!(out, " Repository: {}", state.url);
    }
    out.push('\n');

    if let Some(error) = &state.error {
        let _ = writeln!(out, " {} {}\n", "[ERROR]".red().bold(), error);
    }

    if state.loading {
        let _ = writeln!(out, " {} Analyzing repository...\n", "⟳".cyan());
    }

    let Some(result) = &state.result else {
        return out;
    };

    out.push_str(&summary_box(result));
    let _ = writeln!(
        out,
        " {} {}",
        "✓".green(),
        if result.message.is_empty() { "Analysis complete." } else { result.message.as_str() }
    );
    let _ = writeln!(out, "   {}\n", "Choose \"Export components\" to save the components as JSON.".dimmed());

    out.push_str(&tab_bar(state.tab));
    out.push_str("\n\n");
    out.push_str(&render_panel(result, state.tab));
    out.push('\n');
    out
}

fn summary_box(result: &AnalysisResult) -> String {
    let counters = [
        ("Total components", result.stat("total_components")),
        ("Functions", result.stat("functions")),
        ("Classes", result.stat("classes")),
        ("Methods", result.stat("methods")),
    ];

    let mut out = String::new();
    out.push_str(" ┌────────────────────────────────────────────────────┐\n");
    let _ = writeln!(out, " │  {:<49} │", "SUMMARY".bold());
    for (label, value) in counters {
        let line = format!("{:<18}: {:>8}", label, group_digits(&value.to_string()));
        let _ = writeln!(out, " │  {:<49} │", line);
    }
    out.push_str(" └────────────────────────────────────────────────────┘\n");
    out
}

fn tab_bar(selected: Tab) -> String {
    let tabs: Vec<String> = Tab::ALL
        .iter()
        .map(|tab| {
            if *tab == selected {
                format!("[{tab}]").bold().to_string()
            } else {
                format!(" {tab} ").dimmed().to_string()
            }
        })
        .collect();
    format!(" {}", tabs.join("  "))
}

/// Body of one tab.
pub fn render_panel(result: &AnalysisResult, tab: Tab) -> String {
    match tab {
        Tab::Formatted => result.formatted_output.clone(),
        Tab::Components => components_table(result).to_string(),
        Tab::Dag => {
            let entries = dag_entries(&result.dag);
            if entries.is_empty() {
                return " No dependencies.".to_string();
            }
            entries
                .iter()
                .map(|(source, targets)| {
                    format!(" {} {} {}", source.bold(), "->".cyan(), targets.join(", "))
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Tab::Statistics => {
            let mut table = new_table(&["Metric", "Value"]);
            for (label, value) in statistics_entries(&result.stats) {
                table.add_row(vec![
                    Cell::new(label),
                    Cell::new(value).set_alignment(CellAlignment::Right),
                ]);
            }
            table.to_string()
        }
    }
}

fn components_table(result: &AnalysisResult) -> Table {
    let mut table = new_table(&["Component", "Type", "File", "Depends on"]);

    for (id, component) in &result.components {
        let depends_on = component
            .depends_on
            .as_deref()
            .filter(|deps| !deps.is_empty())
            .map(|deps| deps.join("\n"))
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(id),
            Cell::new(&component.kind).fg(kind_color(&component.kind)),
            Cell::new(&component.file_path),
            Cell::new(depends_on),
        ]);
    }

    table
}

fn kind_color(kind: &str) -> Color {
    match kind {
        "class" => Color::Cyan,
        "function" => Color::Green,
        "method" => Color::Blue,
        "global_variable" => Color::Yellow,
        _ => Color::DarkGrey,
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

/// `dag` entries that have at least one target, in key order.
pub fn dag_entries(dag: &BTreeMap<String, Vec<String>>) -> Vec<(&str, &[String])> {
    dag.iter()
        .filter(|(_, targets)| !targets.is_empty())
        .map(|(source, targets)| (source.as_str(), targets.as_slice()))
        .collect()
}

/// Every metric as a `(label, formatted value)` pair, in key order.
pub fn statistics_entries(stats: &BTreeMap<String, Number>) -> Vec<(String, String)> {
    stats
        .iter()
        .map(|(name, value)| (metric_label(name), format_number(value)))
        .collect()
}

/// `avg_dependencies` → `avg dependencies`
pub fn metric_label(name: &str) -> String {
    name.replace(['_', '-'], " ")
}

/// Thousands grouping; fractions keep at most two decimals.
pub fn format_number(value: &Number) -> String {
    if let Some(n) = value.as_u64() {
        return group_digits(&n.to_string());
    }
    if let Some(n) = value.as_i64() {
        return format!("-{}", group_digits(&n.unsigned_abs().to_string()));
    }

    let f = value.as_f64().unwrap_or(0.0);
    let fixed = format!("{:.2}", f.abs());
    let fixed = fixed.trim_end_matches('0').trim_end_matches('.');
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, frac)) => (i, Some(frac)),
        None => (fixed, None),
    };

    let sign = if f < 0.0 && fixed != "0" { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{}.{frac}", group_digits(int_part)),
        None => format!("{sign}{}", group_digits(int_part)),
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Offline scan report
// ---------------------------------------------------------------------------

/// Summary and component table for `scan`. With `verbose` the DAG and
/// orderings follow.
pub fn render_scan(analysis: &Analysis, formatted: &str, path: &Path, verbose: bool, quiet: bool) -> String {
    let stats = &analysis.stats;
    let mut out = String::new();

    if quiet {
        let _ = writeln!(
            out,
            "Components: {}  Functions: {}  Classes: {}  Methods: {}  Globals: {}",
            stats.total_components,
            stats.functions.to_string().green(),
            stats.classes.to_string().cyan(),
            stats.methods.to_string().blue(),
            stats.global_variables.to_string().yellow(),
        );
        return out;
    }

    let _ = writeln!(
        out,
        "\n {} v{}",
        "repo-depgraph".bold(),
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(out, " Scanning: {}\n", path.display());
    out.push_str(&scan_summary(stats));
    out.push('\n');

    let mut table = new_table(&["Component", "Type", "File", "Lines", "Deps"]);
    for component in analysis.components.values() {
        table.add_row(vec![
            Cell::new(&component.id),
            Cell::new(component.kind.to_string()).fg(kind_color(&component.kind.to_string())),
            Cell::new(&component.file_path),
            Cell::new(format!("{}-{}", component.start_line, component.end_line)),
            Cell::new(component.depends_on.len()).set_alignment(CellAlignment::Right),
        ]);
    }
    let _ = writeln!(out, "{table}");

    if verbose {
        let _ = writeln!(out, "\n{formatted}");
    }

    out
}

fn scan_summary(stats: &AnalysisStats) -> String {
    let rows = [
        (ComponentKind::Function.to_string(), stats.functions),
        (ComponentKind::Class.to_string(), stats.classes),
        (ComponentKind::Method.to_string(), stats.methods),
        (ComponentKind::GlobalVariable.to_string(), stats.global_variables),
    ];

    let mut out = String::new();
    out.push_str(" ┌────────────────────────────────────────────────────┐\n");
    let _ = writeln!(out, " │  {:<49} │", "SUMMARY".bold());
    let _ = writeln!(
        out,
        " │  {:<49} │",
        format!("Total components   : {:>6}", stats.total_components)
    );
    for (kind, count) in rows {
        let _ = writeln!(
            out,
            " │  {:<49} │",
            format!("{:<19}: {:>6}", metric_label(&kind), count)
        );
    }
    let _ = writeln!(
        out,
        " │  {:<49} │",
        format!(
            "Dependencies       : {:>6}  (max {}, avg {})",
            stats.total_dependencies, stats.max_dependencies, stats.avg_dependencies
        )
    );
    let _ = writeln!(
        out,
        " │  {:<49} │",
        format!(
            "Docstrings         : {:>6}  ({} without)",
            stats.components_with_docstrings, stats.components_without_docstrings
        )
    );
    out.push_str(" └────────────────────────────────────────────────────┘\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> AnalysisResult {
        serde_json::from_value(serde_json::json!({
            "components": {
                "app.Store": {"type": "class", "file_path": "app.py", "depends_on": ["app.Store.add"]},
                "app.helper": {"type": "function", "file_path": "util.py", "depends_on": []}
            },
            "dag": {"A": ["B"], "C": []},
            "stats": {"total_components": 12, "functions": 5},
            "formatted_output": "Components:\n  app.Store\n  app.helper",
            "message": "Analysis complete."
        }))
        .unwrap()
    }

    #[test]
    fn test_statistics_entries() {
        let entries = statistics_entries(&result().stats);
        assert_eq!(
            entries,
            vec![
                ("functions".to_string(), "5".to_string()),
                ("total components".to_string(), "12".to_string()),
            ]
        );
    }

    #[test]
    fn test_dag_entries_skip_empty_lists() {
        let r = result();
        let entries = dag_entries(&r.dag);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "A");
        assert_eq!(entries[0].1, ["B".to_string()]);
    }

    #[test]
    fn test_format_number() {
        let n = |v: serde_json::Value| format_number(v.as_number().unwrap());
        assert_eq!(n(serde_json::json!(0)), "0");
        assert_eq!(n(serde_json::json!(999)), "999");
        assert_eq!(n(serde_json::json!(1234567)), "1,234,567");
        assert_eq!(n(serde_json::json!(-1234)), "-1,234");
        assert_eq!(n(serde_json::json!(2.5)), "2.5");
        assert_eq!(n(serde_json::json!(1234.567)), "1,234.57");
        assert_eq!(n(serde_json::json!(3.0)), "3");
    }

    #[test]
    fn test_metric_label() {
        assert_eq!(metric_label("components_with_docstrings"), "components with docstrings");
        assert_eq!(metric_label("max-dependencies"), "max dependencies");
    }

    #[test]
    fn test_panels() {
        colored::control::set_override(false);
        let r = result();

        assert_eq!(render_panel(&r, Tab::Formatted), r.formatted_output);

        let dag = render_panel(&r, Tab::Dag);
        assert_eq!(dag, " A -> B");

        let components = render_panel(&r, Tab::Components);
        assert!(components.contains("app.Store"));
        assert!(components.contains("app.Store.add"));
        assert!(components.contains("util.py"));

        let stats = render_panel(&r, Tab::Statistics);
        assert!(stats.contains("total components"));
        assert!(stats.contains("12"));
    }

    #[test]
    fn test_render_view_banners() {
        colored::control::set_override(false);

        let failed = ViewState::new().with_error("HTTP error! status: 500");
        let text = render_view(&failed);
        assert!(text.contains("[ERROR] HTTP error! status: 500"));
        assert!(!text.contains("SUMMARY"));

        let done = ViewState::new()
            .with_result(result())
            .select_tab(Tab::Statistics);
        let text = render_view(&done);
        assert!(text.contains("SUMMARY"));
        assert!(text.contains("Total components"));
        assert!(text.contains("Analysis complete."));
        assert!(text.contains("Export components"));
        assert!(text.contains("[Statistics]"));
    }
}
