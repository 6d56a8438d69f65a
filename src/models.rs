use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A single extracted unit of code: class, function, method, or module-level variable.
///
/// Identifiers follow `module_path.Name[.member]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeComponent {
    pub id: String,
    pub language: Language,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub file_path: String,
    pub module_path: String,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub has_docstring: bool,
    #[serde(default)]
    pub docstring: String,
    /// Byte span of the defining syntax node in its file.
    #[serde(skip)]
    pub byte_range: Range<usize>,
}

impl CodeComponent {
    pub fn new(
        id: String,
        language: Language,
        kind: ComponentKind,
        file_path: &str,
        module_path: &str,
    ) -> Self {
        Self {
            id,
            language,
            kind,
            file_path: file_path.to_string(),
            module_path: module_path.to_string(),
            depends_on: BTreeSet::new(),
            source_code: None,
            start_line: 0,
            end_line: 0,
            has_docstring: false,
            docstring: String::new(),
            byte_range: 0..0,
        }
    }

    /// Final segment of the identifier (`pkg.mod.Class.run` → `run`).
    pub fn short_name(&self) -> &str {
        self.id.rsplit('.').next().unwrap_or(&self.id)
    }

    /// Identifier of the enclosing component (`pkg.mod.Class.run` → `pkg.mod.Class`).
    pub fn parent_id(&self) -> Option<&str> {
        self.id.rsplit_once('.').map(|(parent, _)| parent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Class,
    Function,
    Method,
    GlobalVariable,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Class => write!(f, "class"),
            ComponentKind::Function => write!(f, "function"),
            ComponentKind::Method => write!(f, "method"),
            ComponentKind::GlobalVariable => write!(f, "global_variable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "Python"),
            Language::JavaScript => write!(f, "JavaScript"),
            Language::TypeScript => write!(f, "TypeScript"),
            Language::Java => write!(f, "Java"),
        }
    }
}

/// Component record as exposed over the API and in saved JSON files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub id: String,
    pub language: Language,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub file_path: String,
    pub module_path: String,
    pub depends_on: Vec<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub has_docstring: bool,
    pub docstring: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub total_components: usize,
    pub functions: usize,
    pub classes: usize,
    pub methods: usize,
    pub global_variables: usize,
    pub components_with_docstrings: usize,
    pub components_without_docstrings: usize,
    pub total_dependencies: usize,
    pub max_dependencies: usize,
    pub avg_dependencies: f64,
}

fn default_true() -> bool {
    true
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub repo_url: String,
    /// Persist the components map under the server's output directory.
    #[serde(default = "default_true")]
    pub save_json: bool,
    /// Include (truncated) source text for every component.
    #[serde(default = "default_true")]
    pub include_source: bool,
}

/// Full response of `POST /analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub repo_url: String,
    pub timestamp: String,
    pub stats: AnalysisStats,
    pub components: BTreeMap<String, ComponentInfo>,
    pub topological_order: Vec<String>,
    pub dfs_order: Vec<String>,
    pub dag: BTreeMap<String, Vec<String>>,
    pub formatted_output: String,
    pub output_file: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Client-side view of an analysis
// ---------------------------------------------------------------------------

/// The subset of an analysis response the terminal client consumes.
///
/// Deserializing into this type is the schema check at the client boundary:
/// a payload missing any of these fields, or carrying values of the wrong
/// shape, is rejected before it reaches any renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub components: BTreeMap<String, ComponentDescriptor>,
    pub dag: BTreeMap<String, Vec<String>>,
    pub stats: BTreeMap<String, serde_json::Number>,
    pub formatted_output: String,
    pub message: String,
}

impl AnalysisResult {
    /// Integer value of a metric, `0` when absent or fractional.
    pub fn stat(&self, name: &str) -> u64 {
        self.stats.get(name).and_then(|n| n.as_u64()).unwrap_or(0)
    }
}

/// A component as seen by the client. Unknown fields are carried through
/// untouched so exports reproduce what the service sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_kind_wire_names() {
        let json = serde_json::to_string(&ComponentKind::GlobalVariable).unwrap();
        assert_eq!(json, "\"global_variable\"");
        let kind: ComponentKind = serde_json::from_str("\"method\"").unwrap();
        assert_eq!(kind, ComponentKind::Method);
    }

    #[test]
    fn test_analyze_request_defaults() {
        let req: AnalyzeRequest =
            serde_json::from_str(r#"{"repo_url": "https://github.com/a/b"}"#).unwrap();
        assert!(req.save_json);
        assert!(req.include_source);
    }

    #[test]
    fn test_analysis_result_rejects_missing_stats() {
        let payload = r#"{"components": {}, "dag": {}, "formatted_output": "", "message": "ok"}"#;
        assert!(serde_json::from_str::<AnalysisResult>(payload).is_err());
    }

    #[test]
    fn test_analysis_result_rejects_non_numeric_stat() {
        let payload = r#"{"components": {}, "dag": {}, "stats": {"functions": "five"}, "formatted_output": "", "message": "ok"}"#;
        assert!(serde_json::from_str::<AnalysisResult>(payload).is_err());
    }

    #[test]
    fn test_analysis_result_rejects_missing_formatted_output() {
        let payload = r#"{"components": {}, "dag": {}, "stats": {}, "message": "ok"}"#;
        assert!(serde_json::from_str::<AnalysisResult>(payload).is_err());
    }

    #[test]
    fn test_analysis_result_rejects_missing_message() {
        let payload = r#"{"components": {}, "dag": {}, "stats": {}, "formatted_output": ""}"#;
        assert!(serde_json::from_str::<AnalysisResult>(payload).is_err());
    }

    #[test]
    fn test_analysis_result_accepts_complete_payload() {
        let payload = r#"{"components": {}, "dag": {}, "stats": {"functions": 2}, "formatted_output": "Components:", "message": "ok", "success": true}"#;
        let result: AnalysisResult = serde_json::from_str(payload).unwrap();
        assert_eq!(result.stat("functions"), 2);
        assert_eq!(result.message, "ok");
    }

    #[test]
    fn test_descriptor_keeps_unknown_fields() {
        let payload = r#"{"type": "function", "file_path": "a.py", "start_line": 3, "language": "python"}"#;
        let descriptor: ComponentDescriptor = serde_json::from_str(payload).unwrap();
        assert_eq!(descriptor.depends_on, None);
        assert_eq!(descriptor.extra.len(), 2);

        let back = serde_json::to_value(&descriptor).unwrap();
        let original: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_parent_and_short_name() {
        let comp = CodeComponent::new(
            "pkg.mod.Runner.run".into(),
            Language::Python,
            ComponentKind::Method,
            "pkg/mod.py",
            "pkg.mod",
        );
        assert_eq!(comp.short_name(), "run");
        assert_eq!(comp.parent_id(), Some("pkg.mod.Runner"));
    }
}
