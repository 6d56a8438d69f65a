use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use tree_sitter::Tree;
use walkdir::{DirEntry, WalkDir};

use super::{name_index, AdapterRegistry, LanguageAdapter, NameIndex, ResolveScope};
use crate::graph::rules::apply_doc_dependency_rules;
use crate::models::{CodeComponent, ComponentKind, Language};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    "dist",
];

/// Walks a checkout and builds the full component map.
///
/// 1. Extract components from every supported file.
/// 2. Resolve dependencies against the complete component set, through one
///    name index per language built up front.
/// 3. Make every class depend on its own methods (except `__init__`).
/// 4. Apply the documentation dependency rules.
pub struct RepositoryParser {
    root: PathBuf,
    registry: AdapterRegistry,
}

struct ParsedFile<'a> {
    adapter: &'a dyn LanguageAdapter,
    source: String,
    tree: Tree,
    ids: Vec<String>,
}

impl RepositoryParser {
    pub fn new(root: &Path) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            registry: AdapterRegistry::new()?,
        })
    }

    pub fn parse(&self) -> Result<BTreeMap<String, CodeComponent>> {
        let mut all_components: BTreeMap<String, CodeComponent> = BTreeMap::new();
        let mut parsed_files: Vec<ParsedFile<'_>> = Vec::new();

        // Pass 1: extract
        for path in source_files(&self.root) {
            let Some(adapter) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|name| self.registry.adapter_for_file(name))
            else {
                continue;
            };

            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let source = String::from_utf8_lossy(&bytes).into_owned();

            let relative = path.strip_prefix(&self.root).unwrap_or(&path);
            let file_path = relative_file_path(relative);
            let module_path = module_path_for(relative);

            let tree = adapter
                .parse(&source)
                .with_context(|| format!("Failed to parse {file_path}"))?;
            let components = adapter.extract_components(&tree, &source, &file_path, &module_path);
            debug!(file = %file_path, components = components.len(), "extracted");

            let ids = components.iter().map(|c| c.id.clone()).collect();
            for component in components {
                all_components.insert(component.id.clone(), component);
            }
            parsed_files.push(ParsedFile {
                adapter,
                source,
                tree,
                ids,
            });
        }

        // Pass 2: resolve
        let resolved = resolve_all(&parsed_files, &all_components);
        for (id, deps) in resolved {
            if let Some(component) = all_components.get_mut(&id) {
                component.depends_on.extend(deps);
            }
        }

        // Pass 3: class → own methods
        link_classes_to_methods(&mut all_components);

        apply_doc_dependency_rules(&mut all_components);
        Ok(all_components)
    }
}

fn resolve_all(
    parsed_files: &[ParsedFile<'_>],
    all_components: &BTreeMap<String, CodeComponent>,
) -> Vec<(String, BTreeSet<String>)> {
    let mut indexes: HashMap<Language, NameIndex<'_>> = HashMap::new();
    for file in parsed_files {
        indexes
            .entry(file.adapter.language())
            .or_insert_with(|| name_index(all_components, file.adapter.resolves_into()));
    }

    let mut resolved = Vec::new();
    for file in parsed_files {
        let Some(names) = indexes.get(&file.adapter.language()) else {
            continue;
        };
        let scope = ResolveScope {
            all_components,
            names,
        };
        for id in &file.ids {
            let Some(component) = all_components.get(id) else {
                continue;
            };
            let deps = file
                .adapter
                .resolve_dependencies(component, &file.tree, &file.source, &scope);
            resolved.push((id.clone(), deps));
        }
    }
    resolved
}

fn link_classes_to_methods(components: &mut BTreeMap<String, CodeComponent>) {
    let methods: Vec<String> = components
        .values()
        .filter(|c| c.kind == ComponentKind::Method && !c.id.ends_with(".__init__"))
        .map(|c| c.id.clone())
        .collect();

    for component in components.values_mut() {
        if component.kind != ComponentKind::Class {
            continue;
        }
        let prefix = format!("{}.", component.id);
        for method in methods.iter().filter(|m| m.starts_with(&prefix)) {
            component.depends_on.insert(method.clone());
        }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Every regular file under `root`, in a stable order, skipping vendored
/// and build directories.
pub fn source_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn relative_file_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `pkg/sub/mod.py` → `pkg.sub.mod`
pub fn module_path_for(relative: &Path) -> String {
    let dotted = relative_file_path(relative).replace('/', ".");
    match dotted.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => dotted,
    }
}
