//! Language adapters that turn source files into [`CodeComponent`]s.
//!
//! Every adapter parses with its tree-sitter grammar and runs in two passes
//! driven by [`repository::RepositoryParser`]:
//! 1. [`LanguageAdapter::extract_components`] on each file in isolation.
//! 2. [`LanguageAdapter::resolve_dependencies`] once every component of the
//!    repository is known, so calls can be matched across files.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{anyhow, Context, Result};
use tree_sitter::{Node, Parser, Tree};

use crate::models::{CodeComponent, ComponentKind, Language};

pub mod java;
pub mod javascript;
pub mod python;
pub mod repository;

/// Last-segment name → component id, for one family of languages.
pub type NameIndex<'a> = HashMap<&'a str, &'a str>;

/// Everything pass 2 resolves against. Built once per language family.
pub struct ResolveScope<'a> {
    pub all_components: &'a BTreeMap<String, CodeComponent>,
    pub names: &'a NameIndex<'a>,
}

impl<'a> ResolveScope<'a> {
    pub fn lookup(&self, name: &str) -> Option<&'a str> {
        self.names.get(name).copied()
    }
}

pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// File suffixes handled by this adapter, including the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Languages whose components this adapter's calls may resolve to.
    fn resolves_into(&self) -> &'static [Language];

    fn grammar(&self) -> &tree_sitter::Language;

    fn parse(&self, source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(self.grammar())
            .map_err(|e| anyhow!("Incompatible {} grammar: {e}", self.language()))?;
        parser
            .parse(source, None)
            .with_context(|| format!("tree-sitter produced no {} tree", self.language()))
    }

    fn extract_components(
        &self,
        tree: &Tree,
        source: &str,
        file_path: &str,
        module_path: &str,
    ) -> Vec<CodeComponent>;

    fn resolve_dependencies(
        &self,
        component: &CodeComponent,
        tree: &Tree,
        source: &str,
        scope: &ResolveScope<'_>,
    ) -> BTreeSet<String>;
}

/// Fail at startup rather than per file when a grammar was built for an
/// incompatible tree-sitter ABI.
pub(crate) fn checked_grammar(grammar: tree_sitter::Language, name: &str) -> Result<tree_sitter::Language> {
    Parser::new()
        .set_language(&grammar)
        .map_err(|e| anyhow!("Incompatible {name} grammar: {e}"))?;
    Ok(grammar)
}

/// Ordered set of adapters; the first one whose extension matches wins.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Result<Self> {
        Ok(Self {
            adapters: vec![
                Box::new(python::PythonAdapter::new()?),
                Box::new(javascript::JavaScriptAdapter::javascript()?),
                Box::new(javascript::JavaScriptAdapter::typescript()?),
                Box::new(javascript::JavaScriptAdapter::tsx()?),
                Box::new(java::JavaAdapter::new()?),
            ],
        })
    }

    pub fn adapter_for_file(&self, file_name: &str) -> Option<&dyn LanguageAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.extensions().iter().any(|ext| file_name.ends_with(ext)))
            .map(|adapter| adapter.as_ref())
    }
}

/// Map of short name → component id for the given languages.
///
/// When two components share a short name the one with the greatest id wins,
/// which keeps resolution deterministic across runs.
pub fn name_index<'a>(
    all_components: &'a BTreeMap<String, CodeComponent>,
    languages: &[Language],
) -> NameIndex<'a> {
    all_components
        .values()
        .filter(|c| languages.contains(&c.language))
        .map(|c| (c.short_name(), c.id.as_str()))
        .collect()
}

/// Build a component spanning `node`.
pub(crate) fn component_at(
    id: String,
    language: Language,
    kind: ComponentKind,
    node: Node<'_>,
    source: &str,
    file_path: &str,
    module_path: &str,
) -> CodeComponent {
    let mut comp = CodeComponent::new(id, language, kind, file_path, module_path);
    comp.start_line = node.start_position().row + 1;
    comp.end_line = node.end_position().row + 1;
    comp.byte_range = node.byte_range();
    comp.source_code = source.get(node.byte_range()).map(str::to_string);
    comp
}

/// The syntax node a component was extracted from.
pub(crate) fn component_node<'t>(tree: &'t Tree, component: &CodeComponent) -> Option<Node<'t>> {
    let range = &component.byte_range;
    if range.is_empty() {
        return None;
    }
    tree.root_node().descendant_for_byte_range(range.start, range.end)
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Text of the child in `field`, if the node has one.
pub(crate) fn field_text<'s>(node: Node<'_>, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(n, source))
}

/// Pre-order walk over `node` and everything below it, without recursion.
pub(crate) fn for_each_descendant<'t>(node: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = node.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.node() == node {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Direct children of `node`.
pub(crate) fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}
