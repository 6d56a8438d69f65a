use std::collections::BTreeSet;

use anyhow::Result;
use tree_sitter::{Node, Tree};

use super::{
    checked_grammar, children, component_at, component_node, field_text, for_each_descendant,
    node_text, LanguageAdapter, ResolveScope,
};
use crate::models::{CodeComponent, ComponentKind, Language};

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

/// Adapter for Java sources: top-level classes (also interfaces, enums and
/// records) and the methods declared directly in their bodies.
pub struct JavaAdapter {
    grammar: tree_sitter::Language,
}

impl JavaAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            grammar: checked_grammar(tree_sitter_java::LANGUAGE.into(), "Java")?,
        })
    }
}

/// Methods declared in a type body. Enum methods sit one level down, after
/// the constants.
fn methods_of(body: Node<'_>) -> Vec<Node<'_>> {
    children(body)
        .into_iter()
        .flat_map(|member| match member.kind() {
            "enum_body_declarations" => children(member),
            _ => vec![member],
        })
        .filter(|member| member.kind() == "method_declaration")
        .collect()
}

/// `Foo` in `new Foo(..)` and `new Foo<T>(..)`.
fn created_type<'s>(creation: Node<'_>, source: &'s str) -> Option<&'s str> {
    let ty = creation.child_by_field_name("type")?;
    match ty.kind() {
        "type_identifier" => Some(node_text(ty, source)),
        "generic_type" => ty
            .named_child(0)
            .filter(|n| n.kind() == "type_identifier")
            .map(|n| node_text(n, source)),
        _ => None,
    }
}

impl LanguageAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".java"]
    }

    fn resolves_into(&self) -> &'static [Language] {
        &[Language::Java]
    }

    fn grammar(&self) -> &tree_sitter::Language {
        &self.grammar
    }

    fn extract_components(
        &self,
        tree: &Tree,
        source: &str,
        file_path: &str,
        module_path: &str,
    ) -> Vec<CodeComponent> {
        let make = |id: String, kind: ComponentKind, node: Node<'_>| {
            component_at(id, Language::Java, kind, node, source, file_path, module_path)
        };
        let mut components = Vec::new();

        for decl in children(tree.root_node()) {
            if !TYPE_DECLARATIONS.contains(&decl.kind()) {
                continue;
            }
            let Some(name) = field_text(decl, "name", source) else {
                continue;
            };
            let class_id = format!("{module_path}.{name}");
            components.push(make(class_id.clone(), ComponentKind::Class, decl));

            let Some(body) = decl.child_by_field_name("body") else {
                continue;
            };
            for method in methods_of(body) {
                if let Some(name) = field_text(method, "name", source) {
                    components.push(make(format!("{class_id}.{name}"), ComponentKind::Method, method));
                }
            }
        }

        components
    }

    fn resolve_dependencies(
        &self,
        component: &CodeComponent,
        tree: &Tree,
        source: &str,
        scope: &ResolveScope<'_>,
    ) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        let Some(node) = component_node(tree, component) else {
            return deps;
        };

        for_each_descendant(node, |n| {
            let name = match n.kind() {
                "method_invocation" => field_text(n, "name", source),
                "object_creation_expression" => created_type(n, source),
                _ => None,
            };
            let Some(id) = name.and_then(|name| scope.lookup(name)) else {
                return;
            };
            if id != component.id {
                deps.insert(id.to_string());
            }
        });

        deps
    }
}
