use std::collections::BTreeSet;

use anyhow::Result;
use tree_sitter::{Node, Tree};

use super::{
    checked_grammar, children, component_at, component_node, field_text, for_each_descendant,
    node_text, LanguageAdapter, ResolveScope,
};
use crate::models::{CodeComponent, ComponentKind, Language};

/// Adapter shared by JavaScript and TypeScript.
///
/// Both languages extract function declarations, class declarations and
/// class methods. They differ in resolution: JavaScript follows plain calls,
/// member calls and `new` expressions into JavaScript components, while
/// TypeScript only follows plain calls, into either language.
pub struct JavaScriptAdapter {
    language: Language,
    extensions: &'static [&'static str],
    grammar: tree_sitter::Language,
}

impl JavaScriptAdapter {
    pub fn javascript() -> Result<Self> {
        Ok(Self {
            language: Language::JavaScript,
            extensions: &[".js", ".jsx"],
            grammar: checked_grammar(tree_sitter_javascript::LANGUAGE.into(), "JavaScript")?,
        })
    }

    pub fn typescript() -> Result<Self> {
        Ok(Self {
            language: Language::TypeScript,
            extensions: &[".ts"],
            grammar: checked_grammar(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), "TypeScript")?,
        })
    }

    /// TypeScript with JSX, which needs its own grammar.
    pub fn tsx() -> Result<Self> {
        Ok(Self {
            language: Language::TypeScript,
            extensions: &[".tsx"],
            grammar: checked_grammar(tree_sitter_typescript::LANGUAGE_TSX.into(), "TSX")?,
        })
    }

    fn is_typescript(&self) -> bool {
        self.language == Language::TypeScript
    }

    /// Name of the component a call or `new` expression points at.
    fn callee<'s>(&self, node: Node<'_>, source: &'s str) -> Option<&'s str> {
        let target = match node.kind() {
            "call_expression" => node.child_by_field_name("function")?,
            "new_expression" if !self.is_typescript() => node.child_by_field_name("constructor")?,
            _ => return None,
        };
        match target.kind() {
            "identifier" => Some(node_text(target, source)),
            "member_expression" if !self.is_typescript() && node.kind() == "call_expression" => {
                field_text(target, "property", source)
            }
            _ => None,
        }
    }
}

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        self.language
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    fn resolves_into(&self) -> &'static [Language] {
        match self.language {
            Language::TypeScript => &[Language::JavaScript, Language::TypeScript],
            _ => &[Language::JavaScript],
        }
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
            component_at(id, self.language, kind, node, source, file_path, module_path)
        };
        let mut components = Vec::new();

        for_each_descendant(tree.root_node(), |node| match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = field_text(node, "name", source) {
                    components.push(make(format!("{module_path}.{name}"), ComponentKind::Function, node));
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                let Some(name) = field_text(node, "name", source) else {
                    return;
                };
                let class_id = format!("{module_path}.{name}");
                components.push(make(class_id.clone(), ComponentKind::Class, node));

                let Some(body) = node.child_by_field_name("body") else {
                    return;
                };
                for member in children(body) {
                    if member.kind() != "method_definition" {
                        continue;
                    }
                    if let Some(name) = field_text(member, "name", source) {
                        components.push(make(format!("{class_id}.{name}"), ComponentKind::Method, member));
                    }
                }
            }
            _ => {}
        });

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
            let Some(id) = self.callee(n, source).and_then(|name| scope.lookup(name)) else {
                return;
            };
            if id != component.id {
                deps.insert(id.to_string());
            }
        });

        deps
    }
}
