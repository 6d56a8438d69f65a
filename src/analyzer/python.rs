use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use tree_sitter::{Node, Tree};

use super::{
    checked_grammar, children, component_at, component_node, field_text, for_each_descendant,
    node_text, LanguageAdapter, ResolveScope,
};
use crate::models::{CodeComponent, ComponentKind, Language};

/// Adapter for Python sources.
///
/// Extracted components:
/// - module-level `def` / `async def`, decorated or not → `function`
/// - `class` definitions at any depth → `class`
/// - `def` directly inside a class body (decorated or not) → `method`
/// - module-level `NAME = ...` assignments → `global_variable`
pub struct PythonAdapter {
    grammar: tree_sitter::Language,
}

impl PythonAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            grammar: checked_grammar(tree_sitter_python::LANGUAGE.into(), "Python")?,
        })
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    fn resolves_into(&self) -> &'static [Language] {
        &[Language::Python]
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
        let root = tree.root_node();
        let make = |id: String, kind: ComponentKind, node: Node<'_>| {
            let mut comp = component_at(id, Language::Python, kind, node, source, file_path, module_path);
            if let Some(doc) = docstring(node, source) {
                comp.has_docstring = true;
                comp.docstring = doc;
            }
            comp
        };

        let mut components: Vec<CodeComponent> = Vec::new();

        for_each_descendant(root, |node| match node.kind() {
            "class_definition" => {
                let Some(name) = field_text(node, "name", source) else {
                    return;
                };
                let class_id = format!("{module_path}.{name}");
                components.push(make(class_id.clone(), ComponentKind::Class, node));

                let Some(body) = node.child_by_field_name("body") else {
                    return;
                };
                for method in children(body).into_iter().filter_map(function_of) {
                    if let Some(name) = field_text(method, "name", source) {
                        components.push(make(format!("{class_id}.{name}"), ComponentKind::Method, method));
                    }
                }
            }
            "function_definition" if is_module_level(node) => {
                if let Some(name) = field_text(node, "name", source) {
                    components.push(make(format!("{module_path}.{name}"), ComponentKind::Function, node));
                }
            }
            _ => {}
        });

        // Definitions with the same name take precedence over assignments.
        let mut seen: HashSet<String> = components.iter().map(|c| c.id.clone()).collect();
        for stmt in children(root) {
            let Some(name) = global_assignment(stmt, source) else {
                continue;
            };
            let id = format!("{module_path}.{name}");
            if seen.insert(id.clone()) {
                components.push(component_at(
                    id,
                    Language::Python,
                    ComponentKind::GlobalVariable,
                    stmt,
                    source,
                    file_path,
                    module_path,
                ));
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

        let locals = match component.kind {
            ComponentKind::GlobalVariable => HashSet::new(),
            _ => assigned_names(node, source),
        };
        let own_class = match component.kind {
            ComponentKind::Method => component.parent_id(),
            _ => None,
        };

        for_each_descendant(node, |n| match n.kind() {
            "call" => resolve_call(n, source, own_class, &locals, scope, &mut deps),
            "identifier" => {
                // Bare references to globals of the same module.
                if is_member_name(n) {
                    return;
                }
                let name = node_text(n, source);
                if locals.contains(name) {
                    return;
                }
                let candidate = format!("{}.{}", component.module_path, name);
                if candidate == component.id {
                    return;
                }
                if let Some(target) = scope.all_components.get(&candidate) {
                    if target.kind == ComponentKind::GlobalVariable {
                        deps.insert(candidate);
                    }
                }
            }
            _ => {}
        });

        deps
    }
}

fn resolve_call(
    call: Node<'_>,
    source: &str,
    own_class: Option<&str>,
    locals: &HashSet<&str>,
    scope: &ResolveScope<'_>,
    deps: &mut BTreeSet<String>,
) {
    let Some(function) = call.child_by_field_name("function") else {
        return;
    };
    let text = node_text(function, source);

    if let (Some(class_id), true) = (own_class, text.starts_with("self.")) {
        let method = text.rsplit('.').next().unwrap_or(text);
        let candidate = format!("{class_id}.{method}");
        if scope.all_components.contains_key(&candidate) {
            deps.insert(candidate);
        }
        return;
    }

    let mut add = |name: &str| {
        if let Some(id) = scope.lookup(name) {
            deps.insert(id.to_string());
        }
    };

    match function.kind() {
        "identifier" if !locals.contains(text) => add(text),
        "attribute" => match dotted_name(function, source).as_deref() {
            Some([owner, method]) => {
                add(*method);
                add(*owner);
            }
            Some(_) => {}
            // `make().run()`: only the method name is known.
            None => {
                if let Some(method) = field_text(function, "attribute", source) {
                    add(method);
                }
            }
        },
        _ => {}
    }
}

/// `a.b.c` as `["a", "b", "c"]`; `None` once any link is not a plain name.
fn dotted_name<'s>(node: Node<'_>, source: &'s str) -> Option<Vec<&'s str>> {
    match node.kind() {
        "identifier" => Some(vec![node_text(node, source)]),
        "attribute" => {
            let mut parts = dotted_name(node.child_by_field_name("object")?, source)?;
            parts.push(field_text(node, "attribute", source)?);
            Some(parts)
        }
        _ => None,
    }
}

/// The function behind a class-body statement, looking through decorators.
fn function_of(stmt: Node<'_>) -> Option<Node<'_>> {
    match stmt.kind() {
        "function_definition" => Some(stmt),
        "decorated_definition" => stmt
            .child_by_field_name("definition")
            .filter(|def| def.kind() == "function_definition"),
        _ => None,
    }
}

fn is_module_level(def: Node<'_>) -> bool {
    let Some(parent) = def.parent() else {
        return false;
    };
    match parent.kind() {
        "module" => true,
        "decorated_definition" => parent.parent().is_some_and(|p| p.kind() == "module"),
        _ => false,
    }
}

/// `NAME = value` (optionally annotated) as a module-level statement.
fn global_assignment<'s>(stmt: Node<'_>, source: &'s str) -> Option<&'s str> {
    if stmt.kind() != "expression_statement" {
        return None;
    }
    let assignment = stmt.named_child(0).filter(|n| n.kind() == "assignment")?;
    assignment.child_by_field_name("right")?;
    let left = assignment
        .child_by_field_name("left")
        .filter(|n| n.kind() == "identifier")?;
    Some(node_text(left, source))
}

/// Names bound by plain assignments anywhere under `node`.
fn assigned_names<'s>(node: Node<'_>, source: &'s str) -> HashSet<&'s str> {
    let mut names = HashSet::new();
    for_each_descendant(node, |n| {
        if n.kind() != "assignment" {
            return;
        }
        if let Some(left) = n.child_by_field_name("left").filter(|l| l.kind() == "identifier") {
            names.insert(node_text(left, source));
        }
    });
    names
}

/// `x` in `obj.x` or in `f(x=1)`: a member or keyword, not a reference.
fn is_member_name(ident: Node<'_>) -> bool {
    let Some(parent) = ident.parent() else {
        return false;
    };
    let field = match parent.kind() {
        "attribute" => "attribute",
        "keyword_argument" => "name",
        _ => return false,
    };
    parent.child_by_field_name(field) == Some(ident)
}

/// First statement of the body when it is a lone string literal, quotes
/// stripped and trimmed.
fn docstring(def: Node<'_>, source: &str) -> Option<String> {
    let body = def.child_by_field_name("body")?;
    let first = children(body)
        .into_iter()
        .find(|n| n.is_named() && n.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }
    let literal = first.named_child(0).filter(|n| n.kind() == "string")?;
    Some(strip_quotes(node_text(literal, source)).trim().to_string())
}

fn strip_quotes(literal: &str) -> &str {
    let body = literal.trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B', 'f', 'F']);
    ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| body.len() >= 2 * q.len() && body.starts_with(q) && body.ends_with(q))
        .map(|q| &body[q.len()..body.len() - q.len()])
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::analyzer::name_index;

    const SOURCE: &str = r#"import os

CONFIG = {
    "debug": True,
}
counter: int = 0


def load(path):
    """Load a file from disk."""
    data = read(path)
    return Processor.process(data)


def read(path):
    return open(path).read()


class Processor:
    '''
    Processes data.
    '''

    def __init__(self):
        self.items = []

    @staticmethod
    def process(data):
        return helper(data)

    def run(self):
        if CONFIG["debug"]:
            print("running")
        return self._step()

    def _step(self):
        def nested():
            pass
        return nested()


def helper(x): return x


async def fetch(url):
    return await read(url)


@lru_cache(maxsize=None)
def cached(key):
    return helper(key)
"#;

    fn extract_from(source: &str, file_path: &str, module_path: &str) -> (Tree, Vec<CodeComponent>) {
        let adapter = PythonAdapter::new().unwrap();
        let tree = adapter.parse(source).unwrap();
        let comps = adapter.extract_components(&tree, source, file_path, module_path);
        (tree, comps)
    }

    fn extract() -> Vec<CodeComponent> {
        extract_from(SOURCE, "pkg/app.py", "pkg.app").1
    }

    fn by_id(components: &[CodeComponent], id: &str) -> CodeComponent {
        components
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("missing component {id}"))
    }

    /// Dependencies of every component in `source`, resolved within the file.
    fn resolve_all(source: &str, module_path: &str) -> BTreeMap<String, BTreeSet<String>> {
        let adapter = PythonAdapter::new().unwrap();
        let (tree, comps) = extract_from(source, "m.py", module_path);
        let all: BTreeMap<String, CodeComponent> =
            comps.into_iter().map(|c| (c.id.clone(), c)).collect();
        let names = name_index(&all, &[Language::Python]);
        let scope = ResolveScope {
            all_components: &all,
            names: &names,
        };
        all.values()
            .map(|c| (c.id.clone(), adapter.resolve_dependencies(c, &tree, source, &scope)))
            .collect()
    }

    #[test]
    fn test_extracts_all_kinds() {
        let comps = extract();
        let mut ids: Vec<&str> = comps.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        assert_eq!(
            ids,
            vec![
                "pkg.app.CONFIG",
                "pkg.app.Processor",
                "pkg.app.Processor.__init__",
                "pkg.app.Processor._step",
                "pkg.app.Processor.process",
                "pkg.app.Processor.run",
                "pkg.app.cached",
                "pkg.app.counter",
                "pkg.app.fetch",
                "pkg.app.helper",
                "pkg.app.load",
                "pkg.app.read",
            ]
        );

        assert_eq!(by_id(&comps, "pkg.app.CONFIG").kind, ComponentKind::GlobalVariable);
        assert_eq!(by_id(&comps, "pkg.app.Processor.process").kind, ComponentKind::Method);
        assert_eq!(by_id(&comps, "pkg.app.helper").kind, ComponentKind::Function);
        assert_eq!(by_id(&comps, "pkg.app.fetch").kind, ComponentKind::Function);
        assert_eq!(by_id(&comps, "pkg.app.cached").kind, ComponentKind::Function);
    }

    #[test]
    fn test_line_spans() {
        let comps = extract();
        let config = by_id(&comps, "pkg.app.CONFIG");
        assert_eq!((config.start_line, config.end_line), (3, 5));

        let load = by_id(&comps, "pkg.app.load");
        assert_eq!((load.start_line, load.end_line), (9, 12));

        let helper = by_id(&comps, "pkg.app.helper");
        assert_eq!(helper.start_line, helper.end_line);

        let fetch = by_id(&comps, "pkg.app.fetch");
        assert_eq!((fetch.start_line, fetch.end_line), (45, 46));
        assert!(fetch.source_code.unwrap().starts_with("async def fetch"));
    }

    #[test]
    fn test_docstrings() {
        let comps = extract();
        let load = by_id(&comps, "pkg.app.load");
        assert!(load.has_docstring);
        assert_eq!(load.docstring, "Load a file from disk.");

        let class = by_id(&comps, "pkg.app.Processor");
        assert!(class.has_docstring);
        assert_eq!(class.docstring, "Processes data.");

        assert!(!by_id(&comps, "pkg.app.read").has_docstring);
    }

    #[test]
    fn test_resolve_dependencies() {
        let deps = resolve_all(SOURCE, "pkg.app");

        let load = &deps["pkg.app.load"];
        assert!(load.contains("pkg.app.read"));
        assert!(load.contains("pkg.app.Processor"));
        assert!(load.contains("pkg.app.Processor.process"));

        let run = &deps["pkg.app.Processor.run"];
        assert!(run.contains("pkg.app.Processor._step"));
        assert!(run.contains("pkg.app.CONFIG"));

        assert!(deps["pkg.app.Processor.process"].contains("pkg.app.helper"));
        assert!(deps["pkg.app.fetch"].contains("pkg.app.read"));
        assert!(deps["pkg.app.cached"].contains("pkg.app.helper"));
    }

    #[test]
    fn test_local_shadowing_blocks_plain_calls() {
        let source = "def a():\n    b = make()\n    return b()\n\ndef b():\n    pass\n\ndef make():\n    pass\n";
        let deps = resolve_all(source, "m");
        assert!(deps["m.a"].contains("m.make"));
        assert!(!deps["m.a"].contains("m.b"));
    }

    #[test]
    fn test_multiline_string_at_column_zero_stays_in_body() {
        let source = "def query(db):\n    sql = \"\"\"\nSELECT *\nFROM t\n\"\"\"\n    return run(db, sql)\n\ndef run(db, sql):\n    pass\n";
        let (_, comps) = extract_from(source, "m.py", "m");
        let query = by_id(&comps, "m.query");
        assert_eq!((query.start_line, query.end_line), (1, 6));
        assert!(query.source_code.unwrap().ends_with("return run(db, sql)"));

        let deps = resolve_all(source, "m");
        assert!(deps["m.query"].contains("m.run"));
    }

    #[test]
    fn test_calls_inside_strings_and_comments_are_ignored() {
        let source = "def a():\n    # b()\n    return \"b()\"\n\ndef b():\n    pass\n";
        let deps = resolve_all(source, "m");
        assert!(deps["m.a"].is_empty());
    }

    #[test]
    fn test_attribute_and_keyword_names_are_not_global_references() {
        let source = "LIMIT = 3\n\ndef a(obj):\n    return obj.LIMIT + f(LIMIT=1)\n\ndef b():\n    return LIMIT\n";
        let deps = resolve_all(source, "m");
        assert!(!deps["m.a"].contains("m.LIMIT"));
        assert!(deps["m.b"].contains("m.LIMIT"));
    }
}
