//! Documentation-oriented dependency abstraction.
//!
//! Raw call resolution produces method-to-method edges everywhere. For
//! reading a codebase, class-level collaborators matter more, so these rules
//! roll method targets up to their owning class, hide private helpers of the
//! caller's own class and drop self edges. Global variables are never
//! rolled up.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{CodeComponent, ComponentKind};

pub fn apply_doc_dependency_rules(components: &mut BTreeMap<String, CodeComponent>) {
    let kinds: HashMap<String, ComponentKind> = components
        .iter()
        .map(|(id, c)| (id.clone(), c.kind))
        .collect();
    let kind_of = |id: &str| kinds.get(id).copied();

    // Owning class of a method target, if `dep` names a method of a known class.
    let owner_class = |dep: &str| -> Option<String> {
        let (owner, _) = dep.rsplit_once('.')?;
        (kind_of(owner) == Some(ComponentKind::Class)).then(|| owner.to_string())
    };

    // Classes: depend on other classes, not their methods.
    for comp in components.values_mut() {
        if comp.kind != ComponentKind::Class {
            continue;
        }
        let own_prefix = format!("{}.", comp.id);
        let mut new_deps = BTreeSet::new();

        for dep in &comp.depends_on {
            if *dep == comp.id {
                continue;
            }
            if dep.starts_with(&own_prefix)
                || kind_of(dep) == Some(ComponentKind::GlobalVariable)
            {
                new_deps.insert(dep.clone());
                continue;
            }
            match owner_class(dep) {
                Some(owner) => new_deps.insert(owner),
                None => new_deps.insert(dep.clone()),
            };
        }

        comp.depends_on = new_deps;
    }

    // Methods and functions: same roll-up, minus their own class and its private helpers.
    for comp in components.values_mut() {
        if !matches!(comp.kind, ComponentKind::Method | ComponentKind::Function) {
            continue;
        }
        let self_class = match comp.kind {
            ComponentKind::Method => comp.parent_id().map(str::to_string),
            _ => None,
        };
        let private_prefix = self_class.as_ref().map(|c| format!("{c}._"));
        let mut new_deps = BTreeSet::new();

        for dep in &comp.depends_on {
            if self_class.as_deref() == Some(dep.as_str()) {
                continue;
            }
            if private_prefix
                .as_deref()
                .is_some_and(|prefix| dep.starts_with(prefix))
            {
                continue;
            }
            match kind_of(dep) {
                Some(ComponentKind::GlobalVariable) | Some(ComponentKind::Class) => {
                    new_deps.insert(dep.clone());
                    continue;
                }
                _ => {}
            }
            match owner_class(dep) {
                Some(owner) => new_deps.insert(owner),
                None => new_deps.insert(dep.clone()),
            };
        }

        comp.depends_on = new_deps;
    }

    for comp in components.values_mut() {
        let id = comp.id.clone();
        comp.depends_on.remove(&id);
    }
}
