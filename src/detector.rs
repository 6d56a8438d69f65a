use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use crate::analyzer::repository::source_files;
use crate::analyzer::AdapterRegistry;
use crate::models::Language;

/// Count the source files of each supported language under `path`,
/// skipping the same vendored and build directories the parser skips.
pub fn detect_languages(path: &Path) -> Result<Vec<(Language, usize)>> {
    let registry = AdapterRegistry::new()?;
    let mut counts: BTreeMap<Language, usize> = BTreeMap::new();

    for file in source_files(path) {
        let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(adapter) = registry.adapter_for_file(name) {
            *counts.entry(adapter.language()).or_insert(0) += 1;
        }
    }

    Ok(counts.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_languages() {
        let dir = TempDir::new().unwrap();
        for name in ["a.py", "b.py", "web.ts", "Main.java", "README.md"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules").join("dep.js"), "").unwrap();

        let langs = detect_languages(dir.path()).unwrap();
        assert_eq!(
            langs,
            vec![
                (Language::Python, 2),
                (Language::TypeScript, 1),
                (Language::Java, 1),
            ]
        );
    }
}
