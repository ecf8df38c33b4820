//! Workspace-wide markup discovery and bulk validation.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use bls_source::LineIndex;
use bls_templates::BlockSpecs;
use ignore::WalkBuilder;
use tower_lsp_server::ls_types::Diagnostic;

/// Directories that never contain project templates.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".meteor", "packages"];

/// All markup files under `root`, honoring gitignore rules and skipping
/// dependency directories.
#[must_use]
pub fn find_markup_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !SKIPPED_DIRS.contains(&name.as_ref())
        })
        .build();

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if path.extension().is_some_and(|ext| ext == "html") {
            files.push(path);
        }
    }

    files.sort();
    files
}

/// Validates every markup file under `root`. Unreadable files are skipped
/// with a log line; the sweep always completes.
#[must_use]
pub fn validate_workspace(root: &Path, specs: &BlockSpecs) -> Vec<(PathBuf, Vec<Diagnostic>)> {
    let mut results = Vec::new();

    for path in find_markup_files(root) {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!("Skipping {}: {error}", path.display());
                continue;
            }
        };
        let diagnostics = bls_ide::validate(&text, &LineIndex::new(&text), specs);
        if !diagnostics.is_empty() {
            results.push((path, diagnostics));
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_find_markup_skips_dependency_dirs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("client")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join(".meteor/local")).unwrap();
        fs::write(dir.path().join("client/cart.html"), "").unwrap();
        fs::write(dir.path().join("node_modules/pkg/x.html"), "").unwrap();
        fs::write(dir.path().join(".meteor/local/y.html"), "").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();

        let files = find_markup_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("client/cart.html"));
    }

    #[test]
    fn test_validate_workspace_reports_findings() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("bad.html"),
            r#"<template name="t">{{#if x}}</template>"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("good.html"),
            r#"<template name="t">{{#if x}}{{/if}}</template>"#,
        )
        .unwrap();

        let results = validate_workspace(dir.path(), &BlockSpecs::builtin());
        assert_eq!(results.len(), 1);
        assert!(results[0].0.ends_with("bad.html"));
        assert_eq!(results[0].1.len(), 1);
    }
}
