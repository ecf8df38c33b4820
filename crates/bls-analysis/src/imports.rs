//! Import-statement scanning and heuristic path resolution.
//!
//! There is no real module resolver here. Resolution is an ordered list of
//! candidate-path strategies; the first candidate that exists on disk wins.
//! New resolution rules are added by appending a strategy, not by touching
//! the callers.

use std::path::Path;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Named bindings, empty for bare side-effect imports.
    pub names: Vec<String>,
    /// The quoted module specifier.
    pub specifier: String,
    pub offset: usize,
}

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"import\s+(?:type\s+)?(?:\{(?P<names>[^}]*)\}|(?P<default>[A-Za-z_]\w*))\s+from\s+['"](?P<spec>[^'"]+)['"]"#,
    )
    .unwrap()
});

static BARE_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s+['"](?P<spec>[^'"]+)['"]"#).unwrap());

/// All static imports in a script, in document order.
#[must_use]
pub fn import_statements(text: &str) -> Vec<ImportStatement> {
    let mut statements: Vec<ImportStatement> = Vec::new();

    for captures in IMPORT.captures_iter(text) {
        let names = captures.name("names").map_or_else(
            || {
                captures
                    .name("default")
                    .map(|m| vec![m.as_str().to_string()])
                    .unwrap_or_default()
            },
            |m| {
                m.as_str()
                    .split(',')
                    .map(|n| n.trim().trim_start_matches("type ").trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect()
            },
        );

        statements.push(ImportStatement {
            names,
            specifier: captures["spec"].to_string(),
            offset: captures.get(0).expect("match").start(),
        });
    }

    for captures in BARE_IMPORT.captures_iter(text) {
        let offset = captures.get(0).expect("match").start();
        if statements.iter().any(|s| s.offset == offset) {
            continue;
        }
        statements.push(ImportStatement {
            names: Vec::new(),
            specifier: captures["spec"].to_string(),
            offset,
        });
    }

    statements.sort_by_key(|s| s.offset);
    statements
}

/// One way of turning a specifier into candidate paths.
pub trait ImportStrategy: Send + Sync {
    fn candidates(&self, importer_dir: &Path, specifier: &str) -> Vec<PathBuf>;
}

const FILE_SUFFIXES: &[&str] = &["", ".js", ".ts", ".html", "/index.js", "/index.ts"];

fn with_suffixes(base: PathBuf) -> Vec<PathBuf> {
    let Some(base_str) = base.to_str() else {
        return vec![base];
    };
    FILE_SUFFIXES
        .iter()
        .map(|suffix| PathBuf::from(format!("{base_str}{suffix}")))
        .collect()
}

/// `./foo` and `../foo` relative to the importing file's directory.
pub struct RelativeStrategy;

impl ImportStrategy for RelativeStrategy {
    fn candidates(&self, importer_dir: &Path, specifier: &str) -> Vec<PathBuf> {
        if !specifier.starts_with('.') {
            return Vec::new();
        }
        with_suffixes(importer_dir.join(specifier))
    }
}

/// Root-absolute specifiers (`/imports/ui/cart`), mapped under the project
/// root the way Meteor resolves them.
pub struct RootStrategy {
    pub root: PathBuf,
}

impl ImportStrategy for RootStrategy {
    fn candidates(&self, _importer_dir: &Path, specifier: &str) -> Vec<PathBuf> {
        let Some(stripped) = specifier.strip_prefix('/') else {
            return Vec::new();
        };
        with_suffixes(self.root.join(stripped))
    }
}

/// Ordered strategy list; first existing candidate wins.
pub struct ImportResolver {
    strategies: Vec<Box<dyn ImportStrategy>>,
}

impl ImportResolver {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn ImportStrategy>>) -> Self {
        Self { strategies }
    }

    /// The default chain: relative paths, then root-absolute when the
    /// project root is known.
    #[must_use]
    pub fn with_root(root: Option<PathBuf>) -> Self {
        let mut strategies: Vec<Box<dyn ImportStrategy>> = vec![Box::new(RelativeStrategy)];
        if let Some(root) = root {
            strategies.push(Box::new(RootStrategy { root }));
        }
        Self::new(strategies)
    }

    #[must_use]
    pub fn resolve(&self, importer_dir: &Path, specifier: &str) -> Option<PathBuf> {
        for strategy in &self.strategies {
            for candidate in strategy.candidates(importer_dir, specifier) {
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_named_and_default_imports() {
        let text = r#"import { CartData, type Totals } from "./types";
import Checkout from './checkout';
import './cart.html';"#;
        let statements = import_statements(text);
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].names, vec!["CartData", "Totals"]);
        assert_eq!(statements[0].specifier, "./types");
        assert_eq!(statements[1].names, vec!["Checkout"]);
        assert!(statements[2].names.is_empty());
        assert_eq!(statements[2].specifier, "./cart.html");
    }

    #[test]
    fn test_relative_resolution_tries_suffixes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("types.ts"), "export type A = {};").unwrap();

        let resolver = ImportResolver::with_root(None);
        let resolved = resolver.resolve(dir.path(), "./types").unwrap();
        assert_eq!(resolved, dir.path().join("types.ts"));
    }

    #[test]
    fn test_root_absolute_resolution() {
        let dir = tempdir().unwrap();
        let ui = dir.path().join("imports/ui");
        fs::create_dir_all(&ui).unwrap();
        fs::write(ui.join("cart.js"), "").unwrap();

        let resolver = ImportResolver::with_root(Some(dir.path().to_path_buf()));
        let resolved = resolver
            .resolve(Path::new("/elsewhere"), "/imports/ui/cart")
            .unwrap();
        assert_eq!(resolved, ui.join("cart.js"));
    }

    #[test]
    fn test_unresolvable_is_none() {
        let dir = tempdir().unwrap();
        let resolver = ImportResolver::with_root(None);
        assert!(resolver.resolve(dir.path(), "./missing").is_none());
        assert!(resolver.resolve(dir.path(), "meteor/templating").is_none());
    }
}
