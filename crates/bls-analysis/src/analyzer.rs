//! Companion discovery and orchestration.
//!
//! One call scans a template document's directory for companion files and
//! replaces everything the table knows under that directory's keys. I/O
//! failures are logged and treated as "no data from this source"; a partial
//! scan is always preferred over none.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use bls_templates::declared_templates;

use crate::helpers::extract_global_helpers;
use crate::helpers::extract_template_helpers;
use crate::imports::import_statements;
use crate::imports::ImportResolver;
use crate::shapes::extract_shapes;
use crate::shapes::extract_typedef_shapes;
use crate::shapes::template_shape_map;
use crate::shapes::Shape;
use crate::shapes::TEMPLATE_MAP;
use crate::styles::extract_selectors;
use crate::table::AnalysisTable;
use crate::table::HelperDescriptor;
use crate::table::TableKey;

const SCRIPT_EXTENSIONS: &[&str] = &["js", "ts", "mjs"];
const STYLE_EXTENSIONS: &[&str] = &["css", "less", "scss"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionKind {
    Script,
    Style,
}

/// Files in `dir` associated with a template file named `base`: same base
/// name, a declared template's name, or a dotted-prefix split like
/// `cart.events.ts` next to `cart.html`.
pub fn companion_files(
    dir: &Path,
    base: &str,
    declared: &[String],
) -> std::io::Result<Vec<(PathBuf, CompanionKind)>> {
    let mut companions = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let kind = if SCRIPT_EXTENSIONS.contains(&extension) {
            CompanionKind::Script
        } else if STYLE_EXTENSIONS.contains(&extension) {
            CompanionKind::Style
        } else {
            continue;
        };

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let matches = stem == base
            || declared.iter().any(|d| d == stem)
            || stem.starts_with(&format!("{base}."));
        if matches {
            companions.push((path, kind));
        }
    }

    companions.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(companions)
}

/// Re-derives all companion analysis for one template document and replaces
/// the table entries reachable from it.
pub fn analyze_document(
    table: &AnalysisTable,
    resolver: &ImportResolver,
    path: &Path,
    text: &str,
) {
    let Some(dir) = path.parent() else {
        return;
    };
    let Some(base) = path.file_stem().and_then(|s| s.to_str()) else {
        return;
    };

    let declared: Vec<String> = declared_templates(text)
        .into_iter()
        .map(|d| d.name)
        .collect();

    let companions = match companion_files(dir, base, &declared) {
        Ok(companions) => companions,
        Err(error) => {
            tracing::warn!("Failed to list companions of {}: {error}", path.display());
            return;
        }
    };

    let mut global_helpers: Vec<HelperDescriptor> = Vec::new();
    let mut all_selectors: Vec<String> = Vec::new();
    let mut style_bases: Vec<String> = Vec::new();

    for (companion, kind) in &companions {
        let source = match fs::read_to_string(companion) {
            Ok(source) => source,
            Err(error) => {
                tracing::warn!("Failed to read {}: {error}", companion.display());
                continue;
            }
        };
        let companion_base = companion
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        match kind {
            CompanionKind::Script => analyze_script(
                table,
                resolver,
                dir,
                base,
                &companion_base,
                &declared,
                &source,
                &mut global_helpers,
            ),
            CompanionKind::Style => {
                let selectors = extract_selectors(&source);
                table.set_selectors(TableKey::new(dir, &companion_base), selectors.clone());
                style_bases.push(companion_base);
                for selector in selectors {
                    if !all_selectors.contains(&selector) {
                        all_selectors.push(selector);
                    }
                }
            }
        }
    }

    for name in equivalent_keys(base, &declared) {
        if !style_bases.iter().any(|b| b == name) {
            table.set_selectors(TableKey::new(dir, name), all_selectors.clone());
        }
    }

    table.set_global_helpers(dir, global_helpers);
}

#[allow(clippy::too_many_arguments)]
fn analyze_script(
    table: &AnalysisTable,
    resolver: &ImportResolver,
    dir: &Path,
    base: &str,
    companion_base: &str,
    declared: &[String],
    source: &str,
    global_helpers: &mut Vec<HelperDescriptor>,
) {
    let registrations = extract_template_helpers(source);

    // Per-registration data lands under the registration's own name; the
    // file-level keys get the concatenation so lookups by file name work.
    let mut combined: Vec<HelperDescriptor> = Vec::new();
    for registration in &registrations {
        table.set_helpers(
            TableKey::new(dir, &registration.template),
            registration.helpers.clone(),
        );
        for helper in &registration.helpers {
            if !combined.iter().any(|h| h.name == helper.name) {
                combined.push(helper.clone());
            }
        }
    }
    for name in equivalent_keys(base, declared).chain(std::iter::once(companion_base)) {
        if !registrations.iter().any(|r| r.template == name) {
            table.set_helpers(TableKey::new(dir, name), combined.clone());
        }
    }

    for helper in extract_global_helpers(source) {
        if !global_helpers.iter().any(|h| h.name == helper.name) {
            global_helpers.push(helper);
        }
    }

    let mut shapes = extract_shapes(source);
    shapes.extend(extract_typedef_shapes(source));
    follow_imports(resolver, dir, source, &mut shapes);

    let shape_map = template_shape_map(&shapes);
    for (template, shape_name) in &shape_map {
        let key = TableKey::new(dir, template);
        table.set_shape_name(key.clone(), shape_name.clone());
        if let Some(shape) = shapes.iter().find(|s| &s.name == shape_name) {
            table.set_properties(key, property_types(shape));
        }
    }

    // Keys without an explicit mapping fall back to the union of every
    // shape in the file, which is exact in the common one-shape case.
    let union: HashMap<String, String> = shapes
        .iter()
        .filter(|s| s.name != TEMPLATE_MAP)
        .flat_map(|s| s.properties.iter())
        .map(|p| (p.name.clone(), p.type_text.clone()))
        .collect();

    for name in equivalent_keys(base, declared).chain(std::iter::once(companion_base)) {
        if shape_map.iter().all(|(t, _)| t != name) {
            table.set_properties(TableKey::new(dir, name), union.clone());
        }
    }
}

fn equivalent_keys<'a>(base: &'a str, declared: &'a [String]) -> impl Iterator<Item = &'a str> {
    std::iter::once(base).chain(
        declared
            .iter()
            .map(String::as_str)
            .filter(move |name| *name != base),
    )
}

/// Follows one level of local imports to pull in externally declared
/// shapes. Only the names the import statement lists are taken.
fn follow_imports(resolver: &ImportResolver, dir: &Path, source: &str, shapes: &mut Vec<Shape>) {
    for statement in import_statements(source) {
        if statement.names.is_empty() {
            continue;
        }
        let Some(resolved) = resolver.resolve(dir, &statement.specifier) else {
            continue;
        };
        let imported_source = match fs::read_to_string(&resolved) {
            Ok(content) => content,
            Err(error) => {
                tracing::warn!("Failed to read import {}: {error}", resolved.display());
                continue;
            }
        };

        for shape in extract_shapes(&imported_source) {
            let wanted = statement.names.iter().any(|n| *n == shape.name);
            let unseen = !shapes.iter().any(|s| s.name == shape.name);
            if wanted && unseen {
                shapes.push(shape);
            }
        }
    }
}

fn property_types(shape: &Shape) -> HashMap<String, String> {
    shape
        .properties
        .iter()
        .map(|p| (p.name.clone(), p.type_text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn analyze(dir: &Path, doc: &str, text: &str) -> AnalysisTable {
        let table = AnalysisTable::new();
        let resolver = ImportResolver::with_root(None);
        analyze_document(&table, &resolver, &dir.join(doc), text);
        table
    }

    #[test]
    fn test_helpers_keyed_by_base_and_registration_name() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cart.js"),
            "Template.foo.helpers({ bar() { return 1; } });",
        )
        .unwrap();

        let table = analyze(dir.path(), "cart.html", r#"<template name="foo"></template>"#);

        let by_registration = TableKey::new(dir.path(), "foo");
        let by_base = TableKey::new(dir.path(), "cart");
        assert_eq!(table.helper_names(&by_registration), vec!["bar"]);
        assert_eq!(table.helper_names(&by_base), vec!["bar"]);
    }

    #[test]
    fn test_companion_matching_forms() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cart.js"), "").unwrap();
        fs::write(dir.path().join("cart.events.ts"), "").unwrap();
        fs::write(dir.path().join("cartSummary.ts"), "").unwrap();
        fs::write(dir.path().join("unrelated.ts"), "").unwrap();
        fs::write(dir.path().join("cart.css"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let companions = companion_files(
            dir.path(),
            "cart",
            &["cartSummary".to_string()],
        )
        .unwrap();
        let names: Vec<_> = companions
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert!(names.contains(&"cart.js".to_string()));
        assert!(names.contains(&"cart.events.ts".to_string()));
        assert!(names.contains(&"cartSummary.ts".to_string()));
        assert!(names.contains(&"cart.css".to_string()));
        assert!(!names.contains(&"unrelated.ts".to_string()));
        assert!(!names.contains(&"notes.txt".to_string()));
    }

    #[test]
    fn test_selectors_reachable_from_template_keys() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cart.css"), ".row { top: 0; } #total {}").unwrap();

        let table = analyze(dir.path(), "cart.html", r#"<template name="cart"></template>"#);

        let key = TableKey::new(dir.path(), "cart");
        assert_eq!(table.selectors(&key), vec!["row", "total"]);
    }

    #[test]
    fn test_shape_map_binds_template_to_shape() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cart.ts"),
            "interface CartData { total: number; }\ninterface TemplatesData { cart: CartData; }",
        )
        .unwrap();

        let table = analyze(dir.path(), "cart.html", r#"<template name="cart"></template>"#);

        let key = TableKey::new(dir.path(), "cart");
        assert_eq!(table.shape_name(&key).as_deref(), Some("CartData"));
        assert_eq!(table.property_type(&key, "total").as_deref(), Some("number"));
    }

    #[test]
    fn test_imported_shape_followed_one_level() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("types.ts"), "export interface CartData { total: number; }")
            .unwrap();
        fs::write(
            dir.path().join("cart.ts"),
            "import { CartData } from './types';\ninterface TemplatesData { cart: CartData; }",
        )
        .unwrap();

        let table = analyze(dir.path(), "cart.html", r#"<template name="cart"></template>"#);

        let key = TableKey::new(dir.path(), "cart");
        assert_eq!(table.property_type(&key, "total").as_deref(), Some("number"));
    }

    #[test]
    fn test_global_helpers_keyed_by_directory() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cart.js"),
            r#"Template.registerHelper("shout", (v) => v);"#,
        )
        .unwrap();

        let table = analyze(dir.path(), "cart.html", r#"<template name="cart"></template>"#);

        let globals = table.global_helpers(dir.path());
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].name, "shout");
    }

    #[test]
    fn test_missing_directory_is_silent() {
        let table = AnalysisTable::new();
        let resolver = ImportResolver::with_root(None);
        analyze_document(
            &table,
            &resolver,
            Path::new("/definitely/not/here/cart.html"),
            "<template name=\"cart\"></template>",
        );
        assert!(table.helper_names(&TableKey::new(Path::new("/definitely/not/here"), "cart")).is_empty());
    }
}
