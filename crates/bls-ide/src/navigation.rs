//! Go-to-definition.
//!
//! Classification order: inclusion references, iteration aliases, helpers,
//! data properties. Declaration sites are found by re-scanning the
//! candidate companion files at query time; nothing is cached beyond the
//! analysis table's name lists. Any miss or I/O failure falls through to
//! the next candidate and ultimately to `None`.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use bls_analysis::companion_files;
use bls_analysis::extract_shapes;
use bls_analysis::extract_typedef_shapes;
use bls_analysis::import_statements;
use bls_analysis::AnalysisTable;
use bls_analysis::CompanionKind;
use bls_analysis::ImportResolver;
use bls_analysis::TableKey;
use bls_source::LineIndex;
use bls_templates::declared_templates;
use bls_templates::enclosing_template;
use bls_templates::expression_at;
use bls_templates::find_enclosing_each;
use tower_lsp_server::ls_types::Location;
use tower_lsp_server::ls_types::Range;
use tower_lsp_server::ls_types::Uri;

use crate::words::word_at;

/// Resolves the identifier at `offset` to its declaration site(s).
#[must_use]
pub fn definition(
    text: &str,
    offset: usize,
    path: &Path,
    table: &AnalysisTable,
    resolver: &ImportResolver,
) -> Option<Vec<Location>> {
    let expression = expression_at(text, offset)?;
    let (_, word) = word_at(text, offset)?;
    let content = &text[expression.start..expression.end];

    let dir = path.parent()?;
    let base = path.file_stem()?.to_str()?;
    let declared: Vec<String> = declared_templates(text).into_iter().map(|d| d.name).collect();
    let template = enclosing_template(text, offset).map(|d| d.name);
    let key = TableKey::new(dir, template.as_deref().unwrap_or(base));

    if let Some(rest) = content.strip_prefix('>') {
        return inclusion_definition(
            text, word, rest, path, dir, base, &declared, table, resolver,
        );
    }

    if let Some(each) = find_enclosing_each(text, offset) {
        if each.alias == word {
            // The alias stands for the iterated collection; resolve that
            // instead, helpers taking precedence over data properties.
            let source = each.source;
            return helper_definition(dir, base, &declared, &source)
                .or_else(|| property_definition(dir, base, &declared, &key, &source, table))
                .map(|location| vec![location]);
        }
    }

    let is_helper = table.helper(&key, word).is_some()
        || table.global_helpers(dir).iter().any(|h| h.name == word);
    if is_helper {
        if let Some(location) = helper_definition(dir, base, &declared, word) {
            return Some(vec![location]);
        }
    }

    property_definition(dir, base, &declared, &key, word, table).map(|location| vec![location])
}

fn location(path: &Path, source: &str, offset: usize, length: usize) -> Option<Location> {
    let uri: Uri = Uri::from_file_path(path)?;
    let index = LineIndex::new(source);
    let start = index.position(u32::try_from(offset).unwrap_or(u32::MAX));
    let end = index.position(u32::try_from(offset + length).unwrap_or(u32::MAX));
    Some(Location {
        uri,
        range: Range { start, end },
    })
}

fn companion_scripts(dir: &Path, base: &str, declared: &[String]) -> Vec<PathBuf> {
    match companion_files(dir, base, declared) {
        Ok(companions) => companions
            .into_iter()
            .filter(|(_, kind)| *kind == CompanionKind::Script)
            .map(|(path, _)| path)
            .collect(),
        Err(error) => {
            tracing::warn!("Failed to list companions of {}: {error}", dir.display());
            Vec::new()
        }
    }
}

/// First function or method declaration of `name` across the companion
/// scripts, by re-scan.
fn helper_definition(
    dir: &Path,
    base: &str,
    declared: &[String],
    name: &str,
) -> Option<Location> {
    for script in companion_scripts(dir, base, declared) {
        let Ok(source) = fs::read_to_string(&script) else {
            continue;
        };
        if let Some(at) = find_declaration(&source, name) {
            return location(&script, &source, at, name.len());
        }
    }
    None
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Offset of `name` where it is declared as a function, method, or bound
/// value: `name(...)`, `name: ...`, `name = ...`, or `function name(...)`.
fn find_declaration(source: &str, name: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut search = 0usize;

    while let Some(rel) = source[search..].find(name) {
        let at = search + rel;
        search = at + 1;

        let bounded = (at == 0 || !is_word_byte(bytes[at - 1]))
            && !source[at + name.len()..].starts_with(|c: char| c.is_alphanumeric() || c == '_');
        if !bounded {
            continue;
        }

        let after = source[at + name.len()..].trim_start();
        let declares = after.starts_with('(')
            || after.starts_with(':')
            || (after.starts_with('=') && !after.starts_with("==") && !after.starts_with("=>"));
        if declares {
            return Some(at);
        }
    }

    None
}

/// Declaration site of a data property, preferring the shape mapped to the
/// current template, then any shape carrying the property, then typedef
/// blocks, then the mapped shape's own declaration line.
fn property_definition(
    dir: &Path,
    base: &str,
    declared: &[String],
    key: &TableKey,
    property: &str,
    table: &AnalysisTable,
) -> Option<Location> {
    let mapped_shape = table.shape_name(key);
    let mut fallback: Option<Location> = None;

    for script in companion_scripts(dir, base, declared) {
        let Ok(source) = fs::read_to_string(&script) else {
            continue;
        };

        let shapes = extract_shapes(&source);

        if let Some(mapped) = mapped_shape.as_deref() {
            if let Some(shape) = shapes.iter().find(|s| s.name == mapped) {
                if let Some(found) = shape.property(property) {
                    return location(&script, &source, found.offset, property.len());
                }
                if fallback.is_none() {
                    fallback = location(&script, &source, shape.offset, mapped.len());
                }
            }
        }

        if let Some(found) = shapes.iter().find_map(|s| s.property(property)) {
            return location(&script, &source, found.offset, property.len());
        }

        if let Some(found) = extract_typedef_shapes(&source)
            .iter()
            .find_map(|s| s.property(property).cloned())
        {
            return location(&script, &source, found.offset, property.len());
        }
    }

    fallback
}

/// `{{> name param=value}}` — resolves the included template's declaration
/// or one of its parameters.
#[allow(clippy::too_many_arguments)]
fn inclusion_definition(
    text: &str,
    word: &str,
    rest: &str,
    path: &Path,
    dir: &Path,
    base: &str,
    declared: &[String],
    table: &AnalysisTable,
    resolver: &ImportResolver,
) -> Option<Vec<Location>> {
    let included = rest.split_whitespace().next()?;

    if word == included {
        return template_declaration_site(text, word, path, dir, base, declared, resolver)
            .map(|location| vec![location]);
    }

    // Cursor on a parameter: resolve it inside the included template.
    let (target_path, target_text) =
        template_markup_file(text, included, path, dir, base, declared, resolver)?;
    let target_dir = target_path.parent()?;
    let target_base = target_path.file_stem()?.to_str()?;
    let target_declared: Vec<String> = declared_templates(&target_text)
        .into_iter()
        .map(|d| d.name)
        .collect();
    let target_key = TableKey::new(target_dir, included);

    if let Some(found) = property_definition(
        target_dir,
        target_base,
        &target_declared,
        &target_key,
        word,
        table,
    ) {
        return Some(vec![found]);
    }

    // Last resort: the parameter's usage inside the template's own markup.
    let usage = find_declaration(&target_text, word)
        .or_else(|| target_text.find(&format!("{{{{{word}}}}}")).map(|at| at + 2))?;
    location(&target_path, &target_text, usage, word.len()).map(|l| vec![l])
}

fn template_declaration_site(
    text: &str,
    name: &str,
    path: &Path,
    dir: &Path,
    base: &str,
    declared: &[String],
    resolver: &ImportResolver,
) -> Option<Location> {
    if let Some(declaration) = declared_templates(text).into_iter().find(|d| d.name == name) {
        return location(path, text, declaration.offset, 0);
    }

    let (target_path, target_text) =
        template_markup_file(text, name, path, dir, base, declared, resolver)?;
    let declaration = declared_templates(&target_text)
        .into_iter()
        .find(|d| d.name == name)?;
    location(&target_path, &target_text, declaration.offset, 0)
}

/// Locates the markup file declaring `name`, following the companion
/// scripts' imports when the current document does not declare it.
#[allow(clippy::too_many_arguments)]
fn template_markup_file(
    text: &str,
    name: &str,
    path: &Path,
    dir: &Path,
    base: &str,
    declared: &[String],
    resolver: &ImportResolver,
) -> Option<(PathBuf, String)> {
    if declared_templates(text).iter().any(|d| d.name == name) {
        return Some((path.to_path_buf(), text.to_string()));
    }

    for script in companion_scripts(dir, base, declared) {
        let Ok(source) = fs::read_to_string(&script) else {
            continue;
        };
        for statement in import_statements(&source) {
            let Some(resolved) = resolver.resolve(dir, &statement.specifier) else {
                continue;
            };

            let mut candidates: Vec<PathBuf> = Vec::new();
            if resolved.extension().is_some_and(|e| e == "html") {
                candidates.push(resolved.clone());
            }
            if let Some(parent) = resolved.parent() {
                candidates.push(parent.join(format!("{name}.html")));
            }

            for candidate in candidates {
                let Ok(markup) = fs::read_to_string(&candidate) else {
                    continue;
                };
                if declared_templates(&markup).iter().any(|d| d.name == name) {
                    return Some((candidate, markup));
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn line_of(location: &Location) -> u32 {
        location.range.start.line
    }

    #[test]
    fn test_helper_definition_in_companion() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cart.js"),
            "// helpers\nTemplate.cart.helpers({\n  total() {\n    return 0;\n  },\n});",
        )
        .unwrap();
        let table = AnalysisTable::new();
        table.set_helpers(
            TableKey::new(dir.path(), "cart"),
            vec![bls_analysis::HelperDescriptor {
                name: "total".to_string(),
                ..bls_analysis::HelperDescriptor::default()
            }],
        );

        let text = r#"<template name="cart">{{total}}</template>"#;
        let locations = definition(
            text,
            text.find("total").unwrap() + 2,
            &dir.path().join("cart.html"),
            &table,
            &ImportResolver::with_root(None),
        )
        .unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(line_of(&locations[0]), 2);
    }

    #[test]
    fn test_property_definition_in_shape() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cart.ts"),
            "interface CartData {\n  items: string[];\n}\ninterface TemplatesData { cart: CartData; }",
        )
        .unwrap();
        let table = AnalysisTable::new();
        table.set_shape_name(TableKey::new(dir.path(), "cart"), "CartData".to_string());

        let text = r#"<template name="cart">{{items}}</template>"#;
        let locations = definition(
            text,
            text.find("items").unwrap() + 1,
            &dir.path().join("cart.html"),
            &table,
            &ImportResolver::with_root(None),
        )
        .unwrap();
        assert_eq!(line_of(&locations[0]), 1);
    }

    #[test]
    fn test_alias_redirects_to_source() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cart.ts"),
            "interface CartData {\n  boxes: Box[];\n}\ninterface TemplatesData { cart: CartData; }",
        )
        .unwrap();
        let table = AnalysisTable::new();
        table.set_shape_name(TableKey::new(dir.path(), "cart"), "CartData".to_string());

        let text =
            r#"<template name="cart">{{#each box in boxes}}{{box}}{{/each}}</template>"#;
        let locations = definition(
            text,
            text.find("{{box}}").unwrap() + 3,
            &dir.path().join("cart.html"),
            &table,
            &ImportResolver::with_root(None),
        )
        .unwrap();
        // Lands on `boxes` in the shape, not on the alias itself.
        assert_eq!(line_of(&locations[0]), 1);
    }

    #[test]
    fn test_alias_source_prefers_helper() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cart.js"),
            "Template.cart.helpers({\n  boxes() {\n    return [];\n  },\n});",
        )
        .unwrap();
        let table = AnalysisTable::new();

        let text =
            r#"<template name="cart">{{#each box in boxes}}{{box}}{{/each}}</template>"#;
        let locations = definition(
            text,
            text.find("{{box}}").unwrap() + 3,
            &dir.path().join("cart.html"),
            &table,
            &ImportResolver::with_root(None),
        )
        .unwrap();
        assert_eq!(line_of(&locations[0]), 1);
    }

    #[test]
    fn test_inclusion_resolves_same_file_declaration() {
        let dir = tempdir().unwrap();
        let text = "<template name=\"row\">x</template>\n<template name=\"cart\">{{> row}}</template>";
        let locations = definition(
            text,
            text.rfind("row").unwrap() + 1,
            &dir.path().join("cart.html"),
            &AnalysisTable::new(),
            &ImportResolver::with_root(None),
        )
        .unwrap();
        assert_eq!(line_of(&locations[0]), 0);
    }

    #[test]
    fn test_inclusion_follows_companion_import() {
        let dir = tempdir().unwrap();
        let ui = dir.path().join("ui");
        fs::create_dir_all(&ui).unwrap();
        fs::write(
            ui.join("row.html"),
            "<template name=\"row\">{{qty}}</template>",
        )
        .unwrap();
        fs::write(dir.path().join("cart.js"), "import './ui/row.html';").unwrap();

        let text = r#"<template name="cart">{{> row}}</template>"#;
        let locations = definition(
            text,
            text.rfind("row").unwrap() + 1,
            &dir.path().join("cart.html"),
            &AnalysisTable::new(),
            &ImportResolver::with_root(None),
        )
        .unwrap();
        assert!(locations[0].uri.as_str().ends_with("row.html"));
    }

    #[test]
    fn test_inclusion_parameter_resolves_in_target_markup() {
        let dir = tempdir().unwrap();
        let ui = dir.path().join("ui");
        fs::create_dir_all(&ui).unwrap();
        fs::write(
            ui.join("row.html"),
            "<template name=\"row\">{{qty}}</template>",
        )
        .unwrap();
        fs::write(dir.path().join("cart.js"), "import './ui/row.html';").unwrap();

        let text = r#"<template name="cart">{{> row qty=3}}</template>"#;
        let locations = definition(
            text,
            text.find("qty").unwrap() + 1,
            &dir.path().join("cart.html"),
            &AnalysisTable::new(),
            &ImportResolver::with_root(None),
        )
        .unwrap();
        assert!(locations[0].uri.as_str().ends_with("row.html"));
    }

    #[test]
    fn test_unresolved_identifier_is_none() {
        let dir = tempdir().unwrap();
        let text = r#"<template name="cart">{{mystery}}</template>"#;
        assert!(definition(
            text,
            text.find("mystery").unwrap() + 2,
            &dir.path().join("cart.html"),
            &AnalysisTable::new(),
            &ImportResolver::with_root(None),
        )
        .is_none());
    }
}
