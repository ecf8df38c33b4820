//! Hover content for template identifiers.

use std::path::Path;

use bls_analysis::AnalysisTable;
use bls_analysis::HelperDescriptor;
use bls_analysis::TableKey;
use bls_templates::enclosing_template;
use bls_templates::expression_at;
use bls_templates::find_enclosing_each;
use bls_templates::BlockSpecs;
use tower_lsp_server::ls_types::Hover;
use tower_lsp_server::ls_types::HoverContents;
use tower_lsp_server::ls_types::MarkupContent;
use tower_lsp_server::ls_types::MarkupKind;

use crate::words::word_at;

/// Hover information at the cursor, markdown-formatted, or `None` when the
/// identifier resolves to nothing.
#[must_use]
pub fn hover(
    text: &str,
    offset: usize,
    dir: &Path,
    base: &str,
    table: &AnalysisTable,
    specs: &BlockSpecs,
) -> Option<Hover> {
    let expression = expression_at(text, offset)?;
    let (range, word) = word_at(text, offset)?;

    let content = expression.content(text);
    let is_block_name = content.starts_with(['#', '/'])
        && range.start == expression.start + 1;

    if is_block_name {
        return block_hover(word, specs);
    }

    let template = enclosing_template(text, offset).map(|d| d.name);
    let key = TableKey::new(dir, template.as_deref().unwrap_or(base));

    if let Some(helper) = table
        .helper(&key, word)
        .or_else(|| table.global_helpers(dir).into_iter().find(|h| h.name == word))
    {
        return Some(markdown(helper_markdown(&helper)));
    }

    if let Some(each) = find_enclosing_each(text, offset) {
        if each.alias == word {
            return Some(markdown(alias_markdown(&each.alias, &each.source, &key, table)));
        }
    }

    if let Some(type_text) = table.property_type(&key, word) {
        return Some(markdown(format!("**{word}**: `{type_text}`")));
    }

    None
}

fn block_hover(name: &str, specs: &BlockSpecs) -> Option<Hover> {
    let spec = specs.get(name)?;
    let mut lines = vec![format!("**#{name}**")];
    if let Some(doc) = &spec.doc {
        lines.push(String::new());
        lines.push(doc.clone());
    }
    if let Some(usage) = &spec.usage {
        lines.push(String::new());
        lines.push(format!("```spacebars\n{usage}\n```"));
    }
    Some(markdown(lines.join("\n")))
}

fn helper_markdown(helper: &HelperDescriptor) -> String {
    let mut lines = Vec::new();
    if let Some(signature) = &helper.signature {
        let return_suffix = helper
            .return_type
            .as_deref()
            .map(|r| format!(": {r}"))
            .unwrap_or_default();
        lines.push(format!("```js\n{signature}{return_suffix}\n```"));
    } else {
        lines.push(format!("**{}**", helper.name));
    }
    if let Some(doc) = &helper.doc {
        lines.push(String::new());
        lines.push(doc.clone());
    }
    lines.join("\n")
}

/// An alias stands for one element of the iterated collection; strip one
/// level of array-ness off the source's declared type when it is known.
fn alias_markdown(alias: &str, source: &str, key: &TableKey, table: &AnalysisTable) -> String {
    let element = table
        .property_type(key, source)
        .map(|collection| element_type(&collection))
        .unwrap_or_else(|| "unknown".to_string());
    format!("**{alias}**: `{element}` (element of `{source}`)")
}

fn element_type(collection: &str) -> String {
    let trimmed = collection.trim();
    if let Some(inner) = trimmed.strip_suffix("[]") {
        return inner.trim().to_string();
    }
    for wrapper in ["Array<", "Mongo.Cursor<"] {
        if let Some(rest) = trimmed.strip_prefix(wrapper) {
            if let Some(inner) = rest.strip_suffix('>') {
                return inner.trim().to_string();
            }
        }
    }
    trimmed.to_string()
}

fn markdown(value: String) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn hover_value(hover: &Hover) -> &str {
        match &hover.contents {
            HoverContents::Markup(markup) => &markup.value,
            _ => panic!("expected markup"),
        }
    }

    #[test]
    fn test_builtin_block_hover_has_usage() {
        let text = "{{#each box in boxes}}{{/each}}";
        let result = hover(
            text,
            text.find("each").unwrap() + 1,
            Path::new("/app"),
            "t",
            &AnalysisTable::new(),
            &BlockSpecs::builtin(),
        )
        .unwrap();
        let value = hover_value(&result);
        assert!(value.contains("**#each**"));
        assert!(value.contains("{{#each item in items}}"));
    }

    #[test]
    fn test_helper_hover_signature_and_doc() {
        let dir = Path::new("/app");
        let table = AnalysisTable::new();
        table.set_helpers(
            TableKey::new(dir, "cart"),
            vec![HelperDescriptor {
                name: "total".to_string(),
                signature: Some("total(discount)".to_string()),
                return_type: Some("number".to_string()),
                doc: Some("Sum of all line items.".to_string()),
                parameters: Some("discount".to_string()),
            }],
        );
        let text = r#"<template name="cart">{{total}}</template>"#;
        let result = hover(
            text,
            text.find("total").unwrap() + 2,
            dir,
            "cart",
            &table,
            &BlockSpecs::builtin(),
        )
        .unwrap();
        let value = hover_value(&result);
        assert!(value.contains("total(discount): number"));
        assert!(value.contains("Sum of all line items."));
    }

    #[test]
    fn test_property_hover_shows_type() {
        let dir = Path::new("/app");
        let table = AnalysisTable::new();
        table.set_properties(
            TableKey::new(dir, "cart"),
            HashMap::from([("items".to_string(), "string[]".to_string())]),
        );
        let text = r#"<template name="cart">{{items}}</template>"#;
        let result = hover(
            text,
            text.find("items").unwrap() + 1,
            dir,
            "cart",
            &table,
            &BlockSpecs::builtin(),
        )
        .unwrap();
        assert!(hover_value(&result).contains("`string[]`"));
    }

    #[test]
    fn test_alias_hover_derives_element_type() {
        let dir = Path::new("/app");
        let table = AnalysisTable::new();
        table.set_properties(
            TableKey::new(dir, "cart"),
            HashMap::from([("boxes".to_string(), "Box[]".to_string())]),
        );
        let text = r#"<template name="cart">{{#each box in boxes}}{{box}}{{/each}}</template>"#;
        let result = hover(
            text,
            text.find("{{box}}").unwrap() + 3,
            dir,
            "cart",
            &table,
            &BlockSpecs::builtin(),
        )
        .unwrap();
        assert!(hover_value(&result).contains("`Box`"));
    }

    #[test]
    fn test_unknown_identifier_is_none() {
        let text = r#"<template name="cart">{{mystery}}</template>"#;
        assert!(hover(
            text,
            text.find("mystery").unwrap() + 2,
            Path::new("/app"),
            "cart",
            &AnalysisTable::new(),
            &BlockSpecs::builtin(),
        )
        .is_none());
    }

    #[test]
    fn test_outside_expression_is_none() {
        let text = "plain text";
        assert!(hover(
            text,
            2,
            Path::new("/app"),
            "t",
            &AnalysisTable::new(),
            &BlockSpecs::builtin(),
        )
        .is_none());
    }

    #[test]
    fn test_element_type_wrappers() {
        assert_eq!(element_type("Box[]"), "Box");
        assert_eq!(element_type("Array<Item>"), "Item");
        assert_eq!(element_type("Mongo.Cursor<Order>"), "Order");
        assert_eq!(element_type("number"), "number");
    }
}
