//! Context-aware completion.
//!
//! The cursor context decides the pool: block keywords after `{{#`, close
//! candidates after `{{/`, template names and parameters after `{{>`,
//! otherwise helpers, data properties, and scope-introduced names. Outside
//! expressions, `class=` attribute values complete style selectors.

use std::path::Path;

use bls_analysis::AnalysisTable;
use bls_analysis::HelperDescriptor;
use bls_analysis::TableKey;
use bls_templates::declared_templates;
use bls_templates::enclosing_template;
use bls_templates::find_enclosing_conditional;
use bls_templates::find_enclosing_each;
use bls_templates::scan_all_blocks;
use bls_templates::BlockKind;
use bls_templates::BlockSpecs;
use tower_lsp_server::ls_types::CompletionItem;
use tower_lsp_server::ls_types::CompletionItemKind;
use tower_lsp_server::ls_types::Documentation;

/// Completion items for the given cursor position.
#[must_use]
pub fn completion_items(
    text: &str,
    offset: usize,
    dir: &Path,
    base: &str,
    table: &AnalysisTable,
    specs: &BlockSpecs,
) -> Vec<CompletionItem> {
    let template = enclosing_template(text, offset).map(|d| d.name);
    let key = TableKey::new(dir, template.as_deref().unwrap_or(base));

    if let Some(prefix) = open_expression_prefix(text, offset) {
        return expression_completions(text, offset, prefix, dir, &key, table, specs);
    }

    if within_class_attribute(text, offset) {
        return table
            .selectors(&key)
            .into_iter()
            .map(|selector| CompletionItem {
                label: selector,
                kind: Some(CompletionItemKind::VALUE),
                ..CompletionItem::default()
            })
            .collect();
    }

    Vec::new()
}

/// Content between the nearest unclosed `{{` and the cursor, if the cursor
/// sits in a still-open expression. This is deliberately laxer than the
/// boundary finder: completion mostly runs before `}}` has been typed.
fn open_expression_prefix(text: &str, offset: usize) -> Option<&str> {
    let clipped = &text[..offset.min(text.len())];
    let open = clipped.rfind("{{")?;
    let content = &clipped[open + 2..];
    (!content.contains("}}")).then_some(content)
}

fn expression_completions(
    text: &str,
    offset: usize,
    prefix: &str,
    dir: &Path,
    key: &TableKey,
    table: &AnalysisTable,
    specs: &BlockSpecs,
) -> Vec<CompletionItem> {
    if prefix.starts_with('!') {
        return Vec::new();
    }
    if prefix.starts_with('#') {
        return block_keyword_completions(specs);
    }
    if prefix.starts_with('/') {
        return close_tag_completions(text, offset);
    }
    if let Some(rest) = prefix.strip_prefix('>') {
        return inclusion_completions(text, rest, dir, table);
    }

    let mut items = Vec::new();

    for helper in table
        .helper_descriptors(key)
        .into_iter()
        .chain(table.global_helpers(dir))
    {
        items.push(helper_item(&helper));
    }

    for property in table.property_names(key) {
        let detail = table.property_type(key, &property);
        items.push(CompletionItem {
            label: property,
            kind: Some(CompletionItemKind::FIELD),
            detail,
            ..CompletionItem::default()
        });
    }

    if let Some(each) = find_enclosing_each(text, offset) {
        items.push(CompletionItem {
            label: each.alias,
            kind: Some(CompletionItemKind::VARIABLE),
            detail: Some(format!("element of {}", each.source)),
            ..CompletionItem::default()
        });
    }

    if find_enclosing_conditional(text, offset).is_inside {
        items.push(CompletionItem {
            label: "else".to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            ..CompletionItem::default()
        });
    }

    items.extend(custom_block_properties(text, offset, specs));

    items
}

fn block_keyword_completions(specs: &BlockSpecs) -> Vec<CompletionItem> {
    let mut items: Vec<CompletionItem> = specs
        .iter()
        .map(|spec| CompletionItem {
            label: spec.name.clone(),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: spec.usage.clone(),
            documentation: spec.doc.clone().map(Documentation::String),
            ..CompletionItem::default()
        })
        .collect();
    items.sort_by(|a, b| a.label.cmp(&b.label));
    items
}

/// After `{{/` the only sensible completions are the blocks still open at
/// the cursor, innermost first.
fn close_tag_completions(text: &str, offset: usize) -> Vec<CompletionItem> {
    let before = &text[..offset.min(text.len())];
    let mut stack: Vec<String> = Vec::new();

    for occ in scan_all_blocks(before) {
        match occ.kind {
            BlockKind::Open => stack.push(occ.name),
            BlockKind::Close => {
                if let Some(position) = stack.iter().rposition(|name| *name == occ.name) {
                    stack.truncate(position);
                }
            }
        }
    }

    stack
        .into_iter()
        .rev()
        .map(|name| CompletionItem {
            label: name,
            kind: Some(CompletionItemKind::KEYWORD),
            ..CompletionItem::default()
        })
        .collect()
}

fn inclusion_completions(
    text: &str,
    rest: &str,
    dir: &Path,
    table: &AnalysisTable,
) -> Vec<CompletionItem> {
    let mut words = rest.split_whitespace();
    let included = words.next();

    // `{{> name |` — the template is chosen, offer its parameters.
    if let Some(name) = included {
        if rest.trim_end() != rest || words.next().is_some() {
            let key = TableKey::new(dir, name);
            return table
                .property_names(&key)
                .into_iter()
                .map(|property| CompletionItem {
                    label: format!("{property}="),
                    kind: Some(CompletionItemKind::FIELD),
                    detail: table.property_type(&key, &property),
                    ..CompletionItem::default()
                })
                .collect();
        }
    }

    declared_templates(text)
        .into_iter()
        .map(|declaration| CompletionItem {
            label: declaration.name,
            kind: Some(CompletionItemKind::MODULE),
            ..CompletionItem::default()
        })
        .collect()
}

fn custom_block_properties(
    text: &str,
    offset: usize,
    specs: &BlockSpecs,
) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    for spec in specs.iter().filter(|s| !s.properties.is_empty()) {
        if !inside_block(text, offset, &spec.name) {
            continue;
        }
        for property in &spec.properties {
            items.push(CompletionItem {
                label: property.clone(),
                kind: Some(CompletionItemKind::PROPERTY),
                detail: Some(format!("{} block property", spec.name)),
                ..CompletionItem::default()
            });
        }
    }

    items
}

fn inside_block(text: &str, offset: usize, name: &str) -> bool {
    let mut depth = 0usize;
    for occ in scan_all_blocks(text) {
        if occ.name != name {
            continue;
        }
        if occ.offset >= offset {
            break;
        }
        match occ.kind {
            BlockKind::Open => depth += 1,
            BlockKind::Close => depth = depth.saturating_sub(1),
        }
    }
    depth > 0
}

fn helper_item(helper: &HelperDescriptor) -> CompletionItem {
    CompletionItem {
        label: helper.name.clone(),
        kind: Some(CompletionItemKind::FUNCTION),
        detail: helper.signature.clone(),
        documentation: helper.doc.clone().map(Documentation::String),
        ..CompletionItem::default()
    }
}

fn within_class_attribute(text: &str, offset: usize) -> bool {
    let before = &text[..offset.min(text.len())];
    let Some(at) = before.rfind("class=") else {
        return false;
    };
    let value = &before[at + "class=".len()..];
    let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return false;
    };
    !value[1..].contains(quote)
}
