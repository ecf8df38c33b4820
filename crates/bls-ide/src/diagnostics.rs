//! Structural template diagnostics.
//!
//! Three families: unmatched block tags, HTML tags crossing a template
//! block's boundary, and duplicate parameters in a template inclusion.
//! Every diagnostic carries a stable code so clients can filter or remap
//! severity.

use bls_source::LineIndex;
use bls_source::Span;
use bls_templates::comment_at;
use bls_templates::scan_all_blocks;
use bls_templates::BlockKind;
use bls_templates::BlockOccurrence;
use bls_templates::BlockSpecs;
use tower_lsp_server::ls_types::Diagnostic;
use tower_lsp_server::ls_types::DiagnosticSeverity;
use tower_lsp_server::ls_types::NumberOrString;

use crate::SOURCE_NAME;

const MISSING_CLOSE: &str = "B001";
const CLOSE_WITHOUT_OPEN: &str = "B002";
const CROSS_BOUNDARY: &str = "B003";
const DUPLICATE_PARAMETER: &str = "B004";

/// Validates one document, producing publishable diagnostics.
#[must_use]
pub fn validate(text: &str, index: &LineIndex, specs: &BlockSpecs) -> Vec<Diagnostic> {
    let occurrences: Vec<BlockOccurrence> = scan_all_blocks(text)
        .into_iter()
        .filter(|occ| comment_at(text, occ.offset).is_none())
        .collect();

    let mut diagnostics = Vec::new();
    let pairs = match_blocks(&occurrences, index, specs, &mut diagnostics);
    check_cross_boundary(text, index, &pairs, &mut diagnostics);
    check_inclusion_parameters(text, index, &mut diagnostics);

    diagnostics.sort_by_key(|d| (d.range.start.line, d.range.start.character));
    diagnostics
}

/// A matched open/close pair, by body byte range.
struct BlockPair {
    body_start: usize,
    body_end: usize,
}

fn match_blocks(
    occurrences: &[BlockOccurrence],
    index: &LineIndex,
    specs: &BlockSpecs,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<BlockPair> {
    let mut stack: Vec<&BlockOccurrence> = Vec::new();
    let mut pairs = Vec::new();

    for occ in occurrences {
        match occ.kind {
            BlockKind::Open => stack.push(occ),
            BlockKind::Close => {
                let matching = stack.iter().rposition(|open| open.name == occ.name);
                if let Some(position) = matching {
                    // Anything opened above the match is unclosed.
                    for unclosed in stack.drain(position + 1..) {
                        push_missing_close(unclosed, index, specs, diagnostics);
                    }
                    let open = stack.pop().expect("matched position");
                    pairs.push(BlockPair {
                        body_start: open.end(),
                        body_end: occ.offset,
                    });
                } else {
                    let suggestion = stack
                        .last()
                        .map(|open| format!(" Did you mean {{{{/{}}}}}?", open.name))
                        .unwrap_or_default();
                    diagnostics.push(diagnostic(
                        occ,
                        index,
                        CLOSE_WITHOUT_OPEN,
                        DiagnosticSeverity::ERROR,
                        format!(
                            "Closing tag {{{{/{}}}}} has no matching opening tag.{suggestion}",
                            occ.name
                        ),
                    ));
                }
            }
        }
    }

    for unclosed in stack {
        push_missing_close(unclosed, index, specs, diagnostics);
    }

    pairs
}

fn push_missing_close(
    open: &BlockOccurrence,
    index: &LineIndex,
    specs: &BlockSpecs,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if !specs.requires_close(&open.name) {
        return;
    }
    diagnostics.push(diagnostic(
        open,
        index,
        MISSING_CLOSE,
        DiagnosticSeverity::ERROR,
        format!("Missing closing tag {{{{/{}}}}}", open.name),
    ));
}

fn diagnostic(
    occ: &BlockOccurrence,
    index: &LineIndex,
    code: &str,
    severity: DiagnosticSeverity,
    message: String,
) -> Diagnostic {
    span_diagnostic(
        Span::from_bounds(occ.offset, occ.end()),
        index,
        code,
        severity,
        message,
    )
}

fn span_diagnostic(
    span: Span,
    index: &LineIndex,
    code: &str,
    severity: DiagnosticSeverity,
    message: String,
) -> Diagnostic {
    Diagnostic {
        range: span.to_lsp_range(index),
        severity: Some(severity),
        code: Some(NumberOrString::String(code.to_string())),
        source: Some(SOURCE_NAME.to_string()),
        message,
        ..Diagnostic::default()
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

struct HtmlTag {
    name: String,
    offset: usize,
    length: usize,
    closing: bool,
}

fn scan_html_tags(text: &str) -> Vec<HtmlTag> {
    let mut tags = Vec::new();
    let mut cursor = 0usize;

    while let Some(rel) = text[cursor..].find('<') {
        let at = cursor + rel;
        if comment_at(text, at + 1).is_some() {
            cursor = at + 1;
            continue;
        }
        let rest = &text[at + 1..];
        let (closing, name_start) = if rest.starts_with('/') {
            (true, at + 2)
        } else {
            (false, at + 1)
        };

        let name: String = text[name_start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        if name.is_empty() || !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            cursor = at + 1;
            continue;
        }

        let Some(end_rel) = text[at..].find('>') else {
            break;
        };
        let tag_end = at + end_rel + 1;
        let self_closing = text[at..tag_end].ends_with("/>");

        if !self_closing && !VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
            tags.push(HtmlTag {
                name,
                offset: at,
                length: tag_end - at,
                closing,
            });
        }

        cursor = tag_end;
    }

    tags
}

/// Flags HTML elements with exactly one end inside a template block's body:
/// the element can never be well formed in both rendered branches.
fn check_cross_boundary(
    text: &str,
    index: &LineIndex,
    pairs: &[BlockPair],
    diagnostics: &mut Vec<Diagnostic>,
) {
    let tags = scan_html_tags(text);
    let mut stack: Vec<&HtmlTag> = Vec::new();
    let mut element_pairs: Vec<(&HtmlTag, &HtmlTag)> = Vec::new();

    for tag in &tags {
        if tag.closing {
            if let Some(position) = stack.iter().rposition(|open| open.name == tag.name) {
                element_pairs.push((stack[position], tag));
                stack.truncate(position);
            }
        } else {
            stack.push(tag);
        }
    }

    for (open, close) in element_pairs {
        for pair in pairs {
            let open_inside = open.offset >= pair.body_start && open.offset < pair.body_end;
            let close_inside = close.offset >= pair.body_start && close.offset < pair.body_end;
            if open_inside != close_inside {
                let crossing = if open_inside { open } else { close };
                diagnostics.push(span_diagnostic(
                    Span::from_bounds(crossing.offset, crossing.offset + crossing.length),
                    index,
                    CROSS_BOUNDARY,
                    DiagnosticSeverity::WARNING,
                    format!(
                        "<{}> element crosses a template block boundary",
                        open.name
                    ),
                ));
                break;
            }
        }
    }
}

/// `{{> name a=1 a=2}}` — every parameter name may appear once.
fn check_inclusion_parameters(text: &str, index: &LineIndex, diagnostics: &mut Vec<Diagnostic>) {
    let mut cursor = 0usize;

    while let Some(rel) = text[cursor..].find("{{>") {
        let open = cursor + rel;
        let Some(close_rel) = text[open..].find("}}") else {
            break;
        };
        let close = open + close_rel;
        cursor = close + 2;

        if comment_at(text, open).is_some() {
            continue;
        }

        let content = &text[open + 3..close];
        let mut seen: Vec<&str> = Vec::new();
        let mut word_start = open + 3;

        for segment in content.split_whitespace() {
            let at = text[word_start..close]
                .find(segment)
                .map(|rel| word_start + rel)
                .unwrap_or(word_start);
            word_start = at + segment.len();

            let Some((name, _)) = segment.split_once('=') else {
                continue;
            };
            if seen.contains(&name) {
                diagnostics.push(span_diagnostic(
                    Span::from_bounds(at, at + name.len()),
                    index,
                    DUPLICATE_PARAMETER,
                    DiagnosticSeverity::WARNING,
                    format!("Duplicate parameter '{name}' in template inclusion"),
                ));
            } else {
                seen.push(name);
            }
        }
    }
}
