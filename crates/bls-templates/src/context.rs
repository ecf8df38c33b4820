//! Enclosing-block queries for a cursor offset.
//!
//! Completion and hover scope their suggestions to the innermost `#each`
//! or conditional block around the cursor. Results are computed per query
//! from the raw text; nothing is cached.

use crate::blocks::scan_all_blocks;
use crate::blocks::BlockKind;
use crate::blocks::BlockOccurrence;
use crate::blocks::ConditionalKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EachContext {
    pub alias: String,
    pub source: String,
    pub open_offset: usize,
}

/// Innermost `{{#each alias in source}}` block containing `offset`.
///
/// The offset counts as inside when it falls within the opening tag itself
/// or anywhere between the tag's end and the depth-matched `{{/each}}`. An
/// unclosed block extends to the end of the text, which keeps alias
/// completion alive while the user is still typing the body.
#[must_use]
pub fn find_enclosing_each(text: &str, offset: usize) -> Option<EachContext> {
    let occurrences = scan_all_blocks(text);
    let mut innermost: Option<EachContext> = None;

    for (index, occ) in occurrences.iter().enumerate() {
        if occ.kind != BlockKind::Open || occ.name != "each" {
            continue;
        }
        let Some((alias, source)) = parse_each_args(occ.args.as_deref()) else {
            continue;
        };

        let close_start = matching_close_start(&occurrences, index).unwrap_or(text.len());
        let inside_tag = offset >= occ.offset && offset <= occ.end();
        let inside_body = offset > occ.end() && offset < close_start;

        if inside_tag || inside_body {
            // Document order means a later candidate is the inner one.
            innermost = Some(EachContext {
                alias: alias.to_string(),
                source: source.to_string(),
                open_offset: occ.offset,
            });
        }
    }

    innermost
}

fn parse_each_args(args: Option<&str>) -> Option<(&str, &str)> {
    let mut parts = args?.split_whitespace();
    let alias = parts.next()?;
    if parts.next()? != "in" {
        return None;
    }
    let source = parts.next()?;
    Some((alias, source))
}

fn matching_close_start(occurrences: &[BlockOccurrence], open_index: usize) -> Option<usize> {
    let name = &occurrences[open_index].name;
    let mut depth = 1usize;

    for occ in &occurrences[open_index + 1..] {
        if occ.name != *name {
            continue;
        }
        match occ.kind {
            BlockKind::Open => depth += 1,
            BlockKind::Close => {
                depth -= 1;
                if depth == 0 {
                    return Some(occ.offset);
                }
            }
        }
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalContext {
    pub is_inside: bool,
    pub block_type: Option<ConditionalKind>,
}

/// Innermost `#if`/`#unless` body containing `offset`.
///
/// Unlike the each finder, the tag delimiters themselves do not count:
/// containment holds only strictly between the opening tag's end and the
/// closing tag's start.
#[must_use]
pub fn find_enclosing_conditional(text: &str, offset: usize) -> ConditionalContext {
    let occurrences = scan_all_blocks(text);
    let mut innermost: Option<(usize, ConditionalKind)> = None;

    for (index, occ) in occurrences.iter().enumerate() {
        if occ.kind != BlockKind::Open {
            continue;
        }
        let kind = match occ.name.as_str() {
            "if" => ConditionalKind::If,
            "unless" => ConditionalKind::Unless,
            _ => continue,
        };

        let Some(close_start) = matching_close_start(&occurrences, index) else {
            continue;
        };

        if offset >= occ.end() && offset < close_start {
            match innermost {
                Some((open, _)) if open > occ.offset => {}
                _ => innermost = Some((occ.offset, kind)),
            }
        }
    }

    ConditionalContext {
        is_inside: innermost.is_some(),
        block_type: innermost.map(|(_, kind)| kind),
    }
}
