//! Block tag scanning and open/close matching.
//!
//! Block tags look like `{{#name args}}` and `{{/name}}`. Matching walks
//! occurrence lists with a depth counter instead of parsing, which keeps it
//! correct for arbitrarily nested same-named blocks and tolerant of text
//! that is not well formed yet.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOccurrence {
    pub kind: BlockKind,
    pub name: String,
    pub args: Option<String>,
    /// Offset of the opening `{{`.
    pub offset: usize,
    /// Length through the closing `}}`.
    pub length: usize,
}

impl BlockOccurrence {
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Scans `text` for every block open/close tag, in document order.
///
/// Unterminated tags are skipped; they belong to the expression scanner's
/// error handling, not the matcher's.
#[must_use]
pub fn scan_all_blocks(text: &str) -> Vec<BlockOccurrence> {
    let mut occurrences = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find("{{") {
        let open_at = cursor + rel;
        let after = &text[open_at + 2..];

        let kind = match after.chars().next() {
            Some('#') => BlockKind::Open,
            Some('/') => BlockKind::Close,
            _ => {
                cursor = open_at + 2;
                continue;
            }
        };

        let Some(close_rel) = after.find("}}") else {
            break;
        };
        let content = &after[1..close_rel];
        let mut parts = content.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().trim();
        let args = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        if !name.is_empty() {
            occurrences.push(BlockOccurrence {
                kind,
                name: name.to_string(),
                args,
                offset: open_at,
                length: close_rel + 4,
            });
        }

        cursor = open_at + 2 + close_rel + 2;
    }

    occurrences
}

/// Occurrences of a single block name, in document order.
#[must_use]
pub fn scan_blocks(text: &str, name: &str) -> Vec<BlockOccurrence> {
    scan_all_blocks(text)
        .into_iter()
        .filter(|occ| occ.name == name)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedOpen {
    pub condition: String,
    pub offset: usize,
}

/// Finds the opening tag matched by a closing tag that sits immediately
/// after `text_before_close`.
///
/// Walks the occurrences in reverse with a depth counter: every close seen
/// on the way back increments depth, and an open either cancels one of those
/// closes or, at depth zero, is the match.
#[must_use]
pub fn find_matching_open(text_before_close: &str, name: &str) -> Option<MatchedOpen> {
    let occurrences = scan_blocks(text_before_close, name);
    let mut depth = 0usize;

    for occ in occurrences.iter().rev() {
        match occ.kind {
            BlockKind::Close => depth += 1,
            BlockKind::Open => {
                if depth > 0 {
                    depth -= 1;
                } else {
                    return Some(MatchedOpen {
                        condition: occ.args.clone().unwrap_or_default(),
                        offset: occ.offset,
                    });
                }
            }
        }
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalKind {
    If,
    Unless,
}

impl ConditionalKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ConditionalKind::If => "if",
            ConditionalKind::Unless => "unless",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub kind: ConditionalKind,
    pub condition: String,
}

/// Finds the conditional block an `{{else}}` at `else_offset` belongs to.
///
/// Builds the chronological open/close sequence of `if`/`unless` tags up to
/// the else marker and reduces it with a stack; the innermost still-open
/// entry is the owner.
#[must_use]
pub fn find_enclosing_branch(text: &str, else_offset: usize) -> Option<Branch> {
    let clipped = &text[..else_offset.min(text.len())];
    let mut stack: Vec<Branch> = Vec::new();

    for occ in scan_all_blocks(clipped) {
        let kind = match occ.name.as_str() {
            "if" => ConditionalKind::If,
            "unless" => ConditionalKind::Unless,
            _ => continue,
        };

        match occ.kind {
            BlockKind::Open => stack.push(Branch {
                kind,
                condition: occ.args.unwrap_or_default(),
            }),
            BlockKind::Close => {
                stack.pop();
            }
        }
    }

    stack.pop()
}
