//! Commented-region detection.
//!
//! Downstream scanners ask whether an offset is commented out before they
//! act on it, so the answer has to be right even when the comment body
//! contains expression-like text.

const HTML_OPEN: &str = "<!--";
const HTML_CLOSE: &str = "-->";
const BLOCK_OPEN: &str = "{{!--";
const BLOCK_CLOSE: &str = "--}}";
const INLINE_OPEN: &str = "{{!";
const SCRIPT_BLOCK_OPEN: &str = "/*";
const SCRIPT_BLOCK_CLOSE: &str = "*/";
const SCRIPT_LINE_OPEN: &str = "//";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Html,
    /// `{{!-- ... --}}`
    Block,
    /// `{{! ... }}`, brace-balanced
    Inline,
    ScriptLine,
    ScriptBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentRegion {
    pub kind: CommentKind,
    pub start: usize,
    /// One past the final byte of the close token, or `text.len()` when the
    /// opener is unterminated.
    pub end: usize,
}

/// Returns the comment region containing `offset`, if any.
///
/// Forms are checked in a fixed order (HTML, template block, template
/// inline, script block, script line) and the first containing region wins.
/// The forms use disjoint delimiters, so no further overlap resolution is
/// needed.
#[must_use]
pub fn comment_at(text: &str, offset: usize) -> Option<CommentRegion> {
    if offset > text.len() {
        return None;
    }

    if let Some(region) = delimited_region(text, offset, HTML_OPEN, HTML_CLOSE, CommentKind::Html)
    {
        return Some(region);
    }
    if let Some(region) =
        delimited_region(text, offset, BLOCK_OPEN, BLOCK_CLOSE, CommentKind::Block)
    {
        return Some(region);
    }
    if let Some(region) = inline_region(text, offset) {
        return Some(region);
    }
    if let Some(region) = delimited_region(
        text,
        offset,
        SCRIPT_BLOCK_OPEN,
        SCRIPT_BLOCK_CLOSE,
        CommentKind::ScriptBlock,
    ) {
        return Some(region);
    }
    line_region(text, offset)
}

fn delimited_region(
    text: &str,
    offset: usize,
    open: &str,
    close: &str,
    kind: CommentKind,
) -> Option<CommentRegion> {
    let start = text[..offset].rfind(open)?;
    let body = start + open.len();
    let end = match text[body..].find(close) {
        Some(rel) => body + rel + close.len(),
        None => text.len(),
    };

    (offset < end).then_some(CommentRegion { kind, start, end })
}

/// `{{! ... }}` — the body may itself contain `{{ ... }}` tokens, so the
/// close is found by balancing brace pairs rather than taking the first `}}`.
fn inline_region(text: &str, offset: usize) -> Option<CommentRegion> {
    let mut search_end = offset;
    let start = loop {
        let candidate = text[..search_end].rfind(INLINE_OPEN)?;
        // `{{!--` belongs to the block form handled above.
        if !text[candidate..].starts_with(BLOCK_OPEN) {
            break candidate;
        }
        search_end = candidate;
    };

    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut pos = start + INLINE_OPEN.len();
    let end = loop {
        if pos + 1 >= text.len() {
            break text.len();
        }
        match (bytes[pos], bytes[pos + 1]) {
            (b'{', b'{') => {
                depth += 1;
                pos += 2;
            }
            (b'}', b'}') => {
                depth -= 1;
                if depth == 0 {
                    break pos + 2;
                }
                pos += 2;
            }
            _ => pos += 1,
        }
    };

    (offset < end).then_some(CommentRegion {
        kind: CommentKind::Inline,
        start,
        end,
    })
}

fn line_region(text: &str, offset: usize) -> Option<CommentRegion> {
    let mut search_end = offset;
    let start = loop {
        let candidate = text[..search_end].rfind(SCRIPT_LINE_OPEN)?;
        // `https://...` is a URL, not a comment.
        if candidate == 0 || text.as_bytes()[candidate - 1] != b':' {
            break candidate;
        }
        search_end = candidate;
    };

    let end = match text[start..].find('\n') {
        Some(rel) => start + rel,
        None => text.len(),
    };

    (offset < end || end == text.len()).then_some(CommentRegion {
        kind: CommentKind::ScriptLine,
        start,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_comment_wins_over_expression_syntax() {
        let text = "<!-- {{#if a}} -->";
        let offset = text.find("#if").unwrap();
        let region = comment_at(text, offset).unwrap();
        assert_eq!(region.kind, CommentKind::Html);
        assert_eq!(region.start, 0);
        assert_eq!(region.end, text.len());
    }

    #[test]
    fn test_outside_closed_html_comment() {
        let text = "<!-- a --> {{b}}";
        assert!(comment_at(text, text.find("{{b").unwrap()).is_none());
    }

    #[test]
    fn test_block_comment() {
        let text = "x {{!-- {{name}} --}} y";
        let region = comment_at(text, text.find("name").unwrap()).unwrap();
        assert_eq!(region.kind, CommentKind::Block);
        assert_eq!(&text[region.start..region.end], "{{!-- {{name}} --}}");
    }

    #[test]
    fn test_inline_comment_balances_nested_braces() {
        let text = "{{! skip {{count}} here }} {{live}}";
        let region = comment_at(text, text.find("count").unwrap()).unwrap();
        assert_eq!(region.kind, CommentKind::Inline);
        assert_eq!(
            &text[region.start..region.end],
            "{{! skip {{count}} here }}"
        );
        // The first `}}` belongs to the nested pair, not the comment close.
        assert!(comment_at(text, text.find("live").unwrap()).is_none());
    }

    #[test]
    fn test_unterminated_comment_extends_to_end() {
        let text = "a {{!-- lost";
        let region = comment_at(text, text.len() - 1).unwrap();
        assert_eq!(region.kind, CommentKind::Block);
        assert_eq!(region.end, text.len());
    }

    #[test]
    fn test_script_line_comment_stops_at_newline() {
        let text = "// note {{x}}\n{{y}}";
        let region = comment_at(text, text.find("x}}").unwrap()).unwrap();
        assert_eq!(region.kind, CommentKind::ScriptLine);
        assert!(comment_at(text, text.find("{{y").unwrap()).is_none());
    }

    #[test]
    fn test_script_block_comment() {
        let text = "let a = 1; /* {{x}} */ let b;";
        let region = comment_at(text, text.find("{{x").unwrap()).unwrap();
        assert_eq!(region.kind, CommentKind::ScriptBlock);
        assert!(comment_at(text, text.find("let b").unwrap()).is_none());
    }

    #[test]
    fn test_plain_text_is_not_commented() {
        assert!(comment_at("{{#each items}}", 4).is_none());
    }

    #[test]
    fn test_url_slashes_are_not_a_comment() {
        let text = r#"<a href="https://example.com">{{label}}</a>"#;
        assert!(comment_at(text, text.find("label").unwrap()).is_none());
    }
}
