//! Expression boundary detection for `{{...}}` and `{{{...}}}` spans.

const DOUBLE_OPEN: &str = "{{";
const DOUBLE_CLOSE: &str = "}}";
const TRIPLE_OPEN: &str = "{{{";
const TRIPLE_CLOSE: &str = "}}}";

/// Content bounds of an expression: `start` is the first byte after the
/// opening delimiter, `end` the first byte of the closing delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expression {
    pub start: usize,
    pub end: usize,
    pub triple: bool,
}

impl Expression {
    #[must_use]
    pub fn content<'t>(&self, text: &'t str) -> &'t str {
        &text[self.start..self.end]
    }
}

/// Returns the expression whose content region contains `offset`, or `None`
/// when the offset is outside any expression or the expression never closes.
///
/// The backward scan takes whichever opener is found first going backward.
/// A `{{{` opener probed from inside therefore matches its inner `{{` pair
/// and classifies as double-brace; the content bounds still land after the
/// third brace, only the `triple` flag differs.
#[must_use]
pub fn expression_at(text: &str, offset: usize) -> Option<Expression> {
    if offset > text.len() {
        return None;
    }

    let double = text[..offset].rfind(DOUBLE_OPEN);
    let triple = text[..offset].rfind(TRIPLE_OPEN);

    let (open_at, is_triple) = match (double, triple) {
        (Some(d), Some(t)) if t >= d => (t, true),
        (Some(d), _) => (d, false),
        (None, Some(t)) => (t, true),
        (None, None) => return None,
    };

    let (open, close) = if is_triple {
        (TRIPLE_OPEN, TRIPLE_CLOSE)
    } else {
        (DOUBLE_OPEN, DOUBLE_CLOSE)
    };

    let start = open_at + open.len();
    let end = start + text[start..].find(close)?;

    (offset >= start && offset <= end).then_some(Expression {
        start,
        end,
        triple: is_triple,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_double_brace() {
        let text = "a {{name}} b";
        let expr = expression_at(text, text.find("ame").unwrap()).unwrap();
        assert_eq!(expr.content(text), "name");
        assert!(!expr.triple);
    }

    #[test]
    fn test_outside_expression() {
        let text = "a {{name}} b";
        assert!(expression_at(text, 0).is_none());
        assert!(expression_at(text, text.len() - 1).is_none());
    }

    #[test]
    fn test_unterminated_is_none() {
        let text = "a {{name";
        assert!(expression_at(text, text.find("ame").unwrap()).is_none());
    }

    #[test]
    fn test_triple_probed_as_double() {
        // Scanning backward from inside finds the inner `{{` pair first, so
        // the span classifies as double-brace even though the author wrote a
        // raw triple. Kept for compatibility; see DESIGN.md.
        let text = "{{{rawHtml}}}";
        let expr = expression_at(text, text.find("Html").unwrap()).unwrap();
        assert!(!expr.triple);
        assert_eq!(expr.start, 3);
        assert_eq!(expr.content(text), "rawHtml");
    }

    #[test]
    fn test_idempotent_bounds() {
        let text = "x {{a b c}} y";
        let offset = text.find('b').unwrap();
        let first = expression_at(text, offset).unwrap();
        let second = expression_at(text, offset).unwrap();
        assert_eq!(first, second);
        for probe in first.start..=first.end {
            assert_eq!(expression_at(text, probe), Some(first));
        }
    }

    #[test]
    fn test_cursor_at_closing_delimiter_counts_as_inside() {
        let text = "{{name}}";
        let expr = expression_at(text, text.find("}}").unwrap()).unwrap();
        assert_eq!(expr.content(text), "name");
    }
}
