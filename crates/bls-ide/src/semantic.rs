//! Semantic tokens for template expressions.
//!
//! Only text inside `{{...}}` spans is ever tokenized; literal markup
//! between block tags produces nothing. The legend is fixed so token type
//! indices are stable across calls.

use bls_source::LineIndex;
use bls_templates::comment_at;
use bls_templates::BlockSpecs;
use tower_lsp_server::ls_types::SemanticToken;
use tower_lsp_server::ls_types::SemanticTokenType;

/// Token type indices, in legend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum TokenType {
    Delimiter = 0,
    Hash = 1,
    BlockName = 2,
    SingleArg = 3,
    FirstArg = 4,
    OtherArgs = 5,
    IterationKeyword = 6,
    Expression = 7,
}

/// The legend advertised in server capabilities; indices match
/// [`TokenType`].
pub const TOKEN_LEGEND: &[SemanticTokenType] = &[
    SemanticTokenType::new("delimiter"),
    SemanticTokenType::new("hash"),
    SemanticTokenType::new("blockName"),
    SemanticTokenType::new("singleArg"),
    SemanticTokenType::new("firstArg"),
    SemanticTokenType::new("otherArgs"),
    SemanticTokenType::new("iterationKeyword"),
    SemanticTokenType::new("expression"),
];

struct RawToken {
    offset: usize,
    length: usize,
    token_type: TokenType,
}

/// Tokenizes every expression in the document, delta-encoded for LSP.
#[must_use]
pub fn semantic_tokens(text: &str, index: &LineIndex, specs: &BlockSpecs) -> Vec<SemanticToken> {
    encode(&raw_tokens(text, specs), index)
}

fn raw_tokens(text: &str, specs: &BlockSpecs) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let mut cursor = 0usize;

    while let Some(rel) = text[cursor..].find("{{") {
        let open = cursor + rel;
        if comment_at(text, open).is_some() {
            cursor = open + 2;
            continue;
        }
        // `{{!` opens a template comment, not an expression.
        if text[open + 2..].starts_with('!') {
            cursor = open + 2;
            continue;
        }

        let Some(close_rel) = text[open + 2..].find("}}") else {
            break;
        };
        let close = open + 2 + close_rel;

        tokens.push(RawToken {
            offset: open,
            length: 2,
            token_type: TokenType::Delimiter,
        });
        tokenize_content(text, open + 2, close, specs, &mut tokens);
        tokens.push(RawToken {
            offset: close,
            length: 2,
            token_type: TokenType::Delimiter,
        });

        cursor = close + 2;
    }

    tokens
}

fn tokenize_content(
    text: &str,
    start: usize,
    end: usize,
    specs: &BlockSpecs,
    tokens: &mut Vec<RawToken>,
) {
    let content = &text[start..end];

    if let Some(rest) = content.strip_prefix(['#', '/']) {
        tokens.push(RawToken {
            offset: start,
            length: 1,
            token_type: TokenType::Hash,
        });

        let words = split_words(rest);
        let Some((name_offset, name)) = words.first() else {
            return;
        };
        tokens.push(RawToken {
            offset: start + 1 + name_offset,
            length: name.len(),
            token_type: TokenType::BlockName,
        });

        let iteration = specs.is_iteration(name);
        emit_arguments(&words[1..], start + 1, iteration, tokens);
        return;
    }

    if content.trim() == "else" {
        let at = content.find("else").unwrap_or_default();
        tokens.push(RawToken {
            offset: start + at,
            length: 4,
            token_type: TokenType::BlockName,
        });
        return;
    }

    let words = split_words(content);
    if words.len() == 1 {
        let (offset, word) = &words[0];
        tokens.push(RawToken {
            offset: start + offset,
            length: word.len(),
            token_type: TokenType::Expression,
        });
    } else {
        emit_arguments(&words, start, false, tokens);
    }
}

fn emit_arguments(
    words: &[(usize, &str)],
    base: usize,
    iteration: bool,
    tokens: &mut Vec<RawToken>,
) {
    if words.len() == 1 {
        let (offset, word) = &words[0];
        tokens.push(RawToken {
            offset: base + offset,
            length: word.len(),
            token_type: TokenType::SingleArg,
        });
        return;
    }

    for (position, (offset, word)) in words.iter().enumerate() {
        let token_type = if iteration && *word == "in" {
            TokenType::IterationKeyword
        } else if position == 0 {
            TokenType::FirstArg
        } else {
            TokenType::OtherArgs
        };
        tokens.push(RawToken {
            offset: base + offset,
            length: word.len(),
            token_type,
        });
    }
}

fn split_words(content: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut word_start: Option<usize> = None;

    for (index, character) in content.char_indices() {
        if character.is_whitespace() {
            if let Some(start) = word_start.take() {
                words.push((start, &content[start..index]));
            }
        } else if word_start.is_none() {
            word_start = Some(index);
        }
    }
    if let Some(start) = word_start {
        words.push((start, &content[start..]));
    }

    words
}

fn encode(tokens: &[RawToken], index: &LineIndex) -> Vec<SemanticToken> {
    let mut encoded = Vec::with_capacity(tokens.len());
    let mut previous_line = 0u32;
    let mut previous_start = 0u32;

    for token in tokens {
        let position = index.position(u32::try_from(token.offset).unwrap_or(u32::MAX));
        let delta_line = position.line - previous_line;
        let delta_start = if delta_line == 0 {
            position.character - previous_start
        } else {
            position.character
        };

        encoded.push(SemanticToken {
            delta_line,
            delta_start,
            length: u32::try_from(token.length).unwrap_or(0),
            token_type: token.token_type as u32,
            token_modifiers_bitset: 0,
        });

        previous_line = position.line;
        previous_start = position.character;
    }

    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types_of(text: &str) -> Vec<u32> {
        let specs = BlockSpecs::builtin();
        raw_tokens(text, &specs)
            .iter()
            .map(|t| t.token_type as u32)
            .collect()
    }

    fn spans_of(text: &str) -> Vec<String> {
        let specs = BlockSpecs::builtin();
        raw_tokens(text, &specs)
            .iter()
            .map(|t| text[t.offset..t.offset + t.length].to_string())
            .collect()
    }

    #[test]
    fn test_plain_expression_single_token() {
        assert_eq!(
            types_of("{{total}}"),
            vec![
                TokenType::Delimiter as u32,
                TokenType::Expression as u32,
                TokenType::Delimiter as u32
            ]
        );
    }

    #[test]
    fn test_helper_with_arguments() {
        assert_eq!(
            types_of("{{pad box 4}}"),
            vec![
                TokenType::Delimiter as u32,
                TokenType::FirstArg as u32,
                TokenType::OtherArgs as u32,
                TokenType::OtherArgs as u32,
                TokenType::Delimiter as u32
            ]
        );
    }

    #[test]
    fn test_block_open_with_single_argument() {
        assert_eq!(
            types_of("{{#if ready}}"),
            vec![
                TokenType::Delimiter as u32,
                TokenType::Hash as u32,
                TokenType::BlockName as u32,
                TokenType::SingleArg as u32,
                TokenType::Delimiter as u32
            ]
        );
    }

    #[test]
    fn test_each_in_tags_iteration_keyword() {
        assert_eq!(
            types_of("{{#each box in boxes}}"),
            vec![
                TokenType::Delimiter as u32,
                TokenType::Hash as u32,
                TokenType::BlockName as u32,
                TokenType::FirstArg as u32,
                TokenType::IterationKeyword as u32,
                TokenType::OtherArgs as u32,
                TokenType::Delimiter as u32
            ]
        );
    }

    #[test]
    fn test_in_is_plain_arg_outside_iteration_blocks() {
        // `with` is not iteration-capable, so `in` stays an ordinary arg.
        let types = types_of("{{#with a in b}}");
        assert!(!types.contains(&(TokenType::IterationKeyword as u32)));
    }

    #[test]
    fn test_else_styled_as_block_name() {
        assert_eq!(
            types_of("{{else}}"),
            vec![
                TokenType::Delimiter as u32,
                TokenType::BlockName as u32,
                TokenType::Delimiter as u32
            ]
        );
    }

    #[test]
    fn test_close_tag_tokens() {
        assert_eq!(
            types_of("{{/if}}"),
            vec![
                TokenType::Delimiter as u32,
                TokenType::Hash as u32,
                TokenType::BlockName as u32,
                TokenType::Delimiter as u32
            ]
        );
    }

    #[test]
    fn test_text_outside_expressions_is_never_tokenized() {
        let text = "<h1>Title</h1> {{#if a}}<p>literal</p>{{/if}} tail";
        let spans = spans_of(text);
        for span in &spans {
            assert!(
                !span.contains("Title") && !span.contains("literal") && !span.contains("tail"),
                "unexpected token text {span:?}"
            );
        }
    }

    #[test]
    fn test_round_trip_reconstructs_expressions() {
        let text = "a {{one}} b {{#if c}} d {{/if}}";
        let specs = BlockSpecs::builtin();
        let tokens = raw_tokens(text, &specs);

        // Delimiter pairs bound each expression; everything tokenized must
        // fall inside one of those spans.
        let mut expressions = Vec::new();
        let mut open = None;
        for token in &tokens {
            if token.length == 2 && text[token.offset..].starts_with("{{") {
                open = Some(token.offset);
            } else if token.length == 2 && text[token.offset..].starts_with("}}") {
                let start = open.take().unwrap();
                expressions.push(&text[start..token.offset + 2]);
            }
        }
        assert_eq!(expressions, vec!["{{one}}", "{{#if c}}", "{{/if}}"]);
    }

    #[test]
    fn test_commented_expressions_are_skipped() {
        assert!(types_of("<!-- {{skipped}} -->").is_empty());
    }

    #[test]
    fn test_template_comments_are_skipped() {
        assert!(types_of("{{! note }}").is_empty());
        assert!(types_of("{{!-- {{note}} --}}").is_empty());
    }

    #[test]
    fn test_delta_encoding_across_lines() {
        let text = "{{a}}\n  {{b}}";
        let index = LineIndex::new(text);
        let specs = BlockSpecs::builtin();
        let encoded = semantic_tokens(text, &index, &specs);

        assert_eq!(encoded[0].delta_line, 0);
        assert_eq!(encoded[0].delta_start, 0);
        // Fourth token is the `{{` of the second line.
        assert_eq!(encoded[3].delta_line, 1);
        assert_eq!(encoded[3].delta_start, 2);
    }
}
