//! Helper-registration scanning for companion scripts.
//!
//! Two registration forms exist: template-scoped
//! `Template.<name>.helpers({...})` objects and page-global
//! `Template.registerHelper("name", fn)` calls. Both are found lexically;
//! the helpers object is isolated by brace balancing and then matched
//! against an ordered set of shapes, documented forms first so a doc
//! comment is never attributed to the wrong member.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::HelperDescriptor;

/// One `Template.<template>.helpers({...})` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperRegistration {
    pub template: String,
    pub helpers: Vec<HelperDescriptor>,
    /// Offset of the `Template` token of the call.
    pub offset: usize,
}

static HELPERS_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Template\.(?P<template>[A-Za-z_]\w*)\.helpers\s*\(").unwrap()
});

static REGISTER_HELPER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"Template\.registerHelper\s*\(\s*['"](?P<name>[A-Za-z_]\w*)['"]\s*,\s*"#)
        .unwrap()
});

// The doc body class `(?:[^*]|\*[^/])*` cannot cross a `*/`, so a comment is
// only ever attributed to the member directly beneath it.
static DOC_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"/\*\*(?P<doc>(?:[^*]|\*[^/])*)\*/\s*(?:async\s+)?(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^)]*)\)\s*(?::\s*(?P<ret>[^{\n]+?))?\s*\{",
    )
    .unwrap()
});

static DOC_PROPERTY_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"/\*\*(?P<doc>(?:[^*]|\*[^/])*)\*/\s*(?P<name>[A-Za-z_]\w*)\s*:\s*(?:async\s+)?function\s*\((?P<params>[^)]*)\)",
    )
    .unwrap()
});

static DOC_ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"/\*\*(?P<doc>(?:[^*]|\*[^/])*)\*/\s*(?P<name>[A-Za-z_]\w*)\s*:\s*(?:async\s+)?(?:\((?P<params>[^)]*)\)|(?P<param>[A-Za-z_]\w*))\s*=>",
    )
    .unwrap()
});

static METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:async\s+)?(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^)]*)\)\s*(?::\s*(?P<ret>[^{\n]+?))?\s*\{",
    )
    .unwrap()
});

static PROPERTY_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<name>[A-Za-z_]\w*)\s*:\s*(?:async\s+)?function\s*\((?P<params>[^)]*)\)",
    )
    .unwrap()
});

static ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<name>[A-Za-z_]\w*)\s*:\s*(?:async\s+)?(?:\((?P<params>[^)]*)\)|(?P<param>[A-Za-z_]\w*))\s*=>",
    )
    .unwrap()
});

const RESERVED: &[&str] = &[
    "if", "else", "for", "while", "switch", "return", "function", "const", "let", "var",
    "new", "typeof",
];

/// All template-scoped helper registrations in a script.
#[must_use]
pub fn extract_template_helpers(text: &str) -> Vec<HelperRegistration> {
    let mut registrations = Vec::new();

    for call in HELPERS_CALL.captures_iter(text) {
        let whole = call.get(0).expect("match");
        let Some(body) = balanced_object_body(&text[whole.end()..]) else {
            continue;
        };

        registrations.push(HelperRegistration {
            template: call["template"].to_string(),
            helpers: extract_helper_members(body),
            offset: whole.start(),
        });
    }

    registrations
}

/// The object literal body starting at the first `{` of `text`, delimited by
/// balanced braces. Strings are not tracked; a stray brace inside one makes
/// this scan return a shorter body, which only narrows the results.
fn balanced_object_body(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;

    for (index, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + 1..index]);
                }
            }
            _ => {}
        }
    }

    None
}

fn extract_helper_members(body: &str) -> Vec<HelperDescriptor> {
    let mut helpers: Vec<HelperDescriptor> = Vec::new();

    let documented = [&*DOC_METHOD, &*DOC_PROPERTY_FN, &*DOC_ARROW];
    let plain = [&*METHOD, &*PROPERTY_FN, &*ARROW];

    for pattern in documented.into_iter().chain(plain) {
        for captures in pattern.captures_iter(body) {
            let name = &captures["name"];
            if RESERVED.contains(&name) || helpers.iter().any(|h| h.name == name) {
                continue;
            }

            let params = captures
                .name("params")
                .or_else(|| captures.name("param"))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            let doc = captures.name("doc").map(|m| m.as_str());
            let (description, doc_return) = doc.map(parse_doc).unwrap_or_default();

            helpers.push(HelperDescriptor {
                name: name.to_string(),
                doc: description,
                signature: Some(format!(
                    "{name}({})",
                    params.as_deref().unwrap_or_default()
                )),
                return_type: captures
                    .name("ret")
                    .map(|m| m.as_str().trim().to_string())
                    .or(doc_return),
                parameters: params,
            });
        }
    }

    helpers
}

/// Splits a doc comment into its description and any `@returns {T}` type.
fn parse_doc(raw: &str) -> (Option<String>, Option<String>) {
    static RETURNS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"@returns?\s*\{(?P<ty>[^}]*)\}").unwrap());

    let mut description = Vec::new();
    for line in raw.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if line.starts_with('@') {
            break;
        }
        if !line.is_empty() {
            description.push(line.to_string());
        }
    }

    let description = (!description.is_empty()).then(|| description.join(" "));
    let returns = RETURNS
        .captures(raw)
        .map(|c| c["ty"].trim().to_string())
        .filter(|s| !s.is_empty());

    (description, returns)
}

/// Page-global `Template.registerHelper` calls.
///
/// The second argument is either an inline function or a reference to a
/// function declared elsewhere in the file; documentation is taken from
/// directly above whichever of the two exists.
#[must_use]
pub fn extract_global_helpers(text: &str) -> Vec<HelperDescriptor> {
    let mut helpers: Vec<HelperDescriptor> = Vec::new();

    for call in REGISTER_HELPER.captures_iter(text) {
        let whole = call.get(0).expect("match");
        let name = call["name"].to_string();
        if helpers.iter().any(|h| h.name == name) {
            continue;
        }

        let rest = &text[whole.end()..];
        let (params, decl_offset) = inline_params(rest)
            .map(|p| (Some(p), None))
            .or_else(|| {
                named_reference(rest)
                    .and_then(|reference| declaration_of(text, &reference))
                    .map(|(params, offset)| (params, Some(offset)))
            })
            .unwrap_or((None, None));

        let doc = decl_offset
            .and_then(|offset| doc_immediately_above(text, offset))
            .or_else(|| doc_immediately_above(text, whole.start()));
        let (description, doc_return) = doc.as_deref().map(parse_doc).unwrap_or_default();

        helpers.push(HelperDescriptor {
            name: name.clone(),
            doc: description,
            signature: Some(format!("{name}({})", params.as_deref().unwrap_or_default())),
            return_type: doc_return,
            parameters: params.filter(|p| !p.is_empty()),
        });
    }

    helpers
}

fn inline_params(rest: &str) -> Option<String> {
    static INLINE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:async\s+)?(?:function\s*\((?P<fn_params>[^)]*)\)|\((?P<arrow_params>[^)]*)\)\s*=>|(?P<single>[A-Za-z_]\w*)\s*=>)",
        )
        .unwrap()
    });

    let captures = INLINE.captures(rest)?;
    let params = captures
        .name("fn_params")
        .or_else(|| captures.name("arrow_params"))
        .or_else(|| captures.name("single"))
        .map(|m| m.as_str().trim().to_string())?;
    Some(params)
}

fn named_reference(rest: &str) -> Option<String> {
    static NAMED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(?P<id>[A-Za-z_]\w*)\s*[,)]").unwrap());
    NAMED.captures(rest).map(|c| c["id"].to_string())
}

/// Finds the declaration of `name` in the file, returning its parameter
/// list (when present) and offset.
fn declaration_of(text: &str, name: &str) -> Option<(Option<String>, usize)> {
    let patterns = [
        format!(r"function\s+{name}\s*\((?P<params>[^)]*)\)"),
        format!(r"(?:const|let|var)\s+{name}\s*=\s*(?:async\s+)?(?:function\s*)?\((?P<params>[^)]*)\)"),
        format!(r"(?:const|let|var)\s+{name}\s*=\s*(?P<single>[A-Za-z_]\w*)\s*=>"),
    ];

    for pattern in &patterns {
        let Ok(regex) = Regex::new(pattern) else {
            continue;
        };
        if let Some(captures) = regex.captures(text) {
            let params = captures
                .name("params")
                .or_else(|| captures.name("single"))
                .map(|m| m.as_str().trim().to_string());
            let offset = captures.get(0).expect("match").start();
            return Some((params, offset));
        }
    }

    None
}

/// The `/** ... */` block whose close sits directly above `offset`, with
/// only whitespace in between.
fn doc_immediately_above(text: &str, offset: usize) -> Option<String> {
    let before = text[..offset].trim_end();
    if !before.ends_with("*/") {
        return None;
    }
    let open = before.rfind("/**")?;
    Some(before[open + 3..before.len() - 2].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_method() {
        let text = "Template.foo.helpers({ bar() { return 1; } });";
        let regs = extract_template_helpers(text);
        assert_eq!(regs.len(), 1);
        assert_eq!(regs[0].template, "foo");
        let bar = &regs[0].helpers[0];
        assert_eq!(bar.name, "bar");
        assert_eq!(bar.signature.as_deref(), Some("bar()"));
        assert!(bar.doc.is_none());
    }

    #[test]
    fn test_documented_method_with_params_and_return() {
        let text = r"Template.cart.helpers({
  /**
   * Sum of all line items.
   * @returns {number}
   */
  total(discount) {
    return 0;
  },
});";
        let helpers = &extract_template_helpers(text)[0].helpers;
        let total = helpers.iter().find(|h| h.name == "total").unwrap();
        assert_eq!(total.doc.as_deref(), Some("Sum of all line items."));
        assert_eq!(total.return_type.as_deref(), Some("number"));
        assert_eq!(total.parameters.as_deref(), Some("discount"));
        assert_eq!(total.signature.as_deref(), Some("total(discount)"));
    }

    #[test]
    fn test_property_function_and_arrow_forms() {
        let text = r"Template.cart.helpers({
  count: function (kind) { return 2; },
  empty: () => true,
  double: n => n * 2,
});";
        let helpers = &extract_template_helpers(text)[0].helpers;
        let names: Vec<_> = helpers.iter().map(|h| h.name.as_str()).collect();
        assert!(names.contains(&"count"));
        assert!(names.contains(&"empty"));
        assert!(names.contains(&"double"));
        let double = helpers.iter().find(|h| h.name == "double").unwrap();
        assert_eq!(double.parameters.as_deref(), Some("n"));
    }

    #[test]
    fn test_typescript_return_annotation() {
        let text = "Template.cart.helpers({\n  label(kind: string): string {\n    return kind;\n  },\n});";
        let helpers = &extract_template_helpers(text)[0].helpers;
        let label = helpers.iter().find(|h| h.name == "label").unwrap();
        assert_eq!(label.return_type.as_deref(), Some("string"));
    }

    #[test]
    fn test_reserved_words_and_duplicates_skipped() {
        let text = r"Template.cart.helpers({
  items() {
    if (ready) { return all; }
    return [];
  },
  items: () => [],
});";
        let helpers = &extract_template_helpers(text)[0].helpers;
        assert_eq!(helpers.iter().filter(|h| h.name == "items").count(), 1);
        assert!(!helpers.iter().any(|h| h.name == "if"));
        assert!(!helpers.iter().any(|h| h.name == "return"));
    }

    #[test]
    fn test_multiple_registrations() {
        let text = r"Template.cart.helpers({ a() { return 1; } });
Template.checkout.helpers({ b() { return 2; } });";
        let regs = extract_template_helpers(text);
        assert_eq!(regs.len(), 2);
        assert_eq!(regs[1].template, "checkout");
        assert_eq!(regs[1].helpers[0].name, "b");
    }

    #[test]
    fn test_global_inline_function() {
        let text = r#"Template.registerHelper("formatDate", function (date, format) {
  return date;
});"#;
        let helpers = extract_global_helpers(text);
        assert_eq!(helpers[0].name, "formatDate");
        assert_eq!(helpers[0].parameters.as_deref(), Some("date, format"));
    }

    #[test]
    fn test_global_named_reference_with_doc() {
        let text = r#"/**
 * Uppercases a string.
 * @returns {string}
 */
function shout(value) {
  return value.toUpperCase();
}

Template.registerHelper("shout", shout);"#;
        let helpers = extract_global_helpers(text);
        assert_eq!(helpers[0].name, "shout");
        assert_eq!(helpers[0].doc.as_deref(), Some("Uppercases a string."));
        assert_eq!(helpers[0].return_type.as_deref(), Some("string"));
        assert_eq!(helpers[0].parameters.as_deref(), Some("value"));
    }

    #[test]
    fn test_global_doc_above_registration() {
        let text = r#"/** Current app version. */
Template.registerHelper("appVersion", () => "1.0");"#;
        let helpers = extract_global_helpers(text);
        assert_eq!(helpers[0].doc.as_deref(), Some("Current app version."));
    }

    #[test]
    fn test_unbalanced_body_yields_nothing() {
        let text = "Template.cart.helpers({ broken() {";
        assert!(extract_template_helpers(text).is_empty());
    }
}
