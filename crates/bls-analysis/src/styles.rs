//! Class and id selector extraction from companion stylesheets.

use once_cell::sync::Lazy;
use regex::Regex;

static SELECTOR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.#](?P<name>-?[A-Za-z_][\w-]*)").unwrap());

static CSS_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

/// Class and id names used in selector position, in order of appearance,
/// deduplicated.
///
/// Selector position is approximated the way a preprocessor-agnostic scan
/// has to: a run of text whose next structural character is `{` is a
/// selector, a run ending in `;` or `}` is not. That keeps `#fff` in
/// `color: #fff;` and dotted numbers out while following less/scss nesting
/// to any depth.
#[must_use]
pub fn extract_selectors(text: &str) -> Vec<String> {
    let stripped = CSS_COMMENT.replace_all(text, "");
    let mut selectors: Vec<String> = Vec::new();
    let mut segment_start = 0usize;

    for (index, byte) in stripped.bytes().enumerate() {
        match byte {
            b'{' => {
                for captures in SELECTOR_TOKEN.captures_iter(&stripped[segment_start..index]) {
                    let name = captures["name"].to_string();
                    if !selectors.contains(&name) {
                        selectors.push(name);
                    }
                }
                segment_start = index + 1;
            }
            b'}' | b';' => segment_start = index + 1,
            _ => {}
        }
    }

    selectors
}
