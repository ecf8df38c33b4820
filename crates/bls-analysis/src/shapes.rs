//! Data-shape extraction from companion scripts.
//!
//! Shapes are the statically declared property sets a template's data
//! context is expected to satisfy. Three declaration styles are read:
//! `type X = {...}` aliases, `interface X {...}`, and JSDoc
//! `@typedef`/`@property` blocks. Extraction is shallow: a property's type
//! is kept as literal text, never resolved further.

use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the declaration mapping template names to shape names.
pub const TEMPLATE_MAP: &str = "TemplatesData";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeProperty {
    pub name: String,
    /// Literal type-expression text, e.g. `string[]` or `{ id: number }`.
    pub type_text: String,
    /// Offset of the property name within the scanned file.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub name: String,
    pub properties: Vec<ShapeProperty>,
    /// Offset of the declaration keyword.
    pub offset: usize,
}

impl Shape {
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&ShapeProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

static TYPE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:export\s+)?(?:type\s+(?P<alias>[A-Za-z_]\w*)\s*=\s*\{|interface\s+(?P<iface>[A-Za-z_]\w*)(?:\s+extends\s+[^{]+)?\s*\{)")
        .unwrap()
});

/// `type`/`interface` declarations with their top-level properties.
#[must_use]
pub fn extract_shapes(text: &str) -> Vec<Shape> {
    let mut shapes = Vec::new();

    for captures in TYPE_DECL.captures_iter(text) {
        let whole = captures.get(0).expect("match");
        let name = captures
            .name("alias")
            .or_else(|| captures.name("iface"))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let body_open = whole.end() - 1;
        let Some(body_end) = balanced_close(text, body_open) else {
            continue;
        };

        shapes.push(Shape {
            name,
            properties: top_level_properties(text, body_open + 1, body_end),
            offset: whole.start(),
        });
    }

    shapes
}

/// Index of the `}` matching the `{` at `open`.
fn balanced_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in text.as_bytes().iter().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Properties at nesting depth zero of a `{...}` body. A nested object type
/// is kept as the property's literal type text, not descended into.
fn top_level_properties(text: &str, body_start: usize, body_end: usize) -> Vec<ShapeProperty> {
    let body = &text[body_start..body_end];
    let bytes = body.as_bytes();
    let mut properties = Vec::new();
    let mut segment_start = 0usize;
    let mut index = 0usize;

    while index < bytes.len() {
        match bytes[index] {
            b'{' => {
                let Some(close) = balanced_close(body, index) else {
                    break;
                };
                parse_property(
                    &body[segment_start..=close],
                    body_start + segment_start,
                    &mut properties,
                );
                index = close + 1;
                segment_start = index;
            }
            b';' | b',' | b'\n' => {
                parse_property(
                    &body[segment_start..index],
                    body_start + segment_start,
                    &mut properties,
                );
                index += 1;
                segment_start = index;
            }
            _ => index += 1,
        }
    }
    parse_property(&body[segment_start..], body_start + segment_start, &mut properties);

    properties
}

fn parse_property(segment: &str, segment_offset: usize, out: &mut Vec<ShapeProperty>) {
    static PROPERTY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?s)^\s*(?:readonly\s+)?(?P<name>[A-Za-z_]\w*)\??\s*:\s*(?P<ty>.+?)\s*$")
            .unwrap()
    });

    if let Some(captures) = PROPERTY.captures(segment) {
        let name = captures.name("name").expect("name");
        out.push(ShapeProperty {
            name: name.as_str().to_string(),
            type_text: captures["ty"].trim().to_string(),
            offset: segment_offset + name.start(),
        });
    }
}

static TYPEDEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@typedef\s*(?:\{[^}]*\}\s*)?(?P<name>[A-Za-z_]\w*)").unwrap()
});

static DOC_PROPERTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@property\s*\{(?P<ty>[^}]*)\}\s*(?:\[)?(?P<name>[A-Za-z_]\w*)").unwrap()
});

static DOC_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*\*(?:[^*]|\*[^/])*\*/").unwrap());

/// JSDoc `@typedef` blocks with `@property` tags, as shapes.
#[must_use]
pub fn extract_typedef_shapes(text: &str) -> Vec<Shape> {
    let mut shapes = Vec::new();

    for block in DOC_BLOCK.find_iter(text) {
        let Some(name) = TYPEDEF
            .captures(block.as_str())
            .map(|c| c["name"].to_string())
        else {
            continue;
        };

        let properties = DOC_PROPERTY
            .captures_iter(block.as_str())
            .map(|captures| {
                let prop = captures.name("name").expect("name");
                ShapeProperty {
                    name: prop.as_str().to_string(),
                    type_text: captures["ty"].trim().to_string(),
                    offset: block.start() + prop.start(),
                }
            })
            .collect();

        shapes.push(Shape {
            name,
            properties,
            offset: block.start(),
        });
    }

    shapes
}

/// Reads the template→shape map out of a `TemplatesData` declaration, if
/// the file has one. Only bare-identifier property types participate.
#[must_use]
pub fn template_shape_map(shapes: &[Shape]) -> Vec<(String, String)> {
    static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*$").unwrap());

    shapes
        .iter()
        .filter(|shape| shape.name == TEMPLATE_MAP)
        .flat_map(|shape| &shape.properties)
        .filter(|property| IDENT.is_match(&property.type_text))
        .map(|property| (property.name.clone(), property.type_text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_alias_properties() {
        let text = "export type CartData = {\n  total: number;\n  items: string[];\n};";
        let shapes = extract_shapes(text);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].name, "CartData");
        let names: Vec<_> = shapes[0].properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["total", "items"]);
        assert_eq!(shapes[0].property("items").unwrap().type_text, "string[]");
    }

    #[test]
    fn test_interface_with_extends() {
        let text = "interface CheckoutData extends Base {\n  payable: boolean\n}";
        let shapes = extract_shapes(text);
        assert_eq!(shapes[0].name, "CheckoutData");
        assert_eq!(shapes[0].property("payable").unwrap().type_text, "boolean");
    }

    #[test]
    fn test_optional_and_readonly_markers() {
        let text = "type T = {\n  readonly id: number;\n  label?: string;\n}";
        let shape = &extract_shapes(text)[0];
        assert!(shape.property("id").is_some());
        assert_eq!(shape.property("label").unwrap().type_text, "string");
    }

    #[test]
    fn test_nested_object_stays_shallow() {
        let text = "type T = {\n  owner: { name: string; age: number };\n  flag: boolean;\n}";
        let shape = &extract_shapes(text)[0];
        let names: Vec<_> = shape.properties.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"owner"));
        assert!(names.contains(&"flag"));
        assert!(!names.contains(&"name"), "nested members are not top-level");
    }

    #[test]
    fn test_property_offset_points_at_name() {
        let text = "type T = { total: number }";
        let shape = &extract_shapes(text)[0];
        let property = shape.property("total").unwrap();
        assert_eq!(&text[property.offset..property.offset + 5], "total");
    }

    #[test]
    fn test_typedef_block() {
        let text = r"/**
 * @typedef {Object} CartData
 * @property {number} total
 * @property {string[]} items
 */";
        let shapes = extract_typedef_shapes(text);
        assert_eq!(shapes[0].name, "CartData");
        assert_eq!(shapes[0].properties.len(), 2);
        assert_eq!(shapes[0].property("total").unwrap().type_text, "number");
    }

    #[test]
    fn test_template_shape_map() {
        let text = "interface TemplatesData {\n  cart: CartData;\n  checkout: CheckoutData;\n}";
        let shapes = extract_shapes(text);
        let map = template_shape_map(&shapes);
        assert!(map.contains(&("cart".to_string(), "CartData".to_string())));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_map_ignores_non_identifier_types() {
        let text = "type TemplatesData = {\n  cart: { inline: true };\n  checkout: CheckoutData;\n}";
        let map = template_shape_map(&extract_shapes(text));
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].0, "checkout");
    }

    #[test]
    fn test_unterminated_declaration_is_skipped() {
        assert!(extract_shapes("interface Broken {\n  a: number;").is_empty());
    }
}
