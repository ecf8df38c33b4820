//! `<template name="...">` declaration scanning.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDeclaration {
    pub name: String,
    /// Offset of the `<` of the declaration tag.
    pub offset: usize,
}

/// All template declarations in the document, in order. A document may
/// declare zero, one, or many templates.
#[must_use]
pub fn declared_templates(text: &str) -> Vec<TemplateDeclaration> {
    let mut declarations = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find("<template") {
        let tag_start = cursor + rel;
        let after = &text[tag_start + "<template".len()..];

        // Require a real tag boundary so `<templates>` does not match.
        if !after.starts_with(|c: char| c.is_whitespace() || c == '>') {
            cursor = tag_start + 1;
            continue;
        }

        let tag_end = after.find('>').map_or(text.len(), |rel| {
            tag_start + "<template".len() + rel
        });

        if let Some(name) = name_attribute(&text[tag_start..tag_end]) {
            declarations.push(TemplateDeclaration {
                name: name.to_string(),
                offset: tag_start,
            });
        }

        cursor = tag_end.max(tag_start + 1);
    }

    declarations
}

fn name_attribute(tag: &str) -> Option<&str> {
    let at = tag.find("name=")?;
    let rest = &tag[at + "name=".len()..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let end = value.find(quote)?;
    let name = &value[..end];
    (!name.is_empty()).then_some(name)
}

/// The declaration whose body contains `offset`: the nearest `<template>`
/// opener scanning backward that has not been closed by `</template>`.
#[must_use]
pub fn enclosing_template(text: &str, offset: usize) -> Option<TemplateDeclaration> {
    let clipped = offset.min(text.len());
    let mut stack: Vec<TemplateDeclaration> = Vec::new();
    let mut cursor = 0;

    loop {
        let open = text[cursor..clipped].find("<template");
        let close = text[cursor..clipped].find("</template");

        let open_first = match (open, close) {
            (Some(o), Some(c)) => o < c,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        if open_first {
            let tag_start = cursor + open.unwrap_or_default();
            let tag_end = text[tag_start..]
                .find('>')
                .map_or(text.len(), |rel| tag_start + rel);
            if let Some(name) = name_attribute(&text[tag_start..tag_end]) {
                stack.push(TemplateDeclaration {
                    name: name.to_string(),
                    offset: tag_start,
                });
            }
            cursor = tag_start + "<template".len();
        } else {
            stack.pop();
            cursor = cursor + close.unwrap_or_default() + "</template".len();
        }
    }

    stack.pop()
}
