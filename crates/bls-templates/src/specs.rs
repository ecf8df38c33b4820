//! Block type specifications.
//!
//! Built-in Spacebars blocks carry documentation and matching rules; user
//! configuration can add custom blocks and change which block types are
//! diagnosed when left unclosed.

use std::collections::HashMap;

use bls_conf::Settings;

#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec {
    pub name: String,
    /// Whether a missing `{{/name}}` produces a diagnostic.
    pub requires_close: bool,
    /// Whether `in` is a keyword in this block's argument list.
    pub iteration: bool,
    pub doc: Option<String>,
    pub usage: Option<String>,
    /// Completion items offered inside the block body (custom blocks only).
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockSpecs {
    specs: HashMap<String, BlockSpec>,
}

const BUILTINS: &[(&str, &str, &str)] = &[
    (
        "if",
        "Renders the block when the condition is truthy; an optional \
         `{{else}}` branch renders otherwise.",
        "{{#if condition}}...{{else}}...{{/if}}",
    ),
    (
        "unless",
        "Inverted conditional: renders the block when the condition is falsy.",
        "{{#unless condition}}...{{/unless}}",
    ),
    (
        "each",
        "Iterates over a collection. The `alias in collection` form binds \
         each element to the alias inside the block.",
        "{{#each item in items}}{{item}}{{/each}}",
    ),
    (
        "with",
        "Narrows the data context to the given expression for the block body.",
        "{{#with user.profile}}{{avatarUrl}}{{/with}}",
    ),
    (
        "let",
        "Binds one or more names to expressions for the block body.",
        "{{#let total=cartTotal}}{{total}}{{/let}}",
    ),
];

impl BlockSpecs {
    /// The built-in table with default closing rules (`let` opts out).
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_settings(&Settings::default())
    }

    /// Built-ins merged with the project's custom blocks and closing rules.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut specs = HashMap::new();

        for (name, doc, usage) in BUILTINS {
            specs.insert(
                (*name).to_string(),
                BlockSpec {
                    name: (*name).to_string(),
                    requires_close: settings.block_types.iter().any(|b| b.as_str() == *name),
                    iteration: *name == "each",
                    doc: Some((*doc).to_string()),
                    usage: Some((*usage).to_string()),
                    properties: Vec::new(),
                },
            );
        }

        for custom in &settings.custom_blocks {
            specs.insert(
                custom.name.clone(),
                BlockSpec {
                    name: custom.name.clone(),
                    requires_close: custom.requires_close,
                    iteration: false,
                    doc: None,
                    usage: None,
                    properties: custom.properties.clone().unwrap_or_default(),
                },
            );
        }

        Self { specs }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BlockSpec> {
        self.specs.get(name)
    }

    #[must_use]
    pub fn requires_close(&self, name: &str) -> bool {
        self.specs.get(name).is_some_and(|s| s.requires_close)
    }

    #[must_use]
    pub fn is_iteration(&self, name: &str) -> bool {
        self.specs.get(name).is_some_and(|s| s.iteration)
    }

    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockSpec> {
        self.specs.values()
    }
}
