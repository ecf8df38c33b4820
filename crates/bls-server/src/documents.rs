//! Open-document store.
//!
//! Text is kept verbatim per document and the line index is rebuilt on
//! every content change; all template analysis re-derives from scratch, so
//! there is nothing incremental to maintain.

use std::collections::HashMap;

use anyhow::anyhow;
use anyhow::Result;
use bls_source::LineIndex;
use tower_lsp_server::ls_types::DidChangeTextDocumentParams;
use tower_lsp_server::ls_types::DidCloseTextDocumentParams;
use tower_lsp_server::ls_types::DidOpenTextDocumentParams;
use tower_lsp_server::ls_types::Range;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Store {
    documents: HashMap<String, TextDocument>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_did_open(&mut self, params: &DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.as_str().to_string();
        debug!(%uri, version = params.text_document.version, "Opening document");

        let document = TextDocument::new(
            uri.clone(),
            params.text_document.text.clone(),
            params.text_document.version,
            &params.text_document.language_id,
        );
        self.documents.insert(uri, document);
    }

    pub fn handle_did_change(&mut self, params: &DidChangeTextDocumentParams) -> Result<()> {
        let uri = params.text_document.uri.as_str();
        let document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| anyhow!("Document not found: {uri}"))?;

        for change in &params.content_changes {
            if let Some(range) = change.range {
                document.apply_change(range, &change.text)?;
            } else {
                document.set_content(change.text.clone());
            }
        }
        document.version = params.text_document.version;

        Ok(())
    }

    pub fn handle_did_close(&mut self, params: &DidCloseTextDocumentParams) {
        self.documents.remove(params.text_document.uri.as_str());
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&TextDocument> {
        self.documents.get(uri)
    }
}

#[derive(Clone, Debug)]
pub struct TextDocument {
    uri: String,
    contents: String,
    index: LineIndex,
    version: i32,
    language: Language,
}

impl TextDocument {
    fn new(uri: String, contents: String, version: i32, language_id: &str) -> Self {
        let index = LineIndex::new(&contents);
        Self {
            uri,
            contents,
            index,
            version,
            language: Language::from_id(language_id),
        }
    }

    pub fn apply_change(&mut self, range: Range, new_text: &str) -> Result<()> {
        let start = self
            .index
            .offset(range.start)
            .ok_or_else(|| anyhow!("Invalid start position: {:?}", range.start))?
            as usize;
        let end = self
            .index
            .offset(range.end)
            .ok_or_else(|| anyhow!("Invalid end position: {:?}", range.end))?
            as usize;

        let mut contents =
            String::with_capacity(self.contents.len() - (end - start) + new_text.len());
        contents.push_str(&self.contents[..start]);
        contents.push_str(new_text);
        contents.push_str(&self.contents[end..]);

        self.set_content(contents);
        Ok(())
    }

    pub fn set_content(&mut self, contents: String) {
        self.contents = contents;
        self.index = LineIndex::new(&self.contents);
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.contents
    }

    #[must_use]
    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    /// Template markup (`.html` with `<template>` declarations).
    Markup,
    /// Companion script (`.js`/`.ts`), analyzed but not validated.
    Script,
    Other,
}

impl Language {
    #[must_use]
    pub fn from_id(language_id: &str) -> Self {
        match language_id {
            "html" | "spacebars" | "handlebars" => Self::Markup,
            "javascript" | "typescript" => Self::Script,
            _ => Self::Other,
        }
    }
}
