use std::path::PathBuf;
use std::sync::Arc;

use bls_analysis::AnalysisTable;
use bls_analysis::ImportResolver;
use bls_conf::Settings;
use bls_templates::BlockSpecs;
use tower_lsp_server::ls_types::ClientCapabilities;

use crate::documents::Store;

/// Mutable per-connection state, owned behind the server's `RwLock`.
///
/// The analysis table is shared by handle so read paths (completion, hover,
/// definition) can hold it without holding the session lock.
pub struct Session {
    client_capabilities: Option<ClientCapabilities>,
    settings: Settings,
    specs: BlockSpecs,
    documents: Store,
    analysis: Arc<AnalysisTable>,
    resolver: Arc<ImportResolver>,
    root: Option<PathBuf>,
}

impl Default for Session {
    fn default() -> Self {
        let settings = Settings::default();
        let specs = BlockSpecs::from_settings(&settings);
        Self {
            client_capabilities: None,
            settings,
            specs,
            documents: Store::new(),
            analysis: Arc::new(AnalysisTable::new()),
            resolver: Arc::new(ImportResolver::with_root(None)),
            root: None,
        }
    }
}

impl Session {
    pub fn client_capabilities_mut(&mut self) -> &mut Option<ClientCapabilities> {
        &mut self.client_capabilities
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings and everything derived from them.
    pub fn set_settings(&mut self, settings: Settings) {
        self.specs = BlockSpecs::from_settings(&settings);
        self.settings = settings;
    }

    #[must_use]
    pub fn specs(&self) -> &BlockSpecs {
        &self.specs
    }

    #[must_use]
    pub fn documents(&self) -> &Store {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut Store {
        &mut self.documents
    }

    #[must_use]
    pub fn analysis(&self) -> Arc<AnalysisTable> {
        Arc::clone(&self.analysis)
    }

    #[must_use]
    pub fn resolver(&self) -> Arc<ImportResolver> {
        Arc::clone(&self.resolver)
    }

    #[must_use]
    pub fn root(&self) -> Option<&PathBuf> {
        self.root.as_ref()
    }

    pub fn set_root(&mut self, root: Option<PathBuf>) {
        self.resolver = Arc::new(ImportResolver::with_root(root.clone()));
        self.root = root;
    }
}
