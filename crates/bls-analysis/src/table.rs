//! The shared lookup table filled by companion analysis.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use dashmap::DashMap;

/// Composite key: the directory a template lives in plus a name the data is
/// reachable under (file base name, declared template name, or the name used
/// in a registration call). The same payload is stored under every
/// equivalent key so lookups succeed whichever name the caller knows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub dir: PathBuf,
    pub name: String,
}

impl TableKey {
    #[must_use]
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
        }
    }
}

/// What the helper scanner learned about one registered helper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelperDescriptor {
    pub name: String,
    pub doc: Option<String>,
    pub signature: Option<String>,
    pub return_type: Option<String>,
    pub parameters: Option<String>,
}

/// Process-wide analysis results, passed around as an explicit
/// `Arc<AnalysisTable>` handle.
///
/// Writes replace a key's value wholesale (last writer wins); there is no
/// eviction, so entries for deleted files linger until the key is scanned
/// again. That staleness is acceptable for an editor tool and keeps every
/// write idempotent per key.
#[derive(Debug, Default)]
pub struct AnalysisTable {
    helper_names: DashMap<TableKey, Vec<String>>,
    helper_descriptors: DashMap<TableKey, Vec<HelperDescriptor>>,
    selectors: DashMap<TableKey, Vec<String>>,
    property_names: DashMap<TableKey, Vec<String>>,
    property_types: DashMap<TableKey, HashMap<String, String>>,
    shape_names: DashMap<TableKey, String>,
    global_helpers: DashMap<PathBuf, Vec<HelperDescriptor>>,
}

impl AnalysisTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_helpers(&self, key: TableKey, descriptors: Vec<HelperDescriptor>) {
        let names = descriptors.iter().map(|d| d.name.clone()).collect();
        self.helper_names.insert(key.clone(), names);
        self.helper_descriptors.insert(key, descriptors);
    }

    #[must_use]
    pub fn helper_names(&self, key: &TableKey) -> Vec<String> {
        self.helper_names
            .get(key)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn helper_descriptors(&self, key: &TableKey) -> Vec<HelperDescriptor> {
        self.helper_descriptors
            .get(key)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn helper(&self, key: &TableKey, name: &str) -> Option<HelperDescriptor> {
        self.helper_descriptors
            .get(key)?
            .iter()
            .find(|d| d.name == name)
            .cloned()
    }

    pub fn set_selectors(&self, key: TableKey, selectors: Vec<String>) {
        self.selectors.insert(key, selectors);
    }

    #[must_use]
    pub fn selectors(&self, key: &TableKey) -> Vec<String> {
        self.selectors
            .get(key)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    pub fn set_properties(&self, key: TableKey, types: HashMap<String, String>) {
        let names = types.keys().cloned().collect();
        self.property_names.insert(key.clone(), names);
        self.property_types.insert(key, types);
    }

    #[must_use]
    pub fn property_names(&self, key: &TableKey) -> Vec<String> {
        self.property_names
            .get(key)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn property_type(&self, key: &TableKey, property: &str) -> Option<String> {
        self.property_types.get(key)?.get(property).cloned()
    }

    pub fn set_shape_name(&self, key: TableKey, shape: String) {
        self.shape_names.insert(key, shape);
    }

    #[must_use]
    pub fn shape_name(&self, key: &TableKey) -> Option<String> {
        self.shape_names.get(key).map(|v| v.value().clone())
    }

    pub fn set_global_helpers(&self, dir: &Path, descriptors: Vec<HelperDescriptor>) {
        self.global_helpers.insert(dir.to_path_buf(), descriptors);
    }

    #[must_use]
    pub fn global_helpers(&self, dir: &Path) -> Vec<HelperDescriptor> {
        self.global_helpers
            .get(dir)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }
}
