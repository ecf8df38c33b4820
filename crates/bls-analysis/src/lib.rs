//! Companion-file analysis.
//!
//! Templates get their helpers, data shapes, and style selectors from
//! sibling script and stylesheet files. This crate scans those companions
//! and fills an [`AnalysisTable`] that the IDE features read. Scanning is
//! lexical: regex passes plus brace balancing, rebuilt wholesale per file
//! event, tolerant of anything that does not match.

mod analyzer;
mod helpers;
mod imports;
mod shapes;
mod styles;
mod table;

pub use analyzer::analyze_document;
pub use analyzer::companion_files;
pub use analyzer::CompanionKind;
pub use helpers::extract_global_helpers;
pub use helpers::extract_template_helpers;
pub use helpers::HelperRegistration;
pub use imports::import_statements;
pub use imports::ImportResolver;
pub use imports::ImportStatement;
pub use imports::ImportStrategy;
pub use imports::RelativeStrategy;
pub use imports::RootStrategy;
pub use shapes::extract_shapes;
pub use shapes::extract_typedef_shapes;
pub use shapes::template_shape_map;
pub use shapes::Shape;
pub use shapes::ShapeProperty;
pub use styles::extract_selectors;
pub use table::AnalysisTable;
pub use table::HelperDescriptor;
pub use table::TableKey;
