//! IDE features over the template scanners and the analysis table.
//!
//! Every function here is a pure query: document text and cursor offset in,
//! protocol types out. Misses are `None`/empty, never errors.

mod completions;
mod diagnostics;
mod hover;
mod navigation;
mod semantic;
mod words;

pub use completions::completion_items;
pub use diagnostics::validate;
pub use hover::hover;
pub use navigation::definition;
pub use semantic::semantic_tokens;
pub use semantic::TOKEN_LEGEND;

pub const SOURCE_NAME: &str = "bls";
