//! Scanners for Spacebars template text.
//!
//! Everything here operates on raw source text and byte offsets. There is
//! deliberately no AST: each scanner walks the text it is given and degrades
//! to "no result" on malformed input, which keeps every feature usable while
//! the user is mid-edit.

mod blocks;
mod comments;
mod context;
mod declarations;
mod expressions;
mod specs;

pub use blocks::find_enclosing_branch;
pub use blocks::find_matching_open;
pub use blocks::scan_all_blocks;
pub use blocks::scan_blocks;
pub use blocks::BlockKind;
pub use blocks::BlockOccurrence;
pub use blocks::Branch;
pub use blocks::ConditionalKind;
pub use blocks::MatchedOpen;
pub use comments::comment_at;
pub use comments::CommentKind;
pub use comments::CommentRegion;
pub use context::find_enclosing_conditional;
pub use context::find_enclosing_each;
pub use context::ConditionalContext;
pub use context::EachContext;
pub use declarations::declared_templates;
pub use declarations::enclosing_template;
pub use declarations::TemplateDeclaration;
pub use expressions::expression_at;
pub use expressions::Expression;
pub use specs::BlockSpec;
pub use specs::BlockSpecs;
