//! Declaration tree for one Papyrus script file
//!
//! The parser only extracts what documentation needs: the script header,
//! imports, properties, functions, events, structs and states. Function
//! bodies and expressions are skipped. Every declaration carries a
//! [`DeclSite`] so comments can be attached to it afterwards.

mod comment;
mod item;
mod types;

pub use comment::{Comment, CommentKind};
pub use item::*;
pub use types::TypeExpr;

// Re-export Span from lexer for convenience
pub use crate::lexer::Span;

/// Source position of a declaration, used for comment attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeclSite {
    /// Byte offset of the first token of the declaration
    pub start: u32,
    /// Byte offset just past the token that terminates the declaration header
    pub header_end: u32,
    /// Line of the first token
    pub line: u32,
    /// Line of the header's terminating token
    pub end_line: u32,
    /// Significant-token index just after the header; a comment lexed at
    /// this index opens the declaration's body
    pub body_at: usize,
}

/// A parsed script file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptFile {
    pub header: Header,
    pub imports: Vec<String>,
    pub items: Vec<Item>,
    /// Every comment in the file, in source order
    pub comments: Vec<Comment>,
}

impl ScriptFile {
    /// Every declaration site in the file, header first, in source order
    #[must_use]
    pub fn sites(&self) -> Vec<DeclSite> {
        let mut sites = vec![self.header.site];
        for item in &self.items {
            item.collect_sites(&mut sites);
        }
        sites.sort_by_key(|site| site.start);
        sites
    }
}
