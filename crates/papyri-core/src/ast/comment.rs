//! Comment handling for the declaration tree
//!
//! Comments are not part of the grammar. The parser collects them with
//! their position so the doc model builder can attach them to declarations.

use crate::lexer::{comment_text, Span, Token, TokenKind};

/// A comment in the source code
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// The comment content without delimiters
    pub text: String,
    pub kind: CommentKind,
    pub span: Span,
    /// First line of the comment
    pub line: u32,
    /// Last line of the comment
    pub end_line: u32,
    /// Number of significant tokens that precede this comment
    pub follows: usize,
}

impl Comment {
    /// Build a comment from a trivia token
    #[must_use]
    pub fn from_token(token: &Token, follows: usize) -> Option<Self> {
        let kind = match token.kind {
            TokenKind::LineComment => CommentKind::Line,
            TokenKind::BlockComment => CommentKind::Block,
            TokenKind::DocComment => CommentKind::Doc,
            _ => return None,
        };
        Some(Self {
            text: comment_text(&token.kind, &token.lexeme),
            kind,
            span: token.span,
            line: token.line,
            end_line: token.end_line,
            follows,
        })
    }

    /// Check if this is a documentation comment (`{ ... }`)
    #[must_use]
    pub fn is_doc_comment(&self) -> bool {
        self.kind == CommentKind::Doc
    }
}

/// The kind of comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `; ...`
    Line,
    /// `;/ ... /;`
    Block,
    /// `{ ... }`
    Doc,
}
