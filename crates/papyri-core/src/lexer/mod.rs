//! Lexer for Papyrus script sources
//!
//! The lexer converts source code into a stream of tokens, handling:
//! - Case-insensitive keywords, identifiers, and operators
//! - Numeric and string literals
//! - Line (`;`), block (`;/ ... /;`) and documentation (`{ ... }`) comments
//! - Line continuations (`\` at end of line)
//!
//! Errors never abort lexing. An invalid character or an unterminated
//! literal is reported and the lexer resumes at the next line boundary.

#![allow(clippy::cast_possible_truncation)] // Spans are u32; script files > 4GB are unsupported

mod span;
mod token;

pub use span::{LineIndex, Span};
pub use token::TokenKind;

use logos::Logos;
use thiserror::Error;

/// A token with its kind, span, source text and position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// The source text of the token
    pub lexeme: String,
    /// 1-indexed line of the first byte
    pub line: u32,
    /// 1-indexed column of the first byte
    pub column: u32,
    /// 1-indexed line of the last byte (differs from `line` for block comments)
    pub end_line: u32,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, span: Span, lexeme: impl Into<String>, index: &LineIndex) -> Self {
        let (line, column) = index.position(span.start);
        let end_line = if span.is_empty() {
            line
        } else {
            index.line(span.end - 1)
        };
        Self {
            kind,
            span,
            lexeme: lexeme.into(),
            line,
            column,
            end_line,
        }
    }
}

/// Lexer error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
    #[error("unterminated documentation comment")]
    UnterminatedDocComment,
}

/// A lexer error with location information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedError {
    pub error: LexError,
    pub span: Span,
    pub line: u32,
}

impl SpannedError {
    #[must_use]
    pub fn new(error: LexError, span: Span, line: u32) -> Self {
        Self { error, span, line }
    }
}

impl std::fmt::Display for SpannedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on line {}", self.error, self.line)
    }
}

impl std::error::Error for SpannedError {}

/// The Papyrus lexer
pub struct Lexer<'source> {
    source: &'source str,
    /// Current position in the source (byte offset)
    position: usize,
    index: LineIndex,
    finished: bool,
    errors: Vec<SpannedError>,
}

impl<'source> Lexer<'source> {
    #[must_use]
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            position: 0,
            index: LineIndex::new(source),
            finished: false,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source, returning all tokens and any errors
    ///
    /// The token list always ends with exactly one `Eof` token.
    #[must_use]
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<SpannedError>) {
        let mut lexer = Lexer::new(source);
        let tokens: Vec<Token> = lexer.by_ref().collect();
        (tokens, lexer.errors)
    }

    #[must_use]
    pub fn errors(&self) -> &[SpannedError] {
        &self.errors
    }

    fn eof(&mut self) -> Token {
        self.finished = true;
        Token::new(TokenKind::Eof, Span::empty_at(self.source.len()), "", &self.index)
    }

    fn make(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        Token::new(
            kind,
            Span::new(start, end),
            &self.source[start..end],
            &self.index,
        )
    }

    /// Record an error and skip to the next line boundary
    fn recover(&mut self, error: LexError, start: usize) -> Token {
        let end = self.source[start..]
            .find('\n')
            .map_or(self.source.len(), |offset| start + offset);
        let end = end.max(start + 1).min(self.source.len());
        let span = Span::new(start, end);
        self.errors
            .push(SpannedError::new(error, span, self.index.line(span.start)));
        self.position = end;
        self.make(TokenKind::Error, start, end)
    }

    fn next_token(&mut self) -> Token {
        if self.position >= self.source.len() {
            return self.eof();
        }

        let remaining = &self.source[self.position..];
        let mut logos_lexer = TokenKind::lexer(remaining);

        match logos_lexer.next() {
            Some(Ok(kind)) => {
                let range = logos_lexer.span();
                let start = self.position + range.start;
                let end = self.position + range.end;
                self.position = end;
                match kind {
                    TokenKind::Quote => self.lex_string(start),
                    TokenKind::BlockCommentStart => self.lex_delimited(
                        start,
                        "/;",
                        TokenKind::BlockComment,
                        LexError::UnterminatedBlockComment,
                    ),
                    TokenKind::DocCommentStart => self.lex_delimited(
                        start,
                        "}",
                        TokenKind::DocComment,
                        LexError::UnterminatedDocComment,
                    ),
                    _ => self.make(kind, start, end),
                }
            }
            Some(Err(())) => {
                let start = self.position + logos_lexer.span().start;
                let invalid = self.source[start..].chars().next().unwrap_or('\u{fffd}');
                self.recover(LexError::UnexpectedChar(invalid), start)
            }
            None => {
                self.position = self.source.len();
                self.eof()
            }
        }
    }

    /// Scan the body of a string literal whose opening quote is at `start`
    fn lex_string(&mut self, start: usize) -> Token {
        let bytes = self.source.as_bytes();
        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if bytes.get(i + 1) != Some(&b'\n') => i += 2,
                b'"' => {
                    self.position = i + 1;
                    return self.make(TokenKind::String, start, i + 1);
                }
                b'\n' => break,
                _ => i += 1,
            }
        }
        self.recover(LexError::UnterminatedString, start)
    }

    /// Scan a comment that runs from `start` to the first `close`
    fn lex_delimited(
        &mut self,
        start: usize,
        close: &str,
        kind: TokenKind,
        error: LexError,
    ) -> Token {
        match self.source[self.position..].find(close) {
            Some(offset) => {
                let end = self.position + offset + close.len();
                self.position = end;
                self.make(kind, start, end)
            }
            None => self.recover(error, start),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            None
        } else {
            Some(self.next_token())
        }
    }
}

/// Strip the delimiters from a comment lexeme
#[must_use]
pub fn comment_text(kind: &TokenKind, lexeme: &str) -> String {
    let inner = match kind {
        TokenKind::DocComment => lexeme
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(lexeme),
        TokenKind::BlockComment => lexeme
            .strip_prefix(";/")
            .and_then(|s| s.strip_suffix("/;"))
            .unwrap_or(lexeme),
        TokenKind::LineComment => lexeme.strip_prefix(';').unwrap_or(lexeme),
        _ => lexeme,
    };
    inner.trim().to_string()
}
