//! Parser for Papyrus script files
//!
//! A lenient recursive-descent parser that extracts declarations and skips
//! everything documentation does not need (function bodies, variables,
//! custom events). Errors are scoped to the construct being parsed: the
//! parser records them and resumes at the next declaration boundary. Only
//! a missing header or an unterminated block makes the whole file unusable.
//!
//! # Example
//!
//! ```
//! use papyri_core::parser::Parser;
//!
//! let output = Parser::parse("ScriptName MyQuest extends Quest\nInt Property Stage Auto\n");
//! let script = output.script.unwrap();
//! assert_eq!(script.header.name, "MyQuest");
//! assert_eq!(script.items.len(), 1);
//! ```

mod error;

pub use error::{ExpectedToken, ParseError, ParseErrorKind};

use crate::ast::{
    AutoKind, Comment, DeclSite, FunctionDecl, Header, Item, ParamDecl, PropertyDecl,
    ScriptFile, StateDecl, StructDecl, StructMemberDecl, TypeExpr,
};
use crate::lexer::{Lexer, Span, SpannedError, Token, TokenKind};

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Everything the parser learned about one file
#[derive(Debug, Clone)]
pub struct ParseOutput {
    /// `None` when the file is unusable (missing header or unterminated block)
    pub script: Option<ScriptFile>,
    /// Syntax errors, recovered and fatal alike
    pub errors: Vec<ParseError>,
    /// Lexer errors (passed through)
    pub lex_errors: Vec<SpannedError>,
}

impl ParseOutput {
    /// The error that excluded the file, if any
    #[must_use]
    pub fn fatal_error(&self) -> Option<&ParseError> {
        self.errors.iter().find(|e| e.is_fatal())
    }
}

/// The Papyrus parser
pub struct Parser {
    /// Significant tokens; always ends with `Eof`
    tokens: Vec<Token>,
    /// Current position in the token stream
    position: usize,
    comments: Vec<Comment>,
    errors: Vec<ParseError>,
    lex_errors: Vec<SpannedError>,
    /// Open `Group` block: label and opening line
    group: Option<(String, u32)>,
}

impl Parser {
    /// Create a new parser from source code
    #[must_use]
    pub fn new(source: &str) -> Self {
        let (raw, lex_errors) = Lexer::tokenize(source);
        let mut tokens: Vec<Token> = Vec::with_capacity(raw.len());
        let mut comments = Vec::new();
        for token in raw {
            if token.kind.is_trivia() {
                comments.extend(Comment::from_token(&token, tokens.len()));
            } else if token.kind != TokenKind::Error {
                tokens.push(token);
            }
        }
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let end = source.len();
            let line = tokens.last().map_or(1, |t| t.end_line);
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::empty_at(end),
                lexeme: String::new(),
                line,
                column: 1,
                end_line: line,
            });
        }
        Self {
            tokens,
            position: 0,
            comments,
            errors: Vec::new(),
            lex_errors,
            group: None,
        }
    }

    /// Parse a complete script file
    #[must_use]
    pub fn parse(source: &str) -> ParseOutput {
        let mut parser = Parser::new(source);
        let script = match parser.script_file() {
            Ok(file) => Some(file),
            Err(error) => {
                parser.errors.push(error);
                None
            }
        };
        ParseOutput {
            script,
            errors: parser.errors,
            lex_errors: parser.lex_errors,
        }
    }

    // ==================== Token Management ====================

    fn current(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.position.min(last)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind.clone()
    }

    fn peek_kind(&self, ahead: usize) -> TokenKind {
        let last = self.tokens.len() - 1;
        self.tokens[(self.position + ahead).min(last)].kind.clone()
    }

    fn is_eof(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_eof() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(ExpectedToken::Token(kind)))
        }
    }

    fn error_here(&self, kind: ParseErrorKind) -> ParseError {
        let token = self.current();
        ParseError::new(kind, token.span, token.line)
    }

    fn unexpected(&self, expected: ExpectedToken) -> ParseError {
        if self.is_eof() {
            return self.error_here(ParseErrorKind::UnexpectedEof);
        }
        self.error_here(ParseErrorKind::UnexpectedToken {
            found: self.kind(),
            expected,
        })
    }

    fn at_line_start(&self) -> bool {
        self.position == 0 || self.tokens[self.position - 1].end_line < self.current().line
    }

    /// Build the site of a declaration whose header has just been consumed
    fn site_from(&self, start: &Token) -> DeclSite {
        let last = &self.tokens[self.position.saturating_sub(1)];
        DeclSite {
            start: start.span.start,
            header_end: last.span.end,
            line: start.line,
            end_line: last.end_line,
            body_at: self.position,
        }
    }

    // ==================== Lookahead ====================

    /// If a type expression starts here, the token that follows it
    fn type_led(&self) -> Option<TokenKind> {
        let kind_at = |i: usize| {
            self.tokens
                .get(i)
                .map_or(TokenKind::Eof, |t| t.kind.clone())
        };
        let mut i = self.position;
        if !kind_at(i).is_name_like() {
            return None;
        }
        i += 1;
        while kind_at(i) == TokenKind::Colon && kind_at(i + 1).is_name_like() {
            i += 2;
        }
        if kind_at(i) == TokenKind::Hash && kind_at(i + 1).is_name_like() {
            i += 2;
        }
        if kind_at(i) == TokenKind::LBracket && kind_at(i + 1) == TokenKind::RBracket {
            i += 2;
        }
        Some(kind_at(i))
    }

    /// Whether the current token begins a declaration or closes a block scope
    fn is_decl_start(&self) -> bool {
        match self.kind() {
            TokenKind::ScriptName
            | TokenKind::Import
            | TokenKind::Function
            | TokenKind::Event
            | TokenKind::State
            | TokenKind::Struct
            | TokenKind::Group
            | TokenKind::EndGroup
            | TokenKind::EndState
            | TokenKind::EndStruct
            | TokenKind::EndProperty
            | TokenKind::CustomEvent
            | TokenKind::Eof => true,
            TokenKind::Auto => self.peek_kind(1) == TokenKind::State,
            _ => matches!(
                self.type_led(),
                Some(TokenKind::Function | TokenKind::Property)
            ),
        }
    }

    // ==================== Script ====================

    fn script_file(&mut self) -> ParseResult<ScriptFile> {
        let header = self.header()?;
        let mut file = ScriptFile {
            header,
            ..ScriptFile::default()
        };

        while !self.is_eof() {
            let from = self.position;
            match self.top_level_item(&mut file.imports) {
                Ok(Some(item)) => file.items.push(item),
                Ok(None) => {}
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize(from);
                }
            }
        }

        if let Some((name, opened)) = self.group.take() {
            return Err(self.error_here(ParseErrorKind::UnterminatedBlock {
                block: "group",
                name,
                opened,
            }));
        }

        file.comments = std::mem::take(&mut self.comments);
        Ok(file)
    }

    fn header(&mut self) -> ParseResult<Header> {
        if !self.check(&TokenKind::ScriptName) {
            let stray = self.unexpected(ExpectedToken::Token(TokenKind::ScriptName));
            while !self.is_eof() && !self.check(&TokenKind::ScriptName) {
                self.advance();
            }
            if self.is_eof() {
                return Err(self.error_here(ParseErrorKind::MissingHeader));
            }
            self.errors.push(stray);
        }

        let start = self.advance();
        let (name, _) = self.namespaced_name().map_err(|_| {
            self.error_here(ParseErrorKind::MissingHeader)
                .with_hint("expected a script name after ScriptName")
        })?;

        let mut extends = None;
        if self.eat(&TokenKind::Extends) {
            match self.type_expr() {
                Ok(ty) => extends = Some(ty),
                Err(error) => self.errors.push(error),
            }
        }
        let flags = self.flags();
        let site = self.site_from(&start);

        Ok(Header {
            name,
            extends,
            flags,
            site,
        })
    }

    fn top_level_item(&mut self, imports: &mut Vec<String>) -> ParseResult<Option<Item>> {
        match self.kind() {
            TokenKind::Import => {
                self.advance();
                let (name, _) = self.namespaced_name()?;
                imports.push(name);
                Ok(None)
            }
            TokenKind::Group => {
                let start = self.advance();
                let (name, _) = self.name()?;
                self.flags();
                self.group = Some((name, start.line));
                Ok(None)
            }
            TokenKind::EndGroup => {
                let token = self.advance();
                if self.group.take().is_none() {
                    return Err(ParseError::new(
                        ParseErrorKind::StrayBlockEnd { found: token.kind },
                        token.span,
                        token.line,
                    ));
                }
                Ok(None)
            }
            TokenKind::CustomEvent => {
                self.advance();
                self.name()?;
                Ok(None)
            }
            TokenKind::Struct => self.struct_decl().map(|s| Some(Item::Struct(s))),
            TokenKind::State => self.state_decl().map(|s| Some(Item::State(s))),
            TokenKind::Auto if self.peek_kind(1) == TokenKind::State => {
                self.state_decl().map(|s| Some(Item::State(s)))
            }
            TokenKind::Function | TokenKind::Event => {
                let start = self.current().clone();
                self.function_decl(None, &start)
                    .map(|f| Some(Item::Function(f)))
            }
            kind if kind.is_block_end() => {
                let token = self.advance();
                Err(ParseError::new(
                    ParseErrorKind::StrayBlockEnd { found: token.kind },
                    token.span,
                    token.line,
                ))
            }
            kind if kind.is_name_like() => self.type_led_item(),
            _ => Err(self.unexpected(ExpectedToken::Description("a declaration".into()))),
        }
    }

    /// `<type> Property ...`, `<type> Function ...` or a script variable
    fn type_led_item(&mut self) -> ParseResult<Option<Item>> {
        let start = self.current().clone();
        let ty = self.type_expr()?;
        match self.kind() {
            TokenKind::Property => self
                .property_decl(ty, &start)
                .map(|p| Some(Item::Property(p))),
            TokenKind::Function => self
                .function_decl(Some(ty), &start)
                .map(|f| Some(Item::Function(f))),
            kind if kind.is_name_like() => {
                // Script variable: not documented, skip the rest of the line
                let line = self.advance().line;
                while !self.is_eof() && self.current().line == line {
                    self.advance();
                }
                Ok(None)
            }
            _ => Err(self.unexpected(ExpectedToken::OneOf(vec![
                TokenKind::Property,
                TokenKind::Function,
                TokenKind::Ident,
            ]))),
        }
    }

    // ==================== Declarations ====================

    fn property_decl(&mut self, ty: TypeExpr, start: &Token) -> ParseResult<PropertyDecl> {
        self.expect(TokenKind::Property)?;
        let (name, _) = self.name()?;
        let default = if self.eat(&TokenKind::Eq) {
            Some(self.literal()?)
        } else {
            None
        };

        let mut auto_kind = AutoKind::Plain;
        let mut flags = Vec::new();
        loop {
            match self.kind() {
                TokenKind::Auto if self.peek_kind(1) != TokenKind::State => {
                    self.advance();
                    auto_kind = AutoKind::Auto;
                }
                TokenKind::AutoReadOnly => {
                    self.advance();
                    auto_kind = AutoKind::AutoReadOnly;
                }
                kind if kind.is_flag() => flags.push(self.advance().lexeme),
                _ => break,
            }
        }
        let site = self.site_from(start);

        if auto_kind == AutoKind::Plain {
            self.property_block(&name, start.line)?;
        }

        Ok(PropertyDecl {
            name,
            ty,
            default,
            auto_kind,
            flags,
            group: self.group.as_ref().map(|(label, _)| label.clone()),
            site,
        })
    }

    /// Accessors of a full property, up to `EndProperty`; they are not documented
    fn property_block(&mut self, name: &str, opened: u32) -> ParseResult<()> {
        loop {
            let from = self.position;
            let result = match self.kind() {
                TokenKind::EndProperty => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::Function | TokenKind::Event => {
                    let start = self.current().clone();
                    self.function_decl(None, &start).map(drop)
                }
                _ if self.type_led() == Some(TokenKind::Function) => {
                    let start = self.current().clone();
                    self.type_expr()
                        .and_then(|ty| self.function_decl(Some(ty), &start))
                        .map(drop)
                }
                kind if self.is_decl_start() || kind.is_block_end() => {
                    return Err(self.error_here(ParseErrorKind::UnterminatedBlock {
                        block: "property",
                        name: name.to_string(),
                        opened,
                    }));
                }
                _ => Err(self.unexpected(ExpectedToken::OneOf(vec![
                    TokenKind::Function,
                    TokenKind::EndProperty,
                ]))),
            };
            self.recover(result, from)?;
        }
    }

    fn function_decl(
        &mut self,
        return_type: Option<TypeExpr>,
        start: &Token,
    ) -> ParseResult<FunctionDecl> {
        let is_event = self.check(&TokenKind::Event);
        if !is_event {
            self.expect(TokenKind::Function)?;
        } else {
            self.advance();
        }

        let mut event_source = None;
        let name = if is_event {
            let (first, _) = self.namespaced_name()?;
            if self.eat(&TokenKind::Dot) {
                event_source = Some(first);
                self.name()?.0
            } else {
                first
            }
        } else {
            self.name()?.0
        };

        self.expect(TokenKind::LParen)?;
        let params = self.params()?;
        self.expect(TokenKind::RParen)?;
        let flags = self.flags();
        let site = self.site_from(start);

        let native = flags.iter().any(|f| f.eq_ignore_ascii_case("native"));
        let has_body = if native {
            false
        } else {
            self.function_body(is_event, &name, start.line)?
        };

        Ok(FunctionDecl {
            name,
            return_type,
            params,
            flags,
            is_event,
            event_source,
            has_body,
            site,
        })
    }

    fn params(&mut self) -> ParseResult<Vec<ParamDecl>> {
        let mut params = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let ty = self.type_expr()?;
            let (name, _) = self.name()?;
            let default = if self.eat(&TokenKind::Eq) {
                Some(self.literal()?)
            } else {
                None
            };
            params.push(ParamDecl { name, ty, default });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    /// Skip a function body; `Ok(false)` when the header has no body at all
    fn function_body(&mut self, is_event: bool, name: &str, opened: u32) -> ParseResult<bool> {
        let closer = if is_event {
            TokenKind::EndEvent
        } else {
            TokenKind::EndFunction
        };
        let begin = self.position;
        loop {
            let kind = self.kind();
            if kind == closer {
                self.advance();
                return Ok(true);
            }
            if kind.is_block_end() || self.is_decl_start() {
                if self.position == begin {
                    return Ok(false);
                }
                return Err(self
                    .error_here(ParseErrorKind::UnterminatedBlock {
                        block: if is_event { "event" } else { "function" },
                        name: name.to_string(),
                        opened,
                    })
                    .with_hint(format!("expected {closer}")));
            }
            self.advance();
        }
    }

    fn struct_decl(&mut self) -> ParseResult<StructDecl> {
        let start = self.expect(TokenKind::Struct)?;
        let (name, _) = self.name()?;
        let site = self.site_from(&start);
        let mut members = Vec::new();

        loop {
            let from = self.position;
            let result = match self.kind() {
                TokenKind::EndStruct => {
                    self.advance();
                    break;
                }
                kind if self.is_decl_start() || kind.is_block_end() => {
                    return Err(self.error_here(ParseErrorKind::UnterminatedBlock {
                        block: "struct",
                        name,
                        opened: start.line,
                    }));
                }
                kind if kind.is_name_like() => self.struct_member().map(|m| members.push(m)),
                _ => Err(self.unexpected(ExpectedToken::Description("a struct member".into()))),
            };
            self.recover(result, from)?;
        }

        Ok(StructDecl {
            name,
            members,
            site,
        })
    }

    fn struct_member(&mut self) -> ParseResult<StructMemberDecl> {
        let start = self.current().clone();
        let ty = self.type_expr()?;
        let (name, _) = self.name()?;
        let default = if self.eat(&TokenKind::Eq) {
            Some(self.literal()?)
        } else {
            None
        };
        let flags = self.flags();
        Ok(StructMemberDecl {
            name,
            ty,
            default,
            flags,
            site: self.site_from(&start),
        })
    }

    fn state_decl(&mut self) -> ParseResult<StateDecl> {
        let start = self.current().clone();
        let auto = self.eat(&TokenKind::Auto);
        self.expect(TokenKind::State)?;
        let (name, _) = self.name()?;
        let site = self.site_from(&start);
        let mut functions = Vec::new();

        loop {
            let from = self.position;
            let result = match self.kind() {
                TokenKind::EndState => {
                    self.advance();
                    break;
                }
                TokenKind::Function | TokenKind::Event => {
                    let fn_start = self.current().clone();
                    self.function_decl(None, &fn_start)
                        .map(|f| functions.push(f))
                }
                _ if self.type_led() == Some(TokenKind::Function) => {
                    let fn_start = self.current().clone();
                    self.type_expr()
                        .and_then(|ty| self.function_decl(Some(ty), &fn_start))
                        .map(|f| functions.push(f))
                }
                TokenKind::EndFunction | TokenKind::EndEvent => {
                    let token = self.advance();
                    Err(ParseError::new(
                        ParseErrorKind::StrayBlockEnd { found: token.kind },
                        token.span,
                        token.line,
                    ))
                }
                kind if self.is_decl_start() || kind.is_block_end() => {
                    return Err(self.error_here(ParseErrorKind::UnterminatedBlock {
                        block: "state",
                        name,
                        opened: start.line,
                    }));
                }
                _ => Err(self.unexpected(ExpectedToken::OneOf(vec![
                    TokenKind::Function,
                    TokenKind::Event,
                    TokenKind::EndState,
                ]))),
            };
            self.recover(result, from)?;
        }

        Ok(StateDecl {
            name,
            auto,
            functions,
            site,
        })
    }

    // ==================== Pieces ====================

    fn name(&mut self) -> ParseResult<(String, Span)> {
        if self.current().kind.is_name_like() {
            let token = self.advance();
            Ok((token.lexeme, token.span))
        } else {
            Err(self.error_here(ParseErrorKind::ExpectedIdentifier))
        }
    }

    /// `Name` or `Ns:Sub:Name`
    fn namespaced_name(&mut self) -> ParseResult<(String, Span)> {
        let (mut name, mut span) = self.name()?;
        while self.check(&TokenKind::Colon) && self.peek_kind(1).is_name_like() {
            self.advance();
            let (part, part_span) = self.name()?;
            name.push(':');
            name.push_str(&part);
            span = span.cover(part_span);
        }
        Ok((name, span))
    }

    fn type_expr(&mut self) -> ParseResult<TypeExpr> {
        let (mut name, mut span) = self
            .namespaced_name()
            .map_err(|_| self.error_here(ParseErrorKind::ExpectedType))?;
        if self.check(&TokenKind::Hash) && self.peek_kind(1).is_name_like() {
            self.advance();
            let (member, member_span) = self.name()?;
            name.push('#');
            name.push_str(&member);
            span = span.cover(member_span);
        }
        let mut array = false;
        if self.check(&TokenKind::LBracket) && self.peek_kind(1) == TokenKind::RBracket {
            self.advance();
            span = span.cover(self.advance().span);
            array = true;
        }
        Ok(TypeExpr::new(name, array, span))
    }

    /// A default value literal, kept as written
    fn literal(&mut self) -> ParseResult<String> {
        let negative = self.eat(&TokenKind::Minus);
        if self.current().kind.is_literal() {
            let token = self.advance();
            Ok(if negative {
                format!("-{}", token.lexeme)
            } else {
                token.lexeme
            })
        } else {
            Err(self.error_here(ParseErrorKind::ExpectedLiteral))
        }
    }

    fn flags(&mut self) -> Vec<String> {
        let mut flags = Vec::new();
        while self.current().kind.is_flag() {
            flags.push(self.advance().lexeme);
        }
        flags
    }

    // ==================== Error Recovery ====================

    /// Record a recoverable error and resynchronize; fatal errors propagate
    fn recover(&mut self, result: ParseResult<()>, from: usize) -> ParseResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(error) if error.is_fatal() => Err(error),
            Err(error) => {
                self.errors.push(error);
                self.synchronize(from);
                Ok(())
            }
        }
    }

    /// Skip to the next line that starts a declaration or closes a block
    fn synchronize(&mut self, from: usize) {
        if self.position == from {
            self.advance();
        }
        while !self.is_eof() {
            if self.at_line_start() && (self.is_decl_start() || self.kind().is_block_end()) {
                return;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> ScriptFile {
        let output = Parser::parse(source);
        match output.script {
            Some(script) => script,
            None => panic!("file excluded: {:?}", output.errors),
        }
    }

    fn functions(script: &ScriptFile) -> Vec<&FunctionDecl> {
        script
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Function(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    fn properties(script: &ScriptFile) -> Vec<&PropertyDecl> {
        script
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Property(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parse_header() {
        let script = parse_ok("scriptname Ns:MyQuest EXTENDS Quest conditional hidden\n");
        assert_eq!(script.header.name, "Ns:MyQuest");
        assert_eq!(script.header.extends.as_ref().map(|t| t.name.as_str()), Some("Quest"));
        assert_eq!(script.header.flags, vec!["conditional", "hidden"]);
    }

    #[test]
    fn parse_imports() {
        let script = parse_ok("ScriptName A\nImport Utility\nImport Game:Things\n");
        assert_eq!(script.imports, vec!["Utility", "Game:Things"]);
    }

    #[test]
    fn parse_properties() {
        let source = "ScriptName A\n\
                      Int Property Stage Auto\n\
                      Float Property Speed = -1.5 AutoReadOnly Hidden\n\
                      Actor[] Property Crowd Auto Const Mandatory\n";
        let script = parse_ok(source);
        let props = properties(&script);
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].name, "Stage");
        assert_eq!(props[0].ty.name, "Int");
        assert_eq!(props[0].auto_kind, AutoKind::Auto);
        assert_eq!(props[1].default.as_deref(), Some("-1.5"));
        assert_eq!(props[1].auto_kind, AutoKind::AutoReadOnly);
        assert_eq!(props[1].flags, vec!["Hidden"]);
        assert!(props[2].ty.array);
        assert_eq!(props[2].flags, vec!["Const", "Mandatory"]);
    }

    #[test]
    fn parse_full_property_block() {
        let source = "ScriptName A\n\
                      Int Property Count\n\
                        Int Function Get()\n\
                          Return 5\n\
                        EndFunction\n\
                        Function Set(Int value)\n\
                        EndFunction\n\
                      EndProperty\n\
                      Function After()\n\
                      EndFunction\n";
        let script = parse_ok(source);
        let props = properties(&script);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].auto_kind, AutoKind::Plain);
        // accessors are not script functions
        let fns = functions(&script);
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].name, "After");
    }

    #[test]
    fn parse_bodiless_function() {
        let script = parse_ok("ScriptName MyQuest extends Quest\nFunction DoThing(int a, bool b = true)\n");
        let fns = functions(&script);
        assert_eq!(fns.len(), 1);
        assert!(!fns[0].has_body);
        assert_eq!(fns[0].params.len(), 2);
        assert_eq!(fns[0].params[1].default.as_deref(), Some("true"));
    }

    #[test]
    fn parse_function_with_body_and_return_type() {
        let source = "ScriptName A\n\
                      Int[] Function GetAll(Actor akTarget, string asName = \"x\") Global\n\
                        Int[] result = new Int[5]\n\
                        If akTarget == None\n\
                          Return result\n\
                        EndIf\n\
                        Return result\n\
                      EndFunction\n\
                      Function Native1() Native Global\n\
                      Function Next()\n\
                      EndFunction\n";
        let script = parse_ok(source);
        let fns = functions(&script);
        assert_eq!(fns.len(), 3);
        assert!(fns[0].has_body);
        assert_eq!(fns[0].return_type.as_ref().map(ToString::to_string).as_deref(), Some("Int[]"));
        assert_eq!(fns[0].params[1].default.as_deref(), Some("\"x\""));
        assert!(!fns[1].has_body);
        assert_eq!(fns[1].flags, vec!["Native", "Global"]);
        assert!(fns[2].has_body);
    }

    #[test]
    fn parse_events() {
        let source = "ScriptName A\n\
                      Event OnInit()\n\
                        Debug.Trace(\"hi\")\n\
                      EndEvent\n\
                      Event Actor.OnDeath(Actor akSender, Actor akKiller)\n\
                      EndEvent\n";
        let script = parse_ok(source);
        let fns = functions(&script);
        assert_eq!(fns.len(), 2);
        assert!(fns.iter().all(|f| f.is_event && f.has_body));
        assert_eq!(fns[1].event_source.as_deref(), Some("Actor"));
        assert_eq!(fns[1].name, "OnDeath");
    }

    #[test]
    fn parse_struct_state_and_group() {
        let source = "ScriptName A\n\
                      Struct Point\n\
                        Float X = 0.0\n\
                        Float Y Hidden\n\
                      EndStruct\n\
                      Group Settings Collapsed\n\
                        Bool Property Enabled = True Auto\n\
                      EndGroup\n\
                      Int Property Loose Auto\n\
                      Auto State Waiting\n\
                        Event OnActivate(ObjectReference akActionRef)\n\
                        EndEvent\n\
                        Function Poll()\n\
                      EndState\n";
        let script = parse_ok(source);
        let Item::Struct(point) = &script.items[0] else {
            panic!("expected struct, got {:?}", script.items[0]);
        };
        assert_eq!(point.members.len(), 2);
        assert_eq!(point.members[0].default.as_deref(), Some("0.0"));
        assert_eq!(point.members[1].flags, vec!["Hidden"]);

        let props = properties(&script);
        assert_eq!(props[0].group.as_deref(), Some("Settings"));
        assert_eq!(props[1].group, None);

        let Item::State(state) = &script.items[3] else {
            panic!("expected state, got {:?}", script.items[3]);
        };
        assert!(state.auto);
        assert_eq!(state.functions.len(), 2);
        assert!(!state.functions[1].has_body);
    }

    #[test]
    fn variables_and_custom_events_are_skipped() {
        let source = "ScriptName A\n\
                      Int count = 0\n\
                      CustomEvent OnThing\n\
                      Function F()\n\
                      EndFunction\n";
        let script = parse_ok(source);
        assert_eq!(script.items.len(), 1);
    }

    #[test]
    fn unterminated_function_excludes_file() {
        let source = "ScriptName Broken\n\
                      Function F()\n\
                        int x = 1\n\
                      Function G()\n\
                      EndFunction\n";
        let output = Parser::parse(source);
        assert!(output.script.is_none());
        let fatal = output.fatal_error().map(|e| e.kind.clone());
        assert!(matches!(
            fatal,
            Some(ParseErrorKind::UnterminatedBlock { block: "function", .. })
        ));
    }

    #[test]
    fn unterminated_state_excludes_file() {
        let output = Parser::parse("ScriptName A\nState Busy\nFunction F()\nEndFunction\n");
        assert!(output.script.is_none());
    }

    #[test]
    fn missing_header_excludes_file() {
        let output = Parser::parse("Int Property X Auto\n");
        assert!(output.script.is_none());
        assert!(matches!(
            output.fatal_error().map(|e| &e.kind),
            Some(ParseErrorKind::MissingHeader)
        ));
    }

    #[test]
    fn bad_construct_is_skipped() {
        let source = "ScriptName A\n\
                      Function Broken(int = 5)\n\
                      Int Property Good Auto\n\
                      Function Fine()\n\
                      EndFunction\n";
        let output = Parser::parse(source);
        assert_eq!(output.errors.len(), 1);
        let script = output.script.unwrap();
        assert_eq!(properties(&script).len(), 1);
        assert_eq!(functions(&script).len(), 1);
    }

    #[test]
    fn comments_are_collected_with_positions() {
        let source = "ScriptName A\n{script doc}\n; note\nFunction F() ; trailing\nEndFunction\n";
        let script = parse_ok(source);
        assert_eq!(script.comments.len(), 3);
        assert_eq!(script.comments[0].text, "script doc");
        assert_eq!(script.comments[0].follows, script.header.site.body_at);
        assert_eq!(script.comments[2].line, 4);
    }
}
