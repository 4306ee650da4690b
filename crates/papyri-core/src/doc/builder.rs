//! Doc model builder - turns a parsed file into a [`ScriptDecl`]
//!
//! Comments are attached in three rounds over the whole file, and each
//! round only sees the comments earlier rounds left unclaimed:
//!
//! 1. a doc comment ending on the line just before a declaration (or
//!    earlier on its first line), with no other declaration in between;
//!    the nearest one wins when several qualify
//! 2. a doc comment after a declaration's header on the header's last line
//! 3. for block declarations still undocumented, a doc comment on the line
//!    after the header that directly opens the body
//!
//! A comment that starts on a header's last line is only ever a trailing
//! comment, never a preceding one for the next declaration. A comment is
//! attached at most once.

use std::collections::HashMap;
use std::path::Path;

use crate::ast::{
    self, Comment, DeclSite, FunctionDecl, Item, PropertyDecl, ScriptFile, StateDecl, StructDecl,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::parser::Parser;

use super::model::{
    AutoKind, Function, Parameter, Property, ScriptDecl, State, StructDef, StructMember, TypeRef,
};
use super::{DocComment, Flag, FlagSet};

/// The result of building one source file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// `None` when the file was excluded
    pub script: Option<ScriptDecl>,
    pub diagnostics: Diagnostics,
}

/// Builds immutable script documents from parsed files
pub struct DocBuilder<'a> {
    attacher: CommentAttacher<'a>,
}

impl<'a> DocBuilder<'a> {
    fn new(file: &'a ScriptFile) -> Self {
        Self {
            attacher: CommentAttacher::new(&file.comments, &file.sites()),
        }
    }

    /// Lex, parse and build one file
    ///
    /// Lexer and recovered syntax errors become warnings. A file that cannot
    /// be parsed at all is excluded and reported.
    pub fn build_source(text: &str, path: &Path) -> FileOutcome {
        let output = Parser::parse(text);
        let mut diagnostics = Diagnostics::new();

        for error in &output.lex_errors {
            diagnostics.push(
                Diagnostic::warning(DiagnosticKind::LexError, error.error.to_string())
                    .in_file(path)
                    .at_line(error.line),
            );
        }
        for error in &output.errors {
            let diagnostic = if error.is_fatal() {
                Diagnostic::error(DiagnosticKind::SyntaxError, error.to_string())
            } else {
                Diagnostic::warning(DiagnosticKind::SyntaxError, error.to_string())
            };
            diagnostics.push(diagnostic.in_file(path).at_line(error.line));
        }

        let script = match &output.script {
            Some(file) => Some(Self::build(file, path)),
            None => {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::FileExcluded,
                        "file excluded from the corpus",
                    )
                    .in_file(path),
                );
                None
            }
        };

        FileOutcome {
            script,
            diagnostics,
        }
    }

    /// Build the document for a parsed file
    pub fn build(file: &ScriptFile, source: &Path) -> ScriptDecl {
        let mut builder = DocBuilder::new(file);
        let header = &file.header;
        let doc = builder.attacher.attach(&header.site, true);

        let mut script = ScriptDecl {
            name: header.name.clone(),
            extends: header.extends.as_ref().map(TypeRef::from),
            flags: FlagSet::from_words(&header.flags),
            imports: file.imports.clone(),
            properties: Vec::new(),
            functions: Vec::new(),
            structs: Vec::new(),
            states: Vec::new(),
            doc,
            source: source.to_path_buf(),
        };

        for item in &file.items {
            match item {
                Item::Property(p) => script.properties.push(builder.property(p)),
                Item::Function(f) => script.functions.push(builder.function(f)),
                Item::Struct(s) => script.structs.push(builder.struct_def(s)),
                Item::State(s) => script.states.push(builder.state(s)),
            }
        }

        script
    }

    fn property(&mut self, decl: &PropertyDecl) -> Property {
        let is_block = decl.auto_kind == AutoKind::Plain;
        Property {
            name: decl.name.clone(),
            ty: TypeRef::from(&decl.ty),
            auto_kind: decl.auto_kind,
            default: decl.default.clone(),
            flags: FlagSet::from_words(&decl.flags),
            doc: self.attacher.attach(&decl.site, is_block),
            group: decl.group.clone(),
        }
    }

    fn function(&mut self, decl: &FunctionDecl) -> Function {
        let mut flags = FlagSet::from_words(&decl.flags);
        if decl.is_event {
            flags.insert(Flag::Event);
        }
        Function {
            name: decl.name.clone(),
            return_type: decl.return_type.as_ref().map(TypeRef::from),
            params: decl.params.iter().map(Parameter::from).collect(),
            flags,
            doc: self.attacher.attach(&decl.site, true),
            has_body: decl.has_body,
            event_source: decl
                .event_source
                .as_ref()
                .map(|source| TypeRef::new(source.clone(), false)),
        }
    }

    fn struct_def(&mut self, decl: &StructDecl) -> StructDef {
        let doc = self.attacher.attach(&decl.site, true);
        let members = decl
            .members
            .iter()
            .map(|m| StructMember {
                name: m.name.clone(),
                ty: TypeRef::from(&m.ty),
                default: m.default.clone(),
                flags: FlagSet::from_words(&m.flags),
                doc: self.attacher.attach(&m.site, false),
            })
            .collect();
        StructDef {
            name: decl.name.clone(),
            members,
            doc,
        }
    }

    fn state(&mut self, decl: &StateDecl) -> State {
        let doc = self.attacher.attach(&decl.site, true);
        let functions = decl.functions.iter().map(|f| self.function(f)).collect();
        State {
            name: decl.name.clone(),
            auto: decl.auto,
            functions,
            doc,
        }
    }
}

/// Assigns doc comments to declaration sites, each comment at most once
struct CommentAttacher<'a> {
    docs: Vec<&'a Comment>,
    used: Vec<bool>,
    /// Comments that start on some header's last line, after the header
    trailing_only: Vec<bool>,
    /// Start offsets of every declaration, sorted
    starts: Vec<u32>,
    /// Comment claimed by the declaration starting at each offset
    claims: HashMap<u32, usize>,
}

impl<'a> CommentAttacher<'a> {
    fn new(comments: &'a [Comment], sites: &[DeclSite]) -> Self {
        let docs: Vec<&Comment> = comments.iter().filter(|c| c.is_doc_comment()).collect();
        let trailing_only = docs
            .iter()
            .map(|c| {
                sites
                    .iter()
                    .any(|s| c.line == s.end_line && c.span.start >= s.header_end)
            })
            .collect();
        let mut starts: Vec<u32> = sites.iter().map(|s| s.start).collect();
        starts.sort_unstable();
        let mut attacher = Self {
            used: vec![false; docs.len()],
            docs,
            trailing_only,
            starts,
            claims: HashMap::new(),
        };

        for site in sites {
            if let Some(i) = attacher.preceding(site) {
                attacher.claim(site, i);
            }
        }
        for site in sites {
            if attacher.claims.contains_key(&site.start) {
                continue;
            }
            if let Some(i) = attacher.trailing(site) {
                attacher.claim(site, i);
            }
        }
        attacher
    }

    fn claim(&mut self, site: &DeclSite, i: usize) {
        self.used[i] = true;
        self.claims.insert(site.start, i);
    }

    fn attach(&mut self, site: &DeclSite, is_block: bool) -> Option<DocComment> {
        let chosen = match self.claims.get(&site.start) {
            Some(&i) => i,
            None if is_block => {
                let i = self.body_opening(site)?;
                self.claim(site, i);
                i
            }
            None => return None,
        };
        let doc = DocComment::parse(&self.docs[chosen].text);
        (!doc.is_empty()).then_some(doc)
    }

    fn available(&self, i: usize) -> bool {
        !self.used[i]
    }

    fn preceding(&self, site: &DeclSite) -> Option<usize> {
        (0..self.docs.len())
            .filter(|&i| self.available(i) && !self.trailing_only[i])
            .filter(|&i| {
                let c = self.docs[i];
                c.span.end <= site.start
                    && (c.end_line + 1 == site.line || c.end_line == site.line)
                    && !self
                        .starts
                        .iter()
                        .any(|&start| start >= c.span.end && start < site.start)
            })
            .max_by_key(|&i| self.docs[i].span.end)
    }

    fn trailing(&self, site: &DeclSite) -> Option<usize> {
        (0..self.docs.len()).find(|&i| {
            let c = self.docs[i];
            self.available(i) && c.line == site.end_line && c.span.start >= site.header_end
        })
    }

    fn body_opening(&self, site: &DeclSite) -> Option<usize> {
        (0..self.docs.len()).find(|&i| {
            let c = self.docs[i];
            self.available(i)
                && !self.trailing_only[i]
                && c.follows == site.body_at
                && c.line == site.end_line + 1
        })
    }
}

/// Parse and build a script from source text, for tests and tools
pub fn build_script(text: &str, path: &Path) -> Option<ScriptDecl> {
    let output = Parser::parse(text);
    output.script.as_ref().map(|file| DocBuilder::build(file, path))
}

impl From<&ast::ParamDecl> for Parameter {
    fn from(p: &ast::ParamDecl) -> Self {
        Self {
            name: p.name.clone(),
            ty: TypeRef::from(&p.ty),
            default: p.default.clone(),
        }
    }
}
