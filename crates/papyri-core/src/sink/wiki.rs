//! MediaWiki renderer and the plain `.wiki` file sink
//!
//! [`WikiRenderer`] turns documented scripts into [`Page`]s. The zip, XML
//! and SQL sinks reuse it, so every output mode carries the same text.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::{MarkerConfig, RunConfig};
use crate::doc::{
    script_page, ChainLink, DocComment, Flag, Function, Index, LinkContext, Property, Resolution,
    ScriptDecl, StructDef, TypeRef,
};

use super::titles::{file_stem, TitleRegistry};
use super::{EmitContext, Sink, SinkError};

/// Title of the index page
pub const INDEX_TITLE: &str = "Category:Papyrus";
/// Title of the navigation artifact
pub const SIDEBAR_TITLE: &str = "MediaWiki:Sidebar";
/// Revision timestamp used when markers are off
pub const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

const SIBLING_LINKS: usize = 3;

/// Invisible `<noinclude>` comment stamping generated pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationMarker {
    enabled: bool,
    seconds: bool,
    generated_at: DateTime<Utc>,
}

impl GenerationMarker {
    pub fn new(config: MarkerConfig, generated_at: DateTime<Utc>) -> Self {
        Self {
            enabled: config.enabled,
            seconds: config.seconds,
            generated_at,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn render(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let format = if self.seconds {
            "%Y-%m-%dT%H:%M:%S"
        } else {
            "%Y-%m-%dT%H:%M"
        };
        Some(format!(
            "<noinclude><!-- Generated by papyri at {} UTC --></noinclude>",
            self.generated_at.format(format)
        ))
    }

    /// Timestamp for export revisions; fixed when markers are off
    pub fn revision_timestamp(&self) -> String {
        if self.enabled {
            self.generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
        } else {
            EPOCH_TIMESTAMP.to_string()
        }
    }
}

/// Rendering settings shared by every sink of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiOptions {
    pub project_name: String,
    /// `syntaxhighlight` language
    pub language: String,
    pub marker: GenerationMarker,
}

impl WikiOptions {
    pub fn from_config(config: &RunConfig, generated_at: DateTime<Utc>) -> Self {
        Self {
            project_name: config.project_name.clone(),
            language: config.highlight_language(),
            marker: GenerationMarker::new(config.marker, generated_at),
        }
    }
}

impl Default for WikiOptions {
    fn default() -> Self {
        Self {
            project_name: "PapyrusDocs".to_string(),
            language: "papyrus".to_string(),
            marker: GenerationMarker::disabled(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Script,
    Function,
    Event,
    Index,
    Sidebar,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Function => "function",
            Self::Event => "event",
            Self::Index => "index",
            Self::Sidebar => "sidebar",
        }
    }
}

/// One rendered wiki page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub kind: PageKind,
    pub text: String,
}

impl Page {
    pub fn new(title: impl Into<String>, kind: PageKind, text: String) -> Self {
        Self {
            title: title.into(),
            kind,
            text,
        }
    }
}

/// Title of a function or event page: `DoThing - MyQuest`
pub fn member_page(function: &str, script: &str) -> String {
    format!("{function} - {script}")
}

/// Page titles of a script's functions and events, in declaration order
///
/// Members whose names differ only in case get suffixed titles, and every
/// link to a member goes through these.
pub fn member_pages(script: &ScriptDecl) -> Vec<String> {
    let mut titles = TitleRegistry::new();
    titles.claim(&script_page(&script.name));
    script
        .functions
        .iter()
        .map(|function| titles.claim(&member_page(&function.name, &script.name)))
        .collect()
}

/// Link markup for a resolution, labelled as written in source
fn link_to(resolution: &Resolution, label: &str) -> String {
    match resolution {
        Resolution::Internal(target) => format!("[[{}|{label}]]", target.page),
        Resolution::External(target) if target.is_url() => format!("[{} {label}]", target.page),
        Resolution::External(target) => format!("[[{}|{label}]]", target.page),
        Resolution::Unknown => label.to_string(),
    }
}

fn type_link(ty: &TypeRef, links: &LinkContext) -> String {
    link_to(links.resolve(ty), &ty.to_string())
}

fn chain_link(link: &ChainLink) -> String {
    link_to(&link.resolution, &link.name)
}

fn description(doc: Option<&DocComment>, fallback: impl FnOnce() -> String) -> String {
    doc.map(DocComment::text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(fallback)
}

fn summary(doc: Option<&DocComment>) -> Option<&str> {
    doc.map(|d| d.summary.as_str()).filter(|s| !s.is_empty())
}

/// Whether `text` uses a word starting with "return"
fn mentions_return(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.match_indices("return").any(|(at, _)| {
        lower[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn property_line(property: &Property, links: &LinkContext) -> String {
    let mut line = format!("*{} {}", type_link(&property.ty, links), property.name);
    if let Some(default) = &property.default {
        line.push_str(" = ");
        line.push_str(default);
    }
    let mut words: Vec<&str> = property.auto_kind.keyword().into_iter().collect();
    words.extend(property.flags.iter().map(Flag::as_str));
    if !words.is_empty() {
        line.push_str(&format!(" [{}]", words.join(" ")));
    }
    if let Some(group) = &property.group {
        line.push_str(&format!(" ''({group})''"));
    }
    if let Some(text) = summary(property.doc.as_ref()) {
        line.push_str(": ");
        line.push_str(text);
    }
    line
}

/// Renders documentation pages
#[derive(Debug, Clone, Default)]
pub struct WikiRenderer {
    options: WikiOptions,
}

impl WikiRenderer {
    pub fn new(options: WikiOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WikiOptions {
        &self.options
    }

    /// The script page followed by one page per function and event
    pub fn script_pages(
        &self,
        script: &ScriptDecl,
        ctx: &EmitContext<'_>,
    ) -> Result<Vec<Page>, fmt::Error> {
        let mut pages = Vec::with_capacity(script.functions.len() + 1);
        pages.push(Page::new(
            script_page(&script.name),
            PageKind::Script,
            self.script_page(script, ctx)?,
        ));
        for (function, title) in script.functions.iter().zip(member_pages(script)) {
            let page = if function.is_event() {
                Page::new(title, PageKind::Event, self.event_page(script, function, ctx.links)?)
            } else {
                Page::new(
                    title,
                    PageKind::Function,
                    self.function_page(script, function, ctx.links)?,
                )
            };
            pages.push(page);
        }
        Ok(pages)
    }

    /// The index page and the sidebar
    pub fn index_pages(&self, index: &Index) -> Result<Vec<Page>, fmt::Error> {
        Ok(vec![
            Page::new(INDEX_TITLE, PageKind::Index, self.index_page(index)?),
            Page::new(SIDEBAR_TITLE, PageKind::Sidebar, Self::sidebar(index)?),
        ])
    }

    pub fn script_page(&self, script: &ScriptDecl, ctx: &EmitContext<'_>) -> Result<String, fmt::Error> {
        let links = ctx.links;
        let mut out = String::new();

        if let Some(extends) = &script.extends {
            writeln!(out, "'''Extends:''' {}", type_link(extends, links))?;
            writeln!(out)?;
        }
        let text = description(script.doc.as_ref(), || {
            format!("Script for manipulating {} instances.", script.name)
        });
        writeln!(out, "{text}")?;
        writeln!(out)?;

        writeln!(out, "== Definition ==")?;
        self.write_code(&mut out, &script.header_line())?;
        writeln!(out)?;

        if let Some(entry) = ctx
            .index
            .get(&script.name)
            .filter(|entry| !entry.extends_chain.is_empty())
        {
            writeln!(out, "== Inheritance ==")?;
            let mut chain: Vec<String> = entry.extends_chain.iter().rev().map(chain_link).collect();
            chain.push(format!("'''{}'''", script.name));
            writeln!(out, "{}", chain.join(" → "))?;
            if entry.truncated {
                writeln!(out)?;
                writeln!(out, "''The inheritance chain loops back on itself and is shown truncated.''")?;
            }
            writeln!(out)?;
        }

        writeln!(out, "== Summary ==")?;
        writeln!(out, "{{| class=\"wikitable\"")?;
        writeln!(out, "! Category !! Count")?;
        let counts = [
            ("Properties", script.properties.len()),
            ("Functions", script.member_functions().count()),
            ("Events", script.events().count()),
        ];
        for (label, count) in counts {
            writeln!(out, "|-")?;
            writeln!(out, "| {label} || {count}")?;
        }
        writeln!(out, "|}}")?;
        writeln!(out)?;

        if !script.structs.is_empty() {
            writeln!(out, "== Structs ==")?;
            for def in &script.structs {
                self.write_struct(&mut out, def, links)?;
            }
        }

        if !script.properties.is_empty() {
            writeln!(out, "== Properties ==")?;
            let (globals, others): (Vec<&Property>, Vec<&Property>) = script
                .properties
                .iter()
                .partition(|p| p.ty.key() == "globalvariable");
            for (heading, group) in [("Global Properties", globals), ("Script Properties", others)] {
                if group.is_empty() {
                    continue;
                }
                writeln!(out, "=== {heading} ===")?;
                for property in group {
                    writeln!(out, "{}", property_line(property, links))?;
                }
                writeln!(out)?;
            }
        }

        let titles = member_pages(script);
        let (events, functions): (Vec<_>, Vec<_>) = script
            .functions
            .iter()
            .zip(&titles)
            .partition(|(function, _)| function.is_event());
        for (heading, members) in [("Member Functions", functions), ("Events", events)] {
            if members.is_empty() {
                continue;
            }
            writeln!(out, "== {heading} ==")?;
            for (function, title) in members {
                Self::write_member(&mut out, function, title, links)?;
            }
            writeln!(out)?;
        }

        if !script.states.is_empty() {
            writeln!(out, "== States ==")?;
            for state in &script.states {
                writeln!(out, "=== {} ===", state.name)?;
                if state.auto {
                    writeln!(out, "''Initial state.''")?;
                }
                if let Some(doc) = state.doc.as_ref().map(DocComment::text).filter(|t| !t.is_empty()) {
                    writeln!(out, "{doc}")?;
                }
                for function in &state.functions {
                    writeln!(out, "*{}", function.signature())?;
                }
                writeln!(out)?;
            }
        }

        writeln!(out, "[[Category:Scripting]]")?;
        writeln!(out, "[[Category:Papyrus]]")?;
        writeln!(out, "[[Category:Script Objects]]")?;
        self.write_marker(&mut out)?;
        Ok(out)
    }

    pub fn function_page(
        &self,
        script: &ScriptDecl,
        function: &Function,
        links: &LinkContext,
    ) -> Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "[[Category:Scripting]]")?;
        writeln!(out, "[[Category:Papyrus]]")?;
        writeln!(out, "'''Member of:''' [[{}]]", script_page(&script.name))?;
        writeln!(out)?;
        let text = description(function.doc.as_ref(), || {
            format!("Documentation for {}.", function.name)
        });
        writeln!(out, "{text}")?;
        writeln!(out)?;

        writeln!(out, "== Syntax ==")?;
        self.write_code(&mut out, &function.signature())?;

        let flags: Vec<Flag> = function.flags.iter().filter(|f| *f != Flag::Event).collect();
        if !flags.is_empty() && flags != [Flag::Native] {
            writeln!(out)?;
            writeln!(out, "== Flags ==")?;
            for flag in flags {
                writeln!(out, "*'''{flag}'''")?;
            }
        }

        writeln!(out)?;
        writeln!(out, "== Parameters ==")?;
        Self::write_params(&mut out, function, links)?;
        writeln!(out)?;

        writeln!(out, "== Return Value ==")?;
        let returns = function.doc.as_ref().and_then(|d| d.returns.as_deref());
        match (&function.return_type, returns) {
            (None, _) => writeln!(out, "None.")?,
            (Some(ty), Some(doc)) => {
                writeln!(out, "The function returns a {}. {doc}", type_link(ty, links))?;
            }
            (Some(ty), None) if mentions_return(&text) => {
                writeln!(out, "The function returns a {}.", type_link(ty, links))?;
            }
            (Some(ty), None) => {
                writeln!(out, "The {} that this function returns.", type_link(ty, links))?;
            }
        }
        writeln!(out)?;

        writeln!(out, "== Examples ==")?;
        let example = Self::examples(function).unwrap_or_else(|| {
            let args: Vec<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
            let call = format!("{}({})", function.name, args.join(", "));
            let call = if function.return_type.is_some() {
                format!("result = {call}")
            } else {
                call
            };
            format!("; Example usage of {}\n{call}", function.name)
        });
        self.write_code(&mut out, &example)?;
        writeln!(out)?;

        Self::write_see_also(&mut out, script, function, links)?;
        self.write_marker(&mut out)?;
        Ok(out)
    }

    pub fn event_page(
        &self,
        script: &ScriptDecl,
        event: &Function,
        links: &LinkContext,
    ) -> Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "[[Category:Scripting]]")?;
        writeln!(out, "[[Category:Papyrus]]")?;
        writeln!(out, "[[Category:Events]]")?;
        writeln!(out, "'''Member of:''' [[{}]]", script_page(&script.name))?;
        writeln!(out)?;
        let text = description(event.doc.as_ref(), || {
            format!("Event called when {} occurs.", event.name)
        });
        writeln!(out, "{text}")?;
        writeln!(out)?;

        writeln!(out, "== Syntax ==")?;
        self.write_code(&mut out, &event.signature())?;
        writeln!(out)?;

        writeln!(out, "== Parameters ==")?;
        Self::write_params(&mut out, event, links)?;
        writeln!(out)?;

        writeln!(out, "== Examples ==")?;
        let example = Self::examples(event).unwrap_or_else(|| {
            let source = event
                .event_source
                .as_ref()
                .map(|s| format!("{s}."))
                .unwrap_or_default();
            format!(
                "Event {source}{name}({params})\n Debug.Trace(\"{name} triggered\")\nendEvent",
                name = event.name,
                params = event.param_list()
            )
        });
        self.write_code(&mut out, &example)?;
        writeln!(out)?;

        Self::write_see_also(&mut out, script, event, links)?;
        self.write_marker(&mut out)?;
        Ok(out)
    }

    pub fn index_page(&self, index: &Index) -> Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "__NOTOC__ __NOEDITSECTION__")?;
        writeln!(out)?;
        writeln!(
            out,
            "== Welcome to the {} Papyrus Reference ==",
            self.options.project_name
        )?;
        writeln!(
            out,
            "Papyrus is the event-driven scripting language used to build gameplay logic, \
             where each script acts as a type that can extend another. \
             This reference is generated from the project's .psc source files; \
             each script page lists its properties, member functions and events."
        )?;
        writeln!(out)?;

        writeln!(out, "== Papyrus Reference Index ==")?;
        if index.is_empty() {
            writeln!(out, "No scripts were documented.")?;
            writeln!(out)?;
        }
        for (category, entries) in index.categories() {
            writeln!(out, "=== {category} ===")?;
            for entry in entries {
                write!(out, "* [[{}|{}]]", entry.page, entry.script)?;
                if !entry.extends_chain.is_empty() {
                    let chain: Vec<String> = entry.extends_chain.iter().map(chain_link).collect();
                    write!(out, " ''extends'' {}", chain.join(" → "))?;
                }
                if entry.truncated {
                    write!(out, " ''(cyclic)''")?;
                }
                writeln!(out)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "=== Additional Categories ===")?;
        writeln!(out, "* [[:Category:Scripting]]")?;
        writeln!(out, "* [[:Category:Events]]")?;
        writeln!(out, "* [[:Category:Script Objects|All Script Objects]]")?;
        writeln!(out)?;

        writeln!(out, "== Adding Custom Types ==")?;
        writeln!(
            out,
            "Types documented elsewhere can be linked by supplying a JSON file of type names. Example:"
        )?;
        writeln!(out, "<syntaxhighlight lang=\"json\">")?;
        writeln!(out, "[\"MyCustomShip\", \"PlanetObject\", \"DockingPort\"]")?;
        writeln!(out, "</syntaxhighlight>")?;
        writeln!(out)?;

        writeln!(out, "[[Category:Scripting]]")?;
        self.write_marker(&mut out)?;
        Ok(out)
    }

    /// Navigation artifact in `MediaWiki:Sidebar` syntax
    pub fn sidebar(index: &Index) -> Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "* navigation")?;
        writeln!(out, "** mainpage|mainpage-description")?;
        writeln!(out, "** {INDEX_TITLE}|Papyrus Reference")?;
        writeln!(out, "** recentchanges-url|recentchanges")?;
        for (category, entries) in index.categories() {
            writeln!(out, "* {category}")?;
            for entry in entries {
                writeln!(out, "** {}|{}", entry.page, entry.script)?;
            }
        }
        writeln!(out, "* SEARCH")?;
        writeln!(out, "* TOOLBOX")?;
        Ok(out)
    }

    fn write_struct(&self, out: &mut String, def: &StructDef, links: &LinkContext) -> fmt::Result {
        writeln!(out, "=== {} ===", def.name)?;
        if let Some(doc) = def.doc.as_ref().map(DocComment::text).filter(|t| !t.is_empty()) {
            writeln!(out, "{doc}")?;
        }
        let mut code = format!("Struct {}\n", def.name);
        for member in &def.members {
            write!(code, "  {} {}", member.ty, member.name)?;
            if let Some(default) = &member.default {
                write!(code, " = {default}")?;
            }
            writeln!(code)?;
        }
        code.push_str("EndStruct");
        self.write_code(out, &code)?;
        writeln!(out)?;
        for member in &def.members {
            write!(out, "*'''{} {}'''", type_link(&member.ty, links), member.name)?;
            if let Some(text) = summary(member.doc.as_ref()) {
                write!(out, ": {text}")?;
            }
            writeln!(out)?;
        }
        writeln!(out)
    }

    fn write_member(
        out: &mut String,
        function: &Function,
        title: &str,
        links: &LinkContext,
    ) -> fmt::Result {
        write!(out, "*")?;
        if let Some(ret) = &function.return_type {
            write!(out, "{} ", type_link(ret, links))?;
        }
        let keyword = if function.is_event() { "Event" } else { "Function" };
        writeln!(
            out,
            "{keyword} [[{title}|{}]]({})",
            function.name,
            function.param_list()
        )?;
        if let Some(text) = summary(function.doc.as_ref()) {
            writeln!(out, "**{text}")?;
        }
        Ok(())
    }

    fn write_params(out: &mut String, function: &Function, links: &LinkContext) -> fmt::Result {
        if function.params.is_empty() {
            return writeln!(out, "None.");
        }
        for param in &function.params {
            write!(out, "*'''{} {}", type_link(&param.ty, links), param.name)?;
            if let Some(default) = &param.default {
                write!(out, " = {default}")?;
            }
            write!(out, "'''")?;
            if let Some(doc) = function.doc.as_ref().and_then(|d| d.param(&param.name)) {
                write!(out, ": {doc}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn write_see_also(
        out: &mut String,
        script: &ScriptDecl,
        function: &Function,
        links: &LinkContext,
    ) -> fmt::Result {
        writeln!(out, "== See Also ==")?;
        writeln!(out, "*[[{}]]", script_page(&script.name))?;

        let mut related: BTreeMap<String, String> = BTreeMap::new();
        for ty in function.type_refs() {
            let resolution = links.resolve(ty);
            if ty.key() != script.key() && resolution.target().is_some() {
                related
                    .entry(ty.key())
                    .or_insert_with(|| link_to(resolution, ty.script_name()));
            }
        }
        for name in function.doc.iter().flat_map(|d| d.see_also.iter()) {
            related
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| link_to(links.resolve_name(name), name));
        }
        for link in related.values() {
            writeln!(out, "*{link}")?;
        }

        let siblings = script
            .functions
            .iter()
            .zip(member_pages(script))
            .filter(|(f, _)| !f.name.eq_ignore_ascii_case(&function.name))
            .take(SIBLING_LINKS);
        for (sibling, title) in siblings {
            writeln!(out, "*[[{title}|{}]]", sibling.name)?;
        }
        Ok(())
    }

    fn examples(function: &Function) -> Option<String> {
        function
            .doc
            .as_ref()
            .filter(|d| !d.examples.is_empty())
            .map(|d| d.examples.join("\n"))
    }

    fn write_code(&self, out: &mut String, code: &str) -> fmt::Result {
        writeln!(out, "<syntaxhighlight lang=\"{}\">", self.options.language)?;
        writeln!(out, "{code}")?;
        writeln!(out, "</syntaxhighlight>")
    }

    fn write_marker(&self, out: &mut String) -> fmt::Result {
        match self.options.marker.render() {
            Some(marker) => writeln!(out, "{marker}"),
            None => Ok(()),
        }
    }
}

/// Writes one `.wiki` file per page into the output directory
#[derive(Debug)]
pub struct WikiSink {
    root: PathBuf,
    renderer: WikiRenderer,
    names: TitleRegistry,
    written: usize,
    finalized: bool,
}

impl WikiSink {
    /// Create the sink, creating the output directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(root: &Path, options: WikiOptions) -> Result<Self, SinkError> {
        fs::create_dir_all(root).map_err(|e| SinkError::io(root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
            renderer: WikiRenderer::new(options),
            names: TitleRegistry::new(),
            written: 0,
            finalized: false,
        })
    }

    pub fn pages_written(&self) -> usize {
        self.written
    }

    fn write_page(&mut self, page: &Page) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized(self.name()));
        }
        let name = format!("{}.wiki", self.names.claim(&file_stem(&page.title)));
        let path = self.root.join(name);
        fs::write(&path, &page.text).map_err(|e| SinkError::io(&path, e))?;
        tracing::debug!(path = %path.display(), "wrote page");
        self.written += 1;
        Ok(())
    }
}

impl Sink for WikiSink {
    fn name(&self) -> &'static str {
        "wiki"
    }

    fn emit_script(&mut self, script: &ScriptDecl, ctx: &EmitContext<'_>) -> Result<(), SinkError> {
        for page in self.renderer.script_pages(script, ctx)? {
            self.write_page(&page)?;
        }
        Ok(())
    }

    fn emit_index(&mut self, ctx: &EmitContext<'_>) -> Result<(), SinkError> {
        for page in self.renderer.index_pages(ctx.index)? {
            self.write_page(&page)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized(self.name()));
        }
        self.finalized = true;
        tracing::info!(pages = self.written, root = %self.root.display(), "wiki pages written");
        Ok(())
    }
}
