//! MediaWiki XML export (schema 0.11)
//!
//! Pages are buffered while the run emits and the document is built once in
//! [`Sink::finalize`]. Page and revision ids count up from 1 in emit order;
//! titles are made unique ignoring case. Like the zip sink, the export goes
//! through a temporary file in the output directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sxd_document::dom::{Document, Element};
use sxd_document::writer::Writer;
use sxd_document::Package;
use tempfile::NamedTempFile;

use crate::config::SiteConfig;
use crate::doc::ScriptDecl;

use super::titles::TitleRegistry;
use super::wiki::{Page, WikiOptions, WikiRenderer};
use super::{EmitContext, Sink, SinkError};

const EXPORT_NS: &str = "http://www.mediawiki.org/xml/export-0.11/";
const EXPORT_XSD: &str = "http://www.mediawiki.org/xml/export-0.11.xsd";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
const DB_NAME: &str = "papyrus_wiki";

/// Buffered export page
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportPage {
    id: u64,
    title: String,
    text: String,
}

#[derive(Debug)]
pub struct XmlSink {
    target: PathBuf,
    site: SiteConfig,
    renderer: WikiRenderer,
    titles: TitleRegistry,
    pages: Vec<ExportPage>,
    finalized: bool,
}

impl XmlSink {
    /// Prepare an export named `archive` inside `root`
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created.
    pub fn create(
        root: &Path,
        archive: &str,
        site: SiteConfig,
        options: WikiOptions,
    ) -> Result<Self, SinkError> {
        fs::create_dir_all(root).map_err(|e| SinkError::io(root, e))?;
        Ok(Self {
            target: root.join(archive),
            site,
            renderer: WikiRenderer::new(options),
            titles: TitleRegistry::new(),
            pages: Vec::new(),
            finalized: false,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    fn push(&mut self, page: Page) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized("xml"));
        }
        let title = self.titles.claim(&page.title);
        let id = self.pages.len() as u64 + 1;
        self.pages.push(ExportPage {
            id,
            title,
            text: page.text,
        });
        Ok(())
    }

    /// Serialize the whole export
    fn render(&self) -> Result<Vec<u8>, SinkError> {
        let package = Package::new();
        let doc = package.as_document();

        let root = doc.create_element((EXPORT_NS, "mediawiki"));
        root.set_default_namespace_uri(Some(EXPORT_NS));
        root.register_prefix("xsi", XSI_NS);
        root.register_prefix("xml", XML_NS);
        root.set_attribute_value(
            (XSI_NS, "schemaLocation"),
            &format!("{EXPORT_NS} {EXPORT_XSD}"),
        );
        root.set_attribute_value("version", "0.11");
        root.set_attribute_value((XML_NS, "lang"), "en");
        doc.root().append_child(root);

        root.append_child(self.siteinfo(doc));

        let timestamp = self.renderer.options().marker.revision_timestamp();
        for page in &self.pages {
            root.append_child(self.page(doc, page, &timestamp));
        }

        let mut out = Vec::new();
        Writer::new()
            .set_single_quotes(false)
            .set_write_encoding(true)
            .format_document(&doc, &mut out)
            .map_err(|e| SinkError::io(&self.target, e))?;
        out.push(b'\n');
        Ok(out)
    }

    fn siteinfo<'d>(&self, doc: Document<'d>) -> Element<'d> {
        let siteinfo = text_child(doc, None, "siteinfo", "");
        let sitename = self.site.name.as_str();
        append(doc, siteinfo, "sitename", sitename);
        append(doc, siteinfo, "dbname", DB_NAME);
        append(doc, siteinfo, "base", &self.site.base_url);
        append(
            doc,
            siteinfo,
            "generator",
            &format!("papyri {}", crate::VERSION),
        );
        append(doc, siteinfo, "case", "first-letter");

        let namespaces = append(doc, siteinfo, "namespaces", "");
        let talk = format!("{sitename} talk");
        let names: [(i32, &str); 18] = [
            (-2, "Media"),
            (-1, "Special"),
            (0, ""),
            (1, "Talk"),
            (2, "User"),
            (3, "User talk"),
            (4, sitename),
            (5, &talk),
            (6, "File"),
            (7, "File talk"),
            (8, "MediaWiki"),
            (9, "MediaWiki talk"),
            (10, "Template"),
            (11, "Template talk"),
            (12, "Help"),
            (13, "Help talk"),
            (14, "Category"),
            (15, "Category talk"),
        ];
        for (key, name) in names {
            let ns = append(doc, namespaces, "namespace", name);
            ns.set_attribute_value("key", &key.to_string());
            ns.set_attribute_value("case", "first-letter");
        }
        siteinfo
    }

    fn page<'d>(&self, doc: Document<'d>, page: &ExportPage, timestamp: &str) -> Element<'d> {
        let element = text_child(doc, None, "page", "");
        append(doc, element, "title", &page.title);
        append(doc, element, "ns", &namespace_key(&page.title).to_string());
        append(doc, element, "id", &page.id.to_string());

        let revision = append(doc, element, "revision", "");
        append(doc, revision, "id", &page.id.to_string());
        append(doc, revision, "timestamp", timestamp);
        let contributor = append(doc, revision, "contributor", "");
        append(doc, contributor, "username", &self.site.contributor);
        append(doc, contributor, "id", "1");
        append(doc, revision, "model", "wikitext");
        append(doc, revision, "format", "text/x-wiki");
        let text = append(doc, revision, "text", &page.text);
        text.set_attribute_value("bytes", &page.text.len().to_string());
        text.set_attribute_value((XML_NS, "space"), "preserve");
        element
    }
}

/// Namespace number of a title's prefix
fn namespace_key(title: &str) -> i32 {
    match title.split_once(':').map(|(prefix, _)| prefix) {
        Some("Category") => 14,
        Some("MediaWiki") => 8,
        Some("Template") => 10,
        Some("Help") => 12,
        _ => 0,
    }
}

fn text_child<'d>(
    doc: Document<'d>,
    parent: Option<Element<'d>>,
    name: &str,
    text: &str,
) -> Element<'d> {
    let element = doc.create_element((EXPORT_NS, name));
    if !text.is_empty() {
        element.append_child(doc.create_text(text));
    }
    if let Some(parent) = parent {
        parent.append_child(element);
    }
    element
}

fn append<'d>(doc: Document<'d>, parent: Element<'d>, name: &str, text: &str) -> Element<'d> {
    text_child(doc, Some(parent), name, text)
}

impl Sink for XmlSink {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn emit_script(&mut self, script: &ScriptDecl, ctx: &EmitContext<'_>) -> Result<(), SinkError> {
        for page in self.renderer.script_pages(script, ctx)? {
            self.push(page)?;
        }
        Ok(())
    }

    fn emit_index(&mut self, ctx: &EmitContext<'_>) -> Result<(), SinkError> {
        for page in self.renderer.index_pages(ctx.index)? {
            self.push(page)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized("xml"));
        }
        self.finalized = true;
        let bytes = self.render()?;

        let dir = self.target.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| SinkError::io(dir, e))?;
        temp.write_all(&bytes)
            .map_err(|e| SinkError::io(&self.target, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| SinkError::io(&self.target, e))?;
        temp.persist(&self.target)?;
        tracing::info!(pages = self.pages.len(), path = %self.target.display(), "xml export written");
        Ok(())
    }
}
