//! Zip archive of every rendered wiki page
//!
//! The archive is written to a temporary file next to its final location
//! and only moved into place by a successful [`Sink::finalize`]. A sink
//! that fails or is dropped early removes the temporary file with it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::doc::ScriptDecl;

use super::titles::{file_stem, TitleRegistry};
use super::wiki::{Page, WikiOptions, WikiRenderer};
use super::{EmitContext, Sink, SinkError};

pub struct ZipSink {
    target: PathBuf,
    writer: Option<ZipWriter<NamedTempFile>>,
    renderer: WikiRenderer,
    names: TitleRegistry,
    entries: usize,
}

impl ZipSink {
    /// Start an archive named `archive` inside `root`
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or temporary file cannot be created.
    pub fn create(root: &Path, archive: &str, options: WikiOptions) -> Result<Self, SinkError> {
        fs::create_dir_all(root).map_err(|e| SinkError::io(root, e))?;
        let temp = NamedTempFile::new_in(root).map_err(|e| SinkError::io(root, e))?;
        Ok(Self {
            target: root.join(archive),
            writer: Some(ZipWriter::new(temp)),
            renderer: WikiRenderer::new(options),
            names: TitleRegistry::new(),
            entries: 0,
        })
    }

    /// Final location of the archive
    pub fn target(&self) -> &Path {
        &self.target
    }

    fn add(&mut self, page: &Page) -> Result<(), SinkError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(SinkError::Finalized("zip"))?;
        let member = format!("{}.wiki", self.names.claim(&file_stem(&page.title)));
        // fixed member times keep archives byte-identical across runs
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        writer.start_file(member.as_str(), options)?;
        writer
            .write_all(page.text.as_bytes())
            .map_err(|e| SinkError::io(&self.target, e))?;
        self.entries += 1;
        Ok(())
    }
}

impl Sink for ZipSink {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn emit_script(&mut self, script: &ScriptDecl, ctx: &EmitContext<'_>) -> Result<(), SinkError> {
        for page in self.renderer.script_pages(script, ctx)? {
            self.add(&page)?;
        }
        Ok(())
    }

    fn emit_index(&mut self, ctx: &EmitContext<'_>) -> Result<(), SinkError> {
        for page in self.renderer.index_pages(ctx.index)? {
            self.add(&page)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        let writer = self.writer.take().ok_or(SinkError::Finalized("zip"))?;
        let temp = writer.finish()?;
        temp.as_file()
            .sync_all()
            .map_err(|e| SinkError::io(&self.target, e))?;
        temp.persist(&self.target)?;
        tracing::info!(entries = self.entries, path = %self.target.display(), "zip archive written");
        Ok(())
    }
}
