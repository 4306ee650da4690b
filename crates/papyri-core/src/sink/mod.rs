//! Output renderers
//!
//! Every renderer implements [`Sink`]. The pipeline calls
//! [`Sink::emit_script`] once per script in corpus order,
//! [`Sink::emit_index`] at most once, then [`Sink::finalize`] exactly once.
//! A sink owns its single output target, so no two threads ever write to
//! the same file, archive or connection.

mod archive;
mod sql;
mod titles;
mod wiki;
mod xml;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{Mode, RunConfig};
use crate::doc::{Index, LinkContext, ScriptDecl};

pub use self::archive::ZipSink;
pub use self::sql::{PostgresBackend, SqlBackend, SqlSink, SqliteBackend};
pub use self::titles::{file_name, file_stem, TitleRegistry};
pub use self::wiki::{GenerationMarker, Page, PageKind, WikiOptions, WikiRenderer, WikiSink};
pub use self::xml::XmlSink;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render page: {0}")]
    Render(#[from] fmt::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to move archive into place: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("sql sink requires a connection string")]
    MissingConnection,

    #[error("invalid schema name '{0}'")]
    InvalidSchema(String),

    #[error("sink '{0}' was already finalized")]
    Finalized(&'static str),
}

impl SinkError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read-only state shared by every sink during the emit phase
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub links: &'a LinkContext,
    pub index: &'a Index,
}

/// An output renderer
pub trait Sink: Send {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Render one script
    ///
    /// # Errors
    ///
    /// Returns an error if the script could not be written to the target.
    fn emit_script(&mut self, script: &ScriptDecl, ctx: &EmitContext<'_>)
        -> Result<(), SinkError>;

    /// Render the index and navigation artifacts
    ///
    /// # Errors
    ///
    /// Returns an error if the artifacts could not be written to the target.
    fn emit_index(&mut self, ctx: &EmitContext<'_>) -> Result<(), SinkError>;

    /// Flush buffered state; after this the output is complete
    ///
    /// # Errors
    ///
    /// Returns an error if the output could not be completed. Nothing
    /// partial is left behind by archive sinks in that case.
    fn finalize(&mut self) -> Result<(), SinkError>;
}

/// Open the sink selected by the configured mode
///
/// # Errors
///
/// Returns an error if the output target cannot be created or opened.
pub fn open_sink(config: &RunConfig, options: WikiOptions) -> Result<Box<dyn Sink>, SinkError> {
    let sink: Box<dyn Sink> = match config.effective_mode() {
        Mode::Wiki => Box::new(WikiSink::create(&config.output_root, options)?),
        Mode::Zip => Box::new(ZipSink::create(
            &config.output_root,
            &config.archive_name(),
            options,
        )?),
        Mode::Xml => Box::new(XmlSink::create(
            &config.output_root,
            &config.archive_name(),
            config.site.clone(),
            options,
        )?),
        Mode::Sql => Box::new(SqlSink::open(&config.sql, options)?),
    };
    tracing::info!(sink = sink.name(), "opened output");
    Ok(sink)
}
