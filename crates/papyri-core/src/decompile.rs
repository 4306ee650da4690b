//! Contract for turning compiled `.pex` files back into source
//!
//! The core never runs a decompiler itself. A caller that has one wraps it
//! in a [`Decompiler`] and hands it to the pipeline; the pipeline only ever
//! sees the returned source path or the error.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecompileError {
    #[error("failed to decompile {path}: {message}")]
    Failed { path: PathBuf, message: String },

    #[error("decompiler produced no source for {0}")]
    NoOutput(PathBuf),

    #[error("I/O error while decompiling: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces a Papyrus source file from a compiled script
pub trait Decompiler: Sync {
    /// Decompile `compiled` and return the path of the produced `.psc` file
    ///
    /// # Errors
    ///
    /// Returns an error if no source could be produced.
    fn decompile(&self, compiled: &Path) -> Result<PathBuf, DecompileError>;
}

impl<F> Decompiler for F
where
    F: Fn(&Path) -> Result<PathBuf, DecompileError> + Sync,
{
    fn decompile(&self, compiled: &Path) -> Result<PathBuf, DecompileError> {
        self(compiled)
    }
}

/// Whether a path names a compiled script
pub fn is_compiled(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pex"))
}

/// Whether a path names a source script
pub fn is_source(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("psc"))
}
