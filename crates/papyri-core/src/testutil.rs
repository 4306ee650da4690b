//! Test utilities for papyri
//!
//! Helpers that take inline Papyrus sources through the parse and link
//! phases, for use by unit and integration tests.

use std::path::Path;

use crate::diagnostics::Diagnostics;
use crate::doc::{Corpus, CorpusBuilder, DocBuilder, LinkContext, ScriptDecl};
use crate::user_types::UserTypes;

/// Result type for test helpers
pub type TestResult<T> = Result<T, String>;

/// Build one script from source text
///
/// # Errors
/// Returns error if the file is excluded from the corpus
pub fn parse_script(path: &str, source: &str) -> TestResult<ScriptDecl> {
    let outcome = DocBuilder::build_source(source, Path::new(path));
    outcome.script.ok_or_else(|| {
        let reasons: Vec<String> = outcome.diagnostics.iter().map(ToString::to_string).collect();
        format!("{path} was excluded: {}", reasons.join("; "))
    })
}

/// Build a frozen corpus from `(path, source)` pairs in the given order
///
/// # Errors
/// Returns error if any file is excluded
pub fn build_corpus(files: &[(&str, &str)]) -> TestResult<Corpus> {
    let mut builder = CorpusBuilder::new();
    for (path, source) in files {
        builder.insert(parse_script(path, source)?);
    }
    Ok(builder.finish().0)
}

/// Build and link a corpus without user types
///
/// # Errors
/// Returns error if any file is excluded
pub fn link_corpus(files: &[(&str, &str)]) -> TestResult<(Corpus, LinkContext)> {
    let corpus = build_corpus(files)?;
    let links = LinkContext::link(&corpus, &UserTypes::new(), &mut Diagnostics::new());
    Ok((corpus, links))
}
