//! The documentation run
//!
//! A run has three strictly ordered phases:
//!
//! 1. **parse** - every source file is lexed, parsed and built on the rayon
//!    pool; results are collected in sorted path order so the corpus is the
//!    same on every run
//! 2. **link** - once the corpus is frozen, type references are resolved and
//!    the index is built; both are read-only afterwards
//! 3. **emit** - each sink consumes the linked corpus on its own thread
//!
//! Per-file, per-reference and per-sink problems end up in the
//! [`RunReport`]. Only configuration and scan failures abort a run.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use glob::MatchOptions;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, RunConfig};
use crate::decompile::{is_compiled, is_source, Decompiler};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::doc::{Corpus, CorpusBuilder, DocBuilder, FileOutcome, Index, LinkContext};
use crate::sink::{open_sink, EmitContext, Sink, SinkError, WikiOptions};
use crate::user_types::{UserTypes, UserTypesError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    UserTypes(#[from] UserTypesError),

    #[error("cannot scan {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid scan pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to start parser threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// How one sink fared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkOutcome {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SinkOutcome {
    fn succeeded(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ok: true,
            error: None,
        }
    }

    fn failed(name: &str, error: &SinkError) -> Self {
        Self {
            name: name.to_string(),
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

/// End-of-run summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Scripts in the corpus
    pub scripts: usize,
    pub files_scanned: usize,
    /// Files that produced no script
    pub files_excluded: usize,
    pub sinks: Vec<SinkOutcome>,
    pub diagnostics: Diagnostics,
}

impl RunReport {
    /// Whether the run failed as a whole
    ///
    /// That is the case when no script was parsed, or when every sink that
    /// was requested failed.
    pub fn is_fatal(&self) -> bool {
        self.scripts == 0 || (!self.sinks.is_empty() && self.sinks.iter().all(|s| !s.ok))
    }
}

/// One documentation run over a resolved configuration
pub struct Pipeline<'a> {
    config: &'a RunConfig,
    decompiler: Option<&'a dyn Decompiler>,
    generated_at: DateTime<Utc>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self {
            config,
            decompiler: None,
            generated_at: Utc::now(),
        }
    }

    /// Hand compiled scripts without a source file to `decompiler`
    #[must_use]
    pub fn with_decompiler(mut self, decompiler: &'a dyn Decompiler) -> Self {
        self.decompiler = Some(decompiler);
        self
    }

    /// Pin the generation timestamp
    #[must_use]
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    /// Run with the sink selected by the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or user types are invalid, or
    /// if the scan root cannot be read.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        self.execute(None)
    }

    /// Run with caller-provided sinks instead of the configured one
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`].
    pub fn run_with_sinks(&self, sinks: Vec<Box<dyn Sink>>) -> Result<RunReport, PipelineError> {
        self.execute(Some(sinks))
    }

    fn execute(&self, sinks: Option<Vec<Box<dyn Sink>>>) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        self.config.validate()?;
        let user_types = match &self.config.user_types {
            Some(path) => UserTypes::load(path)?,
            None => UserTypes::new(),
        };

        let mut report = RunReport::default();
        let files = self.scan(&mut report)?;
        tracing::info!(files = files.len(), root = %self.config.scan_root.display(), "scan complete");

        let corpus = self.parse(&files, &mut report)?;
        report.scripts = corpus.len();
        if corpus.is_empty() {
            report.diagnostics.push(Diagnostic::error(
                DiagnosticKind::FileExcluded,
                format!(
                    "no scripts could be parsed under {}",
                    self.config.scan_root.display()
                ),
            ));
            return Ok(report);
        }
        tracing::info!(
            scripts = corpus.len(),
            excluded = report.files_excluded,
            "parse phase complete"
        );

        let links = LinkContext::link(&corpus, &user_types, &mut report.diagnostics);
        let index = Index::build(&corpus, &links, &mut report.diagnostics);
        tracing::info!(
            symbols = links.table().len(),
            categories = index.categories().len(),
            "link phase complete"
        );

        let sinks = match sinks {
            Some(sinks) => sinks,
            None => {
                let options = WikiOptions::from_config(self.config, self.generated_at);
                match open_sink(self.config, options) {
                    Ok(sink) => vec![sink],
                    Err(e) => {
                        let mode = self.config.effective_mode();
                        report.diagnostics.push(Diagnostic::error(
                            DiagnosticKind::SinkIoError,
                            format!("cannot open {mode} output: {e}"),
                        ));
                        report.sinks.push(SinkOutcome::failed(mode.as_str(), &e));
                        return Ok(report);
                    }
                }
            }
        };

        let ctx = EmitContext {
            links: &links,
            index: &index,
        };
        let results = emit_all(sinks, &corpus, &ctx, self.config.index);
        for (name, result) in results {
            match result {
                Ok(()) => report.sinks.push(SinkOutcome::succeeded(name)),
                Err(e) => {
                    report.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::SinkIoError,
                        format!("{name} sink failed: {e}"),
                    ));
                    report.sinks.push(SinkOutcome::failed(name, &e));
                }
            }
        }

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis(),
            diagnostics = report.diagnostics.len(),
            "run complete"
        );
        Ok(report)
    }

    /// Collect source files in sorted order, decompiling where needed
    fn scan(&self, report: &mut RunReport) -> Result<Vec<PathBuf>, PipelineError> {
        let root = &self.config.scan_root;
        let metadata = fs::metadata(root).map_err(|source| PipelineError::Scan {
            path: root.clone(),
            source,
        })?;

        let mut found = if metadata.is_file() {
            vec![root.clone()]
        } else {
            let mut paths = find(root, "psc")?;
            if self.decompiler.is_some() {
                paths.extend(find(root, "pex")?);
            }
            paths
        };
        found.sort();

        let sources: HashSet<String> = found
            .iter()
            .filter(|path| is_source(path))
            .map(|path| stem_key(path))
            .collect();

        let mut files = Vec::with_capacity(found.len());
        for path in found {
            if is_source(&path) {
                report.files_scanned += 1;
                files.push(path);
            } else if is_compiled(&path) && !sources.contains(&stem_key(&path)) {
                report.files_scanned += 1;
                if let Some(source) = self.decompiled(&path, report) {
                    files.push(source);
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Source for a compiled script, if the decompiler produced one
    fn decompiled(&self, compiled: &Path, report: &mut RunReport) -> Option<PathBuf> {
        let decompiler = self.decompiler?;
        match decompiler.decompile(compiled) {
            Ok(source) => {
                tracing::debug!(compiled = %compiled.display(), source = %source.display(), "decompiled");
                Some(source)
            }
            Err(e) => {
                report.files_excluded += 1;
                report.diagnostics.push(
                    Diagnostic::warning(DiagnosticKind::DecompileError, e.to_string())
                        .in_file(compiled),
                );
                None
            }
        }
    }

    /// Parse every file and freeze the corpus
    fn parse(&self, files: &[PathBuf], report: &mut RunReport) -> Result<Corpus, PipelineError> {
        let outcomes: Vec<FileOutcome> = if self.config.parallel > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.parallel)
                .build()?;
            pool.install(|| files.par_iter().map(|path| parse_file(path)).collect())
        } else {
            files.par_iter().map(|path| parse_file(path)).collect()
        };

        let mut builder = CorpusBuilder::new();
        for outcome in outcomes {
            report.diagnostics.append(outcome.diagnostics);
            match outcome.script {
                Some(script) => builder.insert(script),
                None => report.files_excluded += 1,
            }
        }
        let (corpus, duplicates) = builder.finish();
        report.diagnostics.append(duplicates);
        Ok(corpus)
    }
}

/// Run with the sink selected by `config`
///
/// # Errors
///
/// See [`Pipeline::run`].
pub fn run(config: &RunConfig) -> Result<RunReport, PipelineError> {
    Pipeline::new(config).run()
}

/// Path without its extension, lowercased, so `A.pex` pairs with `a.PSC`
fn stem_key(path: &Path) -> String {
    path.with_extension("").to_string_lossy().to_lowercase()
}

/// Files under `root` with extension `ext`, in any case
fn find(root: &Path, ext: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let pattern = format!(
        "{}/**/*.{ext}",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut paths = Vec::new();
    for entry in glob::glob_with(&pattern, options)? {
        let path = entry.map_err(|e| PipelineError::Scan {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn parse_file(path: &Path) -> FileOutcome {
    match fs::read(path) {
        Ok(bytes) => {
            // scripts saved by the Creation Kit are not always UTF-8
            let text = String::from_utf8_lossy(&bytes);
            let outcome = DocBuilder::build_source(&text, path);
            tracing::debug!(
                file = %path.display(),
                parsed = outcome.script.is_some(),
                "parsed"
            );
            outcome
        }
        Err(e) => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(
                Diagnostic::error(DiagnosticKind::FileExcluded, format!("cannot read file: {e}"))
                    .in_file(path),
            );
            FileOutcome {
                script: None,
                diagnostics,
            }
        }
    }
}

/// Drive every sink through emit and finalize
///
/// A single sink runs on the calling thread; several run side by side, each
/// owning its own target.
fn emit_all(
    sinks: Vec<Box<dyn Sink>>,
    corpus: &Corpus,
    ctx: &EmitContext<'_>,
    with_index: bool,
) -> Vec<(&'static str, Result<(), SinkError>)> {
    if sinks.len() <= 1 {
        return sinks
            .into_iter()
            .map(|mut sink| (sink.name(), emit(sink.as_mut(), corpus, ctx, with_index)))
            .collect();
    }

    std::thread::scope(|scope| {
        let handles: Vec<_> = sinks
            .into_iter()
            .map(|mut sink| {
                scope.spawn(move || (sink.name(), emit(sink.as_mut(), corpus, ctx, with_index)))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

fn emit(
    sink: &mut dyn Sink,
    corpus: &Corpus,
    ctx: &EmitContext<'_>,
    with_index: bool,
) -> Result<(), SinkError> {
    for script in corpus {
        sink.emit_script(script, ctx)?;
    }
    if with_index {
        sink.emit_index(ctx)?;
    }
    sink.finalize()?;
    tracing::info!(sink = sink.name(), "sink finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompile::DecompileError;

    fn write(dir: &Path, name: &str, text: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    #[test]
    fn scan_is_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b/Zed.psc", "ScriptName Zed\n");
        write(dir.path(), "Alpha.PSC", "ScriptName Alpha\n");
        write(dir.path(), "notes.txt", "not a script");

        let config = RunConfig {
            scan_root: dir.path().to_path_buf(),
            ..RunConfig::default()
        };
        let mut report = RunReport::default();
        let files = Pipeline::new(&config).scan(&mut report).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("Alpha.PSC"), dir.path().join("b/Zed.psc")]
        );
        assert_eq!(report.files_scanned, 2);
    }

    #[test]
    fn scan_root_with_glob_characters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("mods[1]");
        write(&root, "MyQuest.psc", "ScriptName MyQuest\n");
        write(dir.path(), "mods1/Other.psc", "ScriptName Other\n");

        let config = RunConfig {
            scan_root: root.clone(),
            ..RunConfig::default()
        };
        let mut report = RunReport::default();
        let files = Pipeline::new(&config).scan(&mut report).unwrap();
        assert_eq!(files, vec![root.join("MyQuest.psc")]);
    }

    #[test]
    fn compiled_script_with_source_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "MyQuest.psc", "ScriptName MyQuest\n");
        write(dir.path(), "MyQuest.pex", "compiled");
        let config = RunConfig {
            scan_root: dir.path().to_path_buf(),
            ..RunConfig::default()
        };
        let decompiler = |_: &Path| -> Result<PathBuf, DecompileError> {
            panic!("a compiled script with a source must not be decompiled")
        };
        let mut report = RunReport::default();
        let files = Pipeline::new(&config)
            .with_decompiler(&decompiler)
            .scan(&mut report)
            .unwrap();
        assert_eq!(files, vec![dir.path().join("MyQuest.psc")]);
        assert_eq!(report.files_scanned, 1);
    }

    #[test]
    fn missing_scan_root_is_an_error() {
        let config = RunConfig {
            scan_root: PathBuf::from("/definitely/not/here"),
            ..RunConfig::default()
        };
        let err = Pipeline::new(&config).run().unwrap_err();
        assert!(matches!(err, PipelineError::Scan { .. }));
    }

    #[test]
    fn compiled_scripts_are_skipped_without_a_decompiler() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Orphan.pex", "compiled");
        let config = RunConfig {
            scan_root: dir.path().to_path_buf(),
            ..RunConfig::default()
        };
        let mut report = RunReport::default();
        let files = Pipeline::new(&config).scan(&mut report).unwrap();
        assert!(files.is_empty());
        assert_eq!(report.files_scanned, 0);
    }

    #[test]
    fn fatal_when_nothing_parses_or_every_sink_fails() {
        let mut report = RunReport::default();
        assert!(report.is_fatal());

        report.scripts = 2;
        assert!(!report.is_fatal());

        report.sinks.push(SinkOutcome {
            name: "wiki".into(),
            ok: false,
            error: Some("disk full".into()),
        });
        assert!(report.is_fatal());

        report.sinks.push(SinkOutcome::succeeded("xml"));
        assert!(!report.is_fatal());
    }
}
