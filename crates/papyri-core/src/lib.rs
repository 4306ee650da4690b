//! Papyri Core - documentation engine for Papyrus scripts
//!
//! This crate provides the core functionality:
//! - Lexer: Tokenization of script sources
//! - Parser: Lenient declaration trees with error recovery
//! - Doc: Documented script model, corpus, cross-linker and index
//! - Sink: Wiki, SQL, Zip and XML renderers
//! - Pipeline: Parse, link and emit phases of one run

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lexer module - tokenization of Papyrus source code
pub mod lexer;

/// Abstract Syntax Tree - declarations as parsed from one file
pub mod ast;

/// Parser module - converts tokens into declaration trees
pub mod parser;

/// Documentation model - scripts, corpus, links and index
pub mod doc;

/// Run diagnostics collected across all phases
pub mod diagnostics;

/// External type references loaded from a user types file
pub mod user_types;

/// Run configuration
pub mod config;

/// Decompiler contract for compiled scripts
pub mod decompile;

/// Output renderers
pub mod sink;

/// The parse, link and emit pipeline
pub mod pipeline;

/// Test utilities - helpers for testing documentation runs
pub mod testutil;

/// Convenience re-export of lexer
pub use lexer::Lexer;

/// Convenience re-export of parser
pub use parser::Parser;

/// Convenience re-export of configuration
pub use config::RunConfig;

/// Convenience re-export of the pipeline
pub use pipeline::{run, Pipeline, PipelineError, RunReport};
