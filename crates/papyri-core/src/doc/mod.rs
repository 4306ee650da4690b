//! Documentation model for Papyrus scripts
//!
//! This module turns parsed script files into documented declarations,
//! collects them into a corpus, links type references across the corpus
//! and builds the aggregate index that sinks render.

mod builder;
mod corpus;
mod crosslink;
mod flags;
mod index;
mod model;
mod types;

pub use builder::{build_script, DocBuilder, FileOutcome};
pub use corpus::{Corpus, CorpusBuilder};
pub use crosslink::{script_page, LinkContext, LinkTarget, Resolution, SymbolTable};
pub use flags::{Flag, FlagSet, UnknownFlag};
pub use index::{category_of, ChainLink, Index, IndexEntry, DEFAULT_CATEGORY};
pub use model::{
    AutoKind, Function, Parameter, Property, ScriptDecl, State, StructDef, StructMember, TypeRef,
};
pub use types::{DocComment, ParamDoc};
