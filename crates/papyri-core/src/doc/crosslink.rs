//! Cross-reference linking
//!
//! The linker runs once over a finished [`Corpus`]. It builds one
//! case-insensitive symbol table from the external type mapping and the
//! corpus script names, then resolves every type reference in the corpus.
//! The resulting [`LinkContext`] is read-only and is handed to every sink.

use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::user_types::UserTypes;

use super::corpus::Corpus;
use super::model::TypeRef;

/// Where a resolved reference points
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkTarget {
    /// Page title or URL
    pub page: String,
    /// Canonical name of the type
    pub display: String,
}

impl LinkTarget {
    pub fn new(page: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            display: display.into(),
        }
    }

    /// Whether the target is an absolute URL rather than a page title
    pub fn is_url(&self) -> bool {
        self.page.starts_with("http://") || self.page.starts_with("https://")
    }
}

/// The terminal state of every type reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// A script in the corpus
    Internal(LinkTarget),
    /// An entry of the external type mapping
    External(LinkTarget),
    /// Rendered as plain, unlinked text
    Unknown,
}

impl Resolution {
    pub fn target(&self) -> Option<&LinkTarget> {
        match self {
            Self::Internal(target) | Self::External(target) => Some(target),
            Self::Unknown => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Page title of a script's own documentation page
pub fn script_page(name: &str) -> String {
    format!("{name} Script")
}

/// Case-insensitive map from type name to link target
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Resolution>,
}

impl SymbolTable {
    /// Build the table; external entries take precedence over corpus names
    pub fn build(corpus: &Corpus, external: &UserTypes, diagnostics: &mut Diagnostics) -> Self {
        let mut entries: HashMap<String, Resolution> = HashMap::new();

        for ty in external.iter() {
            let key = ty.name.to_ascii_lowercase();
            if let Some(existing) = entries.get(&key) {
                let kept = existing.target().map_or("", |t| t.display.as_str());
                diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::NameCollision,
                    format!(
                        "external type '{}' collides with '{}'; keeping the first",
                        ty.name, kept
                    ),
                ));
                continue;
            }
            entries.insert(
                key,
                Resolution::External(LinkTarget::new(ty.reference.clone(), ty.name.clone())),
            );
        }

        for script in corpus {
            entries.entry(script.key()).or_insert_with(|| {
                Resolution::Internal(LinkTarget::new(script_page(&script.name), script.name.clone()))
            });
        }

        Self { entries }
    }

    /// Look up a name, ignoring case
    pub fn lookup(&self, name: &str) -> Option<&Resolution> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Frozen link state for one run
#[derive(Debug, Clone, Default)]
pub struct LinkContext {
    table: SymbolTable,
    /// Resolution of every referenced name, keyed by lowercase name
    resolved: HashMap<String, Resolution>,
}

static UNKNOWN: Resolution = Resolution::Unknown;

impl LinkContext {
    /// Resolve every type reference of a finished corpus
    pub fn link(corpus: &Corpus, external: &UserTypes, diagnostics: &mut Diagnostics) -> Self {
        let table = SymbolTable::build(corpus, external, diagnostics);
        let mut resolved: HashMap<String, Resolution> = HashMap::new();

        for script in corpus {
            for ty in script.type_refs() {
                let key = ty.key();
                if resolved.contains_key(&key) {
                    continue;
                }
                let resolution = match table.lookup(&key) {
                    Some(found) => found.clone(),
                    None => {
                        if !ty.is_primitive() {
                            diagnostics.push(
                                Diagnostic::warning(
                                    DiagnosticKind::UnresolvedTypeRef,
                                    format!("type '{}' is not documented", ty.script_name()),
                                )
                                .in_file(&script.source),
                            );
                        }
                        Resolution::Unknown
                    }
                };
                resolved.insert(key, resolution);
            }
        }

        tracing::debug!(
            symbols = table.len(),
            references = resolved.len(),
            "linked corpus"
        );
        Self { table, resolved }
    }

    /// Resolution of a type reference; never fails
    pub fn resolve(&self, ty: &TypeRef) -> &Resolution {
        self.resolve_name(ty.script_name())
    }

    /// Resolution of a bare type name; never fails
    pub fn resolve_name(&self, name: &str) -> &Resolution {
        let key = name.to_ascii_lowercase();
        self.resolved
            .get(&key)
            .or_else(|| self.table.lookup(&key))
            .unwrap_or(&UNKNOWN)
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }
}
