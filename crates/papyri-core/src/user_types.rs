//! User-supplied mapping of type names to external references
//!
//! The file is JSON in one of two shapes:
//!
//! ```json
//! ["Actor", "ObjectReference"]
//! ```
//!
//! maps each name to the page `<Name> Script` on the same wiki, and
//!
//! ```json
//! { "Actor": "https://example.org/wiki/Actor_Script", "Form": "Form Script" }
//! ```
//!
//! maps each name to an explicit URL or page name.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserTypesError {
    #[error("failed to read user types file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid user types JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty type name in user types")]
    EmptyName,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserTypes {
    List(Vec<String>),
    Map(serde_json::Map<String, serde_json::Value>),
}

/// One external type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalType {
    /// Name as written in the mapping
    pub name: String,
    /// URL or page name
    pub reference: String,
}

/// External types in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserTypes {
    entries: Vec<ExternalType>,
}

impl UserTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the mapping from a JSON file
    pub fn load(path: &Path) -> Result<Self, UserTypesError> {
        let text = std::fs::read_to_string(path).map_err(|source| UserTypesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse the mapping from JSON text
    pub fn parse(text: &str) -> Result<Self, UserTypesError> {
        let raw: RawUserTypes = serde_json::from_str(text)?;
        let mut types = Self::new();
        match raw {
            RawUserTypes::List(names) => {
                for name in names {
                    let reference = format!("{} Script", name.trim());
                    types.push(name, reference)?;
                }
            }
            RawUserTypes::Map(map) => {
                // serde_json keeps keys sorted unless preserve_order is on
                for (name, value) in map {
                    let reference = match value {
                        serde_json::Value::String(s) if !s.trim().is_empty() => s,
                        _ => format!("{} Script", name.trim()),
                    };
                    types.push(name, reference)?;
                }
            }
        }
        Ok(types)
    }

    pub fn push(
        &mut self,
        name: impl Into<String>,
        reference: impl Into<String>,
    ) -> Result<(), UserTypesError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(UserTypesError::EmptyName);
        }
        self.entries.push(ExternalType {
            name,
            reference: reference.into(),
        });
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExternalType> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
