//! The corpus: every successfully built script of one run
//!
//! [`CorpusBuilder`] is append-only and is consumed by
//! [`CorpusBuilder::finish`], which yields a read-only [`Corpus`]. Linking
//! only ever sees a finished corpus, so forward references across files
//! always resolve against the complete set.

use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};

use super::model::ScriptDecl;

/// Append-only collection used during the parse phase
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    scripts: Vec<ScriptDecl>,
    by_key: HashMap<String, usize>,
    diagnostics: Diagnostics,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script; a later case-insensitive duplicate replaces the earlier one
    pub fn insert(&mut self, script: ScriptDecl) {
        let key = script.key();
        if let Some(&slot) = self.by_key.get(&key) {
            let previous = &self.scripts[slot];
            self.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::DuplicateScriptName,
                    format!(
                        "script '{}' is also declared in {}; keeping this one",
                        script.name,
                        previous.source.display()
                    ),
                )
                .in_file(&script.source),
            );
            self.scripts[slot] = script;
        } else {
            self.by_key.insert(key, self.scripts.len());
            self.scripts.push(script);
        }
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Freeze the corpus
    pub fn finish(self) -> (Corpus, Diagnostics) {
        let corpus = Corpus {
            scripts: self.scripts,
            by_key: self.by_key,
        };
        (corpus, self.diagnostics)
    }
}

impl Extend<ScriptDecl> for CorpusBuilder {
    fn extend<I: IntoIterator<Item = ScriptDecl>>(&mut self, iter: I) {
        for script in iter {
            self.insert(script);
        }
    }
}

/// A frozen, ordered set of scripts keyed by case-insensitive name
#[derive(Debug, Default)]
pub struct Corpus {
    scripts: Vec<ScriptDecl>,
    by_key: HashMap<String, usize>,
}

impl Corpus {
    /// Look up a script by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&ScriptDecl> {
        self.by_key
            .get(&name.to_ascii_lowercase())
            .map(|&slot| &self.scripts[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_key.contains_key(&name.to_ascii_lowercase())
    }

    /// Scripts in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ScriptDecl> {
        self.scripts.iter()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a ScriptDecl;
    type IntoIter = std::slice::Iter<'a, ScriptDecl>;

    fn into_iter(self) -> Self::IntoIter {
        self.scripts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::parse_script;

    #[test]
    fn later_duplicate_replaces_earlier() {
        let mut builder = CorpusBuilder::new();
        builder.insert(parse_script("a/ScriptFoo.psc", "ScriptName ScriptFoo\nInt Property A Auto\n").unwrap());
        builder.insert(parse_script("b/Other.psc", "ScriptName Other\n").unwrap());
        builder.insert(parse_script("c/scriptfoo.psc", "ScriptName SCRIPTFOO\nInt Property B Auto\n").unwrap());
        let (corpus, diagnostics) = builder.finish();

        assert_eq!(corpus.len(), 2);
        let foo = corpus.get("scriptfoo").map(|s| s.properties[0].name.as_str());
        assert_eq!(foo, Some("B"));
        assert_eq!(diagnostics.count(DiagnosticKind::DuplicateScriptName), 1);
        // position of the first occurrence is kept
        let names: Vec<_> = corpus.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["SCRIPTFOO", "Other"]);
    }

    #[test]
    fn lookup_ignores_case() {
        let mut builder = CorpusBuilder::new();
        builder.insert(parse_script("Quest.psc", "ScriptName Quest\n").unwrap());
        let (corpus, _) = builder.finish();
        assert!(corpus.contains("QUEST"));
        assert!(corpus.get("quest").is_some());
        assert!(corpus.get("Actor").is_none());
    }
}
