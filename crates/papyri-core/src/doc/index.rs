//! Index builder - the aggregate listing of a linked corpus

use std::collections::{HashMap, HashSet};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};

use super::corpus::Corpus;
use super::crosslink::{script_page, LinkContext, Resolution};
use super::model::ScriptDecl;

/// Category for scripts without a namespace
pub const DEFAULT_CATEGORY: &str = "Script Objects";

/// One ancestor in an extends chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    /// Name as written in the extends clause
    pub name: String,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub script: String,
    pub page: String,
    /// Grouping key: the namespace of the script name
    pub category: String,
    /// Ancestors, nearest first
    pub extends_chain: Vec<ChainLink>,
    /// Whether the chain was cut at a repeated ancestor
    pub truncated: bool,
}

/// Alphabetized entries grouped by category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: Vec<IndexEntry>,
    by_key: HashMap<String, usize>,
}

/// Namespace prefix of `Ns:Sub:Name`, or the default category
pub fn category_of(name: &str) -> String {
    match name.rsplit_once(':') {
        Some((namespace, _)) if !namespace.is_empty() => namespace.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

impl Index {
    pub fn build(corpus: &Corpus, ctx: &LinkContext, diagnostics: &mut Diagnostics) -> Self {
        let mut entries: Vec<IndexEntry> = corpus
            .iter()
            .map(|script| Self::entry(script, corpus, ctx, diagnostics))
            .collect();
        entries.sort_by(|a, b| {
            (a.category.to_ascii_lowercase(), a.script.to_ascii_lowercase())
                .cmp(&(b.category.to_ascii_lowercase(), b.script.to_ascii_lowercase()))
                .then_with(|| a.script.cmp(&b.script))
        });
        let by_key = entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| (entry.script.to_ascii_lowercase(), slot))
            .collect();
        Self { entries, by_key }
    }

    fn entry(
        script: &ScriptDecl,
        corpus: &Corpus,
        ctx: &LinkContext,
        diagnostics: &mut Diagnostics,
    ) -> IndexEntry {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([script.key()]);
        let mut truncated = false;
        let mut next = script.extends.as_ref().map(|t| t.script_name().to_string());

        while let Some(name) = next.take() {
            if !visited.insert(name.to_ascii_lowercase()) {
                truncated = true;
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::DataIntegrityWarning,
                        format!(
                            "extends chain of '{}' loops back to '{}'; truncated",
                            script.name, name
                        ),
                    )
                    .in_file(&script.source),
                );
                break;
            }
            let resolution = ctx.resolve_name(&name).clone();
            if resolution.is_internal() {
                next = corpus
                    .get(&name)
                    .and_then(|parent| parent.extends.as_ref())
                    .map(|t| t.script_name().to_string());
            }
            chain.push(ChainLink { name, resolution });
        }

        IndexEntry {
            script: script.name.clone(),
            page: script_page(&script.name),
            category: category_of(&script.name),
            extends_chain: chain,
            truncated,
        }
    }

    /// Entry of a script, ignoring case
    pub fn get(&self, script: &str) -> Option<&IndexEntry> {
        self.by_key
            .get(&script.to_ascii_lowercase())
            .map(|&slot| &self.entries[slot])
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries grouped by category, in index order
    pub fn categories(&self) -> Vec<(&str, Vec<&IndexEntry>)> {
        let mut groups: Vec<(&str, Vec<&IndexEntry>)> = Vec::new();
        for entry in &self.entries {
            match groups.last_mut() {
                Some((category, members)) if *category == entry.category => members.push(entry),
                _ => groups.push((entry.category.as_str(), vec![entry])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::link_corpus;

    fn names(entry: &IndexEntry) -> Vec<&str> {
        entry.extends_chain.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn entries_are_sorted_and_grouped() {
        let (corpus, ctx) = link_corpus(&[
            ("b.psc", "ScriptName beta\n"),
            ("a.psc", "ScriptName Alpha\n"),
            ("ns.psc", "ScriptName Ns:Thing\n"),
        ]).unwrap();
        let index = Index::build(&corpus, &ctx, &mut Diagnostics::new());
        let order: Vec<_> = index.entries().iter().map(|e| e.script.as_str()).collect();
        assert_eq!(order, vec!["Ns:Thing", "Alpha", "beta"]);
        let categories: Vec<_> = index.categories().iter().map(|(c, _)| *c).collect();
        assert_eq!(categories, vec!["Ns", DEFAULT_CATEGORY]);
    }

    #[test]
    fn chain_follows_corpus_and_stops_at_external() {
        let (corpus, ctx) = link_corpus(&[
            ("MyQuest.psc", "ScriptName MyQuest extends Quest\n"),
            ("Quest.psc", "ScriptName Quest extends Form\n"),
        ]).unwrap();
        let index = Index::build(&corpus, &ctx, &mut Diagnostics::new());
        let my_quest = &index.entries()[0];
        assert_eq!(my_quest.script, "MyQuest");
        assert_eq!(index.get("myquest"), Some(my_quest));
        assert_eq!(names(my_quest), vec!["Quest", "Form"]);
        assert!(my_quest.extends_chain[0].resolution.is_internal());
        assert_eq!(my_quest.extends_chain[1].resolution, Resolution::Unknown);
        assert!(!my_quest.truncated);
    }

    #[test]
    fn cycles_are_truncated() {
        let (corpus, ctx) = link_corpus(&[
            ("A.psc", "ScriptName A extends B\n"),
            ("B.psc", "ScriptName B extends C\n"),
            ("C.psc", "ScriptName C extends a\n"),
        ]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let index = Index::build(&corpus, &ctx, &mut diagnostics);
        let a = &index.entries()[0];
        assert_eq!(names(a), vec!["B", "C"]);
        assert!(a.truncated);
        assert_eq!(diagnostics.count(DiagnosticKind::DataIntegrityWarning), 3);
    }

    #[test]
    fn self_extension_is_truncated() {
        let (corpus, ctx) = link_corpus(&[("A.psc", "ScriptName A extends A\n")]).unwrap();
        let index = Index::build(&corpus, &ctx, &mut Diagnostics::new());
        assert!(index.entries()[0].extends_chain.is_empty());
        assert!(index.entries()[0].truncated);
    }
}
