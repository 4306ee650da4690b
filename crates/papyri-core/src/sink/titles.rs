//! Page titles and artifact names

use std::collections::HashSet;

/// Hands out names that are unique ignoring case
///
/// A repeated name gets a ` (2)`, ` (3)`... suffix, so two pages can never
/// land on the same title or archive member.
#[derive(Debug, Default)]
pub struct TitleRegistry {
    taken: HashSet<String>,
}

impl TitleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `candidate`, or the first free suffixed variant of it
    pub fn claim(&mut self, candidate: &str) -> String {
        if self.taken.insert(candidate.to_lowercase()) {
            return candidate.to_string();
        }
        let mut n = 2usize;
        loop {
            let name = format!("{candidate} ({n})");
            if self.taken.insert(name.to_lowercase()) {
                return name;
            }
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

/// Path-safe form of a page title
pub fn file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

/// File or archive member name of a wiki page: `Category:Papyrus` becomes
/// `Category_Papyrus.wiki`
pub fn file_name(title: &str) -> String {
    format!("{}.wiki", file_stem(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_titles_get_suffixes() {
        let mut titles = TitleRegistry::new();
        assert_eq!(titles.claim("Foo Script"), "Foo Script");
        assert_eq!(titles.claim("FOO SCRIPT"), "FOO SCRIPT (2)");
        assert_eq!(titles.claim("foo script"), "foo script (3)");
        assert_eq!(titles.claim("Bar Script"), "Bar Script");
        assert_eq!(titles.len(), 4);
    }

    #[test]
    fn file_names_are_path_safe() {
        assert_eq!(file_name("Category:Papyrus"), "Category_Papyrus.wiki");
        assert_eq!(file_name("Ns:Sub:Thing Script"), "Ns_Sub_Thing Script.wiki");
        assert_eq!(file_name("A/B - C"), "A_B - C.wiki");
    }
}
