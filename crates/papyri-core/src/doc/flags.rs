//! Declaration flags normalized into one canonical ordered set

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A declaration flag
///
/// The derived `Ord` defines the canonical order flags are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    Native,
    Global,
    Event,
    Const,
    Conditional,
    Hidden,
    Mandatory,
    Default,
    Collapsed,
    CollapsedOnRef,
    CollapsedOnBase,
    BetaOnly,
    DebugOnly,
}

impl Flag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "Native",
            Self::Global => "Global",
            Self::Event => "Event",
            Self::Const => "Const",
            Self::Conditional => "Conditional",
            Self::Hidden => "Hidden",
            Self::Mandatory => "Mandatory",
            Self::Default => "Default",
            Self::Collapsed => "Collapsed",
            Self::CollapsedOnRef => "CollapsedOnRef",
            Self::CollapsedOnBase => "CollapsedOnBase",
            Self::BetaOnly => "BetaOnly",
            Self::DebugOnly => "DebugOnly",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a word that is not a flag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown flag '{0}'")]
pub struct UnknownFlag(pub String);

impl FromStr for Flag {
    type Err = UnknownFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flag = match s.to_ascii_lowercase().as_str() {
            "native" => Self::Native,
            "global" => Self::Global,
            "event" => Self::Event,
            "const" => Self::Const,
            "conditional" => Self::Conditional,
            "hidden" => Self::Hidden,
            "mandatory" => Self::Mandatory,
            "default" => Self::Default,
            "collapsed" => Self::Collapsed,
            "collapsedonref" => Self::CollapsedOnRef,
            "collapsedonbase" => Self::CollapsedOnBase,
            "betaonly" => Self::BetaOnly,
            "debugonly" => Self::DebugOnly,
            _ => return Err(UnknownFlag(s.to_string())),
        };
        Ok(flag)
    }
}

/// A canonical, ordered, duplicate-free set of flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(BTreeSet<Flag>);

impl FlagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize flag words regardless of order or casing
    ///
    /// Words that are not flags are skipped; the parser only hands over flag
    /// tokens.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        words
            .iter()
            .filter_map(|word| word.as_ref().parse::<Flag>().ok())
            .collect()
    }

    pub fn insert(&mut self, flag: Flag) {
        self.0.insert(flag);
    }

    #[must_use]
    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for flag in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            f.write_str(flag.as_str())?;
        }
        Ok(())
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
