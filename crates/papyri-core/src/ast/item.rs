//! Declaration nodes

use super::{DeclSite, TypeExpr};

/// `ScriptName <name> [Extends <type>] [flags]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    pub name: String,
    pub extends: Option<TypeExpr>,
    /// Flag words as written
    pub flags: Vec<String>,
    pub site: DeclSite,
}

/// How a property stores its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutoKind {
    /// A full property with Get/Set functions
    #[default]
    Plain,
    Auto,
    AutoReadOnly,
}

impl AutoKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Auto => "auto",
            Self::AutoReadOnly => "autoreadonly",
        }
    }

    /// The keyword as it appears in a declaration, if any
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Auto => Some("Auto"),
            Self::AutoReadOnly => Some("AutoReadOnly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub ty: TypeExpr,
    /// Default literal as written
    pub default: Option<String>,
    pub auto_kind: AutoKind,
    pub flags: Vec<String>,
    /// Label of the enclosing `Group` block
    pub group: Option<String>,
    pub site: DeclSite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub default: Option<String>,
}

/// A function or event declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: Option<TypeExpr>,
    pub params: Vec<ParamDecl>,
    pub flags: Vec<String>,
    pub is_event: bool,
    /// Sender type of a remote event: `Event Actor.OnDeath(...)`
    pub event_source: Option<String>,
    pub has_body: bool,
    pub site: DeclSite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMemberDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub default: Option<String>,
    pub flags: Vec<String>,
    pub site: DeclSite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub members: Vec<StructMemberDecl>,
    pub site: DeclSite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateDecl {
    pub name: String,
    /// `Auto State`: the state the script starts in
    pub auto: bool,
    pub functions: Vec<FunctionDecl>,
    pub site: DeclSite,
}

/// A top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Property(PropertyDecl),
    Function(FunctionDecl),
    Struct(StructDecl),
    State(StateDecl),
}

impl Item {
    #[must_use]
    pub fn site(&self) -> DeclSite {
        match self {
            Self::Property(p) => p.site,
            Self::Function(f) => f.site,
            Self::Struct(s) => s.site,
            Self::State(s) => s.site,
        }
    }

    pub(crate) fn collect_sites(&self, out: &mut Vec<DeclSite>) {
        out.push(self.site());
        match self {
            Self::Struct(s) => out.extend(s.members.iter().map(|m| m.site)),
            Self::State(s) => out.extend(s.functions.iter().map(|f| f.site)),
            Self::Property(_) | Self::Function(_) => {}
        }
    }
}
