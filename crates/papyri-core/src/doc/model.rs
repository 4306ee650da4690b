//! The per-script documentation model
//!
//! A [`ScriptDecl`] is built once from one file and never changes after it
//! enters the corpus. Link resolution is kept outside of it, in the linker's
//! context.

use std::fmt;
use std::path::PathBuf;

pub use crate::ast::AutoKind;

use super::{DocComment, FlagSet};

/// A type name as written in source, resolved later by the linker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Name without the array suffix, e.g. `Ns:Quest` or `Script#Point`
    pub name: String,
    pub array: bool,
}

impl TypeRef {
    #[must_use]
    pub fn new(name: impl Into<String>, array: bool) -> Self {
        Self {
            name: name.into(),
            array,
        }
    }

    /// The script part of the name, used for link resolution
    ///
    /// `Script#Point` refers to a struct declared in `Script`.
    #[must_use]
    pub fn script_name(&self) -> &str {
        self.name.split('#').next().unwrap_or(&self.name)
    }

    /// Case-insensitive lookup key
    #[must_use]
    pub fn key(&self) -> String {
        self.script_name().to_ascii_lowercase()
    }

    /// Built-in value types never link anywhere
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.key().as_str(),
            "int" | "float" | "bool" | "string" | "var"
        )
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl From<&crate::ast::TypeExpr> for TypeRef {
    fn from(ty: &crate::ast::TypeExpr) -> Self {
        Self::new(ty.name.clone(), ty.array)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    /// Default literal as written
    pub default: Option<String>,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)?;
        if let Some(default) = &self.default {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

/// A function or an event
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    /// `None` for functions that return nothing
    pub return_type: Option<TypeRef>,
    pub params: Vec<Parameter>,
    pub flags: FlagSet,
    pub doc: Option<DocComment>,
    /// Native functions and bare declarations have no body
    pub has_body: bool,
    /// Sender type of a remote event
    pub event_source: Option<TypeRef>,
}

impl Function {
    #[must_use]
    pub fn is_event(&self) -> bool {
        self.flags.contains(super::Flag::Event)
    }

    /// Parameter list as written: `int a, bool b = true`
    #[must_use]
    pub fn param_list(&self) -> String {
        self.params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// One-line declaration, e.g. `Int Function Add(int a, int b) Global Native`
    #[must_use]
    pub fn signature(&self) -> String {
        let mut out = String::new();
        if let Some(ret) = &self.return_type {
            out.push_str(&ret.to_string());
            out.push(' ');
        }
        out.push_str(if self.is_event() { "Event " } else { "Function " });
        if let Some(source) = &self.event_source {
            out.push_str(&source.to_string());
            out.push('.');
        }
        out.push_str(&self.name);
        out.push('(');
        out.push_str(&self.param_list());
        out.push(')');
        for flag in self.flags.iter().filter(|f| *f != super::Flag::Event) {
            out.push(' ');
            out.push_str(flag.as_str());
        }
        out
    }

    /// Every type this function mentions
    pub fn type_refs(&self) -> impl Iterator<Item = &TypeRef> {
        self.return_type
            .iter()
            .chain(self.params.iter().map(|p| &p.ty))
            .chain(self.event_source.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub ty: TypeRef,
    pub auto_kind: AutoKind,
    pub default: Option<String>,
    pub flags: FlagSet,
    pub doc: Option<DocComment>,
    /// UI grouping label from an enclosing `Group` block
    pub group: Option<String>,
}

impl Property {
    /// One-line declaration, e.g. `Int Property Stage = 10 Auto Hidden`
    #[must_use]
    pub fn signature(&self) -> String {
        let mut out = format!("{} Property {}", self.ty, self.name);
        if let Some(default) = &self.default {
            out.push_str(" = ");
            out.push_str(default);
        }
        if let Some(keyword) = self.auto_kind.keyword() {
            out.push(' ');
            out.push_str(keyword);
        }
        if !self.flags.is_empty() {
            out.push(' ');
            out.push_str(&self.flags.to_string());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<String>,
    pub flags: FlagSet,
    pub doc: Option<DocComment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<StructMember>,
    pub doc: Option<DocComment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub name: String,
    pub auto: bool,
    /// Function overrides scoped to this state
    pub functions: Vec<Function>,
    pub doc: Option<DocComment>,
}

/// One documented script
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDecl {
    /// Unique (case-insensitively) within a corpus
    pub name: String,
    pub extends: Option<TypeRef>,
    pub flags: FlagSet,
    pub imports: Vec<String>,
    pub properties: Vec<Property>,
    pub functions: Vec<Function>,
    pub structs: Vec<StructDef>,
    pub states: Vec<State>,
    pub doc: Option<DocComment>,
    /// The file this script was built from
    pub source: PathBuf,
}

impl ScriptDecl {
    /// Case-insensitive corpus key
    #[must_use]
    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Functions that are not events
    pub fn member_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_event())
    }

    pub fn events(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.is_event())
    }

    /// Every type reference in the script, in declaration order
    pub fn type_refs(&self) -> impl Iterator<Item = &TypeRef> {
        self.extends
            .iter()
            .chain(self.properties.iter().map(|p| &p.ty))
            .chain(self.functions.iter().flat_map(Function::type_refs))
            .chain(
                self.structs
                    .iter()
                    .flat_map(|s| s.members.iter().map(|m| &m.ty)),
            )
            .chain(
                self.states
                    .iter()
                    .flat_map(|s| s.functions.iter().flat_map(Function::type_refs)),
            )
    }

    /// Header line, e.g. `ScriptName MyQuest extends Quest Conditional`
    #[must_use]
    pub fn header_line(&self) -> String {
        let mut out = format!("ScriptName {}", self.name);
        if let Some(extends) = &self.extends {
            out.push_str(" extends ");
            out.push_str(&extends.to_string());
        }
        if !self.flags.is_empty() {
            out.push(' ');
            out.push_str(&self.flags.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Flag;

    fn param(ty: &str, name: &str, default: Option<&str>) -> Parameter {
        Parameter {
            name: name.into(),
            ty: TypeRef::new(ty, false),
            default: default.map(String::from),
        }
    }

    #[test]
    fn param_list_rendering() {
        let function = Function {
            name: "DoThing".into(),
            return_type: None,
            params: vec![param("int", "a", None), param("bool", "b", Some("true"))],
            flags: FlagSet::new(),
            doc: None,
            has_body: false,
            event_source: None,
        };
        assert_eq!(function.param_list(), "int a, bool b = true");
        assert_eq!(function.signature(), "Function DoThing(int a, bool b = true)");
    }

    #[test]
    fn event_signature() {
        let function = Function {
            name: "OnDeath".into(),
            return_type: None,
            params: vec![param("Actor", "akKiller", None)],
            flags: [Flag::Event].into_iter().collect(),
            doc: None,
            has_body: true,
            event_source: Some(TypeRef::new("Actor", false)),
        };
        assert!(function.is_event());
        assert_eq!(function.signature(), "Event Actor.OnDeath(Actor akKiller)");
    }

    #[test]
    fn type_ref_keys() {
        let ty = TypeRef::new("MyScript#Point", true);
        assert_eq!(ty.key(), "myscript");
        assert_eq!(ty.to_string(), "MyScript#Point[]");
        assert!(TypeRef::new("Int", false).is_primitive());
        assert!(!TypeRef::new("ObjectReference", false).is_primitive());
    }
}
