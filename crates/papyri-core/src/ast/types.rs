//! Type expressions as written in source

use crate::lexer::Span;

/// A type as written: `Int`, `Ns:Quest`, `Script#Point`, `Actor[]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    /// The type name without the array suffix
    pub name: String,
    pub array: bool,
    pub span: Span,
}

impl TypeExpr {
    #[must_use]
    pub fn new(name: impl Into<String>, array: bool, span: Span) -> Self {
        Self {
            name: name.into(),
            array,
            span,
        }
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if self.array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}
