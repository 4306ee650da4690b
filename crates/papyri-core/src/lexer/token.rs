//! Token types for the Papyrus lexer

use logos::Logos;

/// The kind of token produced by the lexer
///
/// Papyrus keywords are case-insensitive, so every keyword token ignores
/// ASCII case. Strings, doc comments and block comments only have their
/// opening delimiter matched here; the lexer scans their bodies by hand so
/// that an unterminated literal can be reported and resynchronized.
#[derive(Logos, Debug, Clone, PartialEq, Eq, Hash)]
#[logos(skip r"([ \t\r\n\f]+|\\[ \t]*\r?\n)")]
pub enum TokenKind {
    // ========== Declaration keywords ==========
    #[token("scriptname", ignore(ascii_case))]
    ScriptName,
    #[token("extends", ignore(ascii_case))]
    Extends,
    #[token("import", ignore(ascii_case))]
    Import,
    #[token("property", ignore(ascii_case))]
    Property,
    #[token("endproperty", ignore(ascii_case))]
    EndProperty,
    #[token("auto", ignore(ascii_case))]
    Auto,
    #[token("autoreadonly", ignore(ascii_case))]
    AutoReadOnly,
    #[token("function", ignore(ascii_case))]
    Function,
    #[token("endfunction", ignore(ascii_case))]
    EndFunction,
    #[token("event", ignore(ascii_case))]
    Event,
    #[token("endevent", ignore(ascii_case))]
    EndEvent,
    #[token("state", ignore(ascii_case))]
    State,
    #[token("endstate", ignore(ascii_case))]
    EndState,
    #[token("struct", ignore(ascii_case))]
    Struct,
    #[token("endstruct", ignore(ascii_case))]
    EndStruct,
    #[token("group", ignore(ascii_case))]
    Group,
    #[token("endgroup", ignore(ascii_case))]
    EndGroup,
    #[token("customevent", ignore(ascii_case))]
    CustomEvent,

    // ========== Flag keywords ==========
    #[token("native", ignore(ascii_case))]
    Native,
    #[token("global", ignore(ascii_case))]
    Global,
    #[token("hidden", ignore(ascii_case))]
    Hidden,
    #[token("conditional", ignore(ascii_case))]
    Conditional,
    #[token("const", ignore(ascii_case))]
    Const,
    #[token("mandatory", ignore(ascii_case))]
    Mandatory,
    #[token("betaonly", ignore(ascii_case))]
    BetaOnly,
    #[token("debugonly", ignore(ascii_case))]
    DebugOnly,
    #[token("default", ignore(ascii_case))]
    Default,
    #[token("collapsed", ignore(ascii_case))]
    Collapsed,
    #[token("collapsedonref", ignore(ascii_case))]
    CollapsedOnRef,
    #[token("collapsedonbase", ignore(ascii_case))]
    CollapsedOnBase,

    // ========== Literals ==========
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,
    #[token("none", ignore(ascii_case))]
    None,

    #[regex(r"[0-9]+")]
    Int,
    #[regex(r"0[xX][0-9a-fA-F]+")]
    HexInt,
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    Float,

    /// Opening quote; the lexer scans the rest of the literal
    #[token("\"")]
    Quote,
    /// A complete string literal (produced by the lexer, not by logos)
    String,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // ========== Operators ==========
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Not,

    // ========== Delimiters ==========
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("#")]
    Hash,

    // ========== Comments ==========
    /// Line comment: ; ...
    #[regex(r";([^/\n][^\n]*)?")]
    LineComment,

    /// Opening `;/` of a block comment; the lexer scans to `/;`
    #[token(";/")]
    BlockCommentStart,
    /// A complete block comment (produced by the lexer)
    BlockComment,

    /// Opening `{` of a documentation comment; the lexer scans to `}`
    #[token("{")]
    DocCommentStart,
    /// A complete documentation comment (produced by the lexer)
    DocComment,

    /// End of file (added by lexer, not matched by logos)
    Eof,

    /// Lexer error - invalid character or unterminated literal
    Error,
}

impl TokenKind {
    /// Returns true if this token is a keyword
    #[must_use]
    pub const fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::ScriptName
                | Self::Extends
                | Self::Import
                | Self::Property
                | Self::EndProperty
                | Self::Auto
                | Self::AutoReadOnly
                | Self::Function
                | Self::EndFunction
                | Self::Event
                | Self::EndEvent
                | Self::State
                | Self::EndState
                | Self::Struct
                | Self::EndStruct
                | Self::Group
                | Self::EndGroup
                | Self::CustomEvent
                | Self::True
                | Self::False
                | Self::None
        ) || self.is_flag()
    }

    /// Returns true if this token is a declaration flag
    #[must_use]
    pub const fn is_flag(&self) -> bool {
        matches!(
            self,
            Self::Native
                | Self::Global
                | Self::Hidden
                | Self::Conditional
                | Self::Const
                | Self::Mandatory
                | Self::BetaOnly
                | Self::DebugOnly
                | Self::Default
                | Self::Collapsed
                | Self::CollapsedOnRef
                | Self::CollapsedOnBase
        )
    }

    /// Returns true if this token is a literal
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::HexInt | Self::Float | Self::String | Self::True | Self::False | Self::None
        )
    }

    /// Returns true if this token is a comment of any kind
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment | Self::DocComment)
    }

    /// Returns true if this token closes a block
    #[must_use]
    pub const fn is_block_end(&self) -> bool {
        matches!(
            self,
            Self::EndFunction
                | Self::EndEvent
                | Self::EndState
                | Self::EndStruct
                | Self::EndProperty
                | Self::EndGroup
        )
    }

    /// Returns true if an identifier may be spelled with this token
    ///
    /// Papyrus lets a handful of flag words double as names, e.g. a property
    /// called `Default`.
    #[must_use]
    pub const fn is_name_like(&self) -> bool {
        matches!(self, Self::Ident) || self.is_flag()
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::ScriptName => "ScriptName",
            Self::Extends => "Extends",
            Self::Import => "Import",
            Self::Property => "Property",
            Self::EndProperty => "EndProperty",
            Self::Auto => "Auto",
            Self::AutoReadOnly => "AutoReadOnly",
            Self::Function => "Function",
            Self::EndFunction => "EndFunction",
            Self::Event => "Event",
            Self::EndEvent => "EndEvent",
            Self::State => "State",
            Self::EndState => "EndState",
            Self::Struct => "Struct",
            Self::EndStruct => "EndStruct",
            Self::Group => "Group",
            Self::EndGroup => "EndGroup",
            Self::CustomEvent => "CustomEvent",
            Self::Native => "Native",
            Self::Global => "Global",
            Self::Hidden => "Hidden",
            Self::Conditional => "Conditional",
            Self::Const => "Const",
            Self::Mandatory => "Mandatory",
            Self::BetaOnly => "BetaOnly",
            Self::DebugOnly => "DebugOnly",
            Self::Default => "Default",
            Self::Collapsed => "Collapsed",
            Self::CollapsedOnRef => "CollapsedOnRef",
            Self::CollapsedOnBase => "CollapsedOnBase",
            Self::True => "True",
            Self::False => "False",
            Self::None => "None",
            Self::Int => "integer",
            Self::HexInt => "hex integer",
            Self::Float => "float",
            Self::Quote => "\"",
            Self::String => "string",
            Self::Ident => "identifier",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Eq => "=",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::SlashEq => "/=",
            Self::PercentEq => "%=",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Not => "!",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Colon => ":",
            Self::Hash => "#",
            Self::LineComment => "; comment",
            Self::BlockCommentStart | Self::BlockComment => ";/ comment /;",
            Self::DocCommentStart | Self::DocComment => "{doc comment}",
            Self::Eof => "end of file",
            Self::Error => "error",
        };
        f.write_str(text)
    }
}
