use std::fmt::Display;
use std::fmt::Formatter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Markers
    Eof,

    // Identifiers
    /// foo
    BareIdentifier,
    /// @foo
    AtIdentifier,
    /// %foo
    PercentIdentifier,

    // Literals
    /// 1.0 or 1e-3
    FloatLiteral,
    /// 42
    Integer,
    /// "foo"
    String,
    /// i4, si8, ui16
    IntType,

    // Punctuation
    /// ->
    Arrow,
    /// :
    Colon,
    /// ,
    Comma,
    /// =
    Equal,
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// -
    Minus,
    /// !
    Exclamation,
    /// ?
    Question,
    /// >
    Greater,
    /// <
    Less,
}

/// Position of a token in the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// The line number of the token.
    line: usize,
    /// The column number of the token.
    column: usize,
    /// The character location in the raw source string.
    start: usize,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Location {
    pub fn new(line: usize, column: usize, start: usize) -> Self {
        Self {
            line,
            column,
            start,
        }
    }
    pub fn line(&self) -> usize {
        self.line
    }
    pub fn column(&self) -> usize {
        self.column
    }
    pub fn start(&self) -> usize {
        self.start
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The kind of token, such as `@foo` (AtIdentifier) or `i64` (IntType).
    pub kind: TokenKind,
    /// The text of the token, such as `@foo` or `i64`.
    pub lexeme: String,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, location: Location) -> Self {
        Self {
            kind,
            lexeme,
            location,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} \"{}\" {}", self.kind, self.lexeme, self.location)
    }
}
