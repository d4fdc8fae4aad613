//! Module providing Token struct for lexing

/// Represents Tokens in a chemical formula
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub enum Token {
    /// Element symbol, an uppercase letter followed by lowercase letters
    Element(String),
    /// Bare `R`, a radical
    Radical,
    Number(i64),
    LeftParen,
    RightParen,
    Eof,
}
