use thiserror::Error;

use crate::formula::token::Token;
use crate::formula::{Atom, Formula, FormulaElement, Radical};
/*
Formula Grammar:
formula -> item* ;
item -> ( ELEMENT | RADICAL | group ) NUMBER? ;
group -> "(" RADICAL NUMBER ")" | "(" item* ")" ;

e.g. C2H6O2(CH)2 or C2H4NO2(R1)
 */

/// Formula Parser
pub struct FormulaParser {
    /// Vector of tokens from the formula string
    tokens: Vec<Token>,
    /// Current token being processed
    current: usize,
}

impl FormulaParser {
    pub fn new(tokens: Vec<Token>) -> FormulaParser {
        FormulaParser { tokens, current: 0 }
    }

    // region Parsing Functions

    /// Parse the token vector into a Formula
    pub fn parse(&mut self) -> Result<Formula, ParseError> {
        let formula = self.sequence()?;
        if !self.is_at_end() {
            return Err(ParseError::UnexpectedToken(self.peek()));
        }
        Ok(formula)
    }

    fn sequence(&mut self) -> Result<Formula, ParseError> {
        let mut formula = Formula::new();
        while let Some((element, count)) = self.item()? {
            formula
                .insert(element, count)
                .map_err(|_| ParseError::CountOverflow)?;
        }
        Ok(formula)
    }

    fn item(&mut self) -> Result<Option<(FormulaElement, i64)>, ParseError> {
        let element = match self.peek() {
            Token::Element(symbol) => {
                self.advance();
                FormulaElement::Atom(Atom::new(&symbol))
            }
            Token::Radical => {
                self.advance();
                FormulaElement::Radical(Radical::new("R"))
            }
            Token::LeftParen => {
                self.advance();
                self.group()?
            }
            _ => return Ok(None),
        };
        Ok(Some((element, self.count())))
    }

    fn group(&mut self) -> Result<FormulaElement, ParseError> {
        // Numbered radicals are written as (R1), (R2), ...
        if let (Token::Radical, Token::Number(number), Token::RightParen) =
            (self.peek(), self.peek_at(1), self.peek_at(2))
        {
            self.current += 3;
            return Ok(FormulaElement::Radical(Radical::new(&format!(
                "R{}",
                number
            ))));
        }

        let inner = self.sequence()?;
        self.consume(Token::RightParen, "Expect ')' after group.")?;
        if inner.is_empty() {
            return Err(ParseError::EmptyGroup);
        }
        Ok(FormulaElement::Group(inner))
    }

    /// Count following an item, 1 when absent
    fn count(&mut self) -> i64 {
        if let Token::Number(count) = self.peek() {
            self.advance();
            return count;
        }
        1
    }

    // endregion Parsing Functions

    // region parsing helper functions

    fn check(&self, token: &Token) -> bool {
        if self.is_at_end() {
            return false;
        }
        &self.peek() == token
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek() == Token::Eof
    }

    /// Get a copy of the current token
    fn peek(&self) -> Token {
        self.peek_at(0)
    }

    /// Get a copy of the token `offset` positions ahead, Eof past the end
    fn peek_at(&self, offset: usize) -> Token {
        self.tokens
            .get(self.current + offset)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    /// Advance past `token` if it is the current one, otherwise fail with `msg`
    fn consume(&mut self, token: Token, msg: &str) -> Result<(), ParseError> {
        if self.check(&token) {
            self.advance();
            return Ok(());
        }
        Err(ParseError::MissingToken(msg.to_string()))
    }

    // endregion parsing helper functions
}

/// Enum representing possible parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// Missing expected token (e.g. a right parenthesis)
    #[error("Missing expected token: {0}")]
    MissingToken(String),
    /// Token that can't start an item, e.g. a leading count or an unmatched `)`
    #[error("Unexpected token {0:?}")]
    UnexpectedToken(Token),
    #[error("Empty group `()` in formula")]
    EmptyGroup,
    /// Repeated items whose counts add up past `i64::MAX`
    #[error("Element count overflow in formula")]
    CountOverflow,
}
