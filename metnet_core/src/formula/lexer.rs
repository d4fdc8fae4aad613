//! Lex a formula string into a series of tokens for later parsing

use thiserror::Error;

use crate::formula::token::Token;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source into tokens, always terminated by [`Token::Eof`]
    pub fn lex(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c = self.advance();
        match c {
            '(' => self.tokens.push(Token::LeftParen),
            ')' => self.tokens.push(Token::RightParen),
            'A'..='Z' => self.read_element(),
            '0'..='9' => self.read_number()?,
            ' ' | '\t' => {}
            _ => {
                return Err(LexerError::InvalidCharacter {
                    character: c,
                    position: self.start,
                })
            }
        }
        Ok(())
    }

    fn read_element(&mut self) {
        while self.peek().is_ascii_lowercase() {
            self.advance();
        }
        let symbol: String = self.source[self.start..self.current].iter().collect();
        if symbol == "R" {
            self.tokens.push(Token::Radical);
        } else {
            self.tokens.push(Token::Element(symbol));
        }
    }

    fn read_number(&mut self) -> Result<(), LexerError> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        let text: String = self.source[self.start..self.current].iter().collect();
        let value = text
            .parse::<i64>()
            .map_err(|_| LexerError::InvalidNumber(text))?;
        self.tokens.push(Token::Number(value));
        Ok(())
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            return '\0';
        }
        self.source[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

/// Errors raised while lexing a formula
#[derive(Debug, Error, PartialEq, Clone)]
pub enum LexerError {
    #[error("Invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    /// Count too large to represent
    #[error("Invalid count: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_elements_and_counts() {
        let tokens = Lexer::new("ZnC10").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Element("Zn".to_string()),
                Token::Element("C".to_string()),
                Token::Number(10),
                Token::Eof
            ]
        );
    }

    #[test]
    fn radicals_and_groups() {
        let tokens = Lexer::new("Ru(R1)").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Element("Ru".to_string()),
                Token::LeftParen,
                Token::Radical,
                Token::Number(1),
                Token::RightParen,
                Token::Eof
            ]
        );
    }

    #[test]
    fn invalid_character() {
        assert_eq!(
            Lexer::new("H2O+").lex(),
            Err(LexerError::InvalidCharacter {
                character: '+',
                position: 3
            })
        );
        // Symbolic counts are not supported
        assert!(Lexer::new("(CH2)n").lex().is_err());
    }
}
