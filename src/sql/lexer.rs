//! SQL Lexer (Tokenizer)
//!
//! This module converts SQL strings into a stream of tokens.

use super::token::Token;
use crate::error::{Error, Result};

/// SQL Lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
    /// Last token handed out, used to tell `SELECT *` from multiplication
    last: Option<Token>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            last: None,
        }
    }

    /// Rewind to the start of the input
    pub fn reset(&mut self) {
        self.position = 0;
        self.last = None;
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        let token = self.scan_token()?;
        self.last = Some(token.clone());
        Ok(token)
    }

    fn scan_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();

        match ch {
            '(' => return Ok(self.single(Token::LParen)),
            ')' => return Ok(self.single(Token::RParen)),
            ',' => return Ok(self.single(Token::Comma)),
            ';' => return Ok(self.single(Token::Semicolon)),
            '.' => return Ok(self.single(Token::Dot)),
            '+' => return Ok(self.single(Token::Plus)),
            '-' => return Ok(self.single(Token::Minus)),
            '/' => return Ok(self.single(Token::Slash)),
            '=' => return Ok(self.single(Token::Eq)),
            '*' => {
                let token = if self.last == Some(Token::Select) {
                    Token::Star
                } else {
                    Token::Multiply
                };
                return Ok(self.single(token));
            }
            '<' => {
                self.advance();
                if !self.is_at_end() {
                    match self.current_char() {
                        '=' => {
                            self.advance();
                            return Ok(Token::Lte);
                        }
                        '>' => {
                            self.advance();
                            return Ok(Token::Neq);
                        }
                        _ => {}
                    }
                }
                return Ok(Token::Lt);
            }
            '>' => {
                self.advance();
                if !self.is_at_end() && self.current_char() == '=' {
                    self.advance();
                    return Ok(Token::Gte);
                }
                return Ok(Token::Gt);
            }
            '\'' | '"' => return self.read_string(ch),
            _ => {}
        }

        if ch.is_ascii_digit() {
            return self.read_number();
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.read_identifier());
        }

        Err(Error::UnexpectedCharacter(ch, self.position))
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Skip whitespace and `#` line comments
    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Read a single- or double-quoted string; no escapes
    fn read_string(&mut self, quote: char) -> Result<Token> {
        let start_pos = self.position;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            self.advance();
            if ch == quote {
                return Ok(Token::StringLiteral(value));
            }
            value.push(ch);
        }

        Err(Error::UnterminatedString(start_pos))
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> Result<Token> {
        let start_pos = self.position;
        let mut value = String::new();
        let mut is_float = false;

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && self.peek_is_digit() {
                is_float = true;
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        self.reject_keyword_after_number()?;

        if is_float {
            value
                .parse::<f64>()
                .map(Token::FloatLiteral)
                .map_err(|_| Error::InvalidNumber(start_pos))
        } else {
            value
                .parse::<i64>()
                .map(Token::IntegerLiteral)
                .map_err(|_| Error::InvalidNumber(start_pos))
        }
    }

    fn peek_is_digit(&self) -> bool {
        self.input
            .get(self.position + 1)
            .map_or(false, |c| c.is_ascii_digit())
    }

    /// `3SELECT`, `3 SELECT` and `3AND` are malformed input, not a number followed by a word.
    /// Across spaces only statement keywords are rejected, so `a = 1 AND b = 2` still lexes.
    fn reject_keyword_after_number(&self) -> Result<()> {
        let mut pos = self.position;
        while pos < self.input.len() && self.input[pos] == ' ' {
            pos += 1;
        }
        let adjacent = pos == self.position;

        let word: String = self.input[pos..]
            .iter()
            .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
            .collect();
        if word.is_empty() {
            return Ok(());
        }

        match Token::from_keyword(&word) {
            Some(keyword) if adjacent || keyword.is_statement_keyword() => {
                Err(Error::KeywordAfterNumber {
                    keyword: word.to_uppercase(),
                    position: pos,
                })
            }
            _ => Ok(()),
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::from_keyword(&value).unwrap_or(Token::Identifier(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn lex(sql: &str) -> Vec<Token> {
        Lexer::new(sql).tokenize().unwrap()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            lex("SELECT * FROM users"),
            vec![
                Token::Select,
                Token::Star,
                Token::From,
                Token::Identifier("users".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_select_with_where() {
        assert_eq!(
            lex("select id, name from users where id = 1"),
            vec![
                Token::Select,
                Token::Identifier("id".to_string()),
                Token::Comma,
                Token::Identifier("name".to_string()),
                Token::From,
                Token::Identifier("users".to_string()),
                Token::Where,
                Token::Identifier("id".to_string()),
                Token::Eq,
                Token::IntegerLiteral(1),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_keeps_case() {
        let tokens = lex("SELECT Name FROM Users");
        assert_eq!(tokens[1], Token::Identifier("Name".to_string()));
        assert_eq!(tokens[3], Token::Identifier("Users".to_string()));
    }

    #[test]
    fn test_star_is_multiply_outside_select() {
        let tokens = lex("UPDATE t SET a = a * 2");
        assert!(tokens.contains(&Token::Multiply));
        assert!(!tokens.contains(&Token::Star));
    }

    #[test]
    fn test_string_literals() {
        let tokens = lex("VALUES ('hello world', \"it's\")");
        assert_eq!(tokens[2], Token::StringLiteral("hello world".to_string()));
        assert_eq!(tokens[4], Token::StringLiteral("it's".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("SELECT 'abc").tokenize().unwrap_err();
        assert!(matches!(err, Error::UnterminatedString(7)));
        assert_eq!(err.kind(), ErrorKind::Lex);
    }

    #[test]
    fn test_comparison_operators() {
        let tokens = lex("a < b <= c > d >= e <> f = g");

        assert!(tokens.contains(&Token::Lt));
        assert!(tokens.contains(&Token::Lte));
        assert!(tokens.contains(&Token::Gt));
        assert!(tokens.contains(&Token::Gte));
        assert!(tokens.contains(&Token::Neq));
        assert!(tokens.contains(&Token::Eq));
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("3.14, 42, -7");
        assert_eq!(tokens[0], Token::FloatLiteral(3.14));
        assert_eq!(tokens[2], Token::IntegerLiteral(42));
        assert_eq!(tokens[4], Token::Minus);
        assert_eq!(tokens[5], Token::IntegerLiteral(7));
    }

    #[test]
    fn test_qualified_column() {
        assert_eq!(
            lex("t1.id"),
            vec![
                Token::Identifier("t1".to_string()),
                Token::Dot,
                Token::Identifier("id".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            lex("SELECT # pick everything\n* FROM users # trailing"),
            vec![
                Token::Select,
                Token::Star,
                Token::From,
                Token::Identifier("users".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_illegal_character() {
        let err = Lexer::new("SELECT @ FROM t").tokenize().unwrap_err();
        assert!(matches!(err, Error::UnexpectedCharacter('@', 7)));
    }

    #[test]
    fn test_keyword_after_digit() {
        for sql in ["3SELECT * FROM t", "12 DELETE FROM t", "1and"] {
            let err = Lexer::new(sql).tokenize().unwrap_err();
            assert!(
                matches!(err, Error::KeywordAfterNumber { .. }),
                "{sql} lexed"
            );
        }

        assert!(Lexer::new("WHERE a = 1 AND b = 2").tokenize().is_ok());
    }

    #[test]
    fn test_reset() {
        let mut lexer = Lexer::new("SELECT *");
        let first = lexer.tokenize().unwrap();
        lexer.reset();
        assert_eq!(lexer.tokenize().unwrap(), first);
    }
}
