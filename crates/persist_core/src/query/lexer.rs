//! Tokenizer for predicate expressions.

use crate::error::{CoreError, CoreResult};
use persist_codec::Operator;

/// A lexical token of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    Regex(String),
    Null,
    Op(Operator),
    Like,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

/// Splits `input` into tokens.
pub(crate) fn tokenize(input: &str) -> CoreResult<Vec<Token>> {
    let mut lexer = Lexer {
        chars: input.chars().collect(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl std::fmt::Display) -> CoreError {
        CoreError::query(format!("{message} at offset {}", self.pos))
    }

    fn next_token(&mut self) -> CoreResult<Option<Token>> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '(' => {
                self.pos += 1;
                Token::LParen
            }
            ')' => {
                self.pos += 1;
                Token::RParen
            }
            '\'' | '"' => self.quoted(c)?,
            '/' => self.regex()?,
            '0'..='9' | '.' => self.number()?,
            '-' | '+' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit() || n == '.') => {
                self.number()?
            }
            c if c.is_alphabetic() || c == '_' => self.word(),
            _ => self.symbol()?,
        };
        Ok(Some(token))
    }

    fn quoted(&mut self, quote: char) -> CoreResult<Token> {
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\\') => match self.bump() {
                    Some(escaped) => text.push(escaped),
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) if c == quote => return Ok(Token::Str(text)),
                Some(c) => text.push(c),
            }
        }
    }

    /// `/.../` with `\/` standing for a literal slash; other escapes are
    /// left for the regex engine.
    fn regex(&mut self) -> CoreResult<Token> {
        self.pos += 1;
        let mut pattern = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated regex literal")),
                Some('\\') => match self.bump() {
                    Some('/') => pattern.push('/'),
                    Some(c) => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    None => return Err(self.error("unterminated regex literal")),
                },
                Some('/') => return Ok(Token::Regex(pattern)),
                Some(c) => pattern.push(c),
            }
        }
    }

    fn number(&mut self) -> CoreResult<Token> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E'))
        {
            // exponent sign
            if matches!(self.peek(), Some('e' | 'E')) && matches!(self.peek_at(1), Some('-' | '+')) {
                self.pos += 1;
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| CoreError::query(format!("invalid number literal {text:?}")))
    }

    fn word(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "like" => Token::Like,
            "null" => Token::Null,
            _ => Token::Ident(word),
        }
    }

    fn symbol(&mut self) -> CoreResult<Token> {
        let two: String = self.chars[self.pos..]
            .iter()
            .take(2)
            .collect();
        let (token, width) = match two.as_str() {
            "==" => (Token::Op(Operator::Eq), 2),
            "=~" => (Token::Op(Operator::Matches), 2),
            "!=" | "<>" => (Token::Op(Operator::Ne), 2),
            "!~" => (Token::Op(Operator::NotMatches), 2),
            "<=" => (Token::Op(Operator::Le), 2),
            ">=" => (Token::Op(Operator::Ge), 2),
            "&&" => (Token::And, 2),
            "||" => (Token::Or, 2),
            _ => match self.peek() {
                Some('=') => (Token::Op(Operator::Eq), 1),
                Some('<') => (Token::Op(Operator::Lt), 1),
                Some('>') => (Token::Op(Operator::Gt), 1),
                Some('!') => (Token::Not, 1),
                Some(c) => return Err(self.error(format!("unexpected character {c:?}"))),
                None => return Err(self.error("unexpected end of input")),
            },
        };
        self.pos += width;
        Ok(token)
    }
}
