//! Tokenizer for rule files.

use crate::diagnostics::{line_of, Diagnostics};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    String,
    Dot,
    Hash,
    Equal,
    NewLine,
    /// Something already reported by the scanner.
    Invalid,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Dot => "'.'",
            TokenKind::Hash => "'#'",
            TokenKind::Equal => "'='",
            TokenKind::NewLine => "end of line",
            TokenKind::Invalid => "invalid token",
            TokenKind::Eof => "end of file",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character in the normalized text.
    pub offset: usize,
}

/// Tabs become spaces and every line terminator becomes `\n`.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").replace('\t', " ")
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '#' | '/' | '=' | '"' | ' ' | '\n')
}

pub struct Scanner<'a> {
    file: &'a str,
    text: &'a str,
    pos: usize,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Scanner<'a> {
    /// `text` must already be normalized.
    pub fn new(file: &'a str, text: &'a str, diagnostics: &'a mut Diagnostics) -> Self {
        Scanner {
            file,
            text,
            pos: 0,
            diagnostics,
        }
    }

    pub fn line(&self, offset: usize) -> usize {
        line_of(self.text, offset)
    }

    pub fn file(&self) -> &str {
        self.file
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.text[self.pos..].chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&mut self, offset: usize, message: &str) {
        let line = self.line(offset);
        self.diagnostics.error(self.file, Some(line), message);
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            text: self.text[start..self.pos].to_string(),
            offset: start,
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            let start = self.pos;
            let Some(c) = self.advance() else {
                return self.token(TokenKind::Eof, start);
            };
            match c {
                ' ' => continue,
                '.' => return self.token(TokenKind::Dot, start),
                '#' => return self.token(TokenKind::Hash, start),
                '=' => return self.token(TokenKind::Equal, start),
                '\n' => return self.token(TokenKind::NewLine, start),
                '"' => return self.string(start),
                '/' => match self.peek() {
                    Some('/') => self.skip_line_comment(),
                    Some('*') => {
                        self.advance();
                        self.skip_block_comment(start);
                    }
                    _ => {
                        self.error(start, "unexpected character '/'");
                        return self.token(TokenKind::Invalid, start);
                    }
                },
                _ => {
                    while self.peek().is_some_and(|c| !is_separator(c)) {
                        self.advance();
                    }
                    return self.token(TokenKind::Identifier, start);
                }
            }
        }
    }

    /// A double-quoted literal. `\"` is an escaped quote.
    fn string(&mut self, start: usize) -> Token {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error(start, "unterminated string");
                    return Token {
                        kind: TokenKind::Invalid,
                        text: value,
                        offset: start,
                    };
                }
                Some('"') => {
                    self.advance();
                    return Token {
                        kind: TokenKind::String,
                        text: value,
                        offset: start,
                    };
                }
                Some('\\') if self.peek_second() == Some('"') => {
                    self.advance();
                    self.advance();
                    value.push('"');
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self, start: usize) {
        loop {
            match self.advance() {
                None => {
                    self.error(start, "unterminated comment");
                    return;
                }
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return;
                }
                Some(_) => {}
            }
        }
    }
}
