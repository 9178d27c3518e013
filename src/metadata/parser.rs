//! Recursive-descent parser producing the rule tree.
//!
//! ```text
//! file       := statement*
//! statement  := '.'? pattern ('#' selector)? ( '.' statement | args ) NEWLINE
//! args       := ( key ('=' value)? )*
//! ```
//!
//! A root statement may be followed by lines that start with `.`. Those are
//! relative statements and become children of the innermost rule of the
//! root statement.

use super::scanner::{normalize, Scanner, Token, TokenKind};
use crate::diagnostics::Diagnostics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Set(String),
    /// Written as `key=()`; deletes the attribute.
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub key: String,
    pub value: ArgValue,
    pub offset: usize,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    pub selector: Option<String>,
    pub args: Vec<Arg>,
    pub children: Vec<Rule>,
    pub offset: usize,
    pub line: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Relation {
    Root,
    Relative,
}

enum Parsed {
    Rule(Rule),
    /// The statement was malformed and has been skipped.
    Skipped,
    Eof,
}

/// Parse a whole rule file. Syntax errors are reported and the parser
/// continues with the next line.
pub fn parse(file: &str, text: &str, diagnostics: &mut Diagnostics) -> Vec<Rule> {
    let text = normalize(text);
    let mut parser = Parser::new(Scanner::new(file, &text, diagnostics));
    let mut rules = Vec::new();
    loop {
        match parser.statement(Relation::Root) {
            Parsed::Rule(rule) => rules.push(rule),
            Parsed::Skipped => {}
            Parsed::Eof => break,
        }
    }
    rules
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(mut scanner: Scanner<'a>) -> Self {
        let current = scanner.next_token();
        Parser { scanner, current }
    }

    fn next(&mut self) -> Token {
        let next = self.scanner.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenKind::NewLine) {
            self.next();
        }
    }

    /// Report `message` at the current token unless the scanner already
    /// reported it, then drop the rest of the line.
    fn recover(&mut self, message: impl FnOnce(&Token) -> String) {
        if !self.at(TokenKind::Invalid) {
            let line = self.scanner.line(self.current.offset);
            let file = self.scanner.file().to_string();
            let text = message(&self.current);
            self.scanner.diagnostics().error(&file, Some(line), text);
        }
        while !self.at(TokenKind::NewLine) && !self.at(TokenKind::Eof) {
            self.next();
        }
    }

    fn statement(&mut self, relation: Relation) -> Parsed {
        self.skip_newlines();
        if self.at(TokenKind::Eof) {
            return Parsed::Eof;
        }
        if self.at(TokenKind::Dot) {
            self.next();
        }
        if !self.at(TokenKind::Identifier) {
            self.recover(|t| format!("expected pattern, found {}", t.kind));
            return Parsed::Skipped;
        }
        let pattern = self.next();
        let line = self.scanner.line(pattern.offset);

        let mut selector = None;
        if self.at(TokenKind::Hash) {
            self.next();
            if !self.at(TokenKind::Identifier) {
                self.recover(|t| format!("expected selector after '#', found {}", t.kind));
                return Parsed::Skipped;
            }
            selector = Some(self.next().text);
        }

        let mut rule = Rule {
            pattern: pattern.text,
            selector,
            args: Vec::new(),
            children: Vec::new(),
            offset: pattern.offset,
            line,
        };

        if self.at(TokenKind::Dot) {
            let dot = self.next();
            // The nested pattern must be on the same line.
            if self.at(TokenKind::NewLine) || self.at(TokenKind::Eof) {
                let line = self.scanner.line(dot.offset);
                let file = self.scanner.file().to_string();
                self.scanner
                    .diagnostics()
                    .error(&file, Some(line), "expected pattern after '.'");
                return Parsed::Skipped;
            }
            return match self.statement(relation) {
                Parsed::Rule(child) => {
                    rule.children.push(child);
                    Parsed::Rule(rule)
                }
                _ => Parsed::Skipped,
            };
        }

        self.args(&mut rule);
        if relation == Relation::Root {
            self.relative_children(&mut rule);
        }
        Parsed::Rule(rule)
    }

    /// Parse arguments up to the end of the line. A malformed argument keeps
    /// what was parsed before it.
    fn args(&mut self, rule: &mut Rule) {
        while self.at(TokenKind::Identifier) {
            let key = self.next();
            let value = if self.at(TokenKind::Equal) {
                self.next();
                if !matches!(self.current.kind, TokenKind::Identifier | TokenKind::String) {
                    self.recover(|t| format!("expected value for '{}', found {}", key.text, t.kind));
                    return;
                }
                match self.next().text.as_str() {
                    "()" => ArgValue::Remove,
                    text => ArgValue::Set(text.to_string()),
                }
            } else {
                ArgValue::Set("1".to_string())
            };
            rule.args.push(Arg {
                line: self.scanner.line(key.offset),
                key: key.text,
                value,
                offset: key.offset,
            });
        }
        if !self.at(TokenKind::NewLine) && !self.at(TokenKind::Eof) {
            self.recover(|t| format!("unexpected {}", t.kind));
        }
    }

    fn relative_children(&mut self, rule: &mut Rule) {
        loop {
            self.skip_newlines();
            if !self.at(TokenKind::Dot) {
                return;
            }
            match self.statement(Relation::Relative) {
                Parsed::Rule(child) => rule.children.push(child),
                Parsed::Skipped => {}
                Parsed::Eof => return,
            }
        }
    }
}
