//! # Lexer
//!
//! Splits raw notation text into elements. Each element starts at a pitch
//! letter (`A`-`G`, either case), a pause marker (`P`/`p`) or the comment
//! delimiter `//`.
//!
//! ## States
//! - `Normal` - whitespace separates elements and is dropped; a start
//!   character closes the open element and opens a new one.
//! - `InParens` - everything up to the closing `)` belongs to the element.
//! - `InComment` - everything up to the next `//` belongs to the comment. An
//!   unterminated comment runs to the end of input.
//!
//! A lowercase `b` directly after an uppercase `D`, `E`, `G`, `A` or `B` is a
//! flat sign, not a new note.
//!
//! The lexer never fails. Characters that cannot start an element are glued to
//! the open element (or open an element of their own) and the parser reports
//! them.

use crate::model::{Letter, Span};

/// A raw element with its position in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Normal,
    InParens,
    InComment,
}

/// Start of the element currently being collected
#[derive(Debug, Clone, Copy)]
struct OpenElement {
    offset: usize,
    line: usize,
    column: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    position: usize,
    state: State,
    open: Option<OpenElement>,
    elements: Vec<Element>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            position: 0,
            state: State::Normal,
            open: None,
            elements: Vec::new(),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn at_comment_delimiter(&self) -> bool {
        self.input[self.position..].starts_with("//")
    }

    fn is_start_char(c: char) -> bool {
        Letter::from_char(c).is_some() || c == 'P' || c == 'p'
    }

    /// `b` right after an uppercase flat-capable letter is an accidental.
    fn continues_as_flat(&self, c: char) -> bool {
        if c != 'b' {
            return false;
        }
        match self.open {
            Some(open) if self.position == open.offset + 1 => {
                let first = self.input[open.offset..].chars().next();
                matches!(first, Some(l) if l.is_ascii_uppercase()
                    && Letter::from_char(l).is_some_and(Letter::takes_flat))
            }
            _ => false,
        }
    }

    fn open_element(&mut self) {
        self.close_element();
        self.open = Some(OpenElement {
            offset: self.position,
            line: self.line,
            column: self.column,
        });
    }

    fn close_element(&mut self) {
        if let Some(open) = self.open.take() {
            if self.position > open.offset {
                self.elements.push(Element {
                    text: self.input[open.offset..self.position].to_string(),
                    span: Span {
                        offset: open.offset,
                        len: self.position - open.offset,
                        line: open.line,
                        column: open.column,
                    },
                });
            }
        }
    }

    pub fn tokenize(mut self) -> Vec<Element> {
        while let Some(&c) = self.peek() {
            match self.state {
                State::Normal => {
                    if self.at_comment_delimiter() {
                        self.open_element();
                        self.advance(); // /
                        self.advance(); // /
                        self.state = State::InComment;
                    } else if c.is_whitespace() {
                        self.close_element();
                        self.advance();
                    } else if Self::is_start_char(c) && !self.continues_as_flat(c) {
                        self.open_element();
                        self.advance();
                    } else {
                        if self.open.is_none() {
                            self.open_element();
                        }
                        self.advance();
                        if c == '(' {
                            self.state = State::InParens;
                        }
                    }
                }
                State::InParens => {
                    self.advance();
                    if c == ')' {
                        self.state = State::Normal;
                    }
                }
                State::InComment => {
                    if self.at_comment_delimiter() {
                        self.advance(); // /
                        self.advance(); // /
                        self.close_element();
                        self.state = State::Normal;
                    } else {
                        self.advance();
                    }
                }
            }
        }
        self.close_element();
        self.elements
    }
}

/// Convenience wrapper over [`Lexer::tokenize`].
pub fn tokenize(input: &str) -> Vec<Element> {
    Lexer::new(input).tokenize()
}
