//! Lexer for expression text inside `(macro: ...)` argument positions.
//!
//! Handles the keyword operators (`is`, `is not`, `is in`, `is a`,
//! `contains`, `matches`, `to`, `into`, `of`, `and`, `or`, `not`, `where`,
//! `each`, `via`), variables (`$x`, `_x`), hook references (`?name`),
//! numbers, strings, hex colors, `...` spread, and punctuation. The `'s`
//! possessive is disambiguated from string quotes by whether the previous
//! token could end an operand.

use crate::value::Color;

/// A single token with its byte span in the source.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Color(Color),

    /// `$name`
    Global(String),
    /// `_name`
    Local(String),
    /// `?name`
    HookRef(String),

    True,
    False,
    It,
    Each,
    Via,
    Where,
    To,
    Into,
    Of,
    /// `'s`
    Possessive,

    Is,
    IsNot,
    IsA,
    IsIn,
    IsNotIn,
    Contains,
    Matches,
    And,
    Or,
    Not,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Lte,
    Gte,
    LParen,
    RParen,
    Comma,
    Colon,
    /// `...` spread marker.
    Ellipsis,

    Eof,
    Error(String),
}

impl TokenKind {
    /// Could this token end an operand? Decides whether a following `'`
    /// starts a possessive or a string literal.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::Str(_)
                | TokenKind::Ident(_)
                | TokenKind::Color(_)
                | TokenKind::Global(_)
                | TokenKind::Local(_)
                | TokenKind::HookRef(_)
                | TokenKind::It
                | TokenKind::True
                | TokenKind::False
                | TokenKind::RParen
        )
    }
}

/// Byte-walking lexer over one expression's source text.
pub struct ExprLexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    prev_ends_operand: bool,
}

impl<'a> ExprLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            prev_ends_operand: false,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn save(&self) -> (usize, bool) {
        (self.pos, self.prev_ends_operand)
    }

    pub fn restore(&mut self, state: (usize, bool)) {
        self.pos = state.0;
        self.prev_ends_operand = state.1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Peek at the next token without consuming it.
    pub fn peek_token(&mut self) -> Token {
        let saved = self.save();
        let tok = self.next_token();
        self.restore(saved);
        tok
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Token {
        let tok = self.lex();
        self.prev_ends_operand = tok.kind.ends_operand();
        tok
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            start,
            end: self.pos,
        }
    }

    fn lex(&mut self) -> Token {
        self.skip_whitespace();

        if self.at_end() {
            return self.token(TokenKind::Eof, self.pos);
        }

        let start = self.pos;
        match self.bytes[self.pos] {
            b'$' => self.lex_sigil_name(start, TokenKind::Global as fn(String) -> TokenKind),
            b'_' if self.peek_at(1).is_some_and(|c| c.is_ascii_alphanumeric()) => {
                self.lex_sigil_name(start, TokenKind::Local)
            }
            b'?' if self.peek_at(1).is_some_and(|c| c.is_ascii_alphanumeric()) => {
                self.lex_sigil_name(start, TokenKind::HookRef)
            }
            b'\'' if self.prev_ends_operand => {
                // `'s` possessive. Anything else after an operand's `'` is
                // a stray quote.
                if self.peek_at(1) == Some(b's')
                    && !self.peek_at(2).is_some_and(|c| c.is_ascii_alphanumeric())
                {
                    self.pos += 2;
                    self.token(TokenKind::Possessive, start)
                } else {
                    self.pos += 1;
                    self.token(TokenKind::Error("unexpected quote".to_string()), start)
                }
            }
            b'"' | b'\'' => self.lex_string(start),
            b'0'..=b'9' => self.lex_number(start),
            b'#' => self.lex_hex_color(start),
            b'+' => self.punct(start, TokenKind::Plus, 1),
            b'-' => self.punct(start, TokenKind::Minus, 1),
            b'*' => self.punct(start, TokenKind::Star, 1),
            b'/' => self.punct(start, TokenKind::Slash, 1),
            b'%' => self.punct(start, TokenKind::Percent, 1),
            b'<' => {
                if self.peek_at(1) == Some(b'=') {
                    self.punct(start, TokenKind::Lte, 2)
                } else {
                    self.punct(start, TokenKind::Lt, 1)
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'=') {
                    self.punct(start, TokenKind::Gte, 2)
                } else {
                    self.punct(start, TokenKind::Gt, 1)
                }
            }
            b'(' => self.punct(start, TokenKind::LParen, 1),
            b')' => self.punct(start, TokenKind::RParen, 1),
            b',' => self.punct(start, TokenKind::Comma, 1),
            b':' => self.punct(start, TokenKind::Colon, 1),
            b'.' => {
                if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                    self.punct(start, TokenKind::Ellipsis, 3)
                } else {
                    self.pos += 1;
                    self.token(TokenKind::Error("unexpected '.'".to_string()), start)
                }
            }
            c if c.is_ascii_alphabetic() => self.lex_word(start),
            _ => {
                self.pos += 1;
                let c = self.input[start..self.pos].chars().next().unwrap_or('?');
                self.token(
                    TokenKind::Error(format!("unexpected character '{c}'")),
                    start,
                )
            }
        }
    }

    fn punct(&mut self, start: usize, kind: TokenKind, len: usize) -> Token {
        self.pos += len;
        self.token(kind, start)
    }

    fn lex_sigil_name(&mut self, start: usize, make: impl Fn(String) -> TokenKind) -> Token {
        self.pos += 1; // sigil
        let name_start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        let name = self.input[name_start..self.pos].to_string();
        self.token(make(name), start)
    }

    fn lex_string(&mut self, start: usize) -> Token {
        let quote = self.bytes[self.pos];
        self.pos += 1;
        let mut value = String::new();
        while !self.at_end() {
            let c = self.bytes[self.pos];
            self.pos += 1;
            if c == quote {
                return self.token(TokenKind::Str(value), start);
            }
            if c == b'\\' && !self.at_end() {
                let esc = self.bytes[self.pos];
                self.pos += 1;
                match esc {
                    b'n' => value.push('\n'),
                    b't' => value.push('\t'),
                    b'\\' => value.push('\\'),
                    b'\'' => value.push('\''),
                    b'"' => value.push('"'),
                    other => {
                        value.push('\\');
                        value.push(other as char);
                    }
                }
            } else {
                // Multi-byte characters arrive as raw bytes; collect them.
                let ch_start = self.pos - 1;
                let ch_end = self.input[ch_start..]
                    .chars()
                    .next()
                    .map(|ch| ch_start + ch.len_utf8())
                    .unwrap_or(self.pos);
                value.push_str(&self.input[ch_start..ch_end]);
                self.pos = ch_end;
            }
        }
        self.token(TokenKind::Error("unterminated string".to_string()), start)
    }

    fn lex_number(&mut self, start: usize) -> Token {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek() == Some(b'.')
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.pos += 1;
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        let num_str = &self.input[start..self.pos];
        let value: f64 = num_str.parse().unwrap_or(0.0);

        // Ordinal suffix: `1st`, `2nd`, `3rd`, `4th`... is a member keyword,
        // not a number.
        if let (Some(a), Some(b)) = (self.peek(), self.peek_at(1)) {
            let suffix_ok = matches!(
                (a, b),
                (b's', b't') | (b'n', b'd') | (b'r', b'd') | (b't', b'h')
            );
            if suffix_ok && !self.peek_at(2).is_some_and(|c| c.is_ascii_alphanumeric()) {
                self.pos += 2;
                let word = self.input[start..self.pos].to_string();
                return self.token(TokenKind::Ident(word), start);
            }
        }

        self.token(TokenKind::Number(value), start)
    }

    fn lex_hex_color(&mut self, start: usize) -> Token {
        self.pos += 1; // #
        let hex_start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_hexdigit() {
            self.pos += 1;
        }
        let hex = &self.input[hex_start..self.pos];
        match Color::from_hex(hex) {
            Some(c) => self.token(TokenKind::Color(c), start),
            None => self.token(
                TokenKind::Error(format!("invalid hex color: #{hex}")),
                start,
            ),
        }
    }

    /// Lex a following bare word if it exactly matches `word`.
    fn try_word(&mut self, word: &str) -> bool {
        let saved = self.pos;
        self.skip_whitespace();
        let end = self.pos + word.len();
        if end <= self.bytes.len()
            && &self.input[self.pos..end] == word
            && !self.bytes.get(end).is_some_and(|c| c.is_ascii_alphanumeric())
        {
            self.pos = end;
            true
        } else {
            self.pos = saved;
            false
        }
    }

    fn lex_word(&mut self, start: usize) -> Token {
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric()
                || self.bytes[self.pos] == b'_'
                || self.bytes[self.pos] == b'-')
        {
            self.pos += 1;
        }
        let word = &self.input[start..self.pos];
        let kind = match word {
            "is" => {
                if self.try_word("not") {
                    if self.try_word("in") {
                        TokenKind::IsNotIn
                    } else {
                        TokenKind::IsNot
                    }
                } else if self.try_word("in") {
                    TokenKind::IsIn
                } else if self.try_word("a") || self.try_word("an") {
                    TokenKind::IsA
                } else {
                    TokenKind::Is
                }
            }
            "contains" => TokenKind::Contains,
            "matches" => TokenKind::Matches,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "to" => TokenKind::To,
            "into" => TokenKind::Into,
            "of" => TokenKind::Of,
            "where" => TokenKind::Where,
            "each" => TokenKind::Each,
            "via" => TokenKind::Via,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "it" => TokenKind::It,
            _ => TokenKind::Ident(word.to_string()),
        };
        self.token(kind, start)
    }
}
