//! The SQL scanner: raw text in, located tokens out.

use super::{LexError, Location, Token, TokenKind};

/// Streams the tokens of `sql` into `emit`.
///
/// The callback returns `false` to stop lexing early (the consumer has
/// gone away); that is not an error. Whitespace separates tokens and is
/// never emitted.
///
/// # Errors
///
/// Returns a [`LexError`] on the first unrecoverable condition: an
/// unterminated string or quoted identifier, a malformed number, or a
/// `$` with no identifier after it.
pub fn lex<F>(sql: &str, mut emit: F) -> Result<(), LexError>
where
    F: FnMut(Token) -> bool,
{
    let mut lexer = Lexer::new(sql);
    while let Some(token) = lexer.next_token()? {
        if !emit(token) {
            break;
        }
    }
    Ok(())
}

/// Lexes the whole input into a vector. Convenience wrapper around
/// [`lex`] used mostly by tests and tools.
///
/// # Errors
///
/// Same conditions as [`lex`].
pub fn tokenize(sql: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    lex(sql, |token| {
        tokens.push(token);
        true
    })?;
    Ok(tokens)
}

/// Returns true for characters that end a word: whitespace, quoting
/// delimiters, the `$` parameter sigil, and all single-character
/// punctuation and operator heads.
fn is_separator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '.' | ',' | ';' | '(' | ')' | '+' | '-' | '/' | '*' | '=' | '<' | '>' | '\'' | '"'
                | '$'
        )
}

/// A lexer over a single SQL string.
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the next unconsumed character.
    pos: usize,
    /// Location of the character at `pos`.
    location: Location,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            location: Location::start(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
        Some(c)
    }

    /// True when the character before `pos` belongs to a word, meaning
    /// a `.` here qualifies a name rather than starting a numeric
    /// literal.
    fn follows_word(&self) -> bool {
        self.input[..self.pos]
            .chars()
            .next_back()
            .is_some_and(|c| !is_separator(c))
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError::new(self.location, message)
    }

    /// Scans the next token, or returns `None` at end of input.
    ///
    /// # Errors
    ///
    /// See [`lex`].
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }

        let start = self.location;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '(' => self.punct(TokenKind::LParen, start),
            ')' => self.punct(TokenKind::RParen, start),
            ',' => self.punct(TokenKind::Comma, start),
            ';' => self.punct(TokenKind::Semicolon, start),
            '+' => self.punct(TokenKind::Plus, start),
            '-' => self.punct(TokenKind::Minus, start),
            '/' => self.punct(TokenKind::Slash, start),
            '*' => self.punct(TokenKind::Asterisk, start),
            '=' => self.punct(TokenKind::Equal, start),
            '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::LessOrEqual, start)
                } else if self.peek() == Some('>') {
                    self.advance();
                    Token::new(TokenKind::NotEqual, start)
                } else {
                    Token::new(TokenKind::Less, start)
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::GreaterOrEqual, start)
                } else {
                    Token::new(TokenKind::Greater, start)
                }
            }
            '.' => {
                if self.peek_next().is_some_and(|c| c.is_ascii_digit()) && !self.follows_word() {
                    self.scan_number(start)?
                } else {
                    self.punct(TokenKind::Dot, start)
                }
            }
            '\'' => self.scan_quoted('\'', start)?,
            '"' => self.scan_quoted('"', start)?,
            '$' => self.scan_parameter(start)?,
            c if c.is_ascii_digit() => self.scan_number(start)?,
            _ => self.scan_word(start),
        };

        Ok(Some(token))
    }

    fn punct(&mut self, kind: TokenKind, start: Location) -> Token {
        self.advance();
        Token::new(kind, start)
    }

    /// Scans a maximal run of non-separator characters.
    fn scan_word(&mut self, start: Location) -> Token {
        let from = self.pos;
        while self.peek().is_some_and(|c| !is_separator(c)) {
            self.advance();
        }
        let text = &self.input[from..self.pos];
        Token::new(TokenKind::Word(text.to_string()), start)
    }

    /// Scans a number: digits with at most one decimal point. The run
    /// ends at the first character that is neither a digit nor `.`.
    fn scan_number(&mut self, start: Location) -> Result<Token, LexError> {
        let from = self.pos;
        let mut has_decimal = false;

        while let Some(c) = self.peek() {
            if c == '.' {
                if has_decimal {
                    return Err(self.error("number cannot contain a second decimal point"));
                }
                has_decimal = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            self.advance();
        }

        let text = &self.input[from..self.pos];
        Ok(Token::new(TokenKind::Number(text.to_string()), start))
    }

    /// Scans a `'...'` string or `"..."` quoted identifier. The value
    /// excludes the delimiters; a doubled delimiter and backslash
    /// escapes stay in the value verbatim.
    fn scan_quoted(&mut self, delimiter: char, start: Location) -> Result<Token, LexError> {
        self.advance(); // opening delimiter
        let mut value = String::new();

        loop {
            let Some(c) = self.advance() else {
                return Err(self.error(format!("looking for closing `{delimiter}`")));
            };

            if c == '\\' {
                value.push(c);
                let Some(escaped) = self.advance() else {
                    return Err(self.error(format!("looking for closing `{delimiter}`")));
                };
                value.push(escaped);
            } else if c == delimiter {
                if self.peek() == Some(delimiter) {
                    self.advance();
                    value.push(delimiter);
                    value.push(delimiter);
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }

        let kind = if delimiter == '\'' {
            TokenKind::String(value)
        } else {
            TokenKind::Word(value)
        };
        Ok(Token::new(kind, start))
    }

    /// Scans a `$name` parameter. The name follows word rules and must
    /// be non-empty.
    fn scan_parameter(&mut self, start: Location) -> Result<Token, LexError> {
        self.advance(); // $
        let from = self.pos;
        while self.peek().is_some_and(|c| !is_separator(c)) {
            self.advance();
        }
        let name = &self.input[from..self.pos];
        if name.is_empty() {
            return Err(self.error("expecting identifier after `$`"));
        }
        Ok(Token::new(TokenKind::Parameter(name.to_string()), start))
    }
}
