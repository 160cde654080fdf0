//! A cursor over an immutable input string with primitive token reads.

use thiserror::Error;

/// An error raised by one of the primitive token reads.
///
/// The reader restores its cursor to the start of the attempted token before
/// returning any of these, so callers can report the failure position from
/// the reader itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    /// The input ended where an integer was expected.
    #[error("expected integer")]
    ExpectedInt,
    /// The consumed token was not a valid integer.
    #[error("invalid integer '{0}'")]
    InvalidInt(String),
    /// The input ended where a number was expected.
    #[error("expected float")]
    ExpectedFloat,
    /// The consumed token was not a valid number.
    #[error("invalid float '{0}'")]
    InvalidFloat(String),
    /// The input ended where a boolean was expected.
    #[error("expected boolean")]
    ExpectedBool,
    /// The consumed token was neither "true" nor "false".
    #[error("invalid boolean '{0}'")]
    InvalidBool(String),
    /// A quoted string did not start with a quote character.
    #[error("expected quote to start a string")]
    ExpectedStartOfQuote,
    /// A quoted string was never closed.
    #[error("unclosed quoted string")]
    ExpectedEndOfQuote,
    /// A quoted string contained an unknown escape sequence.
    #[error("invalid escape sequence '\\{0}' in quoted string")]
    InvalidEscape(char),
    /// A specific character was expected at the cursor.
    #[error("expected '{0}'")]
    ExpectedSymbol(char),
}

/// The characters a quoted string may start with.
const QUOTES: [char; 2] = ['"', '\''];
/// The escape character inside quoted strings.
const ESCAPE: char = '\\';
/// The characters a bare number may be built from.
fn is_allowed_in_number(c: char) -> bool {
    c.is_ascii_digit() || c == '-' || c == '.'
}

/// A cursor over an input string.
///
/// Cloning snapshots the cursor; [`StringReader::set_cursor`] rewinds it.
/// Cursors are byte offsets into the original string.
#[derive(Debug, Clone)]
pub struct StringReader<'a> {
    string: &'a str,
    cursor: usize,
}

impl<'a> StringReader<'a> {
    /// Creates a reader at the start of `string`.
    #[must_use]
    pub const fn new(string: &'a str) -> Self {
        Self { string, cursor: 0 }
    }

    /// The full input string.
    #[must_use]
    pub const fn string(&self) -> &'a str {
        self.string
    }

    /// The current cursor position.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor to an absolute position.
    pub const fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// The total length of the input in bytes.
    #[must_use]
    pub const fn total_length(&self) -> usize {
        self.string.len()
    }

    /// The part of the input already consumed.
    #[must_use]
    pub fn get_read(&self) -> &'a str {
        &self.string[..self.cursor]
    }

    /// The part of the input not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a str {
        &self.string[self.cursor..]
    }

    /// The number of unconsumed bytes.
    #[must_use]
    pub const fn remaining_length(&self) -> usize {
        self.string.len() - self.cursor
    }

    /// Whether at least `length` bytes remain.
    #[must_use]
    pub const fn can_read_length(&self, length: usize) -> bool {
        self.cursor + length <= self.string.len()
    }

    /// Whether anything remains to read.
    #[must_use]
    pub const fn can_read(&self) -> bool {
        self.can_read_length(1)
    }

    /// The character at the cursor, if any.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// The character `offset` bytes past the cursor, if any.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.string
            .get(self.cursor + offset..)
            .and_then(|rest| rest.chars().next())
    }

    /// Advances past the character at the cursor, if any.
    pub fn skip(&mut self) {
        if let Some(c) = self.peek() {
            self.cursor += c.len_utf8();
        }
    }

    /// Advances past any whitespace at the cursor.
    pub fn skip_whitespace(&mut self) {
        self.read_while(char::is_whitespace);
    }

    /// Consumes characters while `predicate` holds and returns them.
    pub fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.cursor;
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.cursor += c.len_utf8();
        }
        &self.string[start..self.cursor]
    }

    /// Consumes up to the next argument separator (an ASCII space) and
    /// returns the token, which may be empty.
    pub fn read_unquoted_str(&mut self) -> &'a str {
        self.read_while(|c| c != ' ')
    }

    /// Consumes and parses an integer token.
    pub fn read_int(&mut self) -> Result<i32, ReaderError> {
        let start = self.cursor;
        let token = self.read_while(is_allowed_in_number);
        if token.is_empty() {
            return Err(ReaderError::ExpectedInt);
        }
        token.parse().map_err(|_| {
            self.cursor = start;
            ReaderError::InvalidInt(token.to_owned())
        })
    }

    /// Consumes and parses a floating point token.
    pub fn read_float(&mut self) -> Result<f64, ReaderError> {
        let start = self.cursor;
        let token = self.read_while(is_allowed_in_number);
        if token.is_empty() {
            return Err(ReaderError::ExpectedFloat);
        }
        token.parse().map_err(|_| {
            self.cursor = start;
            ReaderError::InvalidFloat(token.to_owned())
        })
    }

    /// Consumes and parses a boolean token, case-insensitively.
    pub fn read_boolean(&mut self) -> Result<bool, ReaderError> {
        let start = self.cursor;
        let token = self.read_while(|c| c.is_ascii_alphabetic());
        if token.is_empty() {
            return Err(ReaderError::ExpectedBool);
        }
        match token.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => {
                self.cursor = start;
                Err(ReaderError::InvalidBool(token.to_owned()))
            }
        }
    }

    /// Consumes a quoted string, resolving `\"` and `\\` escapes.
    pub fn read_quoted_string(&mut self) -> Result<String, ReaderError> {
        let start = self.cursor;
        let Some(quote) = self.peek().filter(|c| QUOTES.contains(c)) else {
            return Err(ReaderError::ExpectedStartOfQuote);
        };
        self.skip();

        let mut result = String::new();
        let mut escaped = false;
        while let Some(c) = self.peek() {
            self.skip();
            if escaped {
                if c == quote || c == ESCAPE {
                    result.push(c);
                    escaped = false;
                } else {
                    self.cursor = start;
                    return Err(ReaderError::InvalidEscape(c));
                }
            } else if c == ESCAPE {
                escaped = true;
            } else if c == quote {
                return Ok(result);
            } else {
                result.push(c);
            }
        }

        self.cursor = start;
        Err(ReaderError::ExpectedEndOfQuote)
    }

    /// Consumes a string token: quoted if it starts with a quote, otherwise
    /// everything up to the next argument separator.
    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        match self.peek() {
            Some(c) if QUOTES.contains(&c) => self.read_quoted_string(),
            _ => Ok(self.read_unquoted_str().to_owned()),
        }
    }

    /// Consumes `expected` at the cursor or fails without advancing.
    pub fn expect(&mut self, expected: char) -> Result<(), ReaderError> {
        if self.peek() == Some(expected) {
            self.skip();
            Ok(())
        } else {
            Err(ReaderError::ExpectedSymbol(expected))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_integers_and_stops_at_separators() {
        let mut reader = StringReader::new("1234 rest");
        assert_eq!(reader.read_int(), Ok(1234));
        assert_eq!(reader.remaining(), " rest");
    }

    #[test]
    fn invalid_integer_rewinds() {
        let mut reader = StringReader::new("12.5");
        assert_eq!(
            reader.read_int(),
            Err(ReaderError::InvalidInt("12.5".to_owned()))
        );
        assert_eq!(reader.cursor(), 0);
    }

    #[test]
    fn reads_floats() {
        let mut reader = StringReader::new("-42.75,next");
        assert_eq!(reader.read_float(), Ok(-42.75));
        assert_eq!(reader.peek(), Some(','));
    }

    #[test]
    fn reads_booleans_case_insensitively() {
        let mut reader = StringReader::new("True false maybe");
        assert_eq!(reader.read_boolean(), Ok(true));
        reader.skip();
        assert_eq!(reader.read_boolean(), Ok(false));
        reader.skip();
        assert_eq!(
            reader.read_boolean(),
            Err(ReaderError::InvalidBool("maybe".to_owned()))
        );
    }

    #[test]
    fn unquoted_read_stops_at_space_only() {
        let mut reader = StringReader::new("hello,there world");
        assert_eq!(reader.read_unquoted_str(), "hello,there");
        assert_eq!(reader.remaining(), " world");
    }

    #[test]
    fn quoted_string_resolves_escapes() {
        let mut reader = StringReader::new(r#""say \"hi\" \\now" tail"#);
        assert_eq!(
            reader.read_quoted_string(),
            Ok(r#"say "hi" \now"#.to_owned())
        );
        assert_eq!(reader.remaining(), " tail");
    }

    #[test]
    fn unterminated_quote_rewinds() {
        let mut reader = StringReader::new("\"oops");
        assert_eq!(
            reader.read_quoted_string(),
            Err(ReaderError::ExpectedEndOfQuote)
        );
        assert_eq!(reader.cursor(), 0);
    }

    #[test]
    fn read_string_accepts_both_forms() {
        let mut reader = StringReader::new("bare \"quoted text\"");
        assert_eq!(reader.read_string(), Ok("bare".to_owned()));
        reader.skip();
        assert_eq!(reader.read_string(), Ok("quoted text".to_owned()));
    }

    #[test]
    fn clone_snapshots_and_set_cursor_rewinds() {
        let mut reader = StringReader::new("abc def");
        let snapshot = reader.clone();
        reader.read_unquoted_str();
        assert_eq!(reader.cursor(), 3);
        assert_eq!(snapshot.cursor(), 0);
        reader.set_cursor(0);
        assert_eq!(reader.remaining(), "abc def");
    }

    #[test]
    fn expect_consumes_only_on_match() {
        let mut reader = StringReader::new("=x");
        assert_eq!(reader.expect('='), Ok(()));
        assert_eq!(reader.expect('='), Err(ReaderError::ExpectedSymbol('=')));
        assert_eq!(reader.peek(), Some('x'));
    }
}
