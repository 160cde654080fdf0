//! Module defining errors that can occur during command parsing, dispatch
//! and execution.

use std::fmt;

use helm_utils::reader::ReaderError;
use helm_utils::reader::StringReader;
use thiserror::Error;

/// How many characters of context are echoed before the failure position.
const CONTEXT_AMOUNT: usize = 10;

/// Which bound a range check tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFail {
    /// The value fell below the minimum.
    TooLow,
    /// The value exceeded the maximum.
    TooHigh,
    /// A collection had fewer elements than required.
    TooFew,
    /// A collection had more elements than allowed.
    TooMany,
}

/// The specific kind of a [`CommandSyntaxError`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxErrorKind {
    /// Something was expected at the cursor but the input ended or diverged.
    #[error("expected {0}")]
    Expected(String),
    /// Nothing at the cursor matched any known alternative.
    #[error("unknown {0}")]
    Unknown(String),
    /// A parsed token was not followed by the argument separator.
    #[error("expected whitespace to end one argument, but found trailing data")]
    ExpectedArgumentSeparator,
    /// A literal node did not match the token at the cursor.
    #[error("expected literal '{0}'")]
    ExpectedLiteral(String),
    /// A list used its element separator in an invalid position.
    #[error("misplaced list separator '{0}'")]
    BadSeparator(char),
    /// A node's visibility requirement rejected the source with a reason.
    #[error("{0}")]
    RequirementFailed(String),
    /// A value or cardinality fell outside its configured bounds.
    #[error("{value_type} must be between {min} and {max}, found {got}")]
    OutOfRange {
        /// Which bound was violated.
        fail: RangeFail,
        /// A short noun for the value being checked.
        value_type: &'static str,
        /// The offending value, rendered.
        got: String,
        /// The lower bound, rendered.
        min: String,
        /// The upper bound, rendered.
        max: String,
    },
    /// A primitive token read failed.
    #[error(transparent)]
    Reader(#[from] ReaderError),
    /// A free-form message from an argument type.
    #[error("{0}")]
    Message(String),
}

/// A user-displayable error pinned to a position in the input.
///
/// The position is optional until the error passes a reader; consumers can
/// underline `input[cursor..]` when both are present. `rewind` mirrors the
/// argument-type contract: when false, the pinned cursor is the one inside
/// the failing type's own reader and callers must not re-pin it.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct CommandSyntaxError {
    kind: SyntaxErrorKind,
    input: Option<String>,
    cursor: Option<usize>,
    rewind: bool,
}

impl CommandSyntaxError {
    /// Creates an unpositioned error of the given kind.
    #[must_use]
    pub const fn new(kind: SyntaxErrorKind) -> Self {
        Self {
            kind,
            input: None,
            cursor: None,
            rewind: true,
        }
    }

    /// Shorthand for [`SyntaxErrorKind::Expected`].
    #[must_use]
    pub fn expected(thing: impl Into<String>) -> Self {
        Self::new(SyntaxErrorKind::Expected(thing.into()))
    }

    /// Shorthand for [`SyntaxErrorKind::Unknown`].
    #[must_use]
    pub fn unknown(thing: impl Into<String>) -> Self {
        Self::new(SyntaxErrorKind::Unknown(thing.into()))
    }

    /// Shorthand for [`SyntaxErrorKind::Message`].
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self::new(SyntaxErrorKind::Message(text.into()))
    }

    /// Pins the error to the reader's current position.
    #[must_use]
    pub fn with_context(mut self, reader: &StringReader<'_>) -> Self {
        self.input = Some(reader.string().to_owned());
        self.cursor = Some(reader.cursor());
        self
    }

    /// Pins the error to an explicit position if it does not carry one yet.
    #[must_use]
    pub fn positioned(mut self, input: &str, cursor: usize) -> Self {
        if self.cursor.is_none() {
            self.input = Some(input.to_owned());
            self.cursor = Some(cursor);
        }
        self
    }

    /// Marks that the failing cursor must be kept as-is by callers.
    #[must_use]
    pub const fn without_rewind(mut self) -> Self {
        self.rewind = false;
        self
    }

    /// The error kind.
    #[must_use]
    pub const fn kind(&self) -> &SyntaxErrorKind {
        &self.kind
    }

    /// The pinned cursor position, if any.
    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The pinned input, if any.
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Whether callers should restore their reader to the pre-parse cursor.
    #[must_use]
    pub const fn should_rewind(&self) -> bool {
        self.rewind
    }
}

impl From<ReaderError> for CommandSyntaxError {
    fn from(error: ReaderError) -> Self {
        Self::new(SyntaxErrorKind::Reader(error))
    }
}

impl fmt::Display for CommandSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let (Some(input), Some(cursor)) = (&self.input, self.cursor) {
            let cursor = cursor.min(input.len());
            let start = cursor.saturating_sub(CONTEXT_AMOUNT);
            write!(f, " at position {cursor}: ")?;
            if start > 0 {
                write!(f, "...")?;
            }
            write!(f, "{}<--[HERE]", &input[start..cursor])?;
        }
        Ok(())
    }
}

/// An error surfaced by the dispatcher when executing a parse.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The input failed to parse into an executable command.
    #[error(transparent)]
    Syntax(#[from] CommandSyntaxError),
    /// An executor body or redirect modifier failed.
    #[error("command execution failed: {0}")]
    Execution(anyhow::Error),
}

/// A failed visibility requirement.
///
/// Absence of a `reason` makes the parser skip the node silently;
/// `show_in_tree` controls whether usage listings and suggestions still
/// include it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementFailure {
    /// Whether the node is still listed in help and suggestions.
    pub show_in_tree: bool,
    /// The denial reported to the caller, if any.
    pub reason: Option<String>,
}

impl RequirementFailure {
    /// A failure that hides the node entirely.
    #[must_use]
    pub const fn hidden() -> Self {
        Self {
            show_in_tree: false,
            reason: None,
        }
    }

    /// A failure that keeps the node listed and reports `reason` on use.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            show_in_tree: true,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_underlines_the_failure_position() {
        let mut reader = StringReader::new("foo barbaz");
        reader.set_cursor(7);
        let error = CommandSyntaxError::unknown("argument").with_context(&reader);
        assert_eq!(
            error.to_string(),
            "unknown argument at position 7: foo bar<--[HERE]"
        );
    }

    #[test]
    fn display_truncates_long_context() {
        let input = "0123456789abcdefghij";
        let error = CommandSyntaxError::expected("integer").positioned(input, 15);
        assert_eq!(
            error.to_string(),
            "expected integer at position 15: ...56789abcde<--[HERE]"
        );
    }

    #[test]
    fn positioned_never_clobbers_a_pinned_cursor() {
        let error = CommandSyntaxError::message("inner failure")
            .positioned("inner", 3)
            .positioned("outer text", 0);
        assert_eq!(error.cursor(), Some(3));
        assert_eq!(error.input(), Some("inner"));
    }

    #[test]
    fn rewind_defaults_on_and_can_be_disabled() {
        assert!(CommandSyntaxError::expected("value").should_rewind());
        assert!(
            !CommandSyntaxError::expected("value")
                .without_rewind()
                .should_rewind()
        );
    }

    #[test]
    fn reader_errors_convert() {
        let error = CommandSyntaxError::from(ReaderError::ExpectedInt);
        assert_eq!(
            error.kind(),
            &SyntaxErrorKind::Reader(ReaderError::ExpectedInt)
        );
    }
}
