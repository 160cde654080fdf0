//! An integer argument.

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use helm_utils::StringReader;

use crate::arguments::ArgumentType;
use crate::error::{CommandSyntaxError, RangeFail, SyntaxErrorKind};

/// An integer argument that parses a 32-bit signed integer.
///
/// Can optionally have minimum and maximum bounds.
pub struct IntegerArgument {
    min: Option<i32>,
    max: Option<i32>,
}

impl IntegerArgument {
    /// Creates a new unbounded integer argument.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// Creates a new integer argument with bounds.
    #[must_use]
    pub const fn bounded(min: Option<i32>, max: Option<i32>) -> Self {
        Self { min, max }
    }

    fn out_of_range(&self, fail: RangeFail, got: i32) -> CommandSyntaxError {
        CommandSyntaxError::new(SyntaxErrorKind::OutOfRange {
            fail,
            value_type: "integer",
            got: got.to_string(),
            min: self.min.unwrap_or(i32::MIN).to_string(),
            max: self.max.unwrap_or(i32::MAX).to_string(),
        })
    }
}

impl Default for IntegerArgument {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ArgumentType<S> for IntegerArgument {
    type Parsed = i32;
    type Value = i32;

    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError> {
        let start = reader.cursor();
        let value = reader
            .read_int()
            .map_err(|error| CommandSyntaxError::from(error).with_context(reader))?;

        if let Some(min) = self.min
            && value < min
        {
            reader.set_cursor(start);
            return Err(self.out_of_range(RangeFail::TooLow, value).with_context(reader));
        }
        if let Some(max) = self.max
            && value > max
        {
            reader.set_cursor(start);
            return Err(self.out_of_range(RangeFail::TooHigh, value).with_context(reader));
        }

        Ok(value)
    }

    fn load(&self, parsed: Self::Parsed) -> BoxFuture<'_, Result<Self::Value, CommandSyntaxError>> {
        future::ready(Ok(parsed)).boxed()
    }

    fn examples(&self) -> Vec<String> {
        vec!["0".to_owned(), "123".to_owned(), "-123".to_owned()]
    }
}
