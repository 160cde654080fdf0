//! A floating point argument.

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use helm_utils::StringReader;

use crate::arguments::ArgumentType;
use crate::error::{CommandSyntaxError, RangeFail, SyntaxErrorKind};

/// A floating point argument.
///
/// Can optionally have minimum and maximum bounds.
pub struct FloatArgument {
    min: Option<f64>,
    max: Option<f64>,
}

impl FloatArgument {
    /// Creates a new unbounded float argument.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// Creates a new float argument with bounds.
    #[must_use]
    pub const fn bounded(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    fn out_of_range(&self, fail: RangeFail, got: f64) -> CommandSyntaxError {
        CommandSyntaxError::new(SyntaxErrorKind::OutOfRange {
            fail,
            value_type: "float",
            got: got.to_string(),
            min: self.min.unwrap_or(f64::NEG_INFINITY).to_string(),
            max: self.max.unwrap_or(f64::INFINITY).to_string(),
        })
    }
}

impl Default for FloatArgument {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ArgumentType<S> for FloatArgument {
    type Parsed = f64;
    type Value = f64;

    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError> {
        let start = reader.cursor();
        let value = reader
            .read_float()
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
        vec![
            "0".to_owned(),
            "1.2".to_owned(),
            ".5".to_owned(),
            "-1".to_owned(),
            "-.5".to_owned(),
            "-1234.56".to_owned(),
        ]
    }
}
