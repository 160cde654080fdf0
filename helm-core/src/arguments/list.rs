//! A list argument wrapping another argument type.

use futures::FutureExt;
use futures::future::BoxFuture;
use helm_utils::StringReader;

use crate::arguments::ArgumentType;
use crate::error::{CommandSyntaxError, RangeFail, SyntaxErrorKind};

/// When duplicate elements are dropped from a parsed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListDedup {
    /// Keep duplicates.
    #[default]
    Keep,
    /// Drop elements whose parsed form was already collected.
    ByParsed,
    /// Drop elements whose loaded value was already collected.
    ByLoaded,
}

/// A list of values separated by a configurable character, e.g. `1,2,3`.
///
/// Cardinality is bounded by `[min, max]`; a separator not followed by
/// another element is an error.
pub struct ListArgument<A> {
    element: A,
    separator: char,
    min: usize,
    max: Option<usize>,
    dedup: ListDedup,
}

impl<A> ListArgument<A> {
    /// Creates a comma-separated list of at least one element.
    #[must_use]
    pub const fn new(element: A) -> Self {
        Self {
            element,
            separator: ',',
            min: 1,
            max: None,
            dedup: ListDedup::Keep,
        }
    }

    /// Changes the element separator.
    ///
    /// # Panics
    /// - If the separator is the argument separator or not ASCII.
    #[track_caller]
    #[must_use]
    pub fn separated_by(mut self, separator: char) -> Self {
        assert!(
            separator.is_ascii() && separator != ' ',
            "the list separator must be an ASCII character other than the argument separator"
        );
        self.separator = separator;
        self
    }

    /// Bounds how many elements the list accepts.
    #[must_use]
    pub const fn bounded(mut self, min: usize, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Configures duplicate handling.
    #[must_use]
    pub const fn dedup(mut self, dedup: ListDedup) -> Self {
        self.dedup = dedup;
        self
    }

    fn cardinality_error(&self, fail: RangeFail, got: usize) -> CommandSyntaxError {
        CommandSyntaxError::new(SyntaxErrorKind::OutOfRange {
            fail,
            value_type: "list length",
            got: got.to_string(),
            min: self.min.to_string(),
            max: self
                .max
                .map_or_else(|| "unbounded".to_owned(), |max| max.to_string()),
        })
    }
}

impl<S, A> ArgumentType<S> for ListArgument<A>
where
    A: ArgumentType<S>,
    A::Parsed: PartialEq,
    A::Value: PartialEq,
{
    type Parsed = Vec<A::Parsed>;
    type Value = Vec<A::Value>;

    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError> {
        let start = reader.cursor();
        let mut items = Vec::new();
        loop {
            let item = self.element.parse(reader)?;
            if !(self.dedup == ListDedup::ByParsed && items.contains(&item)) {
                items.push(item);
            }
            if reader.peek() == Some(self.separator) {
                let separator_at = reader.cursor();
                reader.skip();
                if !reader.can_read() || reader.peek() == Some(' ') {
                    return Err(CommandSyntaxError::new(SyntaxErrorKind::BadSeparator(
                        self.separator,
                    ))
                    .positioned(reader.string(), separator_at)
                    .without_rewind());
                }
                continue;
            }
            break;
        }

        if items.len() < self.min {
            reader.set_cursor(start);
            return Err(self
                .cardinality_error(RangeFail::TooFew, items.len())
                .with_context(reader));
        }
        if let Some(max) = self.max
            && items.len() > max
        {
            reader.set_cursor(start);
            return Err(self
                .cardinality_error(RangeFail::TooMany, items.len())
                .with_context(reader));
        }
        Ok(items)
    }

    fn load(&self, parsed: Self::Parsed) -> BoxFuture<'_, Result<Self::Value, CommandSyntaxError>> {
        async move {
            let mut values = Vec::with_capacity(parsed.len());
            for item in parsed {
                let value = self.element.load(item).await?;
                if self.dedup == ListDedup::ByLoaded && values.contains(&value) {
                    continue;
                }
                values.push(value);
            }
            Ok(values)
        }
        .boxed()
    }

    fn examples(&self) -> Vec<String> {
        let mut examples = self.element.examples();
        if examples.len() >= 2 {
            let joined = format!("{}{}{}", examples[0], self.separator, examples[1]);
            examples.push(joined);
        }
        examples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::integer::IntegerArgument;

    fn parse(
        argument: &ListArgument<IntegerArgument>,
        input: &str,
    ) -> Result<Vec<i32>, CommandSyntaxError> {
        ArgumentType::<()>::parse(argument, &mut StringReader::new(input))
    }

    #[test]
    fn collects_separated_elements() {
        let argument = ListArgument::new(IntegerArgument::new());
        assert_eq!(parse(&argument, "1,2,3 rest").ok(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn custom_separator_applies() {
        let argument = ListArgument::new(IntegerArgument::new()).separated_by(';');
        assert_eq!(parse(&argument, "4;5").ok(), Some(vec![4, 5]));
    }

    #[test]
    fn dangling_separator_is_rejected_in_place() {
        let argument = ListArgument::new(IntegerArgument::new());
        let error = parse(&argument, "1,2, next").expect_err("must fail");
        assert_eq!(error.kind(), &SyntaxErrorKind::BadSeparator(','));
        assert_eq!(error.cursor(), Some(3));
        assert!(!error.should_rewind());
    }

    #[test]
    fn cardinality_bounds_are_enforced() {
        let argument = ListArgument::new(IntegerArgument::new()).bounded(2, Some(3));
        assert!(matches!(
            parse(&argument, "1").expect_err("too few").kind(),
            SyntaxErrorKind::OutOfRange {
                fail: RangeFail::TooFew,
                ..
            }
        ));
        assert!(matches!(
            parse(&argument, "1,2,3,4").expect_err("too many").kind(),
            SyntaxErrorKind::OutOfRange {
                fail: RangeFail::TooMany,
                ..
            }
        ));
        assert_eq!(parse(&argument, "1,2").ok(), Some(vec![1, 2]));
    }

    #[test]
    fn parsed_dedup_drops_repeats() {
        let argument = ListArgument::new(IntegerArgument::new()).dedup(ListDedup::ByParsed);
        assert_eq!(parse(&argument, "5,5,6,5").ok(), Some(vec![5, 6]));
    }

    #[tokio::test]
    async fn loaded_dedup_drops_repeats() {
        let argument = ListArgument::new(IntegerArgument::new()).dedup(ListDedup::ByLoaded);
        let parsed = parse(&argument, "7,7,8").expect("parses");
        let values = ArgumentType::<()>::load(&argument, parsed)
            .await
            .expect("loads");
        assert_eq!(values, vec![7, 8]);
    }

    #[test]
    fn examples_include_a_joined_pair() {
        let argument = ListArgument::new(IntegerArgument::new());
        assert!(ArgumentType::<()>::examples(&argument).contains(&"0,123".to_owned()));
    }
}
