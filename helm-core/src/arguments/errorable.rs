//! A fallback wrapper trying a secondary argument type when the primary
//! fails to parse.

use futures::FutureExt;
use futures::future::BoxFuture;
use helm_utils::StringReader;

use crate::arguments::ArgumentType;
use crate::error::CommandSyntaxError;

/// Which of the two wrapped types produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preferred<A, B> {
    /// The primary type parsed.
    Primary(A),
    /// The primary failed; the fallback parsed.
    Fallback(B),
}

/// Tries `primary`, rewinds and tries `fallback` when it fails.
///
/// A primary error that forbids rewinding (it consumed committed input)
/// propagates instead of falling back.
pub struct ErrorableArgument<A, B> {
    primary: A,
    fallback: B,
}

impl<A, B> ErrorableArgument<A, B> {
    /// Creates the wrapper.
    #[must_use]
    pub const fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

impl<S, A, B> ArgumentType<S> for ErrorableArgument<A, B>
where
    A: ArgumentType<S>,
    B: ArgumentType<S>,
{
    type Parsed = Preferred<A::Parsed, B::Parsed>;
    type Value = Preferred<A::Value, B::Value>;

    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError> {
        let start = reader.cursor();
        match self.primary.parse(reader) {
            Ok(parsed) => Ok(Preferred::Primary(parsed)),
            Err(error) if error.should_rewind() => {
                reader.set_cursor(start);
                self.fallback.parse(reader).map(Preferred::Fallback)
            }
            Err(error) => Err(error),
        }
    }

    fn load(&self, parsed: Self::Parsed) -> BoxFuture<'_, Result<Self::Value, CommandSyntaxError>> {
        match parsed {
            Preferred::Primary(parsed) => {
                let loading = self.primary.load(parsed);
                async move { Ok(Preferred::Primary(loading.await?)) }.boxed()
            }
            Preferred::Fallback(parsed) => {
                let loading = self.fallback.load(parsed);
                async move { Ok(Preferred::Fallback(loading.await?)) }.boxed()
            }
        }
    }

    fn examples(&self) -> Vec<String> {
        let mut examples = self.primary.examples();
        examples.extend(self.fallback.examples());
        examples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::integer::IntegerArgument;
    use crate::arguments::string::StringArgument;

    fn wrapper() -> ErrorableArgument<IntegerArgument, StringArgument> {
        ErrorableArgument::new(IntegerArgument::new(), StringArgument::word())
    }

    #[test]
    fn primary_wins_when_it_parses() {
        let mut reader = StringReader::new("31");
        let parsed = ArgumentType::<()>::parse(&wrapper(), &mut reader).expect("parses");
        assert_eq!(parsed, Preferred::Primary(31));
    }

    #[test]
    fn fallback_parses_from_the_rewound_cursor() {
        let mut reader = StringReader::new("north x");
        let parsed = ArgumentType::<()>::parse(&wrapper(), &mut reader).expect("parses");
        assert_eq!(parsed, Preferred::Fallback("north".to_owned()));
        assert_eq!(reader.remaining(), " x");
    }

    #[tokio::test]
    async fn load_follows_the_chosen_branch() {
        let argument = wrapper();
        let value = ArgumentType::<()>::load(&argument, Preferred::Primary(4))
            .await
            .expect("loads");
        assert_eq!(value, Preferred::Primary(4));
    }

    #[test]
    fn examples_combine_both_types() {
        let examples = ArgumentType::<()>::examples(&wrapper());
        assert!(examples.contains(&"123".to_owned()));
        assert!(examples.contains(&"word".to_owned()));
    }
}
