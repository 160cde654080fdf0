//! A string argument.

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use helm_utils::StringReader;

use crate::arguments::ArgumentType;
use crate::error::CommandSyntaxError;

/// How much of the input a [`StringArgument`] consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    /// One token up to the next separator.
    SingleWord,
    /// A quoted phrase, also accepting a bare word.
    QuotedPhrase,
    /// Everything to the end of the input.
    GreedyPhrase,
}

/// A string argument in one of three shapes: single word, quoted phrase or
/// greedy remainder.
pub struct StringArgument {
    kind: StringKind,
}

impl StringArgument {
    /// A single token up to the next separator.
    #[must_use]
    pub const fn word() -> Self {
        Self {
            kind: StringKind::SingleWord,
        }
    }

    /// A quoted phrase; bare words also pass.
    #[must_use]
    pub const fn phrase() -> Self {
        Self {
            kind: StringKind::QuotedPhrase,
        }
    }

    /// The whole remainder of the input, spaces included.
    #[must_use]
    pub const fn greedy() -> Self {
        Self {
            kind: StringKind::GreedyPhrase,
        }
    }
}

impl<S> ArgumentType<S> for StringArgument {
    type Parsed = String;
    type Value = String;

    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError> {
        match self.kind {
            StringKind::SingleWord => {
                let token = reader.read_unquoted_str();
                if token.is_empty() {
                    return Err(CommandSyntaxError::expected("word").with_context(reader));
                }
                Ok(token.to_owned())
            }
            StringKind::QuotedPhrase => reader
                .read_string()
                .map_err(|error| CommandSyntaxError::from(error).with_context(reader)),
            StringKind::GreedyPhrase => {
                let text = reader.remaining().to_owned();
                reader.set_cursor(reader.total_length());
                Ok(text)
            }
        }
    }

    fn load(&self, parsed: Self::Parsed) -> BoxFuture<'_, Result<Self::Value, CommandSyntaxError>> {
        future::ready(Ok(parsed)).boxed()
    }

    fn examples(&self) -> Vec<String> {
        match self.kind {
            StringKind::SingleWord => {
                vec!["word".to_owned(), "words_with_underscores".to_owned()]
            }
            StringKind::QuotedPhrase => {
                vec!["\"quoted phrase\"".to_owned(), "word".to_owned()]
            }
            StringKind::GreedyPhrase => vec![
                "word".to_owned(),
                "words with spaces".to_owned(),
                "\"and symbols\"".to_owned(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argument: &StringArgument, input: &str) -> Result<String, CommandSyntaxError> {
        ArgumentType::<()>::parse(argument, &mut StringReader::new(input))
    }

    #[test]
    fn word_stops_at_the_separator() {
        assert_eq!(
            parse(&StringArgument::word(), "hello world").ok().as_deref(),
            Some("hello")
        );
        assert!(parse(&StringArgument::word(), "").is_err());
    }

    #[test]
    fn phrase_accepts_quoted_and_bare() {
        let argument = StringArgument::phrase();
        assert_eq!(
            parse(&argument, "\"two words\" x").ok().as_deref(),
            Some("two words")
        );
        assert_eq!(parse(&argument, "bare rest").ok().as_deref(), Some("bare"));
    }

    #[test]
    fn greedy_consumes_everything() {
        let argument = StringArgument::greedy();
        let mut reader = StringReader::new("all of this text");
        assert_eq!(
            ArgumentType::<()>::parse(&argument, &mut reader).ok().as_deref(),
            Some("all of this text")
        );
        assert!(!reader.can_read());
    }

    #[tokio::test]
    async fn examples_round_trip() {
        for argument in [
            StringArgument::word(),
            StringArgument::phrase(),
            StringArgument::greedy(),
        ] {
            for example in ArgumentType::<()>::examples(&argument) {
                let mut reader = StringReader::new(&example);
                let parsed =
                    ArgumentType::<()>::parse(&argument, &mut reader).expect("parses");
                ArgumentType::<()>::load(&argument, parsed).await.expect("loads");
            }
        }
    }
}
