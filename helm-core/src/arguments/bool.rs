//! A boolean argument.

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use helm_utils::StringReader;

use crate::arguments::ArgumentType;
use crate::error::CommandSyntaxError;

/// A boolean argument that parses "true" or "false", case-insensitively.
pub struct BoolArgument;

impl<S> ArgumentType<S> for BoolArgument {
    type Parsed = bool;
    type Value = bool;

    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError> {
        reader
            .read_boolean()
            .map_err(|error| CommandSyntaxError::from(error).with_context(reader))
    }

    fn load(&self, parsed: Self::Parsed) -> BoxFuture<'_, Result<Self::Value, CommandSyntaxError>> {
        future::ready(Ok(parsed)).boxed()
    }

    fn examples(&self) -> Vec<String> {
        vec!["true".to_owned(), "false".to_owned()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<bool, CommandSyntaxError> {
        ArgumentType::<()>::parse(&BoolArgument, &mut StringReader::new(input))
    }

    #[test]
    fn accepts_both_values_in_any_case() {
        assert_eq!(parse("true").ok(), Some(true));
        assert_eq!(parse("False").ok(), Some(false));
    }

    #[test]
    fn rejects_other_tokens_at_their_position() {
        let error = parse("yes").expect_err("must fail");
        assert_eq!(error.cursor(), Some(0));
    }

    #[tokio::test]
    async fn examples_round_trip() {
        for example in ArgumentType::<()>::examples(&BoolArgument) {
            let mut reader = StringReader::new(&example);
            let parsed = ArgumentType::<()>::parse(&BoolArgument, &mut reader).expect("parses");
            ArgumentType::<()>::load(&BoolArgument, parsed)
                .await
                .expect("loads");
        }
    }
}
