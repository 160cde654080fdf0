//! A wrapper deferring an argument's real parse and load.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use helm_utils::StringReader;

use crate::arguments::ArgumentType;
use crate::error::{CommandSyntaxError, SyntaxErrorKind};

/// Captures one opaque token at parse time; the real parse and load run
/// when the consumer asks for the value.
pub struct LazyArgument<A> {
    inner: Arc<A>,
}

impl<A> LazyArgument<A> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: A) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

/// A deferred value: the raw token plus the type that knows how to resolve
/// it.
pub struct LazyValue<A> {
    raw: String,
    inner: Arc<A>,
}

impl<A> LazyValue<A> {
    /// The raw token as typed.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Runs the deferred parse and load.
    ///
    /// The token must be consumed entirely, the same rule the parser applies
    /// to eagerly parsed arguments.
    pub async fn load<S>(&self) -> Result<A::Value, CommandSyntaxError>
    where
        A: ArgumentType<S>,
    {
        let mut reader = StringReader::new(&self.raw);
        let parsed = self.inner.parse(&mut reader)?;
        if reader.can_read() {
            return Err(
                CommandSyntaxError::new(SyntaxErrorKind::ExpectedArgumentSeparator)
                    .with_context(&reader),
            );
        }
        self.inner.load(parsed).await
    }
}

impl<A> PartialEq for LazyValue<A> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<S, A> ArgumentType<S> for LazyArgument<A>
where
    A: ArgumentType<S> + 'static,
{
    type Parsed = String;
    type Value = LazyValue<A>;

    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError> {
        let token = reader.read_unquoted_str();
        if token.is_empty() {
            return Err(CommandSyntaxError::expected("value").with_context(reader));
        }
        Ok(token.to_owned())
    }

    fn load(&self, parsed: Self::Parsed) -> BoxFuture<'_, Result<Self::Value, CommandSyntaxError>> {
        future::ready(Ok(LazyValue {
            raw: parsed,
            inner: Arc::clone(&self.inner),
        }))
        .boxed()
    }

    fn examples(&self) -> Vec<String> {
        self.inner.examples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::integer::IntegerArgument;

    #[tokio::test]
    async fn resolution_happens_on_demand() {
        let argument = LazyArgument::new(IntegerArgument::bounded(Some(0), Some(100)));
        let mut reader = StringReader::new("55 tail");
        let parsed = ArgumentType::<()>::parse(&argument, &mut reader).expect("parses");
        assert_eq!(reader.remaining(), " tail");

        let value = ArgumentType::<()>::load(&argument, parsed).await.expect("loads");
        assert_eq!(value.raw(), "55");
        assert_eq!(value.load::<()>().await.ok(), Some(55));
    }

    #[tokio::test]
    async fn deferred_errors_surface_at_load_time() {
        let argument = LazyArgument::new(IntegerArgument::bounded(Some(0), Some(100)));
        let mut reader = StringReader::new("999");
        let parsed = ArgumentType::<()>::parse(&argument, &mut reader).expect("parse is opaque");
        let value = ArgumentType::<()>::load(&argument, parsed).await.expect("loads");
        assert!(value.load::<()>().await.is_err());
    }
}
