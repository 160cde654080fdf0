//! This module contains the argument type contract and the stock argument
//! types.

pub mod bool;
pub mod errorable;
pub mod float;
pub mod integer;
pub mod lazy;
pub mod list;
pub mod string;

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use helm_utils::StringReader;

use crate::context::CommandContext;
use crate::error::CommandSyntaxError;
use crate::suggestion::{Suggestions, SuggestionsBuilder};

/// The parsed-but-not-loaded form carried between `parse` and `load`.
pub type ErasedParsed = Box<dyn Any + Send + Sync>;
/// The loaded value as stored into the command context.
pub type ErasedValue = Arc<dyn Any + Send + Sync>;

/// A typed argument parser.
///
/// `parse` is synchronous and consumes input up to the next separator or a
/// type-specific terminator; `load` may suspend to resolve the parsed form
/// into its final value after the parse has committed. Failures in either
/// surface identically through the parser's error map.
pub trait ArgumentType<S>: Send + Sync {
    /// The intermediate form `parse` produces.
    type Parsed: Send + Sync + 'static;
    /// The loaded value executors read out of the context.
    type Value: Send + Sync + 'static;

    /// Parses one argument out of the reader.
    ///
    /// On failure the error may keep its own pinned cursor and declare
    /// itself non-rewinding, in which case callers must not restore the
    /// cursor to the pre-parse position.
    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError>;

    /// Resolves the parsed form into the final value.
    fn load(&self, parsed: Self::Parsed) -> BoxFuture<'_, Result<Self::Value, CommandSyntaxError>>;

    /// Fills completions for a partially typed argument.
    ///
    /// The default walks [`ArgumentType::examples`], keeping those that
    /// start with what the user already typed.
    fn list_suggestions<'a>(
        &'a self,
        _context: &'a CommandContext<S>,
        mut builder: SuggestionsBuilder,
    ) -> BoxFuture<'a, Result<Suggestions, CommandSyntaxError>> {
        for example in self.examples() {
            if example
                .to_ascii_lowercase()
                .starts_with(builder.remaining_lowercase())
            {
                builder.suggest(example);
            }
        }
        future::ready(Ok(builder.build())).boxed()
    }

    /// A small finite set of accepted inputs, feeding default suggestions
    /// and ambiguity detection.
    fn examples(&self) -> Vec<String> {
        Vec::new()
    }
}

/// An argument type whose loaded value is the parsed form itself.
///
/// Wrap implementations in [`Simple`] to use them as an [`ArgumentType`];
/// the load step becomes the identity.
pub trait SimpleArgumentType: Send + Sync {
    /// The parsed (and loaded) value.
    type Value: Send + Sync + 'static;

    /// Parses one argument out of the reader.
    fn parse_simple(&self, reader: &mut StringReader<'_>)
    -> Result<Self::Value, CommandSyntaxError>;

    /// See [`ArgumentType::examples`].
    fn examples(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Projects a [`SimpleArgumentType`] into the full contract.
pub struct Simple<A>(pub A);

impl<S, A: SimpleArgumentType> ArgumentType<S> for Simple<A> {
    type Parsed = A::Value;
    type Value = A::Value;

    fn parse(&self, reader: &mut StringReader<'_>) -> Result<Self::Parsed, CommandSyntaxError> {
        self.0.parse_simple(reader)
    }

    fn load(&self, parsed: Self::Parsed) -> BoxFuture<'_, Result<Self::Value, CommandSyntaxError>> {
        future::ready(Ok(parsed)).boxed()
    }

    fn examples(&self) -> Vec<String> {
        self.0.examples()
    }
}

/// The object-safe face of [`ArgumentType`] the tree stores.
///
/// Implemented blanketly; user code never interacts with the erased forms
/// directly, the context downcasts on access.
pub trait ErasedArgumentType<S>: Send + Sync {
    /// Type-erased [`ArgumentType::parse`].
    fn parse_erased(
        &self,
        reader: &mut StringReader<'_>,
    ) -> Result<ErasedParsed, CommandSyntaxError>;

    /// Type-erased [`ArgumentType::load`].
    fn load_erased(
        &self,
        parsed: ErasedParsed,
    ) -> BoxFuture<'_, Result<ErasedValue, CommandSyntaxError>>;

    /// Type-erased [`ArgumentType::list_suggestions`].
    fn list_suggestions_erased<'a>(
        &'a self,
        context: &'a CommandContext<S>,
        builder: SuggestionsBuilder,
    ) -> BoxFuture<'a, Result<Suggestions, CommandSyntaxError>>;

    /// Type-erased [`ArgumentType::examples`].
    fn examples_erased(&self) -> Vec<String>;
}

impl<S, A: ArgumentType<S>> ErasedArgumentType<S> for A {
    fn parse_erased(
        &self,
        reader: &mut StringReader<'_>,
    ) -> Result<ErasedParsed, CommandSyntaxError> {
        Ok(Box::new(self.parse(reader)?))
    }

    fn load_erased(
        &self,
        parsed: ErasedParsed,
    ) -> BoxFuture<'_, Result<ErasedValue, CommandSyntaxError>> {
        match parsed.downcast::<A::Parsed>() {
            Ok(parsed) => {
                let loading = self.load(*parsed);
                async move { Ok(Arc::new(loading.await?) as ErasedValue) }.boxed()
            }
            Err(_) => future::ready(Err(CommandSyntaxError::message(
                "argument value does not match its declared type",
            )))
            .boxed(),
        }
    }

    fn list_suggestions_erased<'a>(
        &'a self,
        context: &'a CommandContext<S>,
        builder: SuggestionsBuilder,
    ) -> BoxFuture<'a, Result<Suggestions, CommandSyntaxError>> {
        self.list_suggestions(context, builder)
    }

    fn examples_erased(&self) -> Vec<String> {
        self.examples()
    }
}

#[cfg(test)]
mod tests {
    use super::integer::IntegerArgument;
    use super::*;

    #[tokio::test]
    async fn erased_round_trip_preserves_the_value() {
        let argument = IntegerArgument::new();
        let erased: &dyn ErasedArgumentType<()> = &argument;
        let mut reader = StringReader::new("17");
        let parsed = erased.parse_erased(&mut reader).expect("parses");
        let value = erased.load_erased(parsed).await.expect("loads");
        assert_eq!(value.downcast_ref::<i32>(), Some(&17));
    }

    #[test]
    fn simple_wrapper_projects_parse() {
        struct Letter;
        impl SimpleArgumentType for Letter {
            type Value = char;
            fn parse_simple(
                &self,
                reader: &mut StringReader<'_>,
            ) -> Result<Self::Value, CommandSyntaxError> {
                let c = reader
                    .peek()
                    .ok_or_else(|| CommandSyntaxError::expected("letter"))?;
                reader.skip();
                Ok(c)
            }
            fn examples(&self) -> Vec<String> {
                vec!["a".to_owned()]
            }
        }

        let wrapped = Simple(Letter);
        let mut reader = StringReader::new("x");
        let parsed = ArgumentType::<()>::parse(&wrapped, &mut reader).expect("parses");
        assert_eq!(parsed, 'x');
        assert_eq!(ArgumentType::<()>::examples(&wrapped), ["a"]);
    }
}
