//! # Helm Core
//!
//! A declarative command grammar: build a tree of literal and argument
//! nodes, parse free-form input against it, execute the matched command and
//! offer context-sensitive completions for partial input.
//!
//! ```
//! # use helm_core::builder::{argument, literal};
//! # use helm_core::arguments::integer::IntegerArgument;
//! # use helm_core::dispatcher::CommandDispatcher;
//! # futures::executor::block_on(async {
//! let mut dispatcher: CommandDispatcher<()> = CommandDispatcher::new();
//! dispatcher.register(
//!     literal("roll").then(argument("sides", IntegerArgument::bounded(Some(2), None)).executes(
//!         |ctx| Ok(ctx.argument::<i32>("sides").copied().unwrap_or(6)),
//!     )),
//! );
//! assert!(dispatcher.execute("roll 20", ()).await.is_ok());
//! # });
//! ```

pub mod arguments;
pub mod builder;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod suggestion;
pub mod tree;

pub use builder::{CommandBuilder, argument, literal, literal_with_aliases};
pub use context::CommandContext;
pub use dispatcher::{CommandDispatcher, ParseResults};
pub use error::{CommandSyntaxError, DispatchError};
pub use tree::NodeId;
