//! The fluent builder used to assemble command trees before registration.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use smallvec::SmallVec;

use crate::arguments::ArgumentType;
use crate::context::CommandContext;
use crate::error::{CommandSyntaxError, RequirementFailure};
use crate::suggestion::{Suggestions, SuggestionsBuilder};
use crate::tree::{Command, NodeId, NodeKind, RedirectModifier, RequirementFn};

/// A fully assembled node (plus its subtree), ready to be registered or
/// folded into an existing tree.
pub struct BuiltNode<S> {
    pub(crate) kind: NodeKind<S>,
    pub(crate) children: Vec<BuiltNode<S>>,
    pub(crate) command: Option<Command<S>>,
    pub(crate) requirement: Option<RequirementFn<S>>,
    pub(crate) redirect: Option<NodeId>,
    pub(crate) modifier: Option<RedirectModifier<S>>,
    pub(crate) description: Option<String>,
}

/// Starts a literal node matching `name` case-insensitively.
#[must_use]
pub fn literal<S: 'static>(name: impl Into<String>) -> CommandBuilder<S> {
    CommandBuilder::new(NodeKind::Literal {
        names: SmallVec::from_iter([name.into()]),
    })
}

/// Starts a literal node with aliases; index 0 is the canonical name.
///
/// # Panics
/// - If `names` is empty.
#[track_caller]
#[must_use]
pub fn literal_with_aliases<S: 'static>(names: &[&str]) -> CommandBuilder<S> {
    assert!(!names.is_empty(), "a literal needs at least one name");
    CommandBuilder::new(NodeKind::Literal {
        names: names.iter().map(|&name| name.to_owned()).collect(),
    })
}

/// Starts an argument node parsing `argument` into the slot `name`.
#[must_use]
pub fn argument<S: 'static, A>(name: impl Into<String>, argument: A) -> CommandBuilder<S>
where
    A: ArgumentType<S> + 'static,
{
    CommandBuilder::new(NodeKind::Argument {
        name: name.into(),
        argument: Arc::new(argument),
        suggestions: None,
    })
}

/// A node under construction.
///
/// ```
/// # use helm_core::builder::{argument, literal};
/// # use helm_core::arguments::integer::IntegerArgument;
/// let tree = literal::<()>("roll")
///     .then(argument("sides", IntegerArgument::bounded(Some(2), None)).executes(|ctx| {
///         Ok(*ctx.argument::<i32>("sides").unwrap_or(&6))
///     }))
///     .executes(|_| Ok(6));
/// ```
pub struct CommandBuilder<S> {
    kind: NodeKind<S>,
    children: Vec<BuiltNode<S>>,
    command: Option<Command<S>>,
    requirement: Option<RequirementFn<S>>,
    redirect: Option<NodeId>,
    modifier: Option<RedirectModifier<S>>,
    description: Option<String>,
}

impl<S: 'static> CommandBuilder<S> {
    const fn new(kind: NodeKind<S>) -> Self {
        Self {
            kind,
            children: Vec::new(),
            command: None,
            requirement: None,
            redirect: None,
            modifier: None,
            description: None,
        }
    }

    /// Adds a child branch.
    ///
    /// # Panics
    /// - If the node already redirects; a redirecting node has no children.
    #[track_caller]
    #[must_use]
    pub fn then(mut self, child: Self) -> Self {
        assert!(
            self.redirect.is_none(),
            "cannot add children to a redirecting command"
        );
        self.children.push(child.build());
        self
    }

    /// Makes the node executable with a synchronous body.
    #[must_use]
    pub fn executes<F>(self, body: F) -> Self
    where
        F: Fn(&CommandContext<S>) -> anyhow::Result<i32> + Send + Sync + 'static,
    {
        self.executes_async(move |context| future::ready(body(context)).boxed())
    }

    /// Makes the node executable with an asynchronous body.
    #[must_use]
    pub fn executes_async<F>(mut self, body: F) -> Self
    where
        F: for<'a> Fn(&'a CommandContext<S>) -> BoxFuture<'a, anyhow::Result<i32>>
            + Send
            + Sync
            + 'static,
    {
        self.command = Some(Arc::new(body));
        self
    }

    /// Attaches a human description, surfaced as suggestion metadata.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Gates the node behind a predicate; a `false` hides it entirely.
    ///
    /// Repeated calls accumulate conjunctively.
    #[must_use]
    pub fn requires<F>(self, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.requires_check(move |source| (!predicate(source)).then(RequirementFailure::hidden))
    }

    /// Gates the node behind a check distinguishing hidden, silently
    /// skipped and reported denials.
    ///
    /// Repeated calls accumulate conjunctively; the first failure wins.
    #[must_use]
    pub fn requires_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&S) -> Option<RequirementFailure> + Send + Sync + 'static,
    {
        self.requirement = Some(match self.requirement.take() {
            Some(existing) => {
                Arc::new(move |source| existing(source).or_else(|| check(source)))
            }
            None => Arc::new(check),
        });
        self
    }

    /// Overrides where completions for this argument come from.
    ///
    /// # Panics
    /// - If the node is not an argument node.
    #[track_caller]
    #[must_use]
    pub fn suggests<F>(mut self, provider: F) -> Self
    where
        F: for<'a> Fn(
                &'a CommandContext<S>,
                SuggestionsBuilder,
            ) -> BoxFuture<'a, Result<Suggestions, CommandSyntaxError>>
            + Send
            + Sync
            + 'static,
    {
        let NodeKind::Argument { suggestions, .. } = &mut self.kind else {
            panic!("suggestion providers only apply to argument nodes");
        };
        *suggestions = Some(Arc::new(provider));
        self
    }

    /// Hands further parsing over to `target` once this node matches.
    ///
    /// # Panics
    /// - If the node already has children.
    #[track_caller]
    #[must_use]
    pub fn redirect(mut self, target: NodeId) -> Self {
        assert!(
            self.children.is_empty(),
            "cannot redirect a command that has children"
        );
        self.redirect = Some(target);
        self
    }

    /// Redirects like [`CommandBuilder::redirect`], deriving the source(s)
    /// the continuation acts for. Returning several sources forks execution.
    #[track_caller]
    #[must_use]
    pub fn redirect_with<F>(self, target: NodeId, modifier: F) -> Self
    where
        F: Fn(&CommandContext<S>) -> anyhow::Result<Vec<Arc<S>>> + Send + Sync + 'static,
    {
        let mut this = self.redirect(target);
        this.modifier = Some(Arc::new(modifier));
        this
    }

    /// Finishes the builder into a registrable node.
    #[must_use]
    pub fn build(self) -> BuiltNode<S> {
        BuiltNode {
            kind: self.kind,
            children: self.children,
            command: self.command,
            requirement: self.requirement,
            redirect: self.redirect,
            modifier: self.modifier,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "redirecting command")]
    fn children_after_redirect_are_refused() {
        let _ = literal::<()>("loop")
            .redirect(NodeId::ROOT)
            .then(literal("child"));
    }

    #[test]
    #[should_panic(expected = "argument nodes")]
    fn suggests_is_refused_on_literals() {
        let _ = literal::<()>("word")
            .suggests(|_, builder| future::ready(Ok(builder.build())).boxed());
    }

    #[test]
    fn requirements_accumulate_conjunctively() {
        let built = literal::<u8>("gated")
            .requires(|source| *source > 1)
            .requires(|source| *source < 5)
            .build();
        let requirement = built.requirement.expect("requirement must be set");
        assert!(requirement(&3).is_none());
        assert!(requirement(&0).is_some());
        assert!(requirement(&7).is_some());
    }

    #[test]
    fn requires_check_reports_reasons() {
        let built = literal::<u8>("gated")
            .requires_check(|source| {
                (*source == 0).then(|| RequirementFailure::denied("operators only"))
            })
            .build();
        let requirement = built.requirement.expect("requirement must be set");
        let failure = requirement(&0).expect("must fail");
        assert!(failure.show_in_tree);
        assert_eq!(failure.reason.as_deref(), Some("operators only"));
    }
}
