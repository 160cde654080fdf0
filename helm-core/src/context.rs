//! The mutable state the parser accumulates while descending the tree, and
//! the frozen form executors receive.

use std::any::Any;
use std::sync::Arc;

use helm_utils::StringRange;
use rustc_hash::FxHashMap;

use crate::tree::{Command, NodeId, RedirectModifier};

/// A value parsed out of the input: the range it covered plus the loaded,
/// type-erased value.
#[derive(Clone)]
pub struct ParsedArgument {
    range: StringRange,
    value: Arc<dyn Any + Send + Sync>,
}

impl ParsedArgument {
    /// Creates an entry covering `range`.
    #[must_use]
    pub fn new(range: StringRange, value: Arc<dyn Any + Send + Sync>) -> Self {
        Self { range, value }
    }

    /// The input range the argument was parsed from.
    #[must_use]
    pub const fn range(&self) -> StringRange {
        self.range
    }

    /// The erased loaded value.
    #[must_use]
    pub fn value(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    /// The loaded value downcast to its concrete type.
    #[must_use]
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

/// Where the cursor sits relative to the parsed nodes, for the suggestion
/// engine: the node whose children should offer completions, and the
/// position those completions replace from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionContext {
    /// The node whose children are queried for completions.
    pub parent: NodeId,
    /// The position the completions replace from.
    pub start_pos: usize,
}

/// The state accumulated for one (sub)parse: argument bindings, the nodes
/// traversed with their ranges, the selected executor, the current redirect
/// modifier and the child context a redirect opened.
///
/// Copies are shallow; every attempted alternative works on its own copy so
/// backtracking never has to undo anything.
pub struct CommandContextBuilder<S> {
    source: Arc<S>,
    root: NodeId,
    arguments: FxHashMap<String, ParsedArgument>,
    nodes: Vec<(NodeId, StringRange)>,
    command: Option<Command<S>>,
    child: Option<Box<CommandContextBuilder<S>>>,
    modifier: Option<RedirectModifier<S>>,
    range: StringRange,
}

impl<S> Clone for CommandContextBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            root: self.root,
            arguments: self.arguments.clone(),
            nodes: self.nodes.clone(),
            command: self.command.clone(),
            child: self.child.clone(),
            modifier: self.modifier.clone(),
            range: self.range,
        }
    }
}

impl<S> CommandContextBuilder<S> {
    /// Creates a builder rooted at `root`, covering nothing yet.
    #[must_use]
    pub fn new(root: NodeId, source: Arc<S>, start: usize) -> Self {
        Self {
            source,
            root,
            arguments: FxHashMap::default(),
            nodes: Vec::new(),
            command: None,
            child: None,
            modifier: None,
            range: StringRange::at(start),
        }
    }

    /// The caller-provided source value.
    #[must_use]
    pub const fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The node this (sub)context descends from.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// The input range covered so far.
    #[must_use]
    pub const fn range(&self) -> StringRange {
        self.range
    }

    /// The `(node, range)` pairs traversed so far, in order.
    #[must_use]
    pub fn nodes(&self) -> &[(NodeId, StringRange)] {
        &self.nodes
    }

    /// Binds a parsed argument by name.
    pub fn with_argument(&mut self, name: impl Into<String>, argument: ParsedArgument) {
        self.arguments.insert(name.into(), argument);
    }

    /// Selects the current executor. Deeper nodes overwrite, even with
    /// nothing, so only the deepest matched node's executor survives.
    pub fn with_command(&mut self, command: Option<Command<S>>) {
        self.command = command;
    }

    /// Records a traversed node, its covered range and its redirect
    /// modifier (which becomes the current one).
    pub fn with_node(
        &mut self,
        node: NodeId,
        range: StringRange,
        modifier: Option<RedirectModifier<S>>,
    ) {
        self.nodes.push((node, range));
        self.range = StringRange::encompassing(self.range, range);
        self.modifier = modifier;
    }

    /// Attaches the sub-context a redirect produced.
    pub fn with_child(&mut self, child: Self) {
        self.child = Some(Box::new(child));
    }

    /// Locates the node under `cursor` for completion purposes.
    ///
    /// Recurses into the redirect child once the cursor is past this
    /// context's range; inside the range, the node preceding the one the
    /// cursor sits in becomes the parent.
    ///
    /// # Panics
    /// - If `cursor` lies before the context's start.
    #[track_caller]
    #[must_use]
    pub fn find_suggestion_context(&self, cursor: usize) -> SuggestionContext {
        assert!(
            self.range.start() <= cursor,
            "can't find a node before the cursor"
        );
        if self.range.end() < cursor {
            if let Some(child) = &self.child {
                return child.find_suggestion_context(cursor);
            }
            if let Some((node, range)) = self.nodes.last() {
                return SuggestionContext {
                    parent: *node,
                    start_pos: range.end() + 1,
                };
            }
            return SuggestionContext {
                parent: self.root,
                start_pos: self.range.start(),
            };
        }
        let mut previous = self.root;
        for (node, range) in &self.nodes {
            if range.start() <= cursor && cursor <= range.end() {
                return SuggestionContext {
                    parent: previous,
                    start_pos: range.start(),
                };
            }
            previous = *node;
        }
        SuggestionContext {
            parent: previous,
            start_pos: self.range.start(),
        }
    }

    /// Freezes the builder (and its children, recursively) against the
    /// input it parsed.
    #[must_use]
    pub fn build(&self, input: &str) -> CommandContext<S> {
        CommandContext {
            source: Arc::clone(&self.source),
            input: input.to_owned(),
            arguments: self.arguments.clone(),
            command: self.command.clone(),
            root: self.root,
            nodes: self.nodes.clone(),
            range: self.range,
            child: self.child.as_ref().map(|child| Arc::new(child.build(input))),
            modifier: self.modifier.clone(),
        }
    }
}

/// The immutable context a successful parse produces, consumed by
/// executors, redirect modifiers and suggestion providers.
pub struct CommandContext<S> {
    source: Arc<S>,
    input: String,
    arguments: FxHashMap<String, ParsedArgument>,
    command: Option<Command<S>>,
    root: NodeId,
    nodes: Vec<(NodeId, StringRange)>,
    range: StringRange,
    child: Option<Arc<CommandContext<S>>>,
    modifier: Option<RedirectModifier<S>>,
}

impl<S> Clone for CommandContext<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            input: self.input.clone(),
            arguments: self.arguments.clone(),
            command: self.command.clone(),
            root: self.root,
            nodes: self.nodes.clone(),
            range: self.range,
            child: self.child.clone(),
            modifier: self.modifier.clone(),
        }
    }
}

impl<S> CommandContext<S> {
    /// The caller-provided source value.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The source value's shared handle.
    #[must_use]
    pub const fn source_arc(&self) -> &Arc<S> {
        &self.source
    }

    /// The input this context was built against.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The input range this context covers.
    #[must_use]
    pub const fn range(&self) -> StringRange {
        self.range
    }

    /// The node this (sub)context descends from.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// The `(node, range)` pairs traversed, in order.
    #[must_use]
    pub fn nodes(&self) -> &[(NodeId, StringRange)] {
        &self.nodes
    }

    /// Whether any node was traversed.
    #[must_use]
    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// The selected executor, if any.
    #[must_use]
    pub const fn command(&self) -> Option<&Command<S>> {
        self.command.as_ref()
    }

    /// The sub-context a redirect opened, if any.
    #[must_use]
    pub const fn child(&self) -> Option<&Arc<CommandContext<S>>> {
        self.child.as_ref()
    }

    /// The current redirect modifier, if any.
    #[must_use]
    pub const fn modifier(&self) -> Option<&RedirectModifier<S>> {
        self.modifier.as_ref()
    }

    /// A loaded argument by name, downcast to its concrete type.
    ///
    /// The name-to-type pairing is the grammar author's invariant: fetching
    /// a name under a different type returns `None`.
    #[must_use]
    pub fn argument<T: Send + Sync + 'static>(&self, name: &str) -> Option<&T> {
        self.arguments
            .get(name)
            .and_then(ParsedArgument::downcast_ref::<T>)
    }

    /// The raw parsed entry by name.
    #[must_use]
    pub fn parsed_argument(&self, name: &str) -> Option<&ParsedArgument> {
        self.arguments.get(name)
    }

    /// The same context acting for a different source.
    #[must_use]
    pub fn copy_for(&self, source: Arc<S>) -> Self {
        let mut copy = self.clone();
        copy.source = source;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: NodeId = NodeId::ROOT;

    fn builder(start: usize) -> CommandContextBuilder<()> {
        CommandContextBuilder::new(NodeId::ROOT, Arc::new(()), start)
    }

    #[test]
    fn arguments_downcast_by_name_and_type() {
        let mut ctx = builder(0);
        ctx.with_argument(
            "count",
            ParsedArgument::new(StringRange::between(0, 2), Arc::new(42_i32)),
        );
        let built = ctx.build("42");
        assert_eq!(built.argument::<i32>("count"), Some(&42));
        assert_eq!(built.argument::<String>("count"), None);
        assert_eq!(built.argument::<i32>("missing"), None);
    }

    #[test]
    fn range_grows_with_each_node() {
        let mut ctx = builder(0);
        ctx.with_node(A, StringRange::between(0, 1), None);
        ctx.with_node(A, StringRange::between(2, 3), None);
        assert_eq!(ctx.range(), StringRange::between(0, 3));
    }

    #[test]
    fn cursor_past_the_range_lands_after_the_last_node() {
        let mut ctx = builder(0);
        ctx.with_node(A, StringRange::between(0, 1), None);
        let found = ctx.find_suggestion_context(2);
        assert_eq!(found.parent, A);
        assert_eq!(found.start_pos, 2);
    }

    #[test]
    fn cursor_inside_a_node_falls_back_to_its_predecessor() {
        let mut ctx = builder(0);
        ctx.with_node(A, StringRange::between(0, 1), None);
        ctx.with_node(A, StringRange::between(2, 3), None);
        let found = ctx.find_suggestion_context(3);
        assert_eq!(found.parent, A);
        assert_eq!(found.start_pos, 2);
    }

    #[test]
    #[should_panic(expected = "before the cursor")]
    fn cursor_before_the_context_panics() {
        builder(5).find_suggestion_context(2);
    }

    #[test]
    fn copy_for_swaps_only_the_source() {
        let ctx = CommandContextBuilder::new(NodeId::ROOT, Arc::new(1_u8), 0).build("x");
        let copy = ctx.copy_for(Arc::new(9_u8));
        assert_eq!(*copy.source(), 9);
        assert_eq!(copy.input(), "x");
    }
}
