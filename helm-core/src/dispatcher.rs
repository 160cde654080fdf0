//! The dispatcher façade: owns the tree and drives parsing, execution and
//! completion.

use std::sync::Arc;

use futures::future::BoxFuture;
use helm_utils::{StringRange, StringReader};
use rustc_hash::FxHashMap;

use crate::builder::{BuiltNode, CommandBuilder};
use crate::context::{CommandContext, CommandContextBuilder, ParsedArgument};
use crate::error::{CommandSyntaxError, DispatchError, SyntaxErrorKind};
use crate::suggestion::{SuggestionKind, Suggestions, SuggestionsBuilder};
use crate::tree::{CommandTree, NodeId, NodeKind};

/// The character separating arguments.
pub const ARGUMENT_SEPARATOR: char = ' ';

/// The outcome of one parse attempt: the deepest successful context, the
/// reader at the rejection point, and what each rejected child raised.
///
/// An empty error map with a fully consumed reader signals full success.
pub struct ParseResults<'a, S> {
    /// The deepest successfully accumulated context.
    pub context: CommandContextBuilder<S>,
    /// The reader positioned where parsing stopped.
    pub reader: StringReader<'a>,
    /// The error each rejected child alternative raised.
    pub exceptions: FxHashMap<NodeId, CommandSyntaxError>,
}

/// The outcome of one executed branch.
#[derive(Debug)]
pub enum BranchOutcome {
    /// The branch's executor ran to completion.
    Success {
        /// The executor's result value.
        value: i32,
    },
    /// The branch failed; only seen under forked execution, otherwise the
    /// error is returned directly.
    Failed {
        /// What the executor or modifier raised.
        error: anyhow::Error,
    },
}

/// Observes every executed branch, successful or not.
pub trait ResultConsumer<S>: Send + Sync {
    /// Called once per branch with its context and outcome.
    fn on_command_complete(&self, context: &CommandContext<S>, success: bool, result: i32);
}

/// The default consumer: observes nothing.
struct DefaultResultConsumer;

impl<S> ResultConsumer<S> for DefaultResultConsumer {
    fn on_command_complete(&self, _context: &CommandContext<S>, _success: bool, _result: i32) {}
}

/// A struct that parses input against a registered command tree and
/// dispatches it to the matched executor.
pub struct CommandDispatcher<S> {
    tree: CommandTree<S>,
    consumer: Box<dyn ResultConsumer<S>>,
}

impl<S: Send + Sync + 'static> Default for CommandDispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + Sync + 'static> CommandDispatcher<S> {
    /// Creates a dispatcher with an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: CommandTree::new(),
            consumer: Box::new(DefaultResultConsumer),
        }
    }

    /// Replaces the branch-completion observer.
    pub fn set_consumer(&mut self, consumer: Box<dyn ResultConsumer<S>>) {
        self.consumer = consumer;
    }

    /// The underlying tree.
    #[must_use]
    pub const fn tree(&self) -> &CommandTree<S> {
        &self.tree
    }

    /// The root node handle, usable as a redirect target.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Builds and registers a command under the root, returning its handle.
    pub fn register(&mut self, builder: CommandBuilder<S>) -> NodeId {
        self.register_built(builder.build())
    }

    /// Registers an already built node under the root.
    ///
    /// A same-named existing command merges with it: the incoming executor
    /// overrides, grandchildren fold in recursively.
    pub fn register_built(&mut self, node: BuiltNode<S>) -> NodeId {
        let root = self.tree.root();
        self.tree.add_child(root, node)
    }

    /// Removes a registered command (and its whole subtree) from the root.
    ///
    /// Returns whether the node was registered.
    pub fn unregister(&mut self, node: NodeId) -> bool {
        let root = self.tree.root();
        self.tree.remove_child(root, node)
    }

    /// Resolves a space-separated path of child names to a node.
    #[must_use]
    pub fn find_node(&self, path: &str) -> Option<NodeId> {
        let mut node = self.tree.root();
        for name in path.split(ARGUMENT_SEPARATOR).filter(|s| !s.is_empty()) {
            node = self.tree.node(node).child_by_name(name)?;
        }
        Some(node)
    }

    /// Reports overlapping sibling inputs across the whole tree.
    pub fn find_ambiguities(&self, mut consumer: impl FnMut(NodeId, NodeId, NodeId, &[String])) {
        self.tree.find_ambiguities(self.tree.root(), &mut consumer);
    }

    /// Parses `input` for `source` without executing anything.
    pub async fn parse<'a>(&self, input: &'a str, source: S) -> ParseResults<'a, S> {
        self.parse_with_source(input, Arc::new(source)).await
    }

    /// Parses `input` for an already shared source value.
    pub async fn parse_with_source<'a>(
        &self,
        input: &'a str,
        source: Arc<S>,
    ) -> ParseResults<'a, S> {
        let reader = StringReader::new(input);
        let context = CommandContextBuilder::new(self.tree.root(), source, reader.cursor());
        self.parse_nodes(self.tree.root(), reader, context).await
    }

    /// The non-deterministic descent: tries every relevant child of `node`,
    /// collects rejections, recurses behind each success and keeps the best
    /// completed alternative.
    fn parse_nodes<'a: 'f, 'f>(
        &'f self,
        node: NodeId,
        original_reader: StringReader<'a>,
        context_so_far: CommandContextBuilder<S>,
    ) -> BoxFuture<'f, ParseResults<'a, S>> {
        Box::pin(async move {
            let source = Arc::clone(context_so_far.source());
            let cursor = original_reader.cursor();
            let mut errors = FxHashMap::default();
            let mut potentials: Vec<ParseResults<'a, S>> = Vec::new();

            for child in self.tree.relevant_children(node, &original_reader) {
                if let Some(failure) = self.tree.check_requirement(child, &source) {
                    if let Some(reason) = failure.reason {
                        errors.insert(
                            child,
                            CommandSyntaxError::new(SyntaxErrorKind::RequirementFailed(reason))
                                .positioned(original_reader.string(), cursor),
                        );
                    }
                    continue;
                }

                let mut context = context_so_far.clone();
                let mut reader = original_reader.clone();
                if let Err(error) = self.parse_child(child, &mut reader, &mut context).await {
                    errors.insert(child, error.positioned(reader.string(), cursor));
                    continue;
                }
                if reader.can_read() && reader.peek() != Some(ARGUMENT_SEPARATOR) {
                    errors.insert(
                        child,
                        CommandSyntaxError::new(SyntaxErrorKind::ExpectedArgumentSeparator)
                            .with_context(&reader),
                    );
                    continue;
                }

                context.with_command(self.tree.node(child).command().cloned());
                let redirect = self.tree.node(child).redirect();
                if reader.can_read_length(if redirect.is_some() { 1 } else { 2 }) {
                    reader.skip();
                    if let Some(redirect) = redirect {
                        let child_context = CommandContextBuilder::new(
                            redirect,
                            Arc::clone(&source),
                            reader.cursor(),
                        );
                        let parse = self.parse_nodes(redirect, reader, child_context).await;
                        context.with_child(parse.context);
                        return ParseResults {
                            context,
                            reader: parse.reader,
                            exceptions: parse.exceptions,
                        };
                    }
                    let parse = self.parse_nodes(child, reader, context).await;
                    potentials.push(parse);
                } else {
                    potentials.push(ParseResults {
                        context,
                        reader,
                        exceptions: FxHashMap::default(),
                    });
                }
            }

            if !potentials.is_empty() {
                // Prefer fully consumed input, then error-free alternatives;
                // the stable sort keeps registration order beyond that.
                if potentials.len() > 1 {
                    potentials.sort_by(|a, b| {
                        (a.reader.can_read(), !a.exceptions.is_empty())
                            .cmp(&(b.reader.can_read(), !b.exceptions.is_empty()))
                    });
                }
                let mut potentials = potentials.into_iter();
                if let Some(best) = potentials.next() {
                    return best;
                }
            }

            ParseResults {
                context: context_so_far,
                reader: original_reader,
                exceptions: errors,
            }
        })
    }

    /// Matches one child against the reader, stamping the traversal (and,
    /// for arguments, the loaded value) into the context.
    async fn parse_child(
        &self,
        child: NodeId,
        reader: &mut StringReader<'_>,
        context: &mut CommandContextBuilder<S>,
    ) -> Result<(), CommandSyntaxError> {
        let start = reader.cursor();
        let node = self.tree.node(child);
        match node.kind() {
            NodeKind::Root => Err(CommandSyntaxError::unknown("command").with_context(reader)),
            NodeKind::Literal { names } => {
                let token = reader.read_unquoted_str();
                if token.is_empty() || !names.iter().any(|name| name.eq_ignore_ascii_case(token))
                {
                    reader.set_cursor(start);
                    return Err(CommandSyntaxError::new(SyntaxErrorKind::ExpectedLiteral(
                        names[0].clone(),
                    ))
                    .with_context(reader));
                }
                let range = StringRange::between(start, reader.cursor());
                context.with_node(child, range, node.modifier().cloned());
                Ok(())
            }
            NodeKind::Argument { name, argument, .. } => {
                let parsed = argument.parse_erased(reader)?;
                let value = argument.load_erased(parsed).await?;
                let range = StringRange::between(start, reader.cursor());
                context.with_argument(name.clone(), ParsedArgument::new(range, value));
                context.with_node(child, range, node.modifier().cloned());
                Ok(())
            }
        }
    }

    /// Parses and executes in one call.
    pub async fn execute(
        &self,
        input: &str,
        source: S,
    ) -> Result<Vec<BranchOutcome>, DispatchError> {
        let parse = self.parse(input, source).await;
        self.execute_results(parse).await
    }

    /// Executes a finished parse, walking the redirect chain and running
    /// the selected executor for every derived source.
    ///
    /// Under forked execution (a modifier returned several sources) branch
    /// failures are collected; otherwise the first failure is returned.
    pub async fn execute_results(
        &self,
        parse: ParseResults<'_, S>,
    ) -> Result<Vec<BranchOutcome>, DispatchError> {
        let ParseResults {
            context,
            reader,
            exceptions,
        } = parse;
        log::trace!("dispatching '{}'", reader.string());

        if reader.can_read() {
            let error = if exceptions.len() == 1 {
                exceptions
                    .into_values()
                    .next()
                    .unwrap_or_else(|| CommandSyntaxError::unknown("command"))
            } else if context.range().is_empty() {
                CommandSyntaxError::unknown("command").with_context(&reader)
            } else {
                CommandSyntaxError::unknown("argument").with_context(&reader)
            };
            return Err(error.into());
        }

        let original = Arc::new(context.build(reader.string()));
        let mut contexts = vec![original];
        let mut next: Vec<Arc<CommandContext<S>>> = Vec::new();
        let mut outcomes = Vec::new();
        let mut found = false;
        let mut forked = false;

        while !contexts.is_empty() {
            for context in &contexts {
                if let Some(child) = context.child() {
                    if !child.has_nodes() {
                        continue;
                    }
                    found = true;
                    match context.modifier() {
                        None => {
                            next.push(Arc::new(child.copy_for(Arc::clone(context.source_arc()))));
                        }
                        Some(modifier) => match modifier(context) {
                            Ok(sources) => {
                                if sources.len() > 1 {
                                    forked = true;
                                }
                                for source in sources {
                                    next.push(Arc::new(child.copy_for(source)));
                                }
                            }
                            Err(error) => {
                                self.consumer.on_command_complete(context, false, 0);
                                if !forked {
                                    return Err(DispatchError::Execution(error));
                                }
                                outcomes.push(BranchOutcome::Failed { error });
                            }
                        },
                    }
                } else if let Some(command) = context.command() {
                    found = true;
                    match command(context).await {
                        Ok(value) => {
                            self.consumer.on_command_complete(context, true, value);
                            outcomes.push(BranchOutcome::Success { value });
                        }
                        Err(error) => {
                            self.consumer.on_command_complete(context, false, 0);
                            if !forked {
                                return Err(DispatchError::Execution(error));
                            }
                            outcomes.push(BranchOutcome::Failed { error });
                        }
                    }
                }
            }
            contexts = std::mem::take(&mut next);
        }

        if !found {
            return Err(CommandSyntaxError::unknown("command")
                .with_context(&reader)
                .into());
        }
        Ok(outcomes)
    }

    /// Completions for the cursor sitting at the end of the parsed input.
    pub async fn get_completion_suggestions_at_end(
        &self,
        parse: &ParseResults<'_, S>,
    ) -> Suggestions {
        self.get_completion_suggestions(parse, parse.reader.total_length())
            .await
    }

    /// Completions valid at `cursor` inside the parsed input.
    ///
    /// The children of the node under the cursor each contribute a set;
    /// nodes whose requirement hides them are skipped, a failing provider
    /// is swallowed so it cannot poison the rest.
    pub async fn get_completion_suggestions(
        &self,
        parse: &ParseResults<'_, S>,
        cursor: usize,
    ) -> Suggestions {
        let location = parse.context.find_suggestion_context(cursor);
        let start = location.start_pos.min(cursor);

        let full_input = parse.reader.string();
        let truncated = &full_input[..cursor];
        let context = parse.context.build(truncated);

        let mut all = Vec::new();
        for &child in self.tree.node(location.parent).children() {
            if let Some(failure) = self.tree.check_requirement(child, context.source())
                && !failure.show_in_tree
            {
                continue;
            }
            let node = self.tree.node(child);
            let kind = if node.is_literal() {
                SuggestionKind::Literal
            } else {
                SuggestionKind::Argument
            };
            let builder = SuggestionsBuilder::new(truncated, start).annotated(
                kind,
                node.usage_text(),
                node.description().map(str::to_owned),
                child,
            );
            match self.tree.list_suggestions(child, &context, builder).await {
                Ok(suggestions) => all.push(suggestions),
                Err(error) => {
                    log::debug!("suggestions for '{}' failed: {error}", node.name());
                }
            }
        }
        Suggestions::merge(full_input, all)
    }

    /// Every executable path under `node`, one usage line each.
    ///
    /// With `restricted` set, nodes hidden from `source` are skipped.
    #[must_use]
    pub fn get_all_usage(&self, node: NodeId, source: &S, restricted: bool) -> Vec<String> {
        let mut result = Vec::new();
        self.all_usage_recursive(node, source, &mut result, "", restricted);
        result
    }

    fn hidden_from(&self, node: NodeId, source: &S) -> bool {
        self.tree
            .check_requirement(node, source)
            .is_some_and(|failure| !failure.show_in_tree)
    }

    fn all_usage_recursive(
        &self,
        node: NodeId,
        source: &S,
        result: &mut Vec<String>,
        prefix: &str,
        restricted: bool,
    ) {
        if restricted && self.hidden_from(node, source) {
            return;
        }
        let n = self.tree.node(node);
        if n.command().is_some() {
            result.push(prefix.to_owned());
        }
        if let Some(redirect) = n.redirect() {
            let redirect_text = if redirect == self.tree.root() {
                "...".to_owned()
            } else {
                format!("-> {}", self.tree.node(redirect).usage_text())
            };
            if prefix.is_empty() {
                result.push(format!("{} {redirect_text}", n.usage_text()));
            } else {
                result.push(format!("{prefix} {redirect_text}"));
            }
        } else {
            for &child in n.children() {
                let child_usage = self.tree.node(child).usage_text();
                let next_prefix = if prefix.is_empty() {
                    child_usage
                } else {
                    format!("{prefix} {child_usage}")
                };
                self.all_usage_recursive(child, source, result, &next_prefix, restricted);
            }
        }
    }

    /// One collapsed usage string per visible child of `node`, using the
    /// `[optional]`, `(required)` and `a|b` syntax.
    #[must_use]
    pub fn get_smart_usage(&self, node: NodeId, source: &S) -> Vec<(NodeId, String)> {
        let mut result = Vec::new();
        let optional = self.tree.node(node).command().is_some();
        for &child in self.tree.node(node).children() {
            if let Some(usage) = self.smart_usage_recursive(child, source, optional, false) {
                result.push((child, usage));
            }
        }
        result
    }

    fn smart_usage_recursive(
        &self,
        node: NodeId,
        source: &S,
        optional: bool,
        deep: bool,
    ) -> Option<String> {
        if self.hidden_from(node, source) {
            return None;
        }
        let n = self.tree.node(node);
        let this = if optional {
            format!("[{}]", n.usage_text())
        } else {
            n.usage_text()
        };
        if deep {
            return Some(this);
        }

        if let Some(redirect) = n.redirect() {
            let redirect_text = if redirect == self.tree.root() {
                "...".to_owned()
            } else {
                format!("-> {}", self.tree.node(redirect).usage_text())
            };
            return Some(format!("{this} {redirect_text}"));
        }

        let child_optional = n.command().is_some();
        let children: Vec<NodeId> = n
            .children()
            .iter()
            .copied()
            .filter(|&child| !self.hidden_from(child, source))
            .collect();
        match children.len() {
            0 => Some(this),
            1 => match self.smart_usage_recursive(children[0], source, child_optional, child_optional)
            {
                Some(usage) => Some(format!("{this} {usage}")),
                None => Some(this),
            },
            _ => {
                let mut child_usage: Vec<String> = Vec::new();
                for &child in &children {
                    if let Some(usage) =
                        self.smart_usage_recursive(child, source, child_optional, true)
                        && !child_usage.contains(&usage)
                    {
                        child_usage.push(usage);
                    }
                }
                match child_usage.len() {
                    0 => Some(this),
                    1 => {
                        let usage = child_usage.remove(0);
                        let usage = if child_optional {
                            format!("[{usage}]")
                        } else {
                            usage
                        };
                        Some(format!("{this} {usage}"))
                    }
                    _ => {
                        let (open, close) = if child_optional { ("[", "]") } else { ("(", ")") };
                        let mut alternatives = String::from(open);
                        for (i, &child) in children.iter().enumerate() {
                            if i > 0 {
                                alternatives.push('|');
                            }
                            alternatives.push_str(&self.tree.node(child).usage_text());
                        }
                        alternatives.push_str(close);
                        Some(format!("{this} {alternatives}"))
                    }
                }
            }
        }
    }
}
