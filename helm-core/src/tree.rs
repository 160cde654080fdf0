//! The grammar tree: an arena of literal and argument nodes reached from an
//! implicit root.
//!
//! Children own their nodes through the arena; `redirect` stores a plain
//! handle, so cycles through redirects (including back to the root) are fine.
//! Nodes are immutable once registration ends; arena slots are never
//! reclaimed, which keeps every handed-out [`NodeId`] stable.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use helm_utils::StringReader;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::arguments::ErasedArgumentType;
use crate::builder::BuiltNode;
use crate::context::CommandContext;
use crate::error::{CommandSyntaxError, RequirementFailure};
use crate::suggestion::{SuggestionProvider, Suggestions, SuggestionsBuilder};

/// A stable handle to a node inside a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const ROOT: Self = Self(0);

    /// The arena index behind the handle.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An executor attached to a node, run when the command resolves to it.
pub type Command<S> = Arc<
    dyn for<'a> Fn(&'a CommandContext<S>) -> BoxFuture<'a, anyhow::Result<i32>> + Send + Sync,
>;

/// A visibility predicate over the caller's source value. `None` permits.
pub type RequirementFn<S> = Arc<dyn Fn(&S) -> Option<RequirementFailure> + Send + Sync>;

/// Derives the source value(s) a redirect continues with. Returning more
/// than one source forks execution.
pub type RedirectModifier<S> =
    Arc<dyn Fn(&CommandContext<S>) -> anyhow::Result<Vec<Arc<S>>> + Send + Sync>;

/// The per-variant data of a node.
pub enum NodeKind<S> {
    /// The implicit parent of all registered commands. Never matched itself.
    Root,
    /// A fixed keyword; index 0 is the canonical name, the rest are aliases.
    /// Matching is case-insensitive and requires end-of-input or the
    /// argument separator afterwards.
    Literal {
        /// Canonical name plus aliases.
        names: SmallVec<[String; 2]>,
    },
    /// A named slot parsed by an argument type.
    Argument {
        /// The slot name, also the key executors fetch the value by.
        name: String,
        /// The type-erased parser/loader for the slot.
        argument: Arc<dyn ErasedArgumentType<S>>,
        /// A per-node completion override, if any.
        suggestions: Option<SuggestionProvider<S>>,
    },
}

impl<S> NodeKind<S> {
    /// The name children of one parent are keyed by.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Root => "",
            Self::Literal { names } => &names[0],
            Self::Argument { name, .. } => name,
        }
    }
}

/// One vertex of the grammar tree.
pub struct CommandNode<S> {
    kind: NodeKind<S>,
    children: Vec<NodeId>,
    children_by_name: FxHashMap<String, NodeId>,
    literal_lookup: FxHashMap<String, NodeId>,
    command: Option<Command<S>>,
    requirement: Option<RequirementFn<S>>,
    redirect: Option<NodeId>,
    modifier: Option<RedirectModifier<S>>,
    description: Option<String>,
}

impl<S> CommandNode<S> {
    /// The per-variant data.
    #[must_use]
    pub const fn kind(&self) -> &NodeKind<S> {
        &self.kind
    }

    /// The node's name (empty for the root).
    #[must_use]
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Whether this is the implicit root.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    /// Whether this is a literal keyword node.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal { .. })
    }

    /// Whether this is a typed argument node.
    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(self.kind, NodeKind::Argument { .. })
    }

    /// Child handles, literals first, each group sorted by its key.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Looks up a direct child by its canonical name.
    #[must_use]
    pub fn child_by_name(&self, name: &str) -> Option<NodeId> {
        self.children_by_name.get(name).copied()
    }

    /// The attached executor, if any.
    #[must_use]
    pub const fn command(&self) -> Option<&Command<S>> {
        self.command.as_ref()
    }

    /// The redirect target, if any.
    #[must_use]
    pub const fn redirect(&self) -> Option<NodeId> {
        self.redirect
    }

    /// The redirect modifier, if any.
    #[must_use]
    pub const fn modifier(&self) -> Option<&RedirectModifier<S>> {
        self.modifier.as_ref()
    }

    /// The human description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The key children of one kind are ordered by.
    #[must_use]
    pub fn sorted_key(&self) -> &str {
        self.kind.name()
    }

    /// How this node renders inside usage strings.
    #[must_use]
    pub fn usage_text(&self) -> String {
        match &self.kind {
            NodeKind::Root => String::new(),
            NodeKind::Literal { names } => names[0].clone(),
            NodeKind::Argument { name, .. } => format!("<{name}>"),
        }
    }
}

/// Keeps the failure with a reason over reasonless ones.
fn record_failure(most_specific: &mut Option<RequirementFailure>, failure: RequirementFailure) {
    if most_specific
        .as_ref()
        .is_none_or(|current| current.reason.is_none() && failure.reason.is_some())
    {
        *most_specific = Some(failure);
    }
}

/// The arena owning every node of one dispatcher.
pub struct CommandTree<S> {
    nodes: Vec<CommandNode<S>>,
}

impl<S> Default for CommandTree<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> CommandTree<S> {
    /// Creates a tree holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![CommandNode {
                kind: NodeKind::Root,
                children: Vec::new(),
                children_by_name: FxHashMap::default(),
                literal_lookup: FxHashMap::default(),
                command: None,
                requirement: None,
                redirect: None,
                modifier: None,
                description: None,
            }],
        }
    }

    /// The handle of the implicit root.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Resolves a handle.
    ///
    /// # Panics
    /// - If the handle belongs to a different tree.
    #[track_caller]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &CommandNode<S> {
        &self.nodes[id.index()]
    }

    /// Adds a built node under `parent`.
    ///
    /// If a child with the same name exists the nodes merge: an incoming
    /// executor overrides, grandchildren fold in recursively. Children are
    /// re-sorted afterwards (literals before arguments, then by key; keys
    /// compare bytewise, which matches locale order for the ASCII grammars
    /// this crate targets).
    ///
    /// # Panics
    /// - If `node` is a root node, or `parent` is a redirecting node.
    #[track_caller]
    pub fn add_child(&mut self, parent: NodeId, node: BuiltNode<S>) -> NodeId {
        let BuiltNode {
            kind,
            children,
            command,
            requirement,
            redirect,
            modifier,
            description,
        } = node;
        assert!(
            !matches!(kind, NodeKind::Root),
            "the root node cannot be added as a child"
        );
        assert!(
            self.node(parent).redirect.is_none(),
            "a redirecting node cannot receive children"
        );

        let name = kind.name().to_owned();
        if let Some(existing) = self.node(parent).children_by_name.get(&name).copied() {
            if let Some(command) = command {
                if self.nodes[existing.index()].command.is_some() {
                    log::warn!("command node '{name}' is already executable, replacing executor");
                }
                self.nodes[existing.index()].command = Some(command);
            }
            for grandchild in children {
                self.add_child(existing, grandchild);
            }
            return existing;
        }

        let lookup_names: SmallVec<[String; 2]> = match &kind {
            NodeKind::Literal { names } => {
                names.iter().map(|n| n.to_ascii_lowercase()).collect()
            }
            _ => SmallVec::new(),
        };
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(CommandNode {
            kind,
            children: Vec::new(),
            children_by_name: FxHashMap::default(),
            literal_lookup: FxHashMap::default(),
            command,
            requirement,
            redirect,
            modifier,
            description,
        });

        let parent_node = &mut self.nodes[parent.index()];
        parent_node.children.push(id);
        parent_node.children_by_name.insert(name, id);
        for lookup in lookup_names {
            parent_node.literal_lookup.insert(lookup, id);
        }
        for grandchild in children {
            self.add_child(id, grandchild);
        }
        self.resort_children(parent);
        id
    }

    /// Detaches `child` (and its whole subtree) from `parent`.
    ///
    /// Returns whether the child was present. The arena slot survives, so
    /// stale handles (e.g. redirect targets) keep resolving.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let name = self.node(child).name().to_owned();
        let parent_node = &mut self.nodes[parent.index()];
        if parent_node.children_by_name.get(&name) != Some(&child) {
            return false;
        }
        parent_node.children_by_name.remove(&name);
        parent_node.children.retain(|&c| c != child);
        parent_node.literal_lookup.retain(|_, c| *c != child);
        true
    }

    fn resort_children(&mut self, parent: NodeId) {
        let mut children = std::mem::take(&mut self.nodes[parent.index()].children);
        children.sort_by(|&a, &b| {
            let a = &self.nodes[a.index()];
            let b = &self.nodes[b.index()];
            b.is_literal()
                .cmp(&a.is_literal())
                .then_with(|| a.sorted_key().cmp(b.sorted_key()))
        });
        self.nodes[parent.index()].children = children;
    }

    /// The children worth attempting against the reader's next token.
    ///
    /// When a literal child (or one of its aliases) matches the upcoming
    /// whitespace-delimited token, only that child is relevant; otherwise
    /// the argument children compete.
    #[must_use]
    pub fn relevant_children(
        &self,
        parent: NodeId,
        reader: &StringReader<'_>,
    ) -> SmallVec<[NodeId; 8]> {
        let node = self.node(parent);
        if !node.literal_lookup.is_empty() {
            let rest = reader.remaining();
            let token = &rest[..rest.find(' ').unwrap_or(rest.len())];
            if !token.is_empty()
                && let Some(child) = node.literal_lookup.get(&token.to_ascii_lowercase())
            {
                return SmallVec::from_slice(&[*child]);
            }
        }
        node.children
            .iter()
            .copied()
            .filter(|&child| self.node(child).is_argument())
            .collect()
    }

    /// Evaluates whether `source` may see and use `node`.
    ///
    /// A node without its own executor is implicitly permitted when its
    /// redirect target or any descendant is; otherwise the most specific
    /// failure (one carrying a reason, if any was seen) is returned.
    #[must_use]
    pub fn check_requirement(&self, node: NodeId, source: &S) -> Option<RequirementFailure> {
        let mut visited = Vec::new();
        self.check_requirement_inner(node, source, &mut visited)
    }

    fn check_requirement_inner(
        &self,
        id: NodeId,
        source: &S,
        visited: &mut Vec<NodeId>,
    ) -> Option<RequirementFailure> {
        let node = self.node(id);
        if node.is_root() {
            return None;
        }
        if let Some(requirement) = &node.requirement
            && let Some(failure) = requirement(source)
        {
            return Some(failure);
        }
        if node.command.is_some() {
            return None;
        }

        visited.push(id);
        let mut most_specific = None;
        if let Some(target) = node.redirect {
            if visited.contains(&target) {
                record_failure(&mut most_specific, RequirementFailure::hidden());
            } else {
                match self.check_requirement_inner(target, source, visited) {
                    None => {
                        visited.pop();
                        return None;
                    }
                    Some(failure) => record_failure(&mut most_specific, failure),
                }
            }
        }
        for &child in &node.children {
            if visited.contains(&child) {
                continue;
            }
            match self.check_requirement_inner(child, source, visited) {
                None => {
                    visited.pop();
                    return None;
                }
                Some(failure) => record_failure(&mut most_specific, failure),
            }
        }
        visited.pop();
        most_specific
    }

    /// Whether `input` on its own would match this node.
    ///
    /// The root rejects everything. Literals accept any of their names
    /// followed by end-of-input or the separator; arguments accept whatever
    /// their type parses up to a token boundary.
    #[must_use]
    pub fn is_valid_input(&self, node: NodeId, input: &str) -> bool {
        match &self.node(node).kind {
            NodeKind::Root => false,
            NodeKind::Literal { names } => {
                let token = &input[..input.find(' ').unwrap_or(input.len())];
                !token.is_empty() && names.iter().any(|name| name.eq_ignore_ascii_case(token))
            }
            NodeKind::Argument { argument, .. } => {
                let mut reader = StringReader::new(input);
                argument.parse_erased(&mut reader).is_ok()
                    && (!reader.can_read() || reader.peek() == Some(' '))
            }
        }
    }

    /// The example inputs a node advertises, used by default suggestions
    /// and by ambiguity detection.
    #[must_use]
    pub fn examples(&self, node: NodeId) -> Vec<String> {
        match &self.node(node).kind {
            NodeKind::Root => Vec::new(),
            NodeKind::Literal { names } => vec![names[0].clone()],
            NodeKind::Argument { argument, .. } => argument.examples_erased(),
        }
    }

    /// Reports every pair of sibling children whose inputs overlap, then
    /// recurses into each child.
    ///
    /// For each ordered pair `(child, sibling)`, the examples of `child`
    /// that `sibling` would also accept are handed to `consumer` as
    /// `(parent, child, sibling, overlapping examples)`.
    pub fn find_ambiguities(
        &self,
        from: NodeId,
        consumer: &mut dyn FnMut(NodeId, NodeId, NodeId, &[String]),
    ) {
        let children = self.node(from).children.clone();
        for &child in &children {
            for &sibling in &children {
                if child == sibling {
                    continue;
                }
                let matches: Vec<String> = self
                    .examples(child)
                    .into_iter()
                    .filter(|example| self.is_valid_input(sibling, example))
                    .collect();
                if !matches.is_empty() {
                    consumer(from, child, sibling, &matches);
                }
            }
            self.find_ambiguities(child, consumer);
        }
    }

    /// Collects the completions one child node offers.
    ///
    /// Literals offer their matching names (aliases listed in the tooltip);
    /// arguments defer to their per-node override or their type.
    pub(crate) fn list_suggestions<'a>(
        &'a self,
        node: NodeId,
        context: &'a CommandContext<S>,
        mut builder: SuggestionsBuilder,
    ) -> BoxFuture<'a, Result<Suggestions, CommandSyntaxError>> {
        match &self.node(node).kind {
            NodeKind::Root => future::ready(Ok(builder.build())).boxed(),
            NodeKind::Literal { names } => {
                let tooltip = (names.len() > 1).then(|| names[1..].join(", "));
                for name in names {
                    if name
                        .to_ascii_lowercase()
                        .starts_with(builder.remaining_lowercase())
                    {
                        match &tooltip {
                            Some(tooltip) => {
                                builder.suggest_with_tooltip(name.clone(), tooltip.clone())
                            }
                            None => builder.suggest(name.clone()),
                        };
                    }
                }
                future::ready(Ok(builder.build())).boxed()
            }
            NodeKind::Argument {
                argument,
                suggestions,
                ..
            } => match suggestions {
                Some(provider) => provider(context, builder),
                None => argument.list_suggestions_erased(context, builder),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::integer::IntegerArgument;
    use crate::builder::{argument, literal, literal_with_aliases};

    fn names<S>(tree: &CommandTree<S>, parent: NodeId) -> Vec<String> {
        tree.node(parent)
            .children()
            .iter()
            .map(|&c| tree.node(c).name().to_owned())
            .collect()
    }

    #[test]
    fn children_sort_literals_first_then_by_key() {
        let mut tree: CommandTree<()> = CommandTree::new();
        let root = tree.root();
        tree.add_child(root, argument("zeta", IntegerArgument::new()).build());
        tree.add_child(root, literal("m").build());
        tree.add_child(root, argument("alpha", IntegerArgument::new()).build());
        tree.add_child(root, literal("b").build());
        assert_eq!(names(&tree, root), ["b", "m", "alpha", "zeta"]);
    }

    #[test]
    fn same_name_children_merge_and_override_executor() {
        let mut tree: CommandTree<()> = CommandTree::new();
        let root = tree.root();
        let first = tree.add_child(
            root,
            literal("base").then(literal("one")).executes(|_| Ok(1)).build(),
        );
        let second = tree.add_child(
            root,
            literal("base").then(literal("two")).executes(|_| Ok(2)).build(),
        );
        assert_eq!(first, second);
        assert_eq!(names(&tree, first), ["one", "two"]);
        assert!(tree.node(first).command().is_some());
    }

    #[test]
    fn relevant_children_prefer_a_matching_literal() {
        let mut tree: CommandTree<()> = CommandTree::new();
        let root = tree.root();
        let lit = tree.add_child(root, literal_with_aliases(&["teleport", "tp"]).build());
        let arg = tree.add_child(root, argument("count", IntegerArgument::new()).build());

        let reader = StringReader::new("TP 3");
        assert_eq!(tree.relevant_children(root, &reader).as_slice(), [lit]);

        let reader = StringReader::new("7 up");
        assert_eq!(tree.relevant_children(root, &reader).as_slice(), [arg]);
    }

    #[test]
    fn literal_input_requires_a_token_boundary() {
        let mut tree: CommandTree<()> = CommandTree::new();
        let root = tree.root();
        let lit = tree.add_child(root, literal_with_aliases(&["teleport", "tp"]).build());
        for name in ["teleport", "tp", "TELEPORT"] {
            assert!(tree.is_valid_input(lit, name));
            assert!(tree.is_valid_input(lit, &format!("{name} extra")));
        }
        assert!(!tree.is_valid_input(lit, "teleportation"));
        assert!(!tree.is_valid_input(root, "teleport"));
    }

    #[test]
    fn requirement_failure_bubbles_until_a_permitted_leaf() {
        let mut tree: CommandTree<u8> = CommandTree::new();
        let root = tree.root();
        let gated = tree.add_child(
            root,
            literal("admin")
                .then(literal("ban").requires(|level| *level >= 4).executes(|_| Ok(0)))
                .build(),
        );
        assert!(tree.check_requirement(gated, &5).is_none());
        let failure = tree.check_requirement(gated, &1).expect("must be denied");
        assert!(!failure.show_in_tree);
    }

    #[test]
    fn redirect_permission_follows_the_target() {
        let mut tree: CommandTree<u8> = CommandTree::new();
        let root = tree.root();
        let target = tree.add_child(root, literal("home").executes(|_| Ok(0)).build());
        let alias = tree.add_child(root, literal("h").redirect(target).build());
        assert!(tree.check_requirement(alias, &0).is_none());
    }

    #[test]
    fn self_redirect_cycle_terminates() {
        let mut tree: CommandTree<()> = CommandTree::new();
        let root = tree.root();
        let loops = tree.add_child(root, literal("again").redirect(NodeId::ROOT).build());
        // The root is trivially permitted, so the redirect resolves.
        assert!(tree.check_requirement(loops, &()).is_none());
    }

    #[test]
    fn removal_detaches_the_subtree() {
        let mut tree: CommandTree<()> = CommandTree::new();
        let root = tree.root();
        let a = tree.add_child(root, literal("a").then(literal("inner")).build());
        tree.add_child(root, literal("b").build());
        assert!(tree.remove_child(root, a));
        assert_eq!(names(&tree, root), ["b"]);
        assert!(!tree.remove_child(root, a));
    }

    #[test]
    fn ambiguity_reporter_flags_overlapping_siblings() {
        let mut tree: CommandTree<()> = CommandTree::new();
        let root = tree.root();
        let base = tree.add_child(
            root,
            literal("base")
                .then(literal("1"))
                .then(argument("n", IntegerArgument::new()))
                .build(),
        );
        let mut reports = Vec::new();
        tree.find_ambiguities(root, &mut |parent, child, sibling, examples| {
            reports.push((parent, child, sibling, examples.to_vec()));
        });
        // The literal "1" is also a valid integer, in both orientations.
        assert!(reports.iter().any(|(parent, _, _, examples)| {
            *parent == base && examples.contains(&"1".to_owned())
        }));
    }
}
