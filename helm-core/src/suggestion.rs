//! Completion suggestions and the builders that collect them.

use std::sync::Arc;

use futures::future::BoxFuture;
use helm_utils::StringRange;

use crate::context::CommandContext;
use crate::error::CommandSyntaxError;
use crate::tree::NodeId;

/// A custom per-node completion source, overriding the argument type's own.
pub type SuggestionProvider<S> = Arc<
    dyn for<'a> Fn(
            &'a CommandContext<S>,
            SuggestionsBuilder,
        ) -> BoxFuture<'a, Result<Suggestions, CommandSyntaxError>>
        + Send
        + Sync,
>;

/// Which kind of node a suggestion originates from, so consumer UIs can
/// style entries differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    /// A fixed keyword.
    Literal,
    /// A typed argument slot.
    Argument,
}

/// A candidate completion with the input range it would replace.
#[derive(Debug, Clone)]
pub struct Suggestion {
    range: StringRange,
    text: String,
    tooltip: Option<String>,
    kind: Option<SuggestionKind>,
    usage: Option<String>,
    description: Option<String>,
    node: Option<NodeId>,
}

impl Suggestion {
    /// Creates a plain suggestion replacing `range` with `text`.
    #[must_use]
    pub fn new(range: StringRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
            tooltip: None,
            kind: None,
            usage: None,
            description: None,
            node: None,
        }
    }

    /// The replacement text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The range of the original input this replaces.
    #[must_use]
    pub const fn range(&self) -> StringRange {
        self.range
    }

    /// The hover tooltip, if any.
    #[must_use]
    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// The originating node kind, if known.
    #[must_use]
    pub const fn kind(&self) -> Option<SuggestionKind> {
        self.kind
    }

    /// The usage prefix a UI may render before the entry.
    #[must_use]
    pub fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    /// The description suffix a UI may render after the entry.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The node that produced this suggestion, if known.
    #[must_use]
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Applies the suggestion to `input`, returning the completed line.
    #[must_use]
    pub fn apply(&self, input: &str) -> String {
        if self.range.start() == 0 && self.range.end() == input.len() {
            return self.text.clone();
        }
        let mut result = String::with_capacity(input.len() + self.text.len());
        result.push_str(&input[..self.range.start()]);
        result.push_str(&self.text);
        result.push_str(&input[self.range.end()..]);
        result
    }

    /// Widens the suggestion to `range`, splicing in the slices of `input`
    /// the original range did not cover.
    #[must_use]
    fn expand(&self, input: &str, range: StringRange) -> Self {
        if range == self.range {
            return self.clone();
        }
        let mut text = String::new();
        if range.start() < self.range.start() {
            text.push_str(&input[range.start()..self.range.start()]);
        }
        text.push_str(&self.text);
        if range.end() > self.range.end() {
            text.push_str(&input[self.range.end()..range.end()]);
        }
        Self {
            range,
            text,
            ..self.clone()
        }
    }
}

impl PartialEq for Suggestion {
    fn eq(&self, other: &Self) -> bool {
        self.range == other.range && self.text == other.text && self.tooltip == other.tooltip
    }
}

impl Eq for Suggestion {}

/// A sorted, de-duplicated set of suggestions sharing one covering range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suggestions {
    range: StringRange,
    suggestions: Vec<Suggestion>,
}

impl Suggestions {
    /// A set with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The range of the input every entry replaces.
    #[must_use]
    pub const fn range(&self) -> StringRange {
        self.range
    }

    /// The entries, sorted case-insensitively by text.
    #[must_use]
    pub fn list(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Whether the set has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    /// Builds a set from raw entries: computes the covering range, expands
    /// every entry to it, de-duplicates and sorts.
    #[must_use]
    pub fn create(input: &str, suggestions: Vec<Suggestion>) -> Self {
        if suggestions.is_empty() {
            return Self::empty();
        }
        let mut start = usize::MAX;
        let mut end = 0;
        for suggestion in &suggestions {
            start = start.min(suggestion.range.start());
            end = end.max(suggestion.range.end());
        }
        let range = StringRange::between(start, end);
        let mut expanded: Vec<Suggestion> = Vec::with_capacity(suggestions.len());
        for suggestion in &suggestions {
            let suggestion = suggestion.expand(input, range);
            if !expanded.contains(&suggestion) {
                expanded.push(suggestion);
            }
        }
        expanded.sort_by(|a, b| {
            a.text
                .to_ascii_lowercase()
                .cmp(&b.text.to_ascii_lowercase())
        });
        Self {
            range,
            suggestions: expanded,
        }
    }

    /// Merges per-node suggestion sets into one.
    #[must_use]
    pub fn merge(input: &str, sets: Vec<Self>) -> Self {
        let mut sets: Vec<Self> = sets.into_iter().filter(|s| !s.is_empty()).collect();
        match sets.len() {
            0 => Self::empty(),
            1 => sets.remove(0),
            _ => Self::create(
                input,
                sets.into_iter().flat_map(|s| s.suggestions).collect(),
            ),
        }
    }
}

/// Collects suggestions for one node, anchored at a start position inside
/// the (possibly truncated) input.
#[derive(Debug, Clone)]
pub struct SuggestionsBuilder {
    input: String,
    start: usize,
    remaining: String,
    remaining_lowercase: String,
    result: Vec<Suggestion>,
    kind: Option<SuggestionKind>,
    usage: Option<String>,
    description: Option<String>,
    node: Option<NodeId>,
}

impl SuggestionsBuilder {
    /// Creates a builder over `input` whose completions replace
    /// `input[start..]`.
    #[must_use]
    pub fn new(input: &str, start: usize) -> Self {
        let remaining = input[start..].to_owned();
        Self {
            input: input.to_owned(),
            start,
            remaining_lowercase: remaining.to_ascii_lowercase(),
            remaining,
            result: Vec::new(),
            kind: None,
            usage: None,
            description: None,
            node: None,
        }
    }

    /// Stamps node metadata onto every suggestion this builder collects.
    #[must_use]
    pub fn annotated(
        mut self,
        kind: SuggestionKind,
        usage: impl Into<String>,
        description: Option<String>,
        node: NodeId,
    ) -> Self {
        self.kind = Some(kind);
        self.usage = Some(usage.into());
        self.description = description;
        self.node = Some(node);
        self
    }

    /// The input the builder was seeded with.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The anchor position completions replace from.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// The text the user has already typed past the anchor.
    #[must_use]
    pub fn remaining(&self) -> &str {
        &self.remaining
    }

    /// Lowercased [`SuggestionsBuilder::remaining`], cached for prefix tests.
    #[must_use]
    pub fn remaining_lowercase(&self) -> &str {
        &self.remaining_lowercase
    }

    /// Adds a completion. A completion equal to what the user already typed
    /// is dropped, never offered back.
    pub fn suggest(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(text.into(), None)
    }

    /// Adds a completion with a hover tooltip.
    pub fn suggest_with_tooltip(
        &mut self,
        text: impl Into<String>,
        tooltip: impl Into<String>,
    ) -> &mut Self {
        self.push(text.into(), Some(tooltip.into()))
    }

    fn push(&mut self, text: String, tooltip: Option<String>) -> &mut Self {
        if text == self.remaining {
            return self;
        }
        self.result.push(Suggestion {
            range: StringRange::between(self.start, self.input.len()),
            text,
            tooltip,
            kind: self.kind,
            usage: self.usage.clone(),
            description: self.description.clone(),
            node: self.node,
        });
        self
    }

    /// A sibling builder anchored at a different position, sharing input and
    /// metadata but no collected entries.
    #[must_use]
    pub fn create_offset(&self, start: usize) -> Self {
        let remaining = self.input[start..].to_owned();
        Self {
            input: self.input.clone(),
            start,
            remaining_lowercase: remaining.to_ascii_lowercase(),
            remaining,
            result: Vec::new(),
            kind: self.kind,
            usage: self.usage.clone(),
            description: self.description.clone(),
            node: self.node,
        }
    }

    /// Finishes the builder into a merged suggestion set.
    #[must_use]
    pub fn build(self) -> Suggestions {
        Suggestions::create(&self.input, self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_anchors_suggestions_at_start() {
        let mut builder = SuggestionsBuilder::new("tp ho", 3);
        builder.suggest("home").suggest("house");
        let suggestions = builder.build();
        assert_eq!(suggestions.range(), StringRange::between(3, 5));
        let texts: Vec<_> = suggestions.list().iter().map(Suggestion::text).collect();
        assert_eq!(texts, ["home", "house"]);
    }

    #[test]
    fn verbatim_remainder_is_never_offered() {
        let mut builder = SuggestionsBuilder::new("a 1 i", 4);
        builder.suggest("i").suggest("ii");
        let suggestions = builder.build();
        let texts: Vec<_> = suggestions.list().iter().map(Suggestion::text).collect();
        assert_eq!(texts, ["ii"]);
    }

    #[test]
    fn create_expands_to_the_covering_range() {
        let input = "say hello";
        let suggestions = Suggestions::create(
            input,
            vec![
                Suggestion::new(StringRange::between(4, 9), "help"),
                Suggestion::new(StringRange::between(0, 3), "shout"),
            ],
        );
        assert_eq!(suggestions.range(), StringRange::between(0, 9));
        let texts: Vec<_> = suggestions.list().iter().map(Suggestion::text).collect();
        assert_eq!(texts, ["say help", "shout hello"]);
    }

    #[test]
    fn merge_deduplicates_identical_entries() {
        let input = "x fo";
        let set = |text: &str| {
            Suggestions::create(input, vec![Suggestion::new(StringRange::between(2, 4), text)])
        };
        let merged = Suggestions::merge(input, vec![set("foo"), set("foo"), set("for")]);
        let texts: Vec<_> = merged.list().iter().map(Suggestion::text).collect();
        assert_eq!(texts, ["foo", "for"]);
    }

    #[test]
    fn apply_replaces_only_the_range() {
        let suggestion = Suggestion::new(StringRange::between(2, 4), "bar");
        assert_eq!(suggestion.apply("a fo c"), "a barc");
    }

    #[test]
    fn sorting_ignores_case() {
        let mut builder = SuggestionsBuilder::new("", 0);
        builder.suggest("Banana").suggest("apple").suggest("Cherry");
        let suggestions = builder.build();
        let texts: Vec<_> = suggestions.list().iter().map(Suggestion::text).collect();
        assert_eq!(texts, ["apple", "Banana", "Cherry"]);
    }
}
