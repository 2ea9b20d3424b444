//! Ordered dependency path sets.

use std::collections::{BTreeSet, HashSet};

/// Prefix marking a path entry as literal source text rather than a resource
/// path. The sequence can never occur in a real path.
pub const INLINE_MARKER: &str = ">>>";

/// One element of a [`PathSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathEntry {
    /// A resource path handed to the resource provider.
    Resource(String),
    /// Literal script or stylesheet text spliced verbatim into the aggregate.
    Inline(String),
}

impl PathEntry {
    /// Interpret a raw template value, honouring the inline marker.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match raw.strip_prefix(INLINE_MARKER) {
            Some(text) => PathEntry::Inline(text.to_string()),
            None => PathEntry::Resource(raw),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, PathEntry::Inline(_))
    }

    /// First line of the entry, for log output.
    pub fn summary(&self) -> &str {
        let text = match self {
            PathEntry::Resource(path) => path.as_str(),
            PathEntry::Inline(text) => text.as_str(),
        };
        text.lines().next().unwrap_or_default()
    }
}

/// Ordered, duplicate-free collection of dependencies requested together.
///
/// Order decides concatenation order. Cache keying only looks at membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSet {
    entries: Vec<PathEntry>,
    seen: HashSet<PathEntry>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Returns `false` when it was already present.
    pub fn push(&mut self, entry: PathEntry) -> bool {
        if !self.seen.insert(entry.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn push_resource(&mut self, path: impl Into<String>) -> bool {
        self.push(PathEntry::Resource(path.into()))
    }

    pub fn push_inline(&mut self, text: impl Into<String>) -> bool {
        self.push(PathEntry::Inline(text.into()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry carries inline text.
    pub fn has_inline(&self) -> bool {
        self.entries.iter().any(PathEntry::is_inline)
    }

    /// Resource paths as an unordered membership set.
    pub fn resource_paths(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                PathEntry::Resource(path) => Some(path.clone()),
                PathEntry::Inline(_) => None,
            })
            .collect()
    }
}

impl FromIterator<PathEntry> for PathSet {
    fn from_iter<I: IntoIterator<Item = PathEntry>>(iter: I) -> Self {
        let mut set = PathSet::new();
        for entry in iter {
            set.push(entry);
        }
        set
    }
}

impl<'a> FromIterator<&'a str> for PathSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(PathEntry::parse).collect()
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a PathEntry;
    type IntoIter = std::slice::Iter<'a, PathEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
