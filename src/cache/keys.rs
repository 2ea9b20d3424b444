//! Cache key definitions.
//!
//! Keys are immutable composites of the request inputs, so the theme never has
//! to be spliced into a shared structure around a lookup.

use std::collections::BTreeSet;

use crate::domain::{ContentKind, PathSet, ThemeId};

/// Key of one entry in a per-file cache.
///
/// Stylesheets are themed, so their entries carry the active theme; script
/// entries are shared across themes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub theme: Option<ThemeId>,
    pub path: String,
}

impl FileKey {
    pub fn new(kind: ContentKind, theme: &ThemeId, path: &str) -> Self {
        let theme = match kind {
            ContentKind::Script => None,
            ContentKind::Stylesheet => Some(theme.clone()),
        };
        Self {
            theme,
            path: path.to_string(),
        }
    }

    pub(crate) fn approximate_bytes(&self) -> usize {
        self.path.len() + self.theme.as_ref().map_or(0, |theme| theme.as_str().len())
    }
}

/// Key of the file-set cache: which resources were requested, under which
/// theme, for which kind of output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileSetKey {
    pub kind: ContentKind,
    pub theme: ThemeId,
    pub paths: BTreeSet<String>,
}

impl FileSetKey {
    pub fn new(kind: ContentKind, theme: &ThemeId, paths: &PathSet) -> Self {
        Self {
            kind,
            theme: theme.clone(),
            paths: paths.resource_paths(),
        }
    }

    pub(crate) fn approximate_bytes(&self) -> usize {
        self.paths.iter().map(String::len).sum::<usize>() + self.theme.as_str().len()
    }
}
