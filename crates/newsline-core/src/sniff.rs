//! Content sniffing: classify documents by literal byte clues in a bounded prefix
//!
//! A [`ClueTable`] is a list of OR-groups, each an AND-group of literal byte
//! sequences. The sniffer reports the first group whose clues all occur in the
//! first `max_offset` bytes of the content, so the cost of a classification
//! does not depend on document size.

use std::sync::Arc;

/// Ordered OR-groups of AND-ed literal clues. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClueTable {
    groups: Vec<Vec<Vec<u8>>>,
}

impl ClueTable {
    /// Build a table from nested clue lists.
    ///
    /// `[["clue1", "and_clue2"], ["or_clue3"]]` matches content containing
    /// both `clue1` and `and_clue2`, or alternatively `or_clue3`.
    pub fn new<G, C>(groups: impl IntoIterator<Item = G>) -> Self
    where
        G: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            groups: groups
                .into_iter()
                .map(|g| g.into_iter().map(|c| c.as_ref().to_vec()).collect())
                .collect(),
        }
    }

    /// Table where every clue is its own group
    pub fn any_of<C: AsRef<[u8]>>(clues: impl IntoIterator<Item = C>) -> Self {
        Self::new(clues.into_iter().map(|c| [c]))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn group_matches(group: &[Vec<u8>], haystack: &[u8]) -> bool {
        group.iter().all(|clue| contains(haystack, clue))
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Stateless prefix matcher over a shared clue table.
#[derive(Debug, Clone)]
pub struct ContentSniffer {
    clues: Arc<ClueTable>,
    max_offset: usize,
}

impl ContentSniffer {
    pub fn new(clues: Arc<ClueTable>, max_offset: usize) -> Self {
        Self { clues, max_offset }
    }

    pub fn clues(&self) -> &ClueTable {
        &self.clues
    }

    pub fn max_offset(&self) -> usize {
        self.max_offset
    }

    /// Index of the first group fully matched within the content prefix
    pub fn first_match(&self, content: &[u8]) -> Option<usize> {
        let prefix = &content[..content.len().min(self.max_offset)];
        self.clues
            .groups
            .iter()
            .position(|group| ClueTable::group_matches(group, prefix))
    }

    pub fn matches(&self, content: &[u8]) -> bool {
        self.first_match(content).is_some()
    }
}
