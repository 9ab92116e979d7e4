//! Selection state machine.
//!
//! Every transition repaints the whole mesh from scratch, so the rendered
//! state is always a pure function of the current selection and never of
//! the path that led to it.

use std::collections::HashSet;

use foundation::color::Rgb;
use tracing::debug;

use crate::mesh::{MaterialTier, PointMesh};
use crate::palette::{CategoryPalette, SelectionColors};
use crate::paper::Paper;

/// Deterministic set of paper indices backed by a bitset.
///
/// Iteration yields indices in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    words: Vec<u64>,
    len: usize,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        let (word, bit) = word_bit(index);
        self.words
            .get(word)
            .is_some_and(|w| (w & (1u64 << bit)) != 0)
    }

    /// Returns `true` if the set changed.
    pub fn insert(&mut self, index: usize) -> bool {
        let (word, bit) = word_bit(index);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let w = &mut self.words[word];
        if (*w & mask) != 0 {
            return false;
        }
        *w |= mask;
        self.len += 1;
        true
    }

    /// Returns `true` if the set changed.
    pub fn remove(&mut self, index: usize) -> bool {
        let (word, bit) = word_bit(index);
        let Some(w) = self.words.get_mut(word) else {
            return false;
        };
        let mask = 1u64 << bit;
        if (*w & mask) == 0 {
            return false;
        }
        *w &= !mask;
        self.len -= 1;
        true
    }

    pub fn union_in_place(&mut self, other: &Self) {
        let max_words = other.words.len().max(self.words.len());
        self.words.resize(max_words, 0);
        for (idx, ow) in other.words.iter().copied().enumerate() {
            self.words[idx] |= ow;
        }
        self.len = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            let mut bits = w;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros();
                bits &= bits - 1;
                Some(wi * 64 + tz as usize)
            })
        })
    }
}

impl FromIterator<usize> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut s = Self::new();
        for i in iter {
            s.insert(i);
        }
        s
    }
}

fn word_bit(index: usize) -> (usize, u32) {
    (index / 64, (index % 64) as u32)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SelectionMode {
    #[default]
    None,
    /// One picked paper plus its neighbors.
    Single { paper: usize, neighbors: Vec<usize> },
    /// An arbitrary set, e.g. a topic or category match.
    Multi,
}

/// Set of papers painted with one highlight color.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightGroup {
    pub dois: HashSet<String>,
    pub color: Rgb,
}

impl HighlightGroup {
    pub fn new(dois: impl IntoIterator<Item = impl Into<String>>, color: Rgb) -> Self {
        Self {
            dois: dois.into_iter().map(Into::into).collect(),
            color,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    mode: SelectionMode,
    highlighted: SelectionSet,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &SelectionMode {
        &self.mode
    }

    pub fn highlighted(&self) -> &SelectionSet {
        &self.highlighted
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.mode, SelectionMode::None)
    }

    /// Enters `Single`: `paper` in the primary tier, `neighbors` in the
    /// secondary tier, everything else neutral.
    pub fn select_paper(
        &mut self,
        mesh: &mut PointMesh,
        paper: usize,
        neighbors: &[usize],
        colors: &SelectionColors,
    ) {
        let neighbor_set: SelectionSet = neighbors.iter().copied().collect();
        self.highlighted.clear();

        for i in 0..mesh.paper_count() {
            let (color, tier) = if i == paper {
                (colors.primary, MaterialTier::Primary)
            } else if neighbor_set.contains(i) {
                (colors.secondary, MaterialTier::Secondary)
            } else {
                (colors.neutral, MaterialTier::Default)
            };
            if tier.is_highlighted() {
                self.highlighted.insert(i);
            }
            mesh.set_paper_style(i, color, tier);
        }

        debug!(paper, neighbors = neighbors.len(), "selection: single");
        self.mode = SelectionMode::Single {
            paper,
            neighbors: neighbors.to_vec(),
        };
    }

    /// Enters `Multi` with a single highlight color.
    pub fn select_papers(
        &mut self,
        mesh: &mut PointMesh,
        papers: &[Paper],
        dois: &HashSet<String>,
        color: Rgb,
        colors: &SelectionColors,
    ) {
        let group = HighlightGroup {
            dois: dois.clone(),
            color,
        };
        self.select_groups(mesh, papers, std::slice::from_ref(&group), colors);
    }

    /// Enters `Multi` with the union of several groups.
    ///
    /// Groups are painted in order, so a later group's color wins where
    /// groups overlap. Papers outside every group are neutral.
    pub fn select_groups(
        &mut self,
        mesh: &mut PointMesh,
        papers: &[Paper],
        groups: &[HighlightGroup],
        colors: &SelectionColors,
    ) {
        self.highlighted.clear();

        for (i, paper) in papers.iter().enumerate().take(mesh.paper_count()) {
            let color = groups
                .iter()
                .rev()
                .find(|g| g.dois.contains(&paper.doi))
                .map(|g| g.color);
            match color {
                Some(color) => {
                    self.highlighted.insert(i);
                    mesh.set_paper_style(i, color, MaterialTier::Primary);
                }
                None => mesh.set_paper_style(i, colors.neutral, MaterialTier::Default),
            }
        }

        debug!(
            groups = groups.len(),
            highlighted = self.highlighted.len(),
            "selection: multi"
        );
        self.mode = SelectionMode::Multi;
    }

    /// Back to `None`: every paper in its dominant-category color.
    pub fn deselect_all(
        &mut self,
        mesh: &mut PointMesh,
        papers: &[Paper],
        palette: &CategoryPalette,
    ) {
        for (i, paper) in papers.iter().enumerate().take(mesh.paper_count()) {
            mesh.set_paper_style(i, palette.color_for_paper(paper), MaterialTier::Default);
        }
        self.highlighted.clear();
        if self.is_active() {
            debug!("selection: none");
        }
        self.mode = SelectionMode::None;
    }
}
