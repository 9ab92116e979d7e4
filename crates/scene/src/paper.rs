use std::collections::HashMap;

use foundation::bounds::Aabb3;
use foundation::math::Vec3;

/// One `{name, score}` entry of a paper's category ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub name: String,
    pub score: f64,
}

impl CategoryScore {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// A paper placed in embedding space.
#[derive(Debug, Clone, PartialEq)]
pub struct Paper {
    pub doi: String,
    pub point: Vec3,
    pub categories: Vec<CategoryScore>,
    pub title: Option<String>,
    /// Carried through from the document; not interpreted by the explorer.
    pub published_at: Option<String>,
}

impl Paper {
    pub fn new(doi: impl Into<String>, point: Vec3) -> Self {
        Self {
            doi: doi.into(),
            point,
            categories: Vec::new(),
            title: None,
            published_at: None,
        }
    }

    pub fn with_category(mut self, name: impl Into<String>, score: f64) -> Self {
        self.categories.push(CategoryScore::new(name, score));
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The category with the highest score.
    ///
    /// The first maximal entry wins ties. Returns `None` when the paper has
    /// no categories or no strictly positive score.
    pub fn dominant_category(&self) -> Option<&str> {
        let mut best: Option<&CategoryScore> = None;
        for c in &self.categories {
            if c.score.is_nan() || c.score <= 0.0 {
                continue;
            }
            match best {
                Some(b) if c.score <= b.score => {}
                _ => best = Some(c),
            }
        }
        best.map(|c| c.name.as_str())
    }
}

/// The ordered set of papers of one view session.
///
/// Index positions are stable and join papers to their mesh faces.
/// DOIs are unique within the set.
#[derive(Debug, Clone, Default)]
pub struct PaperSet {
    papers: Vec<Paper>,
    by_doi: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateDoi(pub String);

impl std::fmt::Display for DuplicateDoi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplicate doi: {}", self.0)
    }
}

impl std::error::Error for DuplicateDoi {}

impl PaperSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `paper`, returning its index.
    pub fn push(&mut self, paper: Paper) -> Result<usize, DuplicateDoi> {
        if self.by_doi.contains_key(&paper.doi) {
            return Err(DuplicateDoi(paper.doi));
        }
        let idx = self.papers.len();
        self.by_doi.insert(paper.doi.clone(), idx);
        self.papers.push(paper);
        Ok(idx)
    }

    pub fn from_papers(papers: impl IntoIterator<Item = Paper>) -> Result<Self, DuplicateDoi> {
        let mut set = Self::new();
        for p in papers {
            set.push(p)?;
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Paper> {
        self.papers.get(index)
    }

    pub fn as_slice(&self) -> &[Paper] {
        &self.papers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Paper> + '_ {
        self.papers.iter()
    }

    pub fn index_of(&self, doi: &str) -> Option<usize> {
        self.by_doi.get(doi).copied()
    }

    /// Indices of papers whose dominant category is `name`, ascending.
    pub fn indices_in_category(&self, name: &str) -> Vec<usize> {
        self.papers
            .iter()
            .enumerate()
            .filter(|(_, p)| p.dominant_category() == Some(name))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(self.papers.iter().map(|p| p.point))
    }

    /// Mean of all points, `None` for an empty set.
    pub fn centroid(&self) -> Option<Vec3> {
        if self.papers.is_empty() {
            return None;
        }
        let sum = self
            .papers
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + p.point);
        Some(sum * (1.0 / self.papers.len() as f64))
    }
}
