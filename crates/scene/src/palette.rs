use std::collections::HashMap;

use foundation::color::Rgb;

use crate::paper::Paper;

/// Category name → face color, with a fallback for uncategorized papers.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPalette {
    colors: HashMap<String, Rgb>,
    default_color: Rgb,
}

impl Default for CategoryPalette {
    fn default() -> Self {
        Self::new(Rgb::WHITE)
    }
}

impl CategoryPalette {
    pub fn new(default_color: Rgb) -> Self {
        Self {
            colors: HashMap::new(),
            default_color,
        }
    }

    pub fn with_color(mut self, category: impl Into<String>, color: Rgb) -> Self {
        self.insert(category, color);
        self
    }

    pub fn insert(&mut self, category: impl Into<String>, color: Rgb) {
        self.colors.insert(category.into(), color);
    }

    pub fn default_color(&self) -> Rgb {
        self.default_color
    }

    /// Color of `category`, or the default color when it is unknown.
    pub fn color_of(&self, category: &str) -> Rgb {
        self.colors
            .get(category)
            .copied()
            .unwrap_or(self.default_color)
    }

    pub fn color_for_paper(&self, paper: &Paper) -> Rgb {
        match paper.dominant_category() {
            Some(name) => self.color_of(name),
            None => self.default_color,
        }
    }
}

/// Colors for the selection tiers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SelectionColors {
    /// The picked paper.
    pub primary: Rgb,
    /// Neighbors of the picked paper.
    pub secondary: Rgb,
    /// Every paper outside the current selection.
    pub neutral: Rgb,
}

impl Default for SelectionColors {
    fn default() -> Self {
        Self {
            primary: Rgb(0xffc266),
            secondary: Rgb(0xcc7a00),
            neutral: Rgb::WHITE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CategoryPalette;
    use crate::paper::Paper;
    use foundation::color::Rgb;
    use foundation::math::Vec3;

    #[test]
    fn unknown_and_missing_categories_use_default() {
        let palette = CategoryPalette::new(Rgb(0x5475a1)).with_color("treatment", Rgb(0x00ff00));

        let known = Paper::new("a", Vec3::ZERO).with_category("treatment", 0.9);
        let unknown = Paper::new("b", Vec3::ZERO).with_category("other", 0.9);
        let none = Paper::new("c", Vec3::ZERO);

        assert_eq!(palette.color_for_paper(&known), Rgb(0x00ff00));
        assert_eq!(palette.color_for_paper(&unknown), Rgb(0x5475a1));
        assert_eq!(palette.color_for_paper(&none), Rgb(0x5475a1));
    }
}
