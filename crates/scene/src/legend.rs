use foundation::color::Rgb;

use crate::selection::HighlightGroup;

pub const MAX_TOPIC_BADGES: usize = 6;

pub const DEFAULT_TOPIC_COLORS: [Rgb; 6] = [
    Rgb(0xc6759c),
    Rgb(0x7ad895),
    Rgb(0xcba174),
    Rgb(0xad71b9),
    Rgb(0xcf3759),
    Rgb(0x93003a),
];

#[derive(Debug, Clone, PartialEq)]
pub struct TopicBadge {
    pub topic: String,
    pub color: Rgb,
    pub dois: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegendChange {
    Added { evicted: Option<String> },
    AlreadyActive,
}

/// Active topic badges, newest first.
#[derive(Debug, Clone)]
pub struct TopicLegend {
    badges: Vec<TopicBadge>,
    colors: Vec<Rgb>,
    cursor: usize,
    capacity: usize,
}

impl Default for TopicLegend {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_COLORS.to_vec())
    }
}

impl TopicLegend {
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self {
            badges: Vec::new(),
            colors,
            cursor: 0,
            capacity: MAX_TOPIC_BADGES,
        }
    }

    pub fn badges(&self) -> &[TopicBadge] {
        &self.badges
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.badges.iter().any(|b| b.topic == topic)
    }

    /// Next color in the cycle. The cursor advances before the lookup, so
    /// the first badge gets the second color.
    fn next_color(&mut self) -> Rgb {
        if self.colors.is_empty() {
            return Rgb::WHITE;
        }
        self.cursor = (self.cursor + 1) % self.colors.len();
        self.colors[self.cursor]
    }

    /// Pushes a badge to the front, evicting the oldest beyond capacity.
    pub fn add(&mut self, topic: impl Into<String>, dois: Vec<String>) -> LegendChange {
        let topic = topic.into();
        if self.contains(&topic) {
            return LegendChange::AlreadyActive;
        }
        let color = self.next_color();
        self.badges.insert(0, TopicBadge { topic, color, dois });

        let evicted = if self.badges.len() > self.capacity {
            self.badges.pop().map(|b| b.topic)
        } else {
            None
        };
        LegendChange::Added { evicted }
    }

    pub fn remove(&mut self, topic: &str) -> bool {
        let before = self.badges.len();
        self.badges.retain(|b| b.topic != topic);
        self.badges.len() != before
    }

    /// Drops every badge and rewinds the color cycle.
    pub fn clear(&mut self) {
        self.badges.clear();
        self.cursor = 0;
    }

    /// Highlight groups painted oldest first, so the newest badge wins overlaps.
    pub fn groups(&self) -> Vec<HighlightGroup> {
        self.badges
            .iter()
            .rev()
            .map(|b| HighlightGroup::new(b.dois.iter().cloned(), b.color))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_TOPIC_COLORS, LegendChange, TopicLegend};

    fn dois(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn newest_first_and_capped_at_six() {
        let mut legend = TopicLegend::default();
        for i in 0..6 {
            legend.add(format!("t{i}"), Vec::new());
        }
        assert_eq!(legend.badges()[0].topic, "t5");
        assert_eq!(
            legend.add("t6", Vec::new()),
            LegendChange::Added {
                evicted: Some("t0".to_string())
            }
        );
        assert_eq!(legend.badges().len(), 6);
        assert!(!legend.contains("t0"));
    }

    #[test]
    fn colors_cycle_after_advancing() {
        let mut legend = TopicLegend::default();
        legend.add("a", Vec::new());
        legend.add("b", Vec::new());
        assert_eq!(legend.badges()[1].color, DEFAULT_TOPIC_COLORS[1]);
        assert_eq!(legend.badges()[0].color, DEFAULT_TOPIC_COLORS[2]);

        legend.clear();
        legend.add("c", Vec::new());
        assert_eq!(legend.badges()[0].color, DEFAULT_TOPIC_COLORS[1]);
    }

    #[test]
    fn duplicate_topic_is_ignored() {
        let mut legend = TopicLegend::default();
        legend.add("a", dois(&["x"]));
        assert_eq!(legend.add("a", dois(&["y"])), LegendChange::AlreadyActive);
        assert_eq!(legend.badges().len(), 1);
        assert_eq!(legend.badges()[0].dois, dois(&["x"]));
    }

    #[test]
    fn groups_run_oldest_to_newest() {
        let mut legend = TopicLegend::default();
        legend.add("old", dois(&["x"]));
        legend.add("new", dois(&["y"]));
        let groups = legend.groups();
        assert!(groups[0].dois.contains("x"));
        assert!(groups[1].dois.contains("y"));
        assert!(legend.remove("old"));
        assert!(!legend.remove("old"));
        assert_eq!(legend.groups().len(), 1);
    }
}
