//! Click vs. drag classification for mouse and touch input.

use foundation::math::Vec2;

pub const DEFAULT_CLICK_THRESHOLD_PX: f64 = 6.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerGesture {
    /// Released within the threshold of where it went down.
    Click(Vec2),
    /// Moved too far; the press belonged to pan/zoom.
    Drag,
}

/// Pointer-down/up pairing. Mouse and touch feed the same detector.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClickDetector {
    threshold_px: f64,
    down_at: Option<Vec2>,
}

impl Default for ClickDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_THRESHOLD_PX)
    }
}

impl ClickDetector {
    pub fn new(threshold_px: f64) -> Self {
        Self {
            threshold_px,
            down_at: None,
        }
    }

    pub fn threshold_px(&self) -> f64 {
        self.threshold_px
    }

    pub fn is_pressed(&self) -> bool {
        self.down_at.is_some()
    }

    pub fn pointer_down(&mut self, at: Vec2) {
        self.down_at = Some(at);
    }

    /// Classifies the release. An up without a preceding down is a drag.
    ///
    /// Distance is Euclidean; a release exactly at the threshold is a drag.
    pub fn pointer_up(&mut self, at: Vec2) -> PointerGesture {
        match self.down_at.take() {
            Some(down) if down.distance(at) < self.threshold_px => PointerGesture::Click(at),
            _ => PointerGesture::Drag,
        }
    }

    pub fn cancel(&mut self) {
        self.down_at = None;
    }
}

/// Pixel position inside a `width x height` canvas to normalized device
/// coordinates: x right in `[-1, 1]`, y up in `[-1, 1]`.
pub fn screen_to_ndc(px: Vec2, width: f64, height: f64) -> Option<Vec2> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }
    Some(Vec2::new(
        2.0 * px.x / width - 1.0,
        -2.0 * px.y / height + 1.0,
    ))
}
