/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64); // milliseconds, as delivered by requestAnimationFrame

impl Time {
    pub fn from_millis(ms: f64) -> Self {
        Time(ms)
    }

    /// Milliseconds elapsed since `earlier`, clamped at zero.
    pub fn since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}
