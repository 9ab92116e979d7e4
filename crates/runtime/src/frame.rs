use foundation::time::Time;

/// Frame metadata for one animation-frame callback.
///
/// `time` is the timestamp handed to the callback (milliseconds), so a
/// recorded sequence of frames replays to the same camera and selection state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Timestamp of the callback.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, time: Time) -> Self {
        Self { index, time }
    }

    pub fn first() -> Self {
        Self::new(0, Time(0.0))
    }

    /// Next frame; timestamps never run backwards.
    pub fn next(self, time: Time) -> Self {
        let time = if time.0 < self.time.0 { self.time } else { time };
        Self::new(self.index + 1, time)
    }

    /// Milliseconds since the previous frame.
    pub fn delta_ms(self, previous: Frame) -> f64 {
        self.time.since(previous.time)
    }
}
