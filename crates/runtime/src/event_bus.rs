use crate::frame::Frame;

/// A typed event stamped with the frame it was raised in.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub frame_index: u64,
    pub payload: E,
}

/// Append-only queue of frame-stamped events.
///
/// Producers `emit`; consumers either inspect `events()` or take ownership
/// with `drain()` once per frame. Owners that nobody drains trim the queue
/// with `retain_since`.
#[derive(Debug)]
pub struct EventBus<E> {
    events: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, frame: Frame, payload: E) {
        self.events.push(Event {
            frame_index: frame.index,
            payload,
        });
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn last(&self) -> Option<&E> {
        self.events.last().map(|e| &e.payload)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }

    /// Drops events raised before frame `index`. Returns how many went.
    pub fn retain_since(&mut self, index: u64) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.frame_index >= index);
        before - self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use crate::frame::Frame;
    use foundation::time::Time;

    #[test]
    fn records_events_with_frame_index() {
        let mut bus = EventBus::new();
        let f = Frame::new(2, Time(33.0));
        bus.emit(f, "hello");
        assert_eq!(bus.events().len(), 1);
        assert_eq!(bus.events()[0].frame_index, 2);
        assert_eq!(bus.last(), Some(&"hello"));
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(Frame::first(), 7u32);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn retain_since_drops_older_frames_only() {
        let mut bus = EventBus::new();
        let mut frame = Frame::first();
        for i in 0..5u32 {
            bus.emit(frame, i);
            bus.emit(frame, i + 10);
            frame = frame.next(Time(i as f64 * 16.0));
        }
        assert_eq!(bus.retain_since(3), 6);
        let kept: Vec<_> = bus.events().iter().map(|e| e.payload).collect();
        assert_eq!(kept, vec![3, 13, 4, 14]);
        assert_eq!(bus.retain_since(3), 0);
    }
}
