/// Advisory single-flight guard for user-triggered actions.
///
/// While a [`GateTicket`] is outstanding every further `try_begin` is
/// refused: the caller drops the action instead of queueing it.
#[derive(Debug, Default)]
pub struct EventGate {
    state: GateState,
    next_id: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    Busy { ticket: u64 },
}

/// Proof that the holder owns the gate. Not `Clone`: exactly one release.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an unreleased ticket keeps the gate busy"]
pub struct GateTicket {
    id: u64,
}

impl GateTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl EventGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, GateState::Busy { .. })
    }

    pub fn try_begin(&mut self) -> Option<GateTicket> {
        if self.is_busy() {
            return None;
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.state = GateState::Busy { ticket: id };
        Some(GateTicket { id })
    }

    /// Releases the gate. Returns `false` for a stale ticket.
    pub fn finish(&mut self, ticket: GateTicket) -> bool {
        match self.state {
            GateState::Busy { ticket: held } if held == ticket.id => {
                self.state = GateState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Forces the gate back to idle, invalidating any outstanding ticket.
    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::{EventGate, GateState};

    #[test]
    fn second_begin_is_refused_while_busy() {
        let mut gate = EventGate::new();
        let t = gate.try_begin().expect("idle gate");
        assert!(gate.is_busy());
        assert!(gate.try_begin().is_none());
        assert!(gate.finish(t));
        assert_eq!(gate.state(), GateState::Idle);
        assert!(gate.try_begin().is_some());
    }

    #[test]
    fn stale_ticket_does_not_release() {
        let mut gate = EventGate::new();
        let stale = gate.try_begin().expect("first");
        gate.reset();
        let _current = gate.try_begin().expect("second");
        assert!(!gate.finish(stale));
        assert!(gate.is_busy());
    }
}
