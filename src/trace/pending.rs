//! The pending-step holder
//!
//! The effect of a line is only observable after it has run, so the monitor
//! never appends a step at the moment a line is classified. It holds the
//! step here instead, and commits it on the next monitored event of any
//! kind, stamped with a fresh snapshot of the bindings visible then.
//!
//! Two states, two transitions: `hold` enters `Holding`, `take`/`discard`
//! return to `Idle`.

use super::event::EventDescriptor;

/// A step built from static classification but not yet committed
#[derive(Debug, Clone, PartialEq)]
pub struct HeldStep {
    pub line: u32,
    pub event: EventDescriptor,
    pub call_stack: Vec<String>,
}

/// The two-phase commit state machine
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PendingStep {
    #[default]
    Idle,
    Holding(HeldStep),
}

impl PendingStep {
    /// Begin holding a step. Any previously held step is replaced; the
    /// monitor commits before classifying, so this only happens when a
    /// header deliberately discards its line's step.
    pub fn hold(&mut self, step: HeldStep) {
        *self = PendingStep::Holding(step);
    }

    /// Take the held step, returning to `Idle`.
    pub fn take(&mut self) -> Option<HeldStep> {
        match std::mem::take(self) {
            PendingStep::Idle => None,
            PendingStep::Holding(step) => Some(step),
        }
    }

    /// Drop any held step without committing it.
    pub fn discard(&mut self) {
        *self = PendingStep::Idle;
    }

    pub fn is_holding(&self) -> bool {
        matches!(self, PendingStep::Holding(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(line: u32) -> HeldStep {
        HeldStep {
            line,
            event: EventDescriptor::ExecutionFinished,
            call_stack: Vec::new(),
        }
    }

    #[test]
    fn starts_idle() {
        let mut pending = PendingStep::default();
        assert!(!pending.is_holding());
        assert_eq!(pending.take(), None);
    }

    #[test]
    fn hold_then_take_returns_to_idle() {
        let mut pending = PendingStep::default();
        pending.hold(held(3));
        assert!(pending.is_holding());
        let step = pending.take().expect("held step");
        assert_eq!(step.line, 3);
        assert!(!pending.is_holding());
        assert_eq!(pending.take(), None);
    }

    #[test]
    fn discard_drops_the_held_step() {
        let mut pending = PendingStep::default();
        pending.hold(held(5));
        pending.discard();
        assert_eq!(pending.take(), None);
    }

    #[test]
    fn holding_twice_keeps_the_newest() {
        let mut pending = PendingStep::default();
        pending.hold(held(1));
        pending.hold(held(2));
        assert_eq!(pending.take().expect("held step").line, 2);
    }
}
