use crate::{Event, EventEnvelope};

/// A projection builds a read model from an append-only event stream.
///
/// Read models are disposable: they can be dropped and rebuilt by replaying
/// the journal from the start.
///
/// ## Idempotency
///
/// Envelopes may be delivered more than once (replay on startup, at-least-once
/// bus delivery). Applying an envelope twice must leave the read model as if
/// it had been applied once; tracking the last applied `position` is the usual
/// way to get there.
pub trait Projection {
    type Ev: Event;

    /// Apply a single envelope, updating the read model.
    ///
    /// Envelopes the projection does not care about are ignored.
    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>);

    /// Global position of the last envelope applied, `0` if none.
    fn last_position(&self) -> u64;
}
