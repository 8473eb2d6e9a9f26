use chrono::{DateTime, Utc};

/// A domain event: an immutable fact about a medication, prescription or
/// requisition.
///
/// Events are versioned for schema evolution and only ever appended.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "inventory.medication.stock_received").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
