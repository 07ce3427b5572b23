use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// What the filter decided about one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Arrived before the subscription was acknowledged.
    NotReady,
    /// Stamped before the subscription became ready (backlog or replay).
    Stale,
    /// An event with the same id was already accepted.
    Duplicate,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }
}

/// Gates one subscription's event stream.
///
/// Nothing passes until [`mark_ready`](Self::mark_ready) is called on the
/// transport's subscription acknowledgment. After that, events stamped
/// before the ready instant and events whose id was already accepted are
/// dropped. Accepted events keep arrival order.
#[derive(Debug, Default)]
pub struct DeliveryFilter {
    ready_at: Option<DateTime<Utc>>,
    seen: HashSet<String>,
}

impl DeliveryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the acknowledgment instant. Later acks keep the first instant.
    pub fn mark_ready(&mut self, at: DateTime<Utc>) {
        self.ready_at.get_or_insert(at);
    }

    pub fn ready_at(&self) -> Option<DateTime<Utc>> {
        self.ready_at
    }

    pub fn is_ready(&self) -> bool {
        self.ready_at.is_some()
    }

    pub fn inspect(&mut self, event_id: &str, timestamp: DateTime<Utc>) -> Verdict {
        let Some(ready_at) = self.ready_at else {
            return Verdict::NotReady;
        };
        if timestamp < ready_at {
            return Verdict::Stale;
        }
        if !self.seen.insert(event_id.to_string()) {
            return Verdict::Duplicate;
        }
        Verdict::Accepted
    }

    /// Forget readiness and seen ids; used when the subscription ends.
    pub fn reset(&mut self) {
        self.ready_at = None;
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn gated_until_ready() {
        let mut filter = DeliveryFilter::new();
        let now = Utc::now();

        assert_eq!(filter.inspect("evt_1", now), Verdict::NotReady);
        filter.mark_ready(now);
        assert_eq!(filter.inspect("evt_1", now), Verdict::Accepted);
    }

    #[test]
    fn replay_adds_nothing() {
        let mut filter = DeliveryFilter::new();
        let now = Utc::now();
        filter.mark_ready(now);

        assert!(filter.inspect("evt_1", now + Duration::seconds(1)).is_accepted());
        assert_eq!(filter.inspect("evt_1", now + Duration::seconds(1)), Verdict::Duplicate);
    }

    #[test]
    fn backlog_before_ready_is_dropped() {
        let mut filter = DeliveryFilter::new();
        let now = Utc::now();
        filter.mark_ready(now);

        assert_eq!(filter.inspect("evt_old", now - Duration::milliseconds(1)), Verdict::Stale);
    }

    #[test]
    fn second_ack_keeps_first_ready_instant() {
        let mut filter = DeliveryFilter::new();
        let now = Utc::now();
        filter.mark_ready(now);
        filter.mark_ready(now + Duration::seconds(5));

        assert_eq!(filter.ready_at(), Some(now));
        assert!(filter.inspect("evt_1", now + Duration::seconds(2)).is_accepted());
    }

    #[test]
    fn reset_closes_the_gate() {
        let mut filter = DeliveryFilter::new();
        filter.mark_ready(Utc::now());
        filter.reset();

        assert!(!filter.is_ready());
        assert_eq!(filter.inspect("evt_1", Utc::now()), Verdict::NotReady);
    }
}
