//! Session statistics collection

/// Outstation session statistics
///
/// Updated by the session as fragments flow in both directions.
///
/// # Why Statistics?
/// - **Link Health**: Confirm timeouts and transmit failures show a master
///   that stopped answering or a link that drops fragments
/// - **Debugging**: Discarded and replayed requests point at addressing or
///   sequencing problems on the master side
///
/// # Usage
/// Read them at any time through `OutstationSession::statistics`. Counters
/// only grow while the session lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatistics {
    /// Request fragments received, confirms included
    pub fragments_received: u64,
    /// Fragments handed to the link layer
    pub fragments_sent: u64,
    /// Confirms that matched an outstanding response
    pub confirms_received: u64,
    /// Confirms that matched nothing
    pub unexpected_confirms: u64,
    /// Requests dropped without processing
    pub requests_discarded: u64,
    /// Requests answered by replaying the previous response
    pub duplicates_replayed: u64,
    pub confirm_timeouts: u64,
    pub transmit_failures: u64,
    pub unsolicited_retries: u64,
    /// Events dropped by buffer overflow
    pub events_dropped: u64,
}

impl SessionStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn increment_fragments_received(&mut self) {
        self.fragments_received += 1;
    }

    pub fn increment_fragments_sent(&mut self) {
        self.fragments_sent += 1;
    }

    pub fn increment_confirms_received(&mut self) {
        self.confirms_received += 1;
    }

    pub fn increment_unexpected_confirms(&mut self) {
        self.unexpected_confirms += 1;
    }

    pub fn increment_requests_discarded(&mut self) {
        self.requests_discarded += 1;
    }

    pub fn increment_duplicates_replayed(&mut self) {
        self.duplicates_replayed += 1;
    }

    pub fn increment_confirm_timeouts(&mut self) {
        self.confirm_timeouts += 1;
    }

    pub fn increment_transmit_failures(&mut self) {
        self.transmit_failures += 1;
    }

    pub fn increment_unsolicited_retries(&mut self) {
        self.unsolicited_retries += 1;
    }

    pub fn increment_events_dropped(&mut self) {
        self.events_dropped += 1;
    }
}
