//! Unsolicited response lifecycle
//!
//! After the session comes online an empty (null) unsolicited response is
//! sent and must be confirmed before events are reported. Each class then
//! triggers on its pending-event count or on the delay since its first
//! pending event, and one response coalesces every triggered class.
//!
//! A response that is not confirmed is retried `max_retries` times at
//! `retry_delay`, then at `offline_retry_delay` until confirmed, or not at
//! all when that delay is `None`.

use crate::events::{EventSelector, EventState};
use crate::session::{FragmentKind, InFlight, OutboundFragment, OutstationSession};
use bytes::Bytes;
use dnp3_application::ResponseHeader;
use dnp3_core::{AppControl, ClassMask, EventClass, FunctionCode};
use dnp3_database::Database;
use log::{debug, info, warn};
use std::time::Instant;

impl<D: Database> OutstationSession<D> {
    /// Start the unsolicited sequence over, beginning with the null response
    pub(crate) fn restart_unsolicited(&mut self) {
        self.stop_unsolicited();
        self.unsol.null_confirmed = !self.config.unsolicited.send_initial_null;
        self.unsol.retries = 0;
        self.unsol.offline = false;
        self.unsol.halted = false;
        self.unsol.last_fragment = None;
    }

    /// Drop any unsolicited response in flight and return its events
    pub(crate) fn stop_unsolicited(&mut self) {
        if self.current.is_some_and(|f| f.kind == FragmentKind::Unsolicited) {
            self.current = None;
        }
        self.outbox.retain(|f| f.kind != FragmentKind::Unsolicited);
        self.unsol.awaiting_confirm = false;
        self.unsol.confirm_timer.cancel();
        self.unsol.retry_timer.cancel();
        self.events.revert(EventState::SentUnsolicited);
    }

    /// Classes enabled for unsolicited reporting whose trigger fired
    fn triggered_classes(&mut self) -> ClassMask {
        let mut triggered = ClassMask::NONE;
        for class in EventClass::ALL {
            let slot = class.slot();
            if !self.unsol.enabled.contains(class.mask()) {
                continue;
            }
            let pending = self.events.unsent_count(class);
            if pending == 0 {
                self.unsol.class_due[slot] = false;
                continue;
            }
            if pending >= self.config.unsolicited.max_events[slot] || self.unsol.class_due[slot] {
                triggered.insert(class.mask());
            }
        }
        triggered
    }

    /// Send an unsolicited response if one is due and nothing is outstanding
    pub(crate) fn try_unsolicited(&mut self) {
        if !self.config.unsolicited.allowed
            || !self.online
            || self.current.is_some()
            || self.read.active
            || self.deferred
            || self.unsol.awaiting_confirm
            || self.unsol.halted
            || self.unsol.retry_timer.is_running()
        {
            return;
        }

        if self.config.unsolicited.identical_retry {
            if let Some(data) = self.unsol.last_fragment.clone() {
                debug!(
                    "Session {}: unsolicited response {} sent again",
                    self.config.source, self.unsol.seq
                );
                self.queue_unsolicited(data);
                return;
            }
        }

        if !self.unsol.null_confirmed {
            debug!("Session {}: sending null unsolicited response", self.config.source);
            let data = self.finish_unsolicited(self.builder());
            self.queue_unsolicited(data);
            return;
        }

        let triggered = self.triggered_classes();
        if triggered.is_empty() {
            return;
        }
        let mut builder = self.builder();
        let mut written = 0usize;
        for event in self.events.unsent_mut(EventSelector::classes(triggered)) {
            if !builder.push_event(event.variation, event.index, &event.value) {
                break;
            }
            event.state = EventState::SentUnsolicited;
            written += 1;
        }
        if written == 0 {
            return;
        }
        for class in triggered.event_classes() {
            let slot = class.slot();
            if self.events.unsent_count(class) == 0 {
                self.unsol.class_due[slot] = false;
                self.unsol.class_timers[slot].cancel();
            }
        }
        info!(
            "Session {}: unsolicited response {} with {} event(s)",
            self.config.source, self.unsol.seq, written
        );
        let data = self.finish_unsolicited(builder);
        self.queue_unsolicited(data);
    }

    fn finish_unsolicited(&self, builder: dnp3_application::FragmentBuilder) -> Bytes {
        let iin = self.iin | self.db.iin() | self.events.iin();
        builder.finish(ResponseHeader::new(
            AppControl::unsolicited(self.unsol.seq),
            FunctionCode::UnsolicitedResponse,
            iin,
        ))
    }

    fn queue_unsolicited(&mut self, data: Bytes) {
        self.unsol.awaiting_confirm = true;
        self.unsol.last_fragment = Some(data.clone());
        self.current = Some(InFlight {
            kind: FragmentKind::Unsolicited,
            seq: self.unsol.seq,
            confirm: true,
            transmitted: false,
            all_stations: false,
        });
        self.outbox.push_back(OutboundFragment {
            kind: FragmentKind::Unsolicited,
            destination: self.master,
            data,
        });
    }

    /// The unsolicited response in flight failed or was not confirmed
    pub(crate) fn unsolicited_failed(&mut self, now: Instant) {
        if self.current.is_some_and(|f| f.kind == FragmentKind::Unsolicited) {
            self.current = None;
        }
        self.outbox.retain(|f| f.kind != FragmentKind::Unsolicited);
        self.unsol.awaiting_confirm = false;
        self.unsol.confirm_timer.cancel();
        self.unsol.retries += 1;
        self.stats.increment_unsolicited_retries();

        let config = &self.config.unsolicited;
        let exhausted = self.unsol.retries > config.max_retries;
        if !exhausted {
            self.unsol.retry_timer.start(now, config.retry_delay);
        } else if let Some(delay) = config.offline_retry_delay {
            if !self.unsol.offline {
                warn!(
                    "Session {}: unsolicited retries exhausted, retrying every {:?}",
                    self.config.source, delay
                );
            }
            self.unsol.offline = true;
            self.unsol.retry_timer.start(now, delay);
        } else {
            warn!(
                "Session {}: unsolicited retries exhausted, reporting stopped",
                self.config.source
            );
            self.unsol.halted = true;
        }

        if !config.identical_retry || exhausted {
            self.events.revert(EventState::SentUnsolicited);
            self.unsol.last_fragment = None;
            self.unsol.seq.increment();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SessionConfig;
    use crate::session::FragmentKind;
    use crate::testing::*;
    use dnp3_core::{Flags, FunctionCode, Iin};
    use dnp3_database::{Binary, PointType};
    use std::time::Duration;

    fn unsolicited_config() -> SessionConfig {
        let mut config = config();
        config.unsolicited.allowed = true;
        config
    }

    fn unsolicited(fragments: &[crate::OutboundFragment]) -> Vec<&crate::OutboundFragment> {
        fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Unsolicited)
            .collect()
    }

    #[test]
    fn test_null_response_then_events() {
        let (mut session, now) = open_session(unsolicited_config(), database());
        let sent = drain(&mut session, now);
        let null = unsolicited(&sent);
        assert_eq!(null.len(), 1);
        let header = control(null[0]);
        assert!(header.uns && header.con);
        assert_eq!(header.seq.value(), 0);
        assert_eq!(null[0].data[1], FunctionCode::UnsolicitedResponse.as_u8());
        assert!(objects(null[0]).is_empty());
        assert!(iin(null[0]).contains(Iin::DEVICE_RESTART));

        assert!(confirm(&mut session, now, 0, true).is_empty());
        send(&mut session, now, 1, FunctionCode::EnableUnsolicited, &[60, 2, 0x06]);

        assert!(session.add_event(now, PointType::BinaryInput, 1, Binary::new(true, Flags::ONLINE).into()));
        assert!(drain(&mut session, now).is_empty());
        let delay = session.config().unsolicited.max_delay[0];
        assert_eq!(session.next_deadline(), Some(now + delay));

        session.on_timer(now + delay);
        let sent = drain(&mut session, now + delay);
        let events = unsolicited(&sent);
        assert_eq!(events.len(), 1);
        assert_eq!(control(events[0]).seq.value(), 1);
        assert_eq!(&objects(events[0])[..5], &[2, 2, 0x28, 1, 0]);
        assert_eq!(&objects(events[0])[5..7], &[1, 0]);

        confirm(&mut session, now + delay, 1, true);
        assert_eq!(session.event_count(), 0);
        assert_eq!(session.statistics().confirms_received, 2);
    }

    #[test]
    fn test_events_wait_for_null_confirm() {
        let mut config = unsolicited_config();
        config.unsolicited.initial_classes = dnp3_core::ClassMask::EVENTS;
        config.unsolicited.max_events = [1, 5, 5];
        let (mut session, now) = open_session(config, database());
        assert_eq!(unsolicited(&drain(&mut session, now)).len(), 1);

        session.add_event(now, PointType::BinaryInput, 0, Binary::new(false, Flags::ONLINE).into());
        assert!(drain(&mut session, now).is_empty());
        assert!(confirm(&mut session, now, 5, true).is_empty());
        assert_eq!(session.event_count(), 1);

        let sent = confirm(&mut session, now, 0, true);
        let events = unsolicited(&sent);
        assert_eq!(events.len(), 1);
        assert_eq!(control(events[0]).seq.value(), 1);
        assert_eq!(&objects(events[0])[..5], &[2, 2, 0x28, 1, 0]);
    }

    #[test]
    fn test_identical_retry_exhaustion_reverts_events() {
        let mut config = unsolicited_config();
        config.unsolicited.initial_classes = dnp3_core::ClassMask::EVENTS;
        config.unsolicited.max_events = [1, 5, 5];
        config.unsolicited.identical_retry = true;
        config.unsolicited.max_retries = 0;
        let (mut session, now) = open_session(config, database());
        drain(&mut session, now);
        confirm(&mut session, now, 0, true);

        session.add_event(now, PointType::BinaryInput, 0, Binary::new(false, Flags::ONLINE).into());
        let first = drain(&mut session, now);
        assert_eq!(control(unsolicited(&first)[0]).seq.value(), 1);

        let failure = now + session.config().unsolicited.confirm_timeout;
        session.on_timer(failure);
        assert!(drain(&mut session, failure).is_empty());
        assert_eq!(session.event_count(), 1);

        let offline = session.config().unsolicited.offline_retry_delay.unwrap();
        let resend = failure + offline;
        session.on_timer(resend);
        let second = drain(&mut session, resend);
        let events = unsolicited(&second);
        assert_eq!(events.len(), 1);
        assert_eq!(control(events[0]).seq.value(), 2);
        assert_ne!(events[0].data, unsolicited(&first)[0].data);
        assert_eq!(&objects(events[0])[..5], &[2, 2, 0x28, 1, 0]);
    }

    #[test]
    fn test_event_count_triggers_without_delay() {
        let mut config = unsolicited_config();
        config.unsolicited.initial_classes = dnp3_core::ClassMask::EVENTS;
        config.unsolicited.max_events = [2, 5, 5];
        let (mut session, now) = open_session(config, database());
        drain(&mut session, now);
        confirm(&mut session, now, 0, true);

        session.add_event(now, PointType::BinaryInput, 0, Binary::new(false, Flags::ONLINE).into());
        assert!(drain(&mut session, now).is_empty());
        session.add_event(now, PointType::BinaryInput, 2, Binary::new(false, Flags::ONLINE).into());
        let sent = drain(&mut session, now);
        assert_eq!(unsolicited(&sent).len(), 1);
        assert_eq!(objects(unsolicited(&sent)[0])[3], 2);
    }

    #[test]
    fn test_retries_then_offline_delay() {
        let mut config = unsolicited_config();
        config.unsolicited.max_retries = 1;
        let (mut session, now) = open_session(config, database());
        drain(&mut session, now);
        let timeout = session.config().unsolicited.confirm_timeout;
        let retry = session.config().unsolicited.retry_delay;

        let first_failure = now + timeout;
        session.on_timer(first_failure);
        assert!(drain(&mut session, first_failure).is_empty());
        assert_eq!(session.next_deadline(), Some(first_failure + retry));

        let resend = first_failure + retry;
        session.on_timer(resend);
        let sent = drain(&mut session, resend);
        assert_eq!(unsolicited(&sent).len(), 1);
        assert_eq!(control(unsolicited(&sent)[0]).seq.value(), 1);

        let second_failure = resend + timeout;
        session.on_timer(second_failure);
        let offline = session.config().unsolicited.offline_retry_delay.unwrap();
        assert_eq!(session.next_deadline(), Some(second_failure + offline));
        assert_eq!(session.statistics().unsolicited_retries, 2);
        assert_eq!(session.statistics().confirm_timeouts, 2);
    }

    #[test]
    fn test_retries_stop_without_offline_delay() {
        let mut config = unsolicited_config();
        config.unsolicited.max_retries = 0;
        config.unsolicited.offline_retry_delay = None;
        let (mut session, now) = open_session(config, database());
        drain(&mut session, now);

        let failure = now + session.config().unsolicited.confirm_timeout;
        session.on_timer(failure);
        assert_eq!(session.next_deadline(), None);
        assert!(drain(&mut session, failure).is_empty());

        let sent = send(&mut session, failure, 1, FunctionCode::EnableUnsolicited, &[60, 2, 0x06]);
        assert_eq!(unsolicited(&sent).len(), 1);
    }

    #[test]
    fn test_identical_retry_resends_same_fragment() {
        let mut config = unsolicited_config();
        config.unsolicited.identical_retry = true;
        let (mut session, now) = open_session(config, database());
        let first = drain(&mut session, now);

        let failure = now + session.config().unsolicited.confirm_timeout;
        session.on_timer(failure);
        let resend = failure + session.config().unsolicited.retry_delay;
        session.on_timer(resend);
        let second = drain(&mut session, resend);
        assert_eq!(unsolicited(&first)[0].data, unsolicited(&second)[0].data);
    }

    #[test]
    fn test_enable_unsolicited_when_not_allowed() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::EnableUnsolicited, &[60, 2, 0x06]);
        assert!(iin(single_response(&sent)).contains(Iin::NO_FUNC_CODE_SUPPORT));
    }

    #[test]
    fn test_request_waits_for_unsolicited_confirm() {
        let (mut session, now) = open_session(unsolicited_config(), database());
        drain(&mut session, now);

        let sent = send(&mut session, now, 1, FunctionCode::Read, &[60, 1, 0x06]);
        assert!(sent.is_empty());

        let sent = confirm(&mut session, now, 0, true);
        let response = single_response(&sent);
        assert_eq!(control(response).seq.value(), 1);
    }

    #[test]
    fn test_going_offline_drops_unsolicited() {
        let (mut session, now) = open_session(unsolicited_config(), database());
        session.set_online(now, false);
        assert!(drain(&mut session, now).is_empty());
        assert_eq!(session.next_deadline(), None);

        session.set_online(now, true);
        assert_eq!(unsolicited(&drain(&mut session, now)).len(), 1);
    }
}
