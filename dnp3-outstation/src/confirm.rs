//! Confirmation processing
//!
//! A confirm with the UNS bit is matched against the unsolicited response
//! awaiting confirmation, any other confirm against the outstanding
//! solicited response. Confirms that match nothing are ignored.

use crate::events::EventState;
use crate::session::{FragmentKind, OutstationSession};
use dnp3_application::RequestHeader;
use dnp3_core::Iin;
use dnp3_database::Database;
use log::debug;

impl<D: Database> OutstationSession<D> {
    pub(crate) fn process_confirm(&mut self, header: RequestHeader) {
        let seq = header.seq();
        if header.control.uns {
            if !self.unsol.awaiting_confirm || seq != self.unsol.seq {
                debug!(
                    "Session {}: unexpected unsolicited confirm {} ignored",
                    self.config.source, seq
                );
                self.stats.increment_unexpected_confirms();
                return;
            }
            self.stats.increment_confirms_received();
            self.unsol.confirmed();
            self.events.confirm(EventState::SentUnsolicited);
            if self.current.is_some_and(|f| f.kind == FragmentKind::Unsolicited) {
                self.current = None;
            }
            self.outbox.retain(|f| f.kind != FragmentKind::Unsolicited);
            return;
        }

        let matched = self.current.is_some_and(|f| {
            f.kind == FragmentKind::Solicited && f.confirm && f.seq == seq
        });
        if !matched {
            debug!(
                "Session {}: unexpected confirm {} ignored",
                self.config.source, seq
            );
            self.stats.increment_unexpected_confirms();
            return;
        }
        self.stats.increment_confirms_received();
        self.confirm_timer.cancel();
        if self.current.is_some_and(|f| f.all_stations) && self.all_stations_confirm {
            self.iin.remove(Iin::ALL_STATIONS);
            self.all_stations_confirm = false;
        }
        self.current = None;
        self.outbox.retain(|f| f.kind != FragmentKind::Solicited);
        self.events.confirm(EventState::SentSolicited);
    }
}
