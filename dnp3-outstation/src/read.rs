//! Read processing in four passes
//!
//! A READ is answered by running, in order:
//! 1. explicit event headers, recording group 60 class scans on the way
//! 2. events of the scanned classes 1, 2 and 3
//! 3. explicit static headers
//! 4. class 0 static data, if class 0 was scanned
//!
//! When a fragment fills, the cursor keeps the pass, the header offset and
//! the position within the header, and the next fragment resumes there.

use crate::events::{EventSelector, EventState};
use crate::requests::header_indices;
use crate::session::OutstationSession;
use crate::state::{ReadPass, ReadStatus};
use dnp3_application::{
    parse_header, FragmentBuilder, HeaderRange, ObjectHeader, ObjectSize, ReadHandler, Variation,
    REGISTRY,
};
use dnp3_application::ReadPass as EntryPass;
use dnp3_core::{AppControl, ClassMask, Dnp3Error, Flags, Iin};
use dnp3_database::{Binary, Database, Measurement, PointAccess, PointType};
use log::debug;

impl<D: Database> OutstationSession<D> {
    /// Begin answering the READ held in the request slot
    pub(crate) fn start_read(&mut self) {
        self.read.reset();
        self.read.active = true;
        self.db.event_and_static_read(true);
        self.continue_read();
    }

    /// Release the read bracket and return unconfirmed events
    pub(crate) fn abort_read(&mut self) {
        if self.read.active {
            self.read.active = false;
            self.db.event_and_static_read(false);
            self.events.revert(EventState::SentSolicited);
        }
    }

    /// Build and queue the next fragment of the active read
    pub(crate) fn continue_read(&mut self) {
        let Some(request) = self.request.as_ref() else {
            self.abort_read();
            return;
        };
        let fragment = request.fragment.clone();
        let request_seq = request.header.seq();

        let mut builder = self.builder();
        let mut events_written = false;
        let status = loop {
            let status = match self.read.pass {
                ReadPass::Events => {
                    self.read_event_headers(&fragment, &mut builder, &mut events_written)
                }
                ReadPass::Classes => self.read_classes(&mut builder, &mut events_written),
                ReadPass::Static => self.read_static_headers(&fragment, &mut builder),
                ReadPass::Class0 => self.read_class0(&mut builder),
            };
            if status != ReadStatus::Complete || !self.read.advance() {
                break status;
            }
        };

        let stuck = status == ReadStatus::MoreData && builder.is_empty();
        let fin = status != ReadStatus::MoreData || !self.config.allow_multi_fragment || stuck;
        if stuck {
            debug!(
                "Session {}: read object does not fit in an empty fragment",
                self.config.source
            );
        }

        let seq = if self.read.first {
            request_seq
        } else {
            self.response_seq.next()
        };
        let control = AppControl {
            fir: self.read.first,
            fin,
            con: events_written || (!fin && self.config.multi_fragment_confirm),
            uns: false,
            seq,
        };
        self.read.first = false;
        if fin {
            self.read.active = false;
            self.db.event_and_static_read(false);
        }
        self.queue_response(builder, control);
    }

    fn read_parse_failed(&mut self, error: Dnp3Error) -> ReadStatus {
        debug!("Session {}: read aborted: {}", self.config.source, error);
        if !self.request_iin.contains(Iin::OBJECT_UNKNOWN) {
            self.request_iin.insert(Iin::PARAMETER_ERROR);
        }
        ReadStatus::Failed
    }

    fn next_header(&mut self, request: &[u8]) -> Result<(ObjectHeader, usize), ReadStatus> {
        let header = match parse_header(request, self.read.offset) {
            Ok(header) => header,
            Err(e) => return Err(self.read_parse_failed(e)),
        };
        match header.end(request, ObjectSize::None) {
            Ok(end) => Ok((header, end)),
            Err(e) => Err(self.read_parse_failed(e)),
        }
    }

    fn read_event_headers(
        &mut self,
        request: &[u8],
        builder: &mut FragmentBuilder,
        events_written: &mut bool,
    ) -> ReadStatus {
        while self.read.offset < request.len() {
            let (header, end) = match self.next_header(request) {
                Ok(parsed) => parsed,
                Err(status) => return status,
            };
            let entry = REGISTRY
                .read(header.group, header.variation)
                .filter(|e| e.pass == EntryPass::Events);
            if let Some(entry) = entry {
                if !header.qualifier.allowed_for_event_read(header.group) {
                    debug!(
                        "Session {}: qualifier 0x{:02X} not allowed for g{}v{}",
                        self.config.source,
                        header.qualifier.as_u8(),
                        header.group,
                        header.variation
                    );
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    return ReadStatus::Failed;
                }
                match entry.handler {
                    ReadHandler::ClassScan => self.record_class_scan(&header),
                    ReadHandler::Events(point_type) => {
                        let status = self.write_events(
                            builder,
                            point_type,
                            header.variation,
                            header.limit(),
                            events_written,
                        );
                        if status != ReadStatus::Complete {
                            return status;
                        }
                    }
                    ReadHandler::Static(_) | ReadHandler::Iin => {}
                }
            }
            self.read.offset = end;
            self.read.point_index = 0;
        }
        ReadStatus::Complete
    }

    fn record_class_scan(&mut self, header: &ObjectHeader) {
        let Some(mask) = ClassMask::from_group60_variation(header.variation) else {
            return;
        };
        self.read.class_mask.insert(mask);
        if let Some(class) = mask.event_class() {
            self.read.class_limits[class.slot()] = header.limit();
        }
    }

    /// Explicit event read of one point type
    fn write_events(
        &mut self,
        builder: &mut FragmentBuilder,
        point_type: PointType,
        variation: u8,
        limit: Option<usize>,
        events_written: &mut bool,
    ) -> ReadStatus {
        let forced = if variation == 0 {
            None
        } else {
            match Variation::resolve_event(point_type, variation) {
                Some(v) => Some(v),
                None => {
                    self.request_iin.insert(Iin::OBJECT_UNKNOWN);
                    return ReadStatus::Complete;
                }
            }
        };
        for event in self.events.unsent_mut(EventSelector::point_type(point_type)) {
            if limit.is_some_and(|limit| self.read.point_index >= limit) {
                break;
            }
            let variation = forced.unwrap_or(event.variation);
            if !builder.push_event(variation, event.index, &event.value) {
                return ReadStatus::MoreData;
            }
            event.state = EventState::SentSolicited;
            self.read.point_index += 1;
            *events_written = true;
        }
        ReadStatus::Complete
    }

    /// Events of the classes requested by class scans
    fn read_classes(
        &mut self,
        builder: &mut FragmentBuilder,
        events_written: &mut bool,
    ) -> ReadStatus {
        let classes = self.read.class_mask & ClassMask::EVENTS;
        if classes.is_empty() {
            return ReadStatus::Complete;
        }
        for event in self.events.unsent_mut(EventSelector::classes(classes)) {
            let slot = event.class.slot();
            if self.read.class_limits[slot].is_some_and(|limit| self.read.class_sent[slot] >= limit) {
                continue;
            }
            if !builder.push_event(event.variation, event.index, &event.value) {
                return ReadStatus::MoreData;
            }
            event.state = EventState::SentSolicited;
            self.read.class_sent[slot] += 1;
            *events_written = true;
        }
        ReadStatus::Complete
    }

    fn read_static_headers(&mut self, request: &[u8], builder: &mut FragmentBuilder) -> ReadStatus {
        while self.read.offset < request.len() {
            let (header, end) = match self.next_header(request) {
                Ok(parsed) => parsed,
                Err(status) => return status,
            };
            match REGISTRY.read(header.group, header.variation) {
                Some(entry) if entry.pass == EntryPass::Static => {
                    let status = match entry.handler {
                        ReadHandler::Static(point_type) => {
                            self.write_static_header(request, &header, point_type, builder)
                        }
                        ReadHandler::Iin => self.write_iin_header(&header, builder),
                        ReadHandler::ClassScan | ReadHandler::Events(_) => ReadStatus::Complete,
                    };
                    if status != ReadStatus::Complete {
                        return status;
                    }
                }
                Some(_) => {}
                None => {
                    debug!(
                        "Session {}: object g{}v{} unknown for read",
                        self.config.source, header.group, header.variation
                    );
                    self.request_iin.insert(Iin::OBJECT_UNKNOWN);
                }
            }
            self.read.offset = end;
            self.read.point_index = 0;
        }
        ReadStatus::Complete
    }

    /// Variation used for a point when the request does not name one
    fn static_variation(&mut self, point_type: PointType, index: u16) -> Option<&'static Variation> {
        let configured = self.db.static_variation(point_type, index);
        Variation::resolve_static(point_type, configured)
            .or_else(|| Variation::resolve_static(point_type, 0))
    }

    fn write_static_header(
        &mut self,
        request: &[u8],
        header: &ObjectHeader,
        point_type: PointType,
        builder: &mut FragmentBuilder,
    ) -> ReadStatus {
        if !self.db.supports(point_type) {
            self.request_iin.insert(Iin::OBJECT_UNKNOWN);
            return ReadStatus::Complete;
        }
        let forced = if header.variation == 0 {
            None
        } else {
            match Variation::resolve_static(point_type, header.variation) {
                Some(v) => Some(v),
                None => {
                    self.request_iin.insert(Iin::OBJECT_UNKNOWN);
                    return ReadStatus::Complete;
                }
            }
        };
        let quantity = self.db.quantity(point_type);
        let indices = match header_indices(request, header, quantity) {
            Ok(indices) => indices,
            Err(e) => return self.read_parse_failed(e),
        };

        for (position, &index) in indices.iter().enumerate().skip(self.read.point_index) {
            if index >= quantity {
                self.request_iin.insert(Iin::PARAMETER_ERROR);
                continue;
            }
            if !self.db.is_enabled(point_type, index) {
                continue;
            }
            let Some(value) = self.db.read_point(point_type, index) else {
                continue;
            };
            let Some(variation) = forced.or_else(|| self.static_variation(point_type, index))
            else {
                continue;
            };
            if !builder.push_static(variation, index, &value) {
                self.read.point_index = position;
                return ReadStatus::MoreData;
            }
        }
        ReadStatus::Complete
    }

    /// Group 80 read of the internal indications
    fn write_iin_header(&mut self, header: &ObjectHeader, builder: &mut FragmentBuilder) -> ReadStatus {
        let quantity = self.db.iin_quantity();
        let Some(variation) = Variation::lookup(80, 1) else {
            return ReadStatus::Complete;
        };
        if quantity == 0 {
            self.request_iin.insert(Iin::PARAMETER_ERROR);
            return ReadStatus::Complete;
        }
        let (start, stop) = match header.range {
            HeaderRange::Range { start, stop } => (start, stop),
            _ => (0, quantity - 1),
        };
        let iin = self.response_iin();
        let first = start as usize + self.read.point_index;
        for index in first..=stop as usize {
            let index = index as u16;
            if index >= quantity {
                self.request_iin.insert(Iin::PARAMETER_ERROR);
                break;
            }
            let state = if index < Iin::BIT_COUNT {
                Iin::from_index(index).is_some_and(|bit| iin.contains(bit))
            } else {
                self.db.iin_read(index)
            };
            let value = Measurement::from(Binary::new(state, Flags::default()));
            if !builder.push_static(variation, index, &value) {
                self.read.point_index = (index - start) as usize;
                return ReadStatus::MoreData;
            }
        }
        ReadStatus::Complete
    }

    /// Class 0 dump over every static point type
    fn read_class0(&mut self, builder: &mut FragmentBuilder) -> ReadStatus {
        if !self.read.class_mask.contains(ClassMask::CLASS_0) {
            return ReadStatus::Complete;
        }
        while let Some(&point_type) = PointType::STATIC_ORDER.get(self.read.group_index) {
            let quantity = self.db.quantity(point_type) as usize;
            while self.read.point_index < quantity {
                let index = self.read.point_index as u16;
                if self.db.is_enabled(point_type, index) && self.db.in_class0(point_type, index) {
                    let value = self.db.read_point(point_type, index);
                    let variation = self.static_variation(point_type, index);
                    if let (Some(value), Some(variation)) = (value, variation) {
                        if !builder.push_static(variation, index, &value) {
                            return ReadStatus::MoreData;
                        }
                    }
                }
                self.read.point_index += 1;
            }
            self.read.group_index += 1;
            self.read.point_index = 0;
        }
        ReadStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use dnp3_core::{ClassMask, Flags, FunctionCode, Iin};
    use dnp3_database::{Analog, Binary, MemoryDatabase, PointType};
    use std::time::Duration;

    fn analog_database(count: usize) -> MemoryDatabase {
        let mut db = MemoryDatabase::new();
        for i in 0..count {
            db.analog_inputs.add(Analog::new(i as f64, Flags::ONLINE), ClassMask::NONE);
        }
        db
    }

    #[test]
    fn test_empty_class0_read_is_header_only() {
        let (mut session, now) = open_session(config(), MemoryDatabase::new());
        let sent = send(&mut session, now, 1, FunctionCode::Read, &[60, 1, 0x06]);
        let response = single_response(&sent);
        let control = control(response);
        assert!(control.fir && control.fin);
        assert!(!control.con && !control.uns);
        assert_eq!(control.seq.value(), 1);
        assert_eq!(response.data[1], 0x81);
        assert!(objects(response).is_empty());
        assert_eq!(session.database().read_brackets, vec![true, false]);
    }

    #[test]
    fn test_class0_read_reports_static_data() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::Read, &[60, 1, 0x06]);
        let objects = objects(single_response(&sent));
        assert_eq!(&objects[..10], &[1, 2, 0x01, 0, 0, 2, 0, 0x81, 0x01, 0x81]);
        assert_eq!(&objects[10..17], &[20, 1, 0x01, 0, 0, 1, 0]);
        assert_eq!(&objects[17..22], &[0x01, 10, 0, 0, 0]);
    }

    #[test]
    fn test_class_poll_requests_confirm_for_events() {
        let (mut session, now) = open_session(config(), database());
        assert!(session.add_event(now, PointType::BinaryInput, 1, Binary::new(true, Flags::ONLINE).into()));

        let sent = send(&mut session, now, 2, FunctionCode::Read, &[60, 2, 0x06]);
        let response = single_response(&sent);
        assert!(control(response).con);
        let objects = objects(response);
        assert_eq!(&objects[..7], &[2, 2, 0x28, 1, 0, 1, 0]);
        assert_eq!(objects[7], 0x81);
        assert_eq!(objects.len(), 14);
        assert_eq!(session.event_count(), 1);

        confirm(&mut session, now, 2, false);
        assert_eq!(session.event_count(), 0);
        assert_eq!(session.statistics().confirms_received, 1);
    }

    #[test]
    fn test_unconfirmed_events_are_reported_again() {
        let (mut session, now) = open_session(config(), database());
        session.add_event(now, PointType::Counter, 0, dnp3_database::Counter::new(11, Flags::ONLINE).into());
        let sent = send(&mut session, now, 2, FunctionCode::Read, &[60, 3, 0x06]);
        assert!(control(single_response(&sent)).con);

        let later = now + session.config().app_confirm_timeout + Duration::from_millis(1);
        assert_eq!(session.next_deadline(), Some(now + session.config().app_confirm_timeout));
        session.on_timer(later);
        assert_eq!(session.statistics().confirm_timeouts, 1);

        let sent = send(&mut session, later, 3, FunctionCode::Read, &[60, 3, 0x06]);
        let objects = objects(single_response(&sent));
        assert_eq!(&objects[..5], &[22, 1, 0x28, 1, 0]);
        assert_eq!(session.event_count(), 1);
    }

    #[test]
    fn test_events_not_matching_request_stay_buffered() {
        let (mut session, now) = open_session(config(), database());
        session.add_event(now, PointType::BinaryInput, 0, Binary::new(false, Flags::ONLINE).into());
        let sent = send(&mut session, now, 2, FunctionCode::Read, &[60, 4, 0x06]);
        let response = single_response(&sent);
        assert!(!control(response).con);
        assert!(objects(response).is_empty());
        assert!(iin(response).contains(Iin::CLASS_1_EVENTS));
    }

    #[test]
    fn test_large_read_is_split_into_fragments() {
        let config = config().with_max_fragment_size(64);
        let (mut session, now) = open_session(config, analog_database(20));
        let sent = send(&mut session, now, 5, FunctionCode::Read, &[30, 1, 0x06]);
        assert_eq!(sent.len(), 2);

        let first = control(&sent[0]);
        assert!(first.fir && !first.fin && !first.con);
        assert_eq!(first.seq.value(), 5);
        assert_eq!(objects(&sent[0]).len(), 7 + 10 * 5);

        let last = control(&sent[1]);
        assert!(!last.fir && last.fin);
        assert_eq!(last.seq.value(), 6);
        assert_eq!(&objects(&sent[1])[..7], &[30, 1, 0x01, 10, 0, 19, 0]);
        assert_eq!(session.database().read_brackets, vec![true, false]);
    }

    #[test]
    fn test_non_final_fragment_waits_for_confirm() {
        let mut config = config().with_max_fragment_size(64);
        config.multi_fragment_confirm = true;
        let (mut session, now) = open_session(config, analog_database(20));

        let sent = send(&mut session, now, 5, FunctionCode::Read, &[30, 1, 0x06]);
        let first = control(single_response(&sent));
        assert!(first.fir && !first.fin && first.con);

        let sent = confirm(&mut session, now, 5, false);
        let last = control(single_response(&sent));
        assert!(last.fin && !last.con);
        assert_eq!(last.seq.value(), 6);
    }

    #[test]
    fn test_multi_fragment_disabled_truncates_response() {
        let mut config = config().with_max_fragment_size(64);
        config.allow_multi_fragment = false;
        let (mut session, now) = open_session(config, analog_database(20));
        let sent = send(&mut session, now, 5, FunctionCode::Read, &[30, 1, 0x06]);
        let control = control(single_response(&sent));
        assert!(control.fir && control.fin);
        assert_eq!(session.database().read_brackets, vec![true, false]);
    }

    #[test]
    fn test_points_beyond_quantity_set_parameter_error() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::Read, &[1, 2, 0x00, 0, 9]);
        let response = single_response(&sent);
        assert!(iin(response).contains(Iin::PARAMETER_ERROR));
        assert_eq!(objects(response).len(), 7 + 3);
    }

    #[test]
    fn test_unknown_object_sets_object_unknown() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::Read, &[99, 1, 0x06]);
        let response = single_response(&sent);
        assert!(iin(response).contains(Iin::OBJECT_UNKNOWN));
        assert!(objects(response).is_empty());
    }

    #[test]
    fn test_event_read_rejects_range_qualifier() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::Read, &[2, 0, 0x00, 0, 1]);
        assert!(iin(single_response(&sent)).contains(Iin::PARAMETER_ERROR));
    }

    #[test]
    fn test_truncated_header_sets_parameter_error() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::Read, &[60, 1]);
        assert!(iin(single_response(&sent)).contains(Iin::PARAMETER_ERROR));
    }

    #[test]
    fn test_limited_class_read() {
        let (mut session, now) = open_session(config(), database());
        for index in 0..3 {
            session.add_event(now, PointType::BinaryInput, index, Binary::new(true, Flags::ONLINE).into());
        }
        let sent = send(&mut session, now, 1, FunctionCode::Read, &[60, 2, 0x07, 2]);
        let objects = objects(single_response(&sent));
        assert_eq!(&objects[..5], &[2, 2, 0x28, 2, 0]);
        assert_eq!(objects.len(), 5 + 2 * 9);

        confirm(&mut session, now, 1, false);
        assert_eq!(session.event_count(), 1);
    }

    #[test]
    fn test_iin_read_reports_restart() {
        let (mut session, now) = open_session(config(), database());
        session.iin.insert(Iin::DEVICE_RESTART);
        let sent = send(&mut session, now, 1, FunctionCode::Read, &[80, 1, 0x00, 0, 15]);
        let objects = objects(single_response(&sent));
        assert_eq!(&objects[..7], &[80, 1, 0x01, 0, 0, 15, 0]);
        assert_eq!(objects[7] & 0x80, 0x80);
        assert_eq!(objects.len(), 9);
    }

    #[test]
    fn test_new_request_abandons_read_in_progress() {
        let mut config = config().with_max_fragment_size(64);
        config.multi_fragment_confirm = true;
        let (mut session, now) = open_session(config, analog_database(20));
        send(&mut session, now, 5, FunctionCode::Read, &[30, 1, 0x06]);

        let sent = send(&mut session, now, 6, FunctionCode::Read, &[60, 1, 0x06]);
        let control = control(&sent[0]);
        assert!(control.fir);
        assert_eq!(control.seq.value(), 6);
        assert_eq!(session.database().read_brackets, vec![true, false, true]);
    }
}
