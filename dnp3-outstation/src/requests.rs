//! WRITE, freeze, restart, unsolicited enable, class assignment, delay
//! measurement and configuration activation

use crate::session::{OutstationSession, PendingRequest, Reply};
use dnp3_application::{
    parse_header, HeaderRange, ObjectHeader, ObjectSize, WriteHandler, REQUEST_HEADER_SIZE,
    REGISTRY,
};
use dnp3_core::{ClassMask, DnpTime, Dnp3Result, FunctionCode, Iin};
use dnp3_database::{Database, PointAccess};
use log::{debug, info};
use std::time::{Duration, Instant};

/// Point indices named by a header without object data
///
/// # Arguments
/// * `buf` - The request fragment
/// * `header` - Header to enumerate
/// * `quantity` - Number of points of the addressed type, bounds `All` and
///   plain count headers
///
/// # Errors
/// Returns `Dnp3Error::Parse` if a prefixed header is truncated
pub(crate) fn header_indices(buf: &[u8], header: &ObjectHeader, quantity: u16) -> Dnp3Result<Vec<u16>> {
    Ok(match header.range {
        HeaderRange::Range { start, stop } => (start..=stop).collect(),
        HeaderRange::All => (0..quantity).collect(),
        HeaderRange::Count(_) if header.qualifier.is_indexed() => header
            .points(buf, ObjectSize::None)?
            .iter()
            .map(|p| p.index)
            .collect(),
        HeaderRange::Count(count) => (0..count.min(quantity)).collect(),
    })
}

/// Object data length of a WRITE header
fn write_object_size(handler: WriteHandler) -> ObjectSize {
    match handler {
        WriteHandler::Time | WriteHandler::LastRecordedTime => ObjectSize::Fixed(DnpTime::SIZE),
        WriteHandler::Iin => ObjectSize::Packed(1),
    }
}

/// Group 52 time delay object, fine variation when it fits
fn time_delay_object(delay: Duration) -> (u8, [u8; 2]) {
    match u16::try_from(delay.as_millis()) {
        Ok(millis) => (2, millis.to_le_bytes()),
        Err(_) => {
            let seconds = u16::try_from(delay.as_secs()).unwrap_or(u16::MAX);
            (1, seconds.to_le_bytes())
        }
    }
}

impl<D: Database> OutstationSession<D> {
    pub(crate) fn process_write(&mut self, request: &PendingRequest) -> Reply {
        let fragment = &request.fragment;
        let mut offset = REQUEST_HEADER_SIZE;
        while offset < fragment.len() {
            let header = match parse_header(fragment, offset) {
                Ok(header) => header,
                Err(e) => {
                    debug!("Session {}: write rejected: {}", self.config.source, e);
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    break;
                }
            };
            let Some(handler) = REGISTRY.write(header.group, header.variation) else {
                debug!(
                    "Session {}: object g{}v{} unknown for write",
                    self.config.source, header.group, header.variation
                );
                self.request_iin.insert(Iin::OBJECT_UNKNOWN);
                break;
            };
            let result = match handler {
                WriteHandler::Time => self.write_time(fragment, &header),
                WriteHandler::LastRecordedTime => {
                    self.write_last_recorded_time(fragment, &header, request.received_at)
                }
                WriteHandler::Iin => self.write_iin(fragment, &header),
            };
            match result.and_then(|_| header.end(fragment, write_object_size(handler))) {
                Ok(end) => offset = end,
                Err(e) => {
                    debug!("Session {}: write rejected: {}", self.config.source, e);
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    break;
                }
            }
        }
        Reply::Respond(self.builder())
    }

    fn write_time(&mut self, fragment: &[u8], header: &ObjectHeader) -> Dnp3Result<()> {
        for point in header.points(fragment, ObjectSize::Fixed(DnpTime::SIZE))? {
            let time = DnpTime::from_bytes(&fragment[point.data])?;
            self.apply_time(time);
        }
        Ok(())
    }

    fn write_last_recorded_time(
        &mut self,
        fragment: &[u8],
        header: &ObjectHeader,
        received_at: Instant,
    ) -> Dnp3Result<()> {
        for point in header.points(fragment, ObjectSize::Fixed(DnpTime::SIZE))? {
            let time = DnpTime::from_bytes(&fragment[point.data])?;
            match self.recorded_time.take() {
                Some(recorded) => {
                    let elapsed = received_at.saturating_duration_since(recorded);
                    self.apply_time(time.add(elapsed));
                }
                None => {
                    debug!(
                        "Session {}: last recorded time written without a recorded time",
                        self.config.source
                    );
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                }
            }
        }
        Ok(())
    }

    fn apply_time(&mut self, time: DnpTime) {
        if self.db.write_time(time) {
            self.iin.remove(Iin::NEED_TIME);
            info!("Session {}: time set to {} ms", self.config.source, time.as_millis());
        } else {
            self.request_iin.insert(Iin::PARAMETER_ERROR);
        }
    }

    /// Only the restart indication may be cleared
    fn write_iin(&mut self, fragment: &[u8], header: &ObjectHeader) -> Dnp3Result<()> {
        for point in header.points(fragment, ObjectSize::Packed(1))? {
            let set = (fragment[point.data.start] >> point.bit) & 0x01 != 0;
            if point.index == 7 && !set {
                self.iin.remove(Iin::DEVICE_RESTART);
            } else {
                debug!(
                    "Session {}: IIN bit {} may not be written to {}",
                    self.config.source, point.index, set
                );
                self.request_iin.insert(Iin::PARAMETER_ERROR);
            }
        }
        Ok(())
    }

    /// Whether every header of a broadcast WRITE falls in a permitted
    /// category
    pub(crate) fn broadcast_write_permitted(&self, fragment: &[u8]) -> bool {
        let writes = &self.config.broadcast_writes;
        let mut offset = REQUEST_HEADER_SIZE;
        while offset < fragment.len() {
            let Ok(header) = parse_header(fragment, offset) else {
                return false;
            };
            let Some(handler) = REGISTRY.write(header.group, header.variation) else {
                return writes.other;
            };
            let permitted = match handler {
                WriteHandler::Time => writes.clock,
                WriteHandler::LastRecordedTime => writes.last_recorded_time,
                WriteHandler::Iin => writes.cold_restart_iin,
            };
            if !permitted {
                return false;
            }
            match header.end(fragment, write_object_size(handler)) {
                Ok(end) => offset = end,
                Err(_) => return false,
            }
        }
        true
    }

    pub(crate) fn process_freeze(&mut self, request: &PendingRequest, function: FunctionCode) -> Reply {
        let clear = matches!(
            function,
            FunctionCode::FreezeClear | FunctionCode::FreezeClearNoAck
        );
        let fragment = &request.fragment;
        let mut offset = REQUEST_HEADER_SIZE;
        while offset < fragment.len() {
            let header = match parse_header(fragment, offset) {
                Ok(header) => header,
                Err(_) => {
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    break;
                }
            };
            let Some(point_type) = REGISTRY.freeze(header.group, header.variation) else {
                self.request_iin.insert(Iin::OBJECT_UNKNOWN);
                break;
            };
            let quantity = self.db.quantity(point_type);
            let indices = match header_indices(fragment, &header, quantity) {
                Ok(indices) => indices,
                Err(_) => {
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    break;
                }
            };
            for index in indices {
                if index >= quantity || !self.db.freeze_counter(index, clear) {
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                }
            }
            match header.end(fragment, ObjectSize::None) {
                Ok(end) => offset = end,
                Err(_) => break,
            }
        }
        debug!("Session {}: {} processed", self.config.source, function);
        if function.is_no_ack() {
            Reply::Silent
        } else {
            Reply::Respond(self.builder())
        }
    }

    pub(crate) fn process_restart(&mut self, function: FunctionCode) -> Reply {
        let delay = if function == FunctionCode::ColdRestart {
            self.db.cold_restart()
        } else {
            self.db.warm_restart()
        };
        let mut builder = self.builder();
        match delay {
            Some(delay) => {
                info!(
                    "Session {}: {} accepted, restart in {:?}",
                    self.config.source, function, delay
                );
                let (variation, data) = time_delay_object(delay);
                builder.push_count_object(52, variation, &data);
            }
            None => self.request_iin.insert(Iin::NO_FUNC_CODE_SUPPORT),
        }
        Reply::Respond(builder)
    }

    pub(crate) fn process_unsolicited_enable(&mut self, request: &PendingRequest, enable: bool) -> Reply {
        if !self.config.unsolicited.allowed {
            self.request_iin.insert(Iin::NO_FUNC_CODE_SUPPORT);
            return Reply::Respond(self.builder());
        }
        let fragment = &request.fragment;
        let mut classes = ClassMask::NONE;
        let mut offset = REQUEST_HEADER_SIZE;
        while offset < fragment.len() {
            let header = match parse_header(fragment, offset) {
                Ok(header) => header,
                Err(_) => {
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    break;
                }
            };
            match ClassMask::from_group60_variation(header.variation)
                .filter(|mask| header.group == 60 && *mask != ClassMask::CLASS_0)
            {
                Some(mask) => classes.insert(mask),
                None => {
                    self.request_iin.insert(Iin::OBJECT_UNKNOWN);
                    break;
                }
            }
            offset = header.data_start;
        }

        if enable {
            self.unsol.enabled.insert(classes);
            self.unsol.halted = false;
        } else {
            self.unsol.enabled.remove(classes);
        }
        info!(
            "Session {}: unsolicited classes now {:?}",
            self.config.source, self.unsol.enabled
        );
        self.db.unsol_event_mask(self.unsol.enabled);
        Reply::Respond(self.builder())
    }

    pub(crate) fn process_assign_class(&mut self, request: &PendingRequest) -> Reply {
        let fragment = &request.fragment;
        let mut class: Option<ClassMask> = None;
        let mut offset = REQUEST_HEADER_SIZE;
        while offset < fragment.len() {
            let header = match parse_header(fragment, offset) {
                Ok(header) => header,
                Err(_) => {
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    break;
                }
            };
            if header.group == 60 {
                match ClassMask::from_group60_variation(header.variation) {
                    Some(ClassMask::CLASS_0) => class = Some(ClassMask::NONE),
                    Some(mask) => class = Some(mask),
                    None => {
                        self.request_iin.insert(Iin::OBJECT_UNKNOWN);
                        break;
                    }
                }
            } else if let Some(point_type) = REGISTRY.assign_class(header.group, header.variation) {
                let Some(mask) = class else {
                    debug!(
                        "Session {}: class assignment without a class header",
                        self.config.source
                    );
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    break;
                };
                let quantity = self.db.quantity(point_type);
                let indices = match header_indices(fragment, &header, quantity) {
                    Ok(indices) => indices,
                    Err(_) => {
                        self.request_iin.insert(Iin::PARAMETER_ERROR);
                        break;
                    }
                };
                for index in indices {
                    if index >= quantity || !self.db.assign_point_class(point_type, index, mask) {
                        self.request_iin.insert(Iin::PARAMETER_ERROR);
                    }
                }
            } else {
                self.request_iin.insert(Iin::OBJECT_UNKNOWN);
                break;
            }
            match header.end(fragment, ObjectSize::None) {
                Ok(end) => offset = end,
                Err(_) => {
                    self.request_iin.insert(Iin::PARAMETER_ERROR);
                    break;
                }
            }
        }
        Reply::Respond(self.builder())
    }

    pub(crate) fn process_delay_measure(&mut self, now: Instant, request: &PendingRequest) -> Reply {
        let elapsed = now.saturating_duration_since(request.received_at);
        let millis = u16::try_from(elapsed.as_millis()).unwrap_or(u16::MAX);
        let mut builder = self.builder();
        builder.push_count_object(52, 2, &millis.to_le_bytes());
        Reply::Respond(builder)
    }

    pub(crate) fn process_activate_config(&mut self, request: &PendingRequest) -> Reply {
        let objects = request.objects();
        let mut builder = self.builder();
        match self.db.activate_config(&objects) {
            Some(status) => {
                let mut data = Vec::with_capacity(7);
                data.extend_from_slice(&status.delay_ms.to_le_bytes());
                data.push(1);
                data.push(status.status_code);
                data.push(status.text_len);
                let pushed = if self.config.send_obj91_resp_qual7 {
                    builder.push_count_object(91, 1, &data)
                } else {
                    builder.push_free_format_object(91, 1, &data)
                };
                if !pushed {
                    return Reply::Respond(self.builder());
                }
            }
            None => self.request_iin.insert(Iin::NO_FUNC_CODE_SUPPORT),
        }
        Reply::Respond(builder)
    }
}
