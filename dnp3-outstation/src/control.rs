//! Select, operate and direct operate

use crate::session::{OutstationSession, PendingRequest, Reply};
use crate::state::OperateRecord;
use bytes::Bytes;
use dnp3_application::{
    decode_analog_output, decode_crob, parse_header, ControlKind, FragmentBuilder,
    REQUEST_HEADER_SIZE, REGISTRY,
};
use dnp3_core::{AppControl, CommandStatus, Iin};
use dnp3_database::{AnalogOutputCommand, Crob, Database};
use log::{debug, info};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ControlCommand {
    Crob(Crob),
    AnalogOutput(AnalogOutputCommand),
}

/// One control point of a request
#[derive(Debug, Clone, Copy, PartialEq)]
struct ControlPoint {
    index: u16,
    /// Offset of the point's status byte within the request
    status_offset: usize,
    command: ControlCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlAction {
    Select,
    Operate,
}

/// Parse every control object of a request
///
/// # Errors
/// Returns the indication to report when a header is malformed or names an
/// object that is not a supported control
fn parse_controls(fragment: &[u8]) -> Result<Vec<ControlPoint>, Iin> {
    let mut points = Vec::new();
    let mut offset = REQUEST_HEADER_SIZE;
    while offset < fragment.len() {
        let header = parse_header(fragment, offset).map_err(|e| {
            debug!("Control request rejected: {}", e);
            Iin::PARAMETER_ERROR
        })?;
        let entry = REGISTRY
            .control(header.group, header.variation)
            .ok_or(Iin::OBJECT_UNKNOWN)?;
        let size = entry.object_size();
        let refs = header
            .points(fragment, size)
            .map_err(|_| Iin::PARAMETER_ERROR)?;
        for point in refs {
            let data = &fragment[point.data.clone()];
            let command = match entry.kind {
                ControlKind::Crob => decode_crob(data).map(ControlCommand::Crob),
                ControlKind::AnalogOutput => {
                    decode_analog_output(header.variation, data).map(ControlCommand::AnalogOutput)
                }
            }
            .map_err(|_| Iin::PARAMETER_ERROR)?;
            points.push(ControlPoint {
                index: point.index,
                status_offset: point.data.end - 1,
                command,
            });
        }
        offset = header
            .end(fragment, size)
            .map_err(|_| Iin::PARAMETER_ERROR)?;
    }
    Ok(points)
}

impl<D: Database> OutstationSession<D> {
    fn execute_control(&mut self, point: &ControlPoint, action: ControlAction) -> CommandStatus {
        match &point.command {
            ControlCommand::Crob(crob) => match self.db.binary_output_controls() {
                Some(controls) if controls.supports(point.index, crob) => match action {
                    ControlAction::Select => controls.select(point.index, crob),
                    ControlAction::Operate => controls.operate(point.index, crob),
                },
                _ => CommandStatus::NotSupported,
            },
            ControlCommand::AnalogOutput(command) => match self.db.analog_output_controls() {
                Some(controls) if controls.supports(point.index, command) => match action {
                    ControlAction::Select => controls.select(point.index, command),
                    ControlAction::Operate => controls.operate(point.index, command),
                },
                _ => CommandStatus::NotSupported,
            },
        }
    }

    fn execute_controls(&mut self, points: &[ControlPoint], action: ControlAction) -> Vec<CommandStatus> {
        let limit = self.config.max_controls_per_request;
        points
            .iter()
            .enumerate()
            .map(|(position, point)| {
                if position >= limit {
                    CommandStatus::TooManyObjs
                } else {
                    self.execute_control(point, action)
                }
            })
            .collect()
    }

    /// Response echoing the request objects with each status replaced
    fn control_echo(
        &mut self,
        request: &PendingRequest,
        points: &[ControlPoint],
        statuses: &[CommandStatus],
    ) -> FragmentBuilder {
        let mut echo = request.objects().to_vec();
        for (point, status) in points.iter().zip(statuses) {
            if let Some(byte) = echo.get_mut(point.status_offset - REQUEST_HEADER_SIZE) {
                *byte = status.as_u8();
            }
        }
        let mut builder = self.builder();
        if !builder.push_raw(&echo) {
            self.request_iin.insert(Iin::PARAMETER_ERROR);
        }
        builder
    }

    /// Notify the database that a selection is abandoned
    fn notify_select_cancelled(&mut self) {
        if let Some(controls) = self.db.binary_output_controls() {
            controls.cancel_select();
        }
        if let Some(controls) = self.db.analog_output_controls() {
            controls.cancel_select();
        }
    }

    /// Queue the echo of a SELECT or OPERATE; broadcast requests get none
    fn queue_control_response(
        &mut self,
        request: &PendingRequest,
        builder: FragmentBuilder,
    ) -> Option<Bytes> {
        if request.broadcast.is_some() {
            return None;
        }
        Some(self.queue_response(builder, AppControl::single(request.header.seq())))
    }

    /// Drop the pending selection
    pub(crate) fn cancel_select(&mut self) {
        if self.select.is_pending() && !self.select.expired {
            debug!("Session {}: selection cancelled", self.config.source);
            self.notify_select_cancelled();
        }
        self.select.clear();
    }

    /// The select timer fired; a following OPERATE reports a timeout
    pub(crate) fn expire_select(&mut self) {
        if !self.select.is_pending() {
            return;
        }
        debug!("Session {}: selection timed out", self.config.source);
        self.select.expired = true;
        self.notify_select_cancelled();
    }

    pub(crate) fn process_select(&mut self, now: Instant, request: &PendingRequest) -> Reply {
        let seq = request.header.seq();
        let objects = request.objects();

        if self.select.is_pending() && self.select.seq == seq {
            if self.select.objects.as_ref() == Some(&objects) {
                if let Some(response) = self.select.response.clone() {
                    debug!("Session {}: repeated select answered again", self.config.source);
                    return Reply::Replay(response);
                }
            }
            debug!(
                "Session {}: select with sequence {} but different objects discarded",
                self.config.source, seq
            );
            return Reply::Silent;
        }
        self.cancel_select();

        let points = match parse_controls(&request.fragment) {
            Ok(points) => points,
            Err(iin) => {
                self.request_iin.insert(iin);
                return Reply::Respond(self.builder());
            }
        };
        let statuses = self.execute_controls(&points, ControlAction::Select);
        let accepted = statuses.iter().all(|s| s.is_success());
        let builder = self.control_echo(request, &points, &statuses);
        let response = self.queue_control_response(request, builder);

        if accepted {
            self.select.objects = Some(objects);
            self.select.seq = seq;
            self.select.response = response;
            self.select.last_operate = None;
            self.select.expired = false;
            self.select.timer.start(now, self.config.select_timeout);
        } else {
            self.notify_select_cancelled();
        }
        Reply::Queued
    }

    pub(crate) fn process_operate(&mut self, request: &PendingRequest) -> Reply {
        let seq = request.header.seq();
        let objects = request.objects();

        // a repeat can only be recognized once the selection is consumed
        let repeated = self.select.last_operate.as_ref().filter(|record| {
            !self.select.is_pending() && record.seq == seq && record.objects == objects
        });
        if let Some(record) = repeated {
            debug!(
                "Session {}: repeated operate echoed without execution",
                self.config.source
            );
            return Reply::Replay(record.response.clone());
        }

        let points = match parse_controls(&request.fragment) {
            Ok(points) => points,
            Err(iin) => {
                self.cancel_select();
                self.request_iin.insert(iin);
                return Reply::Respond(self.builder());
            }
        };

        let failure = if !self.select.is_pending() {
            Some(CommandStatus::NoSelect)
        } else if self.select.expired {
            Some(CommandStatus::Timeout)
        } else if seq != self.select.seq.next() || self.select.objects.as_ref() != Some(&objects) {
            Some(CommandStatus::NoSelect)
        } else {
            None
        };

        if let Some(status) = failure {
            debug!(
                "Session {}: operate {} rejected with {}",
                self.config.source, seq, status
            );
            self.cancel_select();
            let statuses = vec![status; points.len()];
            return Reply::Respond(self.control_echo(request, &points, &statuses));
        }

        let statuses = self.execute_controls(&points, ControlAction::Operate);
        self.select.clear();
        info!(
            "Session {}: operated {} control point(s)",
            self.config.source,
            points.len()
        );
        let builder = self.control_echo(request, &points, &statuses);
        self.select.last_operate = self
            .queue_control_response(request, builder)
            .map(|response| OperateRecord {
                seq,
                objects,
                response,
            });
        Reply::Queued
    }

    /// DIRECT_OPERATE, answered only when `respond` is set
    pub(crate) fn process_direct_operate(&mut self, request: &PendingRequest, respond: bool) -> Reply {
        let points = match parse_controls(&request.fragment) {
            Ok(points) => points,
            Err(iin) => {
                if !respond {
                    return Reply::Silent;
                }
                self.request_iin.insert(iin);
                return Reply::Respond(self.builder());
            }
        };
        let statuses = self.execute_controls(&points, ControlAction::Operate);
        info!(
            "Session {}: direct operated {} control point(s)",
            self.config.source,
            points.len()
        );
        if respond {
            Reply::Respond(self.control_echo(request, &points, &statuses))
        } else {
            Reply::Silent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::OutstationSession;
    use dnp3_application::CROB_SIZE;
    use dnp3_core::FunctionCode;
    use dnp3_database::{AnalogOutputValue, ControlPoints};
    use mockall::mock;
    use std::time::Duration;

    /// CROB objects with qualifier 0x28, latch on, status zero
    fn crob_objects(indices: &[u16]) -> Vec<u8> {
        let mut objects = vec![12, 1, 0x28];
        objects.extend_from_slice(&(indices.len() as u16).to_le_bytes());
        for index in indices {
            objects.extend_from_slice(&index.to_le_bytes());
            objects.extend_from_slice(&[0x03, 1, 100, 0, 0, 0, 0, 0, 0, 0, 0]);
        }
        objects
    }

    fn crob_request(indices: &[u16]) -> Vec<u8> {
        let mut fragment = vec![0xC3, 0x03];
        fragment.extend(crob_objects(indices));
        fragment
    }

    /// Status byte of the first CROB in an echoed response
    const FIRST_STATUS: usize = 5 + 2 + CROB_SIZE - 1;

    #[test]
    fn test_parse_controls_crob() {
        let fragment = crob_request(&[3, 9]);
        let points = parse_controls(&fragment).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].index, 3);
        assert_eq!(points[1].index, 9);
        assert_eq!(points[0].status_offset, REQUEST_HEADER_SIZE + FIRST_STATUS);
        match points[0].command {
            ControlCommand::Crob(crob) => assert_eq!(crob.on_time, 100),
            ControlCommand::AnalogOutput(_) => panic!("expected a CROB"),
        }
    }

    #[test]
    fn test_parse_controls_analog_output() {
        let fragment = vec![0xC3, 0x03, 41, 2, 0x17, 1, 4, 0x10, 0x00, 0x00];
        let points = parse_controls(&fragment).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].index, 4);
        assert_eq!(points[0].status_offset, 9);
    }

    #[test]
    fn test_parse_controls_rejects_unknown_object() {
        let fragment = vec![0xC3, 0x03, 30, 1, 0x17, 1, 0, 0, 0, 0, 0, 0];
        assert_eq!(parse_controls(&fragment), Err(Iin::OBJECT_UNKNOWN));
    }

    #[test]
    fn test_parse_controls_rejects_truncated_object() {
        let mut fragment = crob_request(&[1]);
        fragment.truncate(fragment.len() - 3);
        assert_eq!(parse_controls(&fragment), Err(Iin::PARAMETER_ERROR));
    }

    #[test]
    fn test_select_then_operate() {
        let (mut session, now) = open_session(config(), database());
        let crobs = crob_objects(&[1]);

        let sent = send(&mut session, now, 1, FunctionCode::Select, &crobs);
        assert_eq!(objects(single_response(&sent)), &crobs[..]);
        assert_eq!(session.database().crob.selects.len(), 1);
        assert!(session.database().crob.operates.is_empty());

        let sent = send(&mut session, now, 2, FunctionCode::Operate, &crobs);
        assert_eq!(objects(single_response(&sent)), &crobs[..]);
        assert_eq!(session.database().crob.operates.len(), 1);
        assert_eq!(session.database().crob.operates[0].0, 1);
    }

    #[test]
    fn test_operate_without_select() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::Operate, &crob_objects(&[1]));
        let response = single_response(&sent);
        assert_eq!(objects(response)[FIRST_STATUS], CommandStatus::NoSelect.as_u8());
        assert!(session.database().crob.operates.is_empty());
    }

    #[test]
    fn test_operate_after_select_timeout() {
        let (mut session, now) = open_session(config(), database());
        let crobs = crob_objects(&[1]);
        send(&mut session, now, 1, FunctionCode::Select, &crobs);
        assert_eq!(session.next_deadline(), Some(now + session.config().select_timeout));

        let later = now + session.config().select_timeout + Duration::from_millis(1);
        session.on_timer(later);
        assert_eq!(session.database().crob.cancels, 1);

        let sent = send(&mut session, later, 2, FunctionCode::Operate, &crobs);
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::Timeout.as_u8()
        );
        assert!(session.database().crob.operates.is_empty());
    }

    #[test]
    fn test_operate_with_wrong_sequence() {
        let (mut session, now) = open_session(config(), database());
        let crobs = crob_objects(&[1]);
        send(&mut session, now, 1, FunctionCode::Select, &crobs);
        let sent = send(&mut session, now, 3, FunctionCode::Operate, &crobs);
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::NoSelect.as_u8()
        );
        assert_eq!(session.database().crob.cancels, 1);
        assert!(session.database().crob.operates.is_empty());
    }

    #[test]
    fn test_operate_with_different_objects() {
        let (mut session, now) = open_session(config(), database());
        send(&mut session, now, 1, FunctionCode::Select, &crob_objects(&[1]));
        let sent = send(&mut session, now, 2, FunctionCode::Operate, &crob_objects(&[2]));
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::NoSelect.as_u8()
        );
        assert!(session.database().crob.operates.is_empty());
    }

    #[test]
    fn test_repeated_operate_executes_once() {
        let (mut session, now) = open_session(config(), database());
        let crobs = crob_objects(&[1]);
        send(&mut session, now, 1, FunctionCode::Select, &crobs);
        let first = send(&mut session, now, 2, FunctionCode::Operate, &crobs);
        let second = send(&mut session, now, 2, FunctionCode::Operate, &crobs);
        assert_eq!(single_response(&first).data, single_response(&second).data);
        assert_eq!(session.database().crob.operates.len(), 1);
    }

    #[test]
    fn test_repeated_select_keeps_timer() {
        let (mut session, now) = open_session(config(), database());
        let crobs = crob_objects(&[1]);
        let first = send(&mut session, now, 1, FunctionCode::Select, &crobs);
        let later = now + Duration::from_secs(1);
        let second = send(&mut session, later, 1, FunctionCode::Select, &crobs);
        assert_eq!(single_response(&first).data, single_response(&second).data);
        assert_eq!(session.database().crob.selects.len(), 1);
        assert_eq!(session.next_deadline(), Some(now + session.config().select_timeout));
    }

    #[test]
    fn test_select_reusing_sequence_with_other_objects_is_discarded() {
        let (mut session, now) = open_session(config(), database());
        send(&mut session, now, 1, FunctionCode::Select, &crob_objects(&[1]));
        let sent = send(&mut session, now, 1, FunctionCode::Select, &crob_objects(&[2]));
        assert!(sent.is_empty());
        assert_eq!(session.database().crob.selects.len(), 1);
    }

    #[test]
    fn test_other_request_cancels_select() {
        let (mut session, now) = open_session(config(), database());
        let crobs = crob_objects(&[1]);
        send(&mut session, now, 1, FunctionCode::Select, &crobs);
        send(&mut session, now, 2, FunctionCode::Read, &[60, 1, 0x06]);
        assert_eq!(session.database().crob.cancels, 1);

        let sent = send(&mut session, now, 2, FunctionCode::Operate, &crobs);
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::NoSelect.as_u8()
        );
    }

    #[test]
    fn test_direct_operate_no_ack_is_silent() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::DirectOperateNoAck, &crob_objects(&[0]));
        assert!(sent.is_empty());
        assert_eq!(session.database().crob.operates.len(), 1);
    }

    #[test]
    fn test_controls_beyond_limit_report_too_many_objects() {
        let mut config = config();
        config.max_controls_per_request = 1;
        let (mut session, now) = open_session(config, database());
        let sent = send(&mut session, now, 1, FunctionCode::DirectOperate, &crob_objects(&[0, 1]));
        let objects = objects(single_response(&sent));
        assert_eq!(objects[FIRST_STATUS], CommandStatus::Success.as_u8());
        assert_eq!(objects[FIRST_STATUS + 2 + CROB_SIZE], CommandStatus::TooManyObjs.as_u8());
        assert_eq!(session.database().crob.operates.len(), 1);
    }

    #[test]
    fn test_unsupported_point_reports_not_supported() {
        let (mut session, now) = open_session(config(), database());
        let sent = send(&mut session, now, 1, FunctionCode::DirectOperate, &crob_objects(&[9]));
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::NotSupported.as_u8()
        );
    }

    #[test]
    fn test_direct_operate_analog_output() {
        let (mut session, now) = open_session(config(), database());
        let request = [41, 2, 0x17, 1, 0, 0x10, 0x00, 0x00];
        let sent = send(&mut session, now, 1, FunctionCode::DirectOperate, &request);
        assert_eq!(objects(single_response(&sent)), &request[..]);
        let (index, command) = session.database().analog_commands.operates[0];
        assert_eq!(index, 0);
        assert_eq!(command.value, AnalogOutputValue::I16(16));
    }

    #[test]
    fn test_malformed_control_request_sets_parameter_error() {
        let (mut session, now) = open_session(config(), database());
        let mut crobs = crob_objects(&[1]);
        crobs.truncate(crobs.len() - 4);
        let sent = send(&mut session, now, 1, FunctionCode::DirectOperate, &crobs);
        let response = single_response(&sent);
        assert!(iin(response).contains(Iin::PARAMETER_ERROR));
        assert!(objects(response).is_empty());
    }

    mock! {
        Crobs {}
        impl ControlPoints<Crob> for Crobs {
            fn supports(&self, index: u16, command: &Crob) -> bool;
            fn select(&mut self, index: u16, command: &Crob) -> CommandStatus;
            fn operate(&mut self, index: u16, command: &Crob) -> CommandStatus;
            fn cancel_select(&mut self);
        }
    }

    struct MockedDatabase {
        crobs: MockCrobs,
    }

    impl Database for MockedDatabase {
        fn binary_output_controls(&mut self) -> Option<&mut dyn ControlPoints<Crob>> {
            Some(&mut self.crobs)
        }
    }

    #[test]
    fn test_select_operate_after_sequence_wrap_executes_again() {
        let (mut session, now) = open_session(config(), database());
        let crobs = crob_objects(&[1]);
        send(&mut session, now, 1, FunctionCode::Select, &crobs);
        send(&mut session, now, 2, FunctionCode::Operate, &crobs);
        for seq in (3..16).chain(0..1) {
            let sent = send(&mut session, now, seq, FunctionCode::Read, &[60, 1, 0x06]);
            single_response(&sent);
        }

        send(&mut session, now, 1, FunctionCode::Select, &crobs);
        let sent = send(&mut session, now, 2, FunctionCode::Operate, &crobs);
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::Success.as_u8()
        );
        assert_eq!(session.database().crob.selects.len(), 2);
        assert_eq!(session.database().crob.operates.len(), 2);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_operate_after_other_request_is_not_echoed() {
        let (mut session, now) = open_session(config(), database());
        let crobs = crob_objects(&[1]);
        send(&mut session, now, 1, FunctionCode::Select, &crobs);
        send(&mut session, now, 2, FunctionCode::Operate, &crobs);
        send(&mut session, now, 3, FunctionCode::DelayMeasure, &[]);

        let sent = send(&mut session, now, 2, FunctionCode::Operate, &crobs);
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::NoSelect.as_u8()
        );
        assert_eq!(session.database().crob.operates.len(), 1);
    }

    #[test]
    fn test_broadcast_select_and_operate_are_not_answered() {
        let mut config = config();
        config.broadcast_functions = config
            .broadcast_functions
            .with(FunctionCode::Select)
            .with(FunctionCode::Operate);
        let (mut session, now) = open_session(config, database());
        let crobs = crob_objects(&[1]);

        session
            .on_fragment(now, MASTER, 0xFFFF, request(1, FunctionCode::Select, &crobs))
            .unwrap();
        assert!(drain(&mut session, now).is_empty());
        session
            .on_fragment(now, MASTER, 0xFFFF, request(2, FunctionCode::Operate, &crobs))
            .unwrap();
        assert!(drain(&mut session, now).is_empty());

        assert_eq!(session.database().crob.selects.len(), 1);
        assert_eq!(session.database().crob.operates.len(), 1);
        assert!(session.iin().contains(Iin::ALL_STATIONS));

        let sent = send(&mut session, now, 3, FunctionCode::Read, &[60, 1, 0x06]);
        assert!(iin(single_response(&sent)).contains(Iin::ALL_STATIONS));
    }

    #[test]
    fn test_rejected_select_is_not_remembered() {
        let mut crobs = MockCrobs::new();
        crobs.expect_supports().returning(|_, _| true);
        crobs
            .expect_select()
            .times(1)
            .returning(|_, _| CommandStatus::HardwareError);
        crobs.expect_cancel_select().returning(|| ());
        crobs.expect_operate().never();

        let now = Instant::now();
        let mut session = OutstationSession::new(config(), MockedDatabase { crobs }).unwrap();
        session.open(now).unwrap();
        drain(&mut session, now);

        let request = crob_objects(&[0]);
        let sent = send(&mut session, now, 1, FunctionCode::Select, &request);
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::HardwareError.as_u8()
        );
        let sent = send(&mut session, now, 2, FunctionCode::Operate, &request);
        assert_eq!(
            objects(single_response(&sent))[FIRST_STATUS],
            CommandStatus::NoSelect.as_u8()
        );
    }
}
