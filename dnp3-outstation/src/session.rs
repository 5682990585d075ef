//! Outstation session state machine
//!
//! A session is a synchronous, run-to-completion state machine. It is
//! driven by four entry points:
//! - `on_fragment` for every received application fragment
//! - `on_transmit_complete` / `on_transmit_failed` once the link layer has
//!   handled a fragment taken from `poll_transmit`
//! - `on_timer` once the deadline reported by `next_deadline` has passed
//!
//! At most one response fragment is outstanding at a time. A request that
//! arrives while an unsolicited response is in flight is kept in the single
//! request slot and processed when that fragment is released.

use crate::config::SessionConfig;
use crate::events::{Event, EventBuffer, EventState};
use crate::state::{ReadState, SelectState, UnsolicitedState};
use crate::statistics::SessionStatistics;
use crate::timer::{earliest, Timer};
use bytes::Bytes;
use dnp3_application::{
    confirm_fragment, FragmentBuilder, RequestHeader, ResponseHeader, Variation,
};
use dnp3_core::{
    AppControl, BroadcastKind, DnpTime, Dnp3Error, Dnp3Result, FunctionCode, Iin, Sequence,
};
use dnp3_database::{Database, Measurement, PointAccess, PointType};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

/// Kind of an outbound fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Response to a request
    Solicited,
    Unsolicited,
    /// Two byte application confirm
    Confirm,
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solicited => write!(f, "solicited"),
            Self::Unsolicited => write!(f, "unsolicited"),
            Self::Confirm => write!(f, "confirm"),
        }
    }
}

/// A fragment ready for the link layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFragment {
    pub kind: FragmentKind,
    pub destination: u16,
    pub data: Bytes,
}

/// The single response fragment that is queued, in transmission, or
/// awaiting confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InFlight {
    pub kind: FragmentKind,
    pub seq: Sequence,
    /// CON was set, a confirm is expected
    pub confirm: bool,
    pub transmitted: bool,
    /// Carried the all-stations indication
    pub all_stations: bool,
}

/// The last received request
#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub header: RequestHeader,
    pub fragment: Bytes,
    pub broadcast: Option<BroadcastKind>,
    pub received_at: Instant,
}

impl PendingRequest {
    /// Object portion of the request
    pub fn objects(&self) -> Bytes {
        self.fragment.slice(dnp3_application::REQUEST_HEADER_SIZE..)
    }
}

/// What a request handler wants sent back
#[derive(Debug)]
pub(crate) enum Reply {
    /// Send the builder as a single-fragment response
    Respond(FragmentBuilder),
    /// Send previously built response bytes again
    Replay(Bytes),
    /// No response
    Silent,
    /// The handler queued its own fragment
    Queued,
}

/// One outstation endpoint bound to a channel
///
/// The session is a synchronous state machine. Every entry point takes the
/// current time, and outbound fragments collect in an outbox that the owner
/// drains with `poll_transmit`, reporting each result back through
/// `on_transmit_complete` or `on_transmit_failed`.
///
/// # Outstanding Fragments
/// At most one response, solicited or unsolicited, is in flight at a time.
/// A request that arrives while one is outstanding is held and processed
/// once that fragment is released by transmission, confirmation or timeout.
///
/// # Type Parameters
/// * `D` - The point database the session serves
///
/// # Usage
/// ```rust,ignore
/// let mut session = OutstationSession::new(SessionConfig::new(4, 3), db)?;
/// session.open(now)?;
/// session.on_fragment(now, master, 4, fragment)?;
/// while let Some(fragment) = session.poll_transmit() {
///     link.send(fragment.destination, &fragment.data);
///     session.on_transmit_complete(now, fragment.kind);
/// }
/// ```
pub struct OutstationSession<D: Database> {
    pub(crate) config: SessionConfig,
    pub(crate) db: D,
    pub(crate) is_open: bool,
    pub(crate) online: bool,
    /// Address responses are sent to
    pub(crate) master: u16,
    /// Latched device and session indications
    pub(crate) iin: Iin,
    /// Indications produced by the request being answered
    pub(crate) request_iin: Iin,
    pub(crate) events: EventBuffer,
    pub(crate) read: ReadState,
    pub(crate) select: SelectState,
    pub(crate) unsol: UnsolicitedState,
    pub(crate) stats: SessionStatistics,
    pub(crate) request: Option<PendingRequest>,
    /// The request in `request` waits for the outstanding fragment
    pub(crate) deferred: bool,
    pub(crate) current: Option<InFlight>,
    pub(crate) outbox: VecDeque<OutboundFragment>,
    /// Last non-read request and its response, for duplicate replay
    pub(crate) last_exchange: Option<(Bytes, Bytes)>,
    pub(crate) response_seq: Sequence,
    pub(crate) confirm_timer: Timer,
    pub(crate) scan_timer: Timer,
    /// Time latched by RECORD_CURRENT_TIME
    pub(crate) recorded_time: Option<Instant>,
    /// A broadcast to the shall-confirm address is awaiting its confirm
    pub(crate) all_stations_confirm: bool,
}

impl<D: Database> fmt::Debug for OutstationSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutstationSession")
            .field("source", &self.config.source)
            .field("is_open", &self.is_open)
            .field("online", &self.online)
            .field("iin", &self.iin)
            .field("current", &self.current)
            .finish()
    }
}

impl<D: Database> OutstationSession<D> {
    /// Create a closed session
    ///
    /// # Errors
    /// Returns `Dnp3Error::Config` if the configuration is invalid
    pub fn new(config: SessionConfig, db: D) -> Dnp3Result<Self> {
        config.validate()?;
        Ok(Self {
            master: config.destination,
            events: EventBuffer::new(config.event_buffer_size),
            config,
            db,
            is_open: false,
            online: false,
            iin: Iin::empty(),
            request_iin: Iin::empty(),
            read: ReadState::default(),
            select: SelectState::default(),
            unsol: UnsolicitedState::default(),
            stats: SessionStatistics::new(),
            request: None,
            deferred: false,
            current: None,
            outbox: VecDeque::new(),
            last_exchange: None,
            response_seq: Sequence::default(),
            confirm_timer: Timer::new(),
            scan_timer: Timer::new(),
            recorded_time: None,
            all_stations_confirm: false,
        })
    }

    /// Open the session
    ///
    /// Opens the database, sets the restart indication, arms the scan timer
    /// and queues the initial null unsolicited response when configured.
    ///
    /// # Errors
    /// Returns an error if the session is already open or the database
    /// fails to open
    pub fn open(&mut self, now: Instant) -> Dnp3Result<()> {
        if self.is_open {
            return Err(Dnp3Error::Protocol(format!(
                "Session {} is already open",
                self.config.source
            )));
        }
        self.db.open()?;
        self.is_open = true;
        self.online = true;
        self.iin.insert(Iin::DEVICE_RESTART);
        if self.config.need_time {
            self.iin.insert(Iin::NEED_TIME);
        }
        if let Some(period) = self.config.event_scan_period {
            self.scan_timer.start(now, period);
        }
        self.unsol.enabled = self.config.unsolicited.initial_classes;
        self.restart_unsolicited();
        info!(
            "Outstation session {} opened (master {})",
            self.config.source, self.config.destination
        );
        self.process_next(now);
        Ok(())
    }

    /// Close the session, dropping queued fragments and cancelling timers
    pub fn close(&mut self) {
        if !self.is_open {
            return;
        }
        self.outbox.clear();
        self.current = None;
        self.abort_read();
        self.cancel_select();
        self.confirm_timer.cancel();
        self.scan_timer.cancel();
        self.stop_unsolicited();
        self.request = None;
        self.deferred = false;
        self.db.close();
        self.is_open = false;
        self.online = false;
        info!("Outstation session {} closed", self.config.source);
    }

    /// Report a change of the link state
    ///
    /// Coming online restarts the unsolicited sequence with a new null
    /// response. Going offline drops any unsolicited fragment in flight.
    pub fn set_online(&mut self, now: Instant, online: bool) {
        if !self.is_open || self.online == online {
            return;
        }
        self.online = online;
        if online {
            info!("Outstation session {} online", self.config.source);
            self.restart_unsolicited();
            self.process_next(now);
        } else {
            info!("Outstation session {} offline", self.config.source);
            self.stop_unsolicited();
        }
    }

    /// Process one received application fragment
    ///
    /// # Arguments
    /// * `now` - Time of reception
    /// * `source` - Link address of the sender
    /// * `destination` - Link address the fragment was sent to
    /// * `fragment` - Application header and object data
    ///
    /// # Errors
    /// Returns `Dnp3Error::Channel` if the session is closed. Malformed
    /// fragments are discarded and do not produce an error.
    pub fn on_fragment(
        &mut self,
        now: Instant,
        source: u16,
        destination: u16,
        fragment: Bytes,
    ) -> Dnp3Result<()> {
        if !self.is_open {
            return Err(Dnp3Error::Channel(format!(
                "Session {} is closed",
                self.config.source
            )));
        }
        self.stats.increment_fragments_received();

        let broadcast = BroadcastKind::from_address(destination);
        if broadcast.is_none() && destination != self.config.source {
            debug!(
                "Session {}: fragment for address {} ignored",
                self.config.source, destination
            );
            self.stats.increment_requests_discarded();
            return Ok(());
        }
        if self.config.validate_source_address && source != self.config.destination {
            debug!(
                "Session {}: fragment from unexpected source {} discarded",
                self.config.source, source
            );
            self.stats.increment_requests_discarded();
            return Ok(());
        }
        let header = match RequestHeader::parse(&fragment) {
            Ok(header) => header,
            Err(e) => {
                debug!("Session {}: {}", self.config.source, e);
                self.stats.increment_requests_discarded();
                return Ok(());
            }
        };
        if !header.control.fir || !header.control.fin {
            debug!(
                "Session {}: multi-fragment request {} discarded",
                self.config.source, header
            );
            self.stats.increment_requests_discarded();
            return Ok(());
        }

        if header.function_code() == Some(FunctionCode::Confirm) {
            self.process_confirm(header);
            self.process_next(now);
            return Ok(());
        }

        if broadcast.is_none() {
            self.master = source;
            if header.control.con {
                self.outbox.push_back(OutboundFragment {
                    kind: FragmentKind::Confirm,
                    destination: source,
                    data: confirm_fragment(header.seq(), false),
                });
            }
        }

        self.abort_read();
        if self.current.is_some_and(|f| f.kind == FragmentKind::Solicited) {
            self.cancel_solicited();
        }

        let function = header.function_code();
        if self.select.is_pending()
            && !matches!(function, Some(FunctionCode::Select | FunctionCode::Operate))
        {
            self.cancel_select();
        }
        if function != Some(FunctionCode::Operate) {
            self.select.last_operate = None;
        }

        self.request = Some(PendingRequest {
            header,
            fragment,
            broadcast,
            received_at: now,
        });

        if self.current.is_some() {
            debug!(
                "Session {}: request {} deferred until the outstanding fragment is released",
                self.config.source, header
            );
            self.deferred = true;
            return Ok(());
        }
        self.process_request(now);
        Ok(())
    }

    /// Take the next fragment to hand to the link layer
    pub fn poll_transmit(&mut self) -> Option<OutboundFragment> {
        let fragment = self.outbox.pop_front()?;
        self.stats.increment_fragments_sent();
        Some(fragment)
    }

    /// The link layer finished sending a fragment of `kind`
    pub fn on_transmit_complete(&mut self, now: Instant, kind: FragmentKind) {
        if kind == FragmentKind::Confirm || !self.is_open {
            return;
        }
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if current.kind != kind || current.transmitted {
            return;
        }
        current.transmitted = true;
        let current = *current;

        if current.all_stations && !self.all_stations_confirm {
            self.iin.remove(Iin::ALL_STATIONS);
        }
        match kind {
            FragmentKind::Solicited => {
                if current.confirm {
                    self.confirm_timer.start(now, self.config.app_confirm_timeout);
                } else {
                    self.current = None;
                }
            }
            FragmentKind::Unsolicited => {
                self.unsol
                    .confirm_timer
                    .start(now, self.config.unsolicited.confirm_timeout);
            }
            FragmentKind::Confirm => {}
        }
        self.process_next(now);
    }

    /// The link layer failed to send a fragment of `kind`
    pub fn on_transmit_failed(&mut self, now: Instant, kind: FragmentKind) {
        if !self.is_open {
            return;
        }
        self.stats.increment_transmit_failures();
        warn!(
            "Session {}: transmission of {} fragment failed",
            self.config.source, kind
        );
        match kind {
            FragmentKind::Confirm => return,
            FragmentKind::Solicited => {
                if self.current.is_some_and(|f| f.kind == FragmentKind::Solicited) {
                    self.current = None;
                    self.confirm_timer.cancel();
                    self.abort_read();
                }
            }
            FragmentKind::Unsolicited => {
                if self.current.is_some_and(|f| f.kind == FragmentKind::Unsolicited) {
                    self.unsolicited_failed(now);
                }
            }
        }
        self.process_next(now);
    }

    /// Handle every timer whose deadline has passed
    pub fn on_timer(&mut self, now: Instant) {
        if !self.is_open {
            return;
        }
        if self.select.timer.take_expired(now) {
            self.expire_select();
        }
        if self.confirm_timer.take_expired(now) {
            self.solicited_confirm_timeout();
        }
        if self.unsol.confirm_timer.take_expired(now) {
            self.stats.increment_confirm_timeouts();
            warn!(
                "Session {}: unsolicited response {} not confirmed",
                self.config.source, self.unsol.seq
            );
            self.unsolicited_failed(now);
        }
        self.unsol.retry_timer.take_expired(now);
        for class in 0..3 {
            if self.unsol.class_timers[class].take_expired(now) {
                self.unsol.class_due[class] = true;
            }
        }
        if self.scan_timer.take_expired(now) {
            self.scan_changes(now);
            if let Some(period) = self.config.event_scan_period {
                self.scan_timer.start(now, period);
            }
        }
        self.process_next(now);
    }

    /// Earliest armed deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.is_open {
            return None;
        }
        let mut deadlines = vec![
            self.select.timer.deadline(),
            self.confirm_timer.deadline(),
            self.unsol.confirm_timer.deadline(),
            self.unsol.retry_timer.deadline(),
            self.scan_timer.deadline(),
        ];
        deadlines.extend(self.unsol.class_timers.iter().map(|t| t.deadline()));
        earliest(deadlines)
    }

    /// Queue an event for a point
    ///
    /// The event class and default variation come from the database. Values
    /// without a timestamp are stamped with the current time.
    ///
    /// # Returns
    /// `false` if the point is not assigned to an event class
    pub fn add_event(
        &mut self,
        now: Instant,
        point_type: PointType,
        index: u16,
        mut value: Measurement,
    ) -> bool {
        let Some(class) = self.db.point_class(point_type, index).event_class() else {
            return false;
        };
        let configured = self.db.event_variation(point_type, index, class);
        let Some(variation) = Variation::resolve_event(point_type, configured)
            .or_else(|| Variation::resolve_event(point_type, 0))
        else {
            return false;
        };
        value.stamp(DnpTime::now());
        let dropped = self.events.push(Event {
            point_type,
            index,
            class,
            value,
            variation,
            state: EventState::Unsent,
        });
        if dropped {
            warn!(
                "Session {}: event buffer overflow, oldest {} event dropped",
                self.config.source, point_type
            );
            self.stats.increment_events_dropped();
        }
        let slot = class.slot();
        if self.config.unsolicited.allowed && !self.unsol.class_timers[slot].is_running() {
            self.unsol.class_timers[slot].start(now, self.config.unsolicited.max_delay[slot]);
        }
        if self.is_open {
            self.process_next(now);
        }
        true
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut D {
        &mut self.db
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.stats
    }

    /// Indications as they would appear in the next response
    pub fn iin(&self) -> Iin {
        self.iin | self.db.iin() | self.events.iin()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn source(&self) -> u16 {
        self.config.source
    }

    /// Number of buffered events
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Run the next piece of queued work if nothing is outstanding
    pub(crate) fn process_next(&mut self, now: Instant) {
        if !self.is_open || self.current.is_some() {
            return;
        }
        if self.read.active {
            self.continue_read();
            return;
        }
        if self.deferred {
            self.process_request(now);
            if self.current.is_some() {
                return;
            }
        }
        self.try_unsolicited();
    }

    /// Process the request held in the request slot
    pub(crate) fn process_request(&mut self, now: Instant) {
        let Some(request) = self.request.clone() else {
            return;
        };
        self.deferred = false;
        self.request_iin = Iin::empty();
        let header = request.header;

        let Some(function) = header.function_code() else {
            debug!(
                "Session {}: unknown function code 0x{:02X}",
                self.config.source, header.function
            );
            if request.broadcast.is_none() {
                self.request_iin.insert(Iin::NO_FUNC_CODE_SUPPORT);
                self.respond_null(header.seq());
            }
            return;
        };

        if let Some(kind) = request.broadcast {
            self.process_broadcast(now, &request, function, kind);
            return;
        }

        if !self.config.enabled_functions.contains(function) {
            debug!(
                "Session {}: function code {} disabled",
                self.config.source, function
            );
            self.request_iin.insert(Iin::NO_FUNC_CODE_SUPPORT);
            self.respond_null(header.seq());
            return;
        }

        if self.replay_duplicate(&request, function) {
            return;
        }

        self.db.func_code(function, true);
        let reply = self.dispatch(now, &request, function);
        self.db.func_code(function, false);

        match reply {
            Reply::Respond(builder) => {
                let control = AppControl::single(header.seq());
                let response = self.queue_response(builder, control);
                self.last_exchange = Some((request.fragment.clone(), response));
            }
            Reply::Replay(response) => self.queue_replay(response),
            Reply::Silent => {}
            Reply::Queued => self.last_exchange = None,
        }
    }

    fn process_broadcast(
        &mut self,
        now: Instant,
        request: &PendingRequest,
        function: FunctionCode,
        kind: BroadcastKind,
    ) {
        let permitted = self.config.broadcast_functions.contains(function)
            && function != FunctionCode::Read
            && (function != FunctionCode::Write || self.broadcast_write_permitted(&request.fragment));
        if !permitted {
            debug!(
                "Session {}: disabled function code {} in broadcast request discarded",
                self.config.source, function
            );
            self.stats.increment_requests_discarded();
            return;
        }
        self.iin.insert(Iin::ALL_STATIONS);
        if kind.requires_confirm() {
            self.all_stations_confirm = true;
        }
        self.db.func_code(function, true);
        // broadcasts are never answered
        let _ = self.dispatch(now, request, function);
        self.db.func_code(function, false);
        debug!(
            "Session {}: broadcast {} processed",
            self.config.source, function
        );
    }

    fn dispatch(&mut self, now: Instant, request: &PendingRequest, function: FunctionCode) -> Reply {
        match function {
            FunctionCode::Read => {
                self.start_read();
                Reply::Queued
            }
            FunctionCode::Write => self.process_write(request),
            FunctionCode::Select => self.process_select(now, request),
            FunctionCode::Operate => self.process_operate(request),
            FunctionCode::DirectOperate => self.process_direct_operate(request, true),
            FunctionCode::DirectOperateNoAck => self.process_direct_operate(request, false),
            FunctionCode::ImmediateFreeze
            | FunctionCode::ImmediateFreezeNoAck
            | FunctionCode::FreezeClear
            | FunctionCode::FreezeClearNoAck => self.process_freeze(request, function),
            FunctionCode::ColdRestart | FunctionCode::WarmRestart => {
                self.process_restart(function)
            }
            FunctionCode::EnableUnsolicited => self.process_unsolicited_enable(request, true),
            FunctionCode::DisableUnsolicited => self.process_unsolicited_enable(request, false),
            FunctionCode::AssignClass => self.process_assign_class(request),
            FunctionCode::DelayMeasure => self.process_delay_measure(now, request),
            FunctionCode::RecordCurrentTime => {
                self.recorded_time = Some(request.received_at);
                Reply::Respond(self.builder())
            }
            FunctionCode::ActivateConfig => self.process_activate_config(request),
            _ => {
                self.request_iin.insert(Iin::NO_FUNC_CODE_SUPPORT);
                Reply::Respond(self.builder())
            }
        }
    }

    /// Answer a byte-identical repeat of the previous request with the
    /// previous response
    fn replay_duplicate(&mut self, request: &PendingRequest, function: FunctionCode) -> bool {
        if matches!(
            function,
            FunctionCode::Read | FunctionCode::Select | FunctionCode::Operate
        ) || function.is_no_ack()
        {
            return false;
        }
        let response = match &self.last_exchange {
            Some((previous, response)) if *previous == request.fragment => response.clone(),
            _ => return false,
        };
        debug!(
            "Session {}: duplicate {} request, previous response replayed",
            self.config.source, function
        );
        self.stats.increment_duplicates_replayed();
        self.queue_replay(response);
        true
    }

    /// Empty builder sized for this session
    pub(crate) fn builder(&self) -> FragmentBuilder {
        FragmentBuilder::new(self.config.max_fragment_size)
    }

    /// Indications for the response being built
    pub(crate) fn response_iin(&self) -> Iin {
        self.iin | self.request_iin | self.db.iin() | self.events.iin()
    }

    /// Finish a solicited response and queue it as the outstanding fragment
    pub(crate) fn queue_response(&mut self, builder: FragmentBuilder, control: AppControl) -> Bytes {
        let all_stations = self.iin.contains(Iin::ALL_STATIONS);
        let mut control = control;
        if all_stations && self.all_stations_confirm {
            control.con = true;
        }
        let iin = self.response_iin();
        let data = builder.finish(ResponseHeader::new(control, FunctionCode::Response, iin));
        self.response_seq = control.seq;
        self.current = Some(InFlight {
            kind: FragmentKind::Solicited,
            seq: control.seq,
            confirm: control.con,
            transmitted: false,
            all_stations,
        });
        self.outbox.push_back(OutboundFragment {
            kind: FragmentKind::Solicited,
            destination: self.master,
            data: data.clone(),
        });
        data
    }

    /// Queue previously built response bytes as the outstanding fragment
    pub(crate) fn queue_replay(&mut self, data: Bytes) {
        let control = AppControl::from_byte(data.first().copied().unwrap_or_default());
        self.response_seq = control.seq;
        self.current = Some(InFlight {
            kind: FragmentKind::Solicited,
            seq: control.seq,
            confirm: control.con,
            transmitted: false,
            all_stations: false,
        });
        self.outbox.push_back(OutboundFragment {
            kind: FragmentKind::Solicited,
            destination: self.master,
            data,
        });
    }

    /// Null response carrying only the header
    pub(crate) fn respond_null(&mut self, seq: Sequence) {
        let builder = self.builder();
        self.queue_response(builder, AppControl::single(seq));
    }

    /// Drop a solicited fragment that is queued or awaiting its confirm
    fn cancel_solicited(&mut self) {
        if self.current.is_some_and(|f| f.kind == FragmentKind::Solicited) {
            self.current = None;
            self.outbox.retain(|f| f.kind != FragmentKind::Solicited);
            self.confirm_timer.cancel();
            self.events.revert(EventState::SentSolicited);
        }
    }

    fn solicited_confirm_timeout(&mut self) {
        if !self.current.is_some_and(|f| f.kind == FragmentKind::Solicited) {
            return;
        }
        self.stats.increment_confirm_timeouts();
        warn!(
            "Session {}: response {} not confirmed",
            self.config.source, self.response_seq
        );
        self.current = None;
        self.abort_read();
        self.events.revert(EventState::SentSolicited);
    }

    /// Poll the database for changed points and queue their events
    fn scan_changes(&mut self, now: Instant) {
        for point_type in PointType::STATIC_ORDER {
            let quantity = self.db.quantity(point_type);
            for index in 0..quantity {
                if let Some(value) = self.db.changed_point(point_type, index) {
                    self.add_event(now, point_type, index, value);
                }
            }
        }
    }
}
