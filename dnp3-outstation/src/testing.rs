//! Helpers shared by the session tests

use crate::config::SessionConfig;
use crate::session::{FragmentKind, OutboundFragment, OutstationSession};
use bytes::Bytes;
use dnp3_core::{AppControl, ClassMask, Flags, FunctionCode, Iin};
use dnp3_database::{
    Analog, Binary, ControlRecorder, Counter, Database, FrozenCounter, MemoryDatabase,
};
use std::time::Instant;

pub(crate) const MASTER: u16 = 3;
pub(crate) const OUTSTATION: u16 = 4;

/// Three binary inputs in class 1, two counters in class 2 and two analog
/// inputs in class 3, with four controllable binary outputs
pub(crate) fn database() -> MemoryDatabase {
    let mut db = MemoryDatabase::new();
    for state in [true, false, true] {
        db.binary_inputs.add(Binary::new(state, Flags::ONLINE), ClassMask::CLASS_1);
    }
    for value in [10, 20] {
        db.counters.add(Counter::new(value, Flags::ONLINE), ClassMask::CLASS_2);
        db.frozen_counters.add(FrozenCounter::new(0, Flags::ONLINE), ClassMask::NONE);
    }
    for value in [1.5, -2.0] {
        db.analog_inputs.add(Analog::new(value, Flags::ONLINE), ClassMask::CLASS_3);
    }
    db.crob = ControlRecorder::new(4);
    db.analog_commands = ControlRecorder::new(4);
    db
}

/// An open session with the restart indication already cleared
pub(crate) fn open_session(
    config: SessionConfig,
    db: MemoryDatabase,
) -> (OutstationSession<MemoryDatabase>, Instant) {
    let now = Instant::now();
    let mut session = OutstationSession::new(config, db).unwrap();
    tokio_test::assert_ok!(session.open(now));
    session.iin.remove(Iin::DEVICE_RESTART);
    (session, now)
}

pub(crate) fn config() -> SessionConfig {
    SessionConfig::new(OUTSTATION, MASTER)
}

pub(crate) fn request(seq: u8, function: FunctionCode, objects: &[u8]) -> Bytes {
    let mut fragment = vec![0xC0 | (seq & 0x0F), function.as_u8()];
    fragment.extend_from_slice(objects);
    Bytes::from(fragment)
}

/// Hand every queued fragment to a link layer that always succeeds
pub(crate) fn drain<D: Database>(session: &mut OutstationSession<D>, now: Instant) -> Vec<OutboundFragment> {
    let mut sent = Vec::new();
    while let Some(fragment) = session.poll_transmit() {
        session.on_transmit_complete(now, fragment.kind);
        sent.push(fragment);
    }
    sent
}

/// Deliver a request and collect every fragment it produced
pub(crate) fn send<D: Database>(
    session: &mut OutstationSession<D>,
    now: Instant,
    seq: u8,
    function: FunctionCode,
    objects: &[u8],
) -> Vec<OutboundFragment> {
    session
        .on_fragment(now, MASTER, OUTSTATION, request(seq, function, objects))
        .unwrap();
    drain(session, now)
}

/// Deliver an application confirm
pub(crate) fn confirm<D: Database>(
    session: &mut OutstationSession<D>,
    now: Instant,
    seq: u8,
    unsolicited: bool,
) -> Vec<OutboundFragment> {
    let control = if unsolicited { 0xD0 } else { 0xC0 };
    let fragment = Bytes::from(vec![control | (seq & 0x0F), 0x00]);
    session.on_fragment(now, MASTER, OUTSTATION, fragment).unwrap();
    drain(session, now)
}

/// The only solicited response among `fragments`
pub(crate) fn single_response(fragments: &[OutboundFragment]) -> &OutboundFragment {
    let responses: Vec<_> = fragments
        .iter()
        .filter(|f| f.kind == FragmentKind::Solicited)
        .collect();
    assert_eq!(responses.len(), 1, "expected one response, got {:?}", fragments);
    responses[0]
}

pub(crate) fn control(fragment: &OutboundFragment) -> AppControl {
    AppControl::from_byte(fragment.data[0])
}

pub(crate) fn iin(fragment: &OutboundFragment) -> Iin {
    Iin::from_bytes([fragment.data[2], fragment.data[3]])
}

pub(crate) fn objects(fragment: &OutboundFragment) -> &[u8] {
    &fragment.data[4..]
}
