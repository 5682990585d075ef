//! Channel task
//!
//! A channel owns the link layer and every session bound to it. Received
//! fragments, link state changes and application events arrive as messages
//! on one queue, and timers are serviced by the same task, so each session
//! sees its entry points strictly one at a time.

use crate::session::OutstationSession;
use async_trait::async_trait;
use bytes::Bytes;
use dnp3_core::{BroadcastKind, Dnp3Error, Dnp3Result};
use dnp3_database::{Database, Measurement, PointType};
use log::{debug, error, info};
use std::time::Instant;
use tokio::sync::mpsc;

/// Link layer below the application layer
///
/// Implementations frame and send one application fragment per call.
#[async_trait]
pub trait LinkLayer: Send {
    /// Send `fragment` from link address `source` to `destination`
    ///
    /// # Errors
    /// Returns an error if the fragment could not be sent. The session then
    /// treats the fragment as lost.
    async fn transmit(&mut self, source: u16, destination: u16, fragment: Bytes) -> Dnp3Result<()>;
}

/// Message delivered to the channel task
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// An application fragment received by the link layer
    Fragment {
        source: u16,
        destination: u16,
        data: Bytes,
    },
    /// The link came up or went down
    SetOnline(bool),
    /// A measurement changed at the outstation with link address `address`
    Event {
        address: u16,
        point_type: PointType,
        index: u16,
        value: Measurement,
    },
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Capacity of the message queue
    pub queue_depth: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { queue_depth: 64 }
    }
}

/// Sending side of a channel's message queue
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    tx: mpsc::Sender<ChannelEvent>,
}

impl ChannelHandle {
    async fn send(&self, event: ChannelEvent) -> Dnp3Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| Dnp3Error::Channel("Channel task has stopped".to_string()))
    }

    /// Deliver a received fragment
    ///
    /// # Errors
    /// Returns `Dnp3Error::Channel` if the channel task has stopped
    pub async fn fragment(&self, source: u16, destination: u16, data: Bytes) -> Dnp3Result<()> {
        self.send(ChannelEvent::Fragment {
            source,
            destination,
            data,
        })
        .await
    }

    pub async fn set_online(&self, online: bool) -> Dnp3Result<()> {
        self.send(ChannelEvent::SetOnline(online)).await
    }

    /// Queue an event at the outstation with link address `address`
    pub async fn add_event(
        &self,
        address: u16,
        point_type: PointType,
        index: u16,
        value: Measurement,
    ) -> Dnp3Result<()> {
        self.send(ChannelEvent::Event {
            address,
            point_type,
            index,
            value,
        })
        .await
    }

    /// Stop the channel task, closing every session
    pub async fn close(&self) -> Dnp3Result<()> {
        self.send(ChannelEvent::Close).await
    }
}

enum Wake {
    Message(Option<ChannelEvent>),
    Timer,
}

/// Sessions sharing one link layer
pub struct Channel<L: LinkLayer, D: Database> {
    link: L,
    sessions: Vec<OutstationSession<D>>,
    rx: mpsc::Receiver<ChannelEvent>,
}

impl<L: LinkLayer, D: Database> Channel<L, D> {
    /// Create a channel and the handle used to feed it
    pub fn new(config: ChannelConfig, link: L) -> (Self, ChannelHandle) {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        (
            Self {
                link,
                sessions: Vec::new(),
                rx,
            },
            ChannelHandle { tx },
        )
    }

    /// Bind a session to the channel
    ///
    /// # Errors
    /// Returns `Dnp3Error::Config` if a session with the same link address
    /// is already bound
    pub fn add_session(&mut self, session: OutstationSession<D>) -> Dnp3Result<()> {
        if self.sessions.iter().any(|s| s.source() == session.source()) {
            return Err(Dnp3Error::Config(format!(
                "A session with address {} is already bound to the channel",
                session.source()
            )));
        }
        self.sessions.push(session);
        Ok(())
    }

    pub fn sessions(&self) -> &[OutstationSession<D>] {
        &self.sessions
    }

    pub fn session_mut(&mut self, address: u16) -> Option<&mut OutstationSession<D>> {
        self.sessions.iter_mut().find(|s| s.source() == address)
    }

    /// Run until closed, returning the closed sessions
    pub async fn run(mut self) -> Vec<OutstationSession<D>> {
        let now = Instant::now();
        for session in self.sessions.iter_mut().filter(|s| !s.is_open()) {
            if let Err(e) = session.open(now) {
                error!("Failed to open session {}: {}", session.source(), e);
            }
        }

        loop {
            self.flush().await;
            let deadline = self.sessions.iter().filter_map(|s| s.next_deadline()).min();
            let timer = async move {
                match deadline {
                    Some(deadline) => {
                        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
                    }
                    None => std::future::pending::<()>().await,
                }
            };
            let wake = tokio::select! {
                message = self.rx.recv() => Wake::Message(message),
                _ = timer => Wake::Timer,
            };
            match wake {
                Wake::Message(None | Some(ChannelEvent::Close)) => break,
                Wake::Message(Some(event)) => self.handle(event),
                Wake::Timer => {
                    let now = Instant::now();
                    for session in &mut self.sessions {
                        session.on_timer(now);
                    }
                }
            }
        }

        for session in &mut self.sessions {
            session.close();
        }
        info!("Channel closed with {} session(s)", self.sessions.len());
        self.sessions
    }

    fn handle(&mut self, event: ChannelEvent) {
        let now = Instant::now();
        match event {
            ChannelEvent::Fragment {
                source,
                destination,
                data,
            } => {
                let broadcast = BroadcastKind::from_address(destination).is_some();
                let mut delivered = false;
                for session in &mut self.sessions {
                    if !broadcast && session.source() != destination {
                        continue;
                    }
                    delivered = true;
                    if let Err(e) = session.on_fragment(now, source, destination, data.clone()) {
                        debug!("Fragment for session {} rejected: {}", session.source(), e);
                    }
                }
                if !delivered {
                    debug!("No session with address {}, fragment dropped", destination);
                }
            }
            ChannelEvent::SetOnline(online) => {
                for session in &mut self.sessions {
                    session.set_online(now, online);
                }
            }
            ChannelEvent::Event {
                address,
                point_type,
                index,
                value,
            } => match self.session_mut(address) {
                Some(session) => {
                    session.add_event(now, point_type, index, value);
                }
                None => debug!("No session with address {}, event dropped", address),
            },
            ChannelEvent::Close => {}
        }
    }

    /// Hand every queued fragment to the link layer
    async fn flush(&mut self) {
        for session in &mut self.sessions {
            while let Some(fragment) = session.poll_transmit() {
                let kind = fragment.kind;
                let result = self
                    .link
                    .transmit(session.source(), fragment.destination, fragment.data)
                    .await;
                let now = Instant::now();
                match result {
                    Ok(()) => session.on_transmit_complete(now, kind),
                    Err(e) => {
                        error!(
                            "Session {}: link layer failed to send {} fragment: {}",
                            session.source(),
                            kind,
                            e
                        );
                        session.on_transmit_failed(now, kind);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use dnp3_core::Flags;
    use dnp3_database::{Binary, MemoryDatabase};

    struct RecordingLink {
        tx: mpsc::UnboundedSender<(u16, u16, Bytes)>,
    }

    #[async_trait]
    impl LinkLayer for RecordingLink {
        async fn transmit(&mut self, source: u16, destination: u16, fragment: Bytes) -> Dnp3Result<()> {
            self.tx
                .send((source, destination, fragment))
                .map_err(|_| Dnp3Error::Channel("receiver dropped".to_string()))
        }
    }

    fn channel() -> (
        Channel<RecordingLink, MemoryDatabase>,
        ChannelHandle,
        mpsc::UnboundedReceiver<(u16, u16, Bytes)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mut channel, handle) = Channel::new(ChannelConfig::default(), RecordingLink { tx });
        let mut db = MemoryDatabase::new();
        db.binary_inputs.add(Binary::new(true, Flags::ONLINE), dnp3_core::ClassMask::CLASS_1);
        let session = OutstationSession::new(SessionConfig::new(4, 3), db).unwrap();
        channel.add_session(session).unwrap();
        (channel, handle, rx)
    }

    #[tokio::test]
    async fn test_channel_answers_read() {
        let (channel, handle, mut sent) = channel();
        let task = tokio::spawn(channel.run());

        handle
            .fragment(3, 4, Bytes::from_static(&[0xC1, 0x01, 60, 1, 0x06]))
            .await
            .unwrap();
        let (source, destination, data) = sent.recv().await.unwrap();
        assert_eq!((source, destination), (4, 3));
        assert_eq!(data[0] & 0x0F, 1);
        assert_eq!(data[1], 0x81);

        handle.close().await.unwrap();
        let sessions = task.await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(!sessions[0].is_open());
        assert_eq!(sessions[0].statistics().fragments_received, 1);
    }

    #[tokio::test]
    async fn test_channel_drops_fragment_for_unknown_address() {
        let (channel, handle, _sent) = channel();
        let task = tokio::spawn(channel.run());

        handle
            .fragment(3, 9, Bytes::from_static(&[0xC1, 0x01, 60, 1, 0x06]))
            .await
            .unwrap();
        handle.close().await.unwrap();
        let sessions = task.await.unwrap();
        assert_eq!(sessions[0].statistics().fragments_received, 0);
    }

    #[tokio::test]
    async fn test_channel_event_reaches_session() {
        let (channel, handle, _sent) = channel();
        let task = tokio::spawn(channel.run());

        handle
            .add_event(4, PointType::BinaryInput, 0, Binary::new(false, Flags::ONLINE).into())
            .await
            .unwrap();
        handle.close().await.unwrap();
        let sessions = task.await.unwrap();
        assert_eq!(sessions[0].event_count(), 1);
    }

    #[test]
    fn test_duplicate_session_address_rejected() {
        let (mut channel, _handle, _sent) = channel();
        let session = OutstationSession::new(SessionConfig::new(4, 3), MemoryDatabase::new()).unwrap();
        assert!(channel.add_session(session).is_err());
    }
}
