//! DNP3 outstation session engine
//!
//! This crate provides:
//! - The per-session state machine (`OutstationSession`) answering requests,
//!   building multi-fragment read responses and reporting unsolicited events
//! - Select-before-operate and direct operate handling
//! - The confirmation and unsolicited retry logic
//! - A channel task serializing fragments, timers and link results for the
//!   sessions that share one link
//!
//! # Usage Example
//! ```rust,no_run
//! use dnp3_database::MemoryDatabase;
//! use dnp3_outstation::{OutstationSession, SessionConfig};
//! use std::time::Instant;
//!
//! let config = SessionConfig::new(4, 3);
//! let mut session = OutstationSession::new(config, MemoryDatabase::new())?;
//! session.open(Instant::now())?;
//! # Ok::<(), dnp3_core::Dnp3Error>(())
//! ```

pub mod config;
pub mod statistics;
pub mod timer;
pub mod events;
pub mod state;
pub mod session;
mod read;
mod control;
mod requests;
mod confirm;
mod unsolicited;
pub mod channel;
#[cfg(test)]
mod testing;

pub use config::{BroadcastWrites, SessionConfig, UnsolicitedConfig};
pub use statistics::SessionStatistics;
pub use events::{Event, EventBuffer, EventSelector, EventState};
pub use session::{FragmentKind, OutboundFragment, OutstationSession};
pub use channel::{Channel, ChannelConfig, ChannelEvent, ChannelHandle, LinkLayer};
