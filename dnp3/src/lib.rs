//! DNP3 outstation
//!
//! This library implements the application-layer behavior of a DNP3
//! outstation: answering a master's requests from a point database,
//! select-before-operate control, event buffering and unsolicited
//! reporting with confirmation and retries.
//!
//! # Architecture
//!
//! The library is organized as a workspace with multiple crates:
//!
//! - `dnp3-core`: Core types, error handling, IIN bits and function codes
//! - `dnp3-database`: The database callback contract and an in-memory backend
//! - `dnp3-application`: Object headers, variation tables and the fragment builder
//! - `dnp3-outstation`: Session state machine and channel task
//!
//! The link and transport layers are not part of this library. A link
//! layer is plugged in through [`outstation::LinkLayer`].
//!
//! # Usage
//!
//! ```no_run
//! use dnp3::database::MemoryDatabase;
//! use dnp3::outstation::{Channel, ChannelConfig, LinkLayer, OutstationSession, SessionConfig};
//!
//! async fn serve<L: LinkLayer + 'static>(link: L) -> dnp3::Dnp3Result<()> {
//!     let (mut channel, handle) = Channel::new(ChannelConfig::default(), link);
//!     let session = OutstationSession::new(SessionConfig::new(4, 3), MemoryDatabase::new())?;
//!     channel.add_session(session)?;
//!     let task = tokio::spawn(channel.run());
//!     handle.set_online(true).await?;
//!     handle.close().await?;
//!     let _ = task.await;
//!     Ok(())
//! }
//! ```

// Re-export core types
pub use dnp3_core::{
    AppControl, BroadcastKind, ClassMask, CommandStatus, Dnp3Error, Dnp3Result, DnpTime,
    EventClass, Flags, FunctionCode, FunctionCodeMask, Iin, QualifierCode, Sequence,
};

// Re-export the database contract
pub mod database {
    pub use dnp3_database::*;
}

// Re-export application layer encoding
pub mod application {
    pub use dnp3_application::*;
}

// Re-export the outstation API
pub mod outstation {
    pub use dnp3_outstation::*;
}
