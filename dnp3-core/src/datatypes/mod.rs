//! Data types shared by point values and objects

pub mod time;
pub mod flags;

pub use time::DnpTime;
pub use flags::Flags;
