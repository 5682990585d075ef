//! Session configuration

use dnp3_application::builder::MIN_FRAGMENT_SIZE;
use dnp3_core::{ClassMask, Dnp3Error, Dnp3Result, FunctionCode, FunctionCodeMask};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Write operations permitted in broadcast requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastWrites {
    /// Group 50 variation 1
    pub clock: bool,
    /// Group 50 variation 3
    pub last_recorded_time: bool,
    /// Group 80 variation 1 (clearing the restart bit)
    pub cold_restart_iin: bool,
    /// Any other written object
    pub other: bool,
}

impl Default for BroadcastWrites {
    fn default() -> Self {
        Self {
            clock: true,
            last_recorded_time: true,
            cold_restart_iin: true,
            other: false,
        }
    }
}

/// Unsolicited response policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsolicitedConfig {
    /// Whether the session may send unsolicited responses at all
    pub allowed: bool,
    /// Send a null unsolicited response when the session comes online
    pub send_initial_null: bool,
    /// Classes enabled before the master sends ENABLE_UNSOLICITED
    pub initial_classes: ClassMask,
    /// Per-class event count that triggers a response
    pub max_events: [usize; 3],
    /// Per-class delay after the first pending event before a response
    pub max_delay: [Duration; 3],
    /// Time to wait for the master's confirm
    pub confirm_timeout: Duration,
    /// Retries at `retry_delay` before switching to the offline delay
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Delay between retries once `max_retries` is exhausted, `None` stops retrying
    pub offline_retry_delay: Option<Duration>,
    /// Resend the exact previous fragment instead of regathering events
    pub identical_retry: bool,
}

impl Default for UnsolicitedConfig {
    fn default() -> Self {
        Self {
            allowed: false,
            send_initial_null: true,
            initial_classes: ClassMask::NONE,
            max_events: [5, 5, 5],
            max_delay: [Duration::from_secs(5); 3],
            confirm_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            offline_retry_delay: Some(Duration::from_secs(60)),
            identical_retry: false,
        }
    }
}

/// Configuration of one outstation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Link address of this outstation
    pub source: u16,
    /// Link address of the master
    pub destination: u16,
    /// Discard requests whose source is not `destination`
    pub validate_source_address: bool,
    /// Function codes accepted in unicast requests
    pub enabled_functions: FunctionCodeMask,
    /// Function codes accepted in broadcast requests
    pub broadcast_functions: FunctionCodeMask,
    pub broadcast_writes: BroadcastWrites,
    /// Largest response fragment in bytes
    pub max_fragment_size: usize,
    pub allow_multi_fragment: bool,
    /// Request confirmation of every non-final fragment
    pub multi_fragment_confirm: bool,
    pub select_timeout: Duration,
    /// Time to wait for confirmation of a solicited response
    pub app_confirm_timeout: Duration,
    /// Largest number of controls executed per request
    pub max_controls_per_request: usize,
    /// Event capacity per point type
    pub event_buffer_size: usize,
    /// Period of the database change scan, `None` disables scanning
    pub event_scan_period: Option<Duration>,
    /// Set the need-time indication when the session opens
    pub need_time: bool,
    /// Encode ACTIVATE_CONFIG status with qualifier 0x07 instead of 0x5B
    pub send_obj91_resp_qual7: bool,
    pub unsolicited: UnsolicitedConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source: 4,
            destination: 3,
            validate_source_address: false,
            enabled_functions: FunctionCodeMask::all_supported(),
            broadcast_functions: FunctionCodeMask::broadcast_default(),
            broadcast_writes: BroadcastWrites::default(),
            max_fragment_size: 2048,
            allow_multi_fragment: true,
            multi_fragment_confirm: false,
            select_timeout: Duration::from_secs(5),
            app_confirm_timeout: Duration::from_secs(10),
            max_controls_per_request: 16,
            event_buffer_size: 100,
            event_scan_period: None,
            need_time: false,
            send_obj91_resp_qual7: false,
            unsolicited: UnsolicitedConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(source: u16, destination: u16) -> Self {
        Self {
            source,
            destination,
            ..Self::default()
        }
    }

    pub fn with_unsolicited(mut self, unsolicited: UnsolicitedConfig) -> Self {
        self.unsolicited = unsolicited;
        self
    }

    pub fn with_max_fragment_size(mut self, size: usize) -> Self {
        self.max_fragment_size = size;
        self
    }

    pub fn with_function(mut self, function: FunctionCode, enabled: bool) -> Self {
        self.enabled_functions = if enabled {
            self.enabled_functions.with(function)
        } else {
            self.enabled_functions.without(function)
        };
        self
    }

    /// Check the configuration for values the session cannot work with
    ///
    /// # Errors
    /// Returns `Dnp3Error::Config` describing the first invalid value
    pub fn validate(&self) -> Dnp3Result<()> {
        if self.source >= 0xFFF0 {
            return Err(Dnp3Error::Config(format!(
                "Source address 0x{:04X} is reserved",
                self.source
            )));
        }
        if self.max_fragment_size < MIN_FRAGMENT_SIZE {
            return Err(Dnp3Error::Config(format!(
                "Fragment size {} below minimum {}",
                self.max_fragment_size, MIN_FRAGMENT_SIZE
            )));
        }
        if self.event_buffer_size == 0 {
            return Err(Dnp3Error::Config("Event buffer size must be non-zero".into()));
        }
        if self.max_controls_per_request == 0 {
            return Err(Dnp3Error::Config(
                "At least one control per request must be allowed".into(),
            ));
        }
        if self.select_timeout.is_zero() || self.app_confirm_timeout.is_zero() {
            return Err(Dnp3Error::Config("Timeouts must be non-zero".into()));
        }
        if self.unsolicited.allowed && self.unsolicited.confirm_timeout.is_zero() {
            return Err(Dnp3Error::Config(
                "Unsolicited confirm timeout must be non-zero".into(),
            ));
        }
        if self.unsolicited.max_events.contains(&0) {
            return Err(Dnp3Error::Config(
                "Unsolicited max events must be at least one per class".into(),
            ));
        }
        Ok(())
    }
}
