//! Application layer function codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// DNP3 application layer function code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    Confirm = 0,
    Read = 1,
    Write = 2,
    Select = 3,
    Operate = 4,
    DirectOperate = 5,
    DirectOperateNoAck = 6,
    ImmediateFreeze = 7,
    ImmediateFreezeNoAck = 8,
    FreezeClear = 9,
    FreezeClearNoAck = 10,
    FreezeAtTime = 11,
    FreezeAtTimeNoAck = 12,
    ColdRestart = 13,
    WarmRestart = 14,
    InitializeData = 15,
    InitializeApplication = 16,
    StartApplication = 17,
    StopApplication = 18,
    SaveConfiguration = 19,
    EnableUnsolicited = 20,
    DisableUnsolicited = 21,
    AssignClass = 22,
    DelayMeasure = 23,
    RecordCurrentTime = 24,
    OpenFile = 25,
    CloseFile = 26,
    DeleteFile = 27,
    GetFileInfo = 28,
    AuthenticateFile = 29,
    AbortFile = 30,
    ActivateConfig = 31,
    AuthRequest = 32,
    AuthRequestNoAck = 33,
    Response = 129,
    UnsolicitedResponse = 130,
    AuthResponse = 131,
}

impl FunctionCode {
    /// Decode a function code byte
    ///
    /// # Returns
    /// `None` for codes not defined by the protocol
    pub fn from_u8(value: u8) -> Option<Self> {
        use FunctionCode::*;
        let code = match value {
            0 => Confirm,
            1 => Read,
            2 => Write,
            3 => Select,
            4 => Operate,
            5 => DirectOperate,
            6 => DirectOperateNoAck,
            7 => ImmediateFreeze,
            8 => ImmediateFreezeNoAck,
            9 => FreezeClear,
            10 => FreezeClearNoAck,
            11 => FreezeAtTime,
            12 => FreezeAtTimeNoAck,
            13 => ColdRestart,
            14 => WarmRestart,
            15 => InitializeData,
            16 => InitializeApplication,
            17 => StartApplication,
            18 => StopApplication,
            19 => SaveConfiguration,
            20 => EnableUnsolicited,
            21 => DisableUnsolicited,
            22 => AssignClass,
            23 => DelayMeasure,
            24 => RecordCurrentTime,
            25 => OpenFile,
            26 => CloseFile,
            27 => DeleteFile,
            28 => GetFileInfo,
            29 => AuthenticateFile,
            30 => AbortFile,
            31 => ActivateConfig,
            32 => AuthRequest,
            33 => AuthRequestNoAck,
            129 => Response,
            130 => UnsolicitedResponse,
            131 => AuthResponse,
            _ => return None,
        };
        Some(code)
    }

    /// Raw function code byte
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Function codes that never produce a response
    pub const fn is_no_ack(self) -> bool {
        matches!(
            self,
            Self::DirectOperateNoAck
                | Self::ImmediateFreezeNoAck
                | Self::FreezeClearNoAck
                | Self::FreezeAtTimeNoAck
                | Self::AuthRequestNoAck
        )
    }

    /// Human-readable name
    pub const fn as_str(self) -> &'static str {
        use FunctionCode::*;
        match self {
            Confirm => "CONFIRM",
            Read => "READ",
            Write => "WRITE",
            Select => "SELECT",
            Operate => "OPERATE",
            DirectOperate => "DIRECT_OPERATE",
            DirectOperateNoAck => "DIRECT_OPERATE_NR",
            ImmediateFreeze => "IMMED_FREEZE",
            ImmediateFreezeNoAck => "IMMED_FREEZE_NR",
            FreezeClear => "FREEZE_CLEAR",
            FreezeClearNoAck => "FREEZE_CLEAR_NR",
            FreezeAtTime => "FREEZE_AT_TIME",
            FreezeAtTimeNoAck => "FREEZE_AT_TIME_NR",
            ColdRestart => "COLD_RESTART",
            WarmRestart => "WARM_RESTART",
            InitializeData => "INITIALIZE_DATA",
            InitializeApplication => "INITIALIZE_APPL",
            StartApplication => "START_APPL",
            StopApplication => "STOP_APPL",
            SaveConfiguration => "SAVE_CONFIG",
            EnableUnsolicited => "ENABLE_UNSOLICITED",
            DisableUnsolicited => "DISABLE_UNSOLICITED",
            AssignClass => "ASSIGN_CLASS",
            DelayMeasure => "DELAY_MEASURE",
            RecordCurrentTime => "RECORD_CURRENT_TIME",
            OpenFile => "OPEN_FILE",
            CloseFile => "CLOSE_FILE",
            DeleteFile => "DELETE_FILE",
            GetFileInfo => "GET_FILE_INFO",
            AuthenticateFile => "AUTHENTICATE_FILE",
            AbortFile => "ABORT_FILE",
            ActivateConfig => "ACTIVATE_CONFIG",
            AuthRequest => "AUTH_REQUEST",
            AuthRequestNoAck => "AUTH_REQUEST_NR",
            Response => "RESPONSE",
            UnsolicitedResponse => "UNSOLICITED_RESPONSE",
            AuthResponse => "AUTH_RESPONSE",
        }
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bit mask of request function codes (0-63)
///
/// Used for the globally enabled set and the broadcast-enabled set of a
/// session. Codes above 63 are never requests and are never enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionCodeMask(u64);

impl FunctionCodeMask {
    /// Mask with no function codes enabled
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mask containing the given function codes
    pub fn from_codes(codes: &[FunctionCode]) -> Self {
        codes.iter().fold(Self::empty(), |mask, code| mask.with(*code))
    }

    /// Every request function code handled by the outstation core
    pub fn all_supported() -> Self {
        use FunctionCode::*;
        Self::from_codes(&[
            Confirm,
            Read,
            Write,
            Select,
            Operate,
            DirectOperate,
            DirectOperateNoAck,
            ImmediateFreeze,
            ImmediateFreezeNoAck,
            FreezeClear,
            FreezeClearNoAck,
            ColdRestart,
            WarmRestart,
            EnableUnsolicited,
            DisableUnsolicited,
            AssignClass,
            DelayMeasure,
            RecordCurrentTime,
            ActivateConfig,
        ])
    }

    /// Function codes accepted in broadcast requests by default
    pub fn broadcast_default() -> Self {
        use FunctionCode::*;
        Self::from_codes(&[
            Write,
            DirectOperateNoAck,
            ImmediateFreezeNoAck,
            FreezeClearNoAck,
            ColdRestart,
            WarmRestart,
            EnableUnsolicited,
            DisableUnsolicited,
            AssignClass,
            RecordCurrentTime,
        ])
    }

    /// Return a copy with `code` enabled
    #[must_use]
    pub fn with(self, code: FunctionCode) -> Self {
        match Self::bit(code) {
            Some(bit) => Self(self.0 | bit),
            None => self,
        }
    }

    /// Return a copy with `code` disabled
    #[must_use]
    pub fn without(self, code: FunctionCode) -> Self {
        match Self::bit(code) {
            Some(bit) => Self(self.0 & !bit),
            None => self,
        }
    }

    /// Check whether `code` is enabled
    pub fn contains(&self, code: FunctionCode) -> bool {
        Self::bit(code).map(|bit| self.0 & bit != 0).unwrap_or(false)
    }

    fn bit(code: FunctionCode) -> Option<u64> {
        let value = code.as_u8();
        if value < 64 {
            Some(1u64 << value)
        } else {
            None
        }
    }
}
