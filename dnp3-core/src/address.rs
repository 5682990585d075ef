//! Link address helpers

/// Broadcast destination addresses
///
/// Broadcast requests are never answered; the kind decides whether the
/// next unicast response must request an application confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastKind {
    /// 0xFFFD: the master requires the next response to be confirmed
    ShallConfirm,
    /// 0xFFFE: no confirmation
    DontConfirm,
    /// 0xFFFF: confirmation optional
    OptionalConfirm,
}

impl BroadcastKind {
    pub const SHALL_CONFIRM_ADDRESS: u16 = 0xFFFD;
    pub const DONT_CONFIRM_ADDRESS: u16 = 0xFFFE;
    pub const OPTIONAL_CONFIRM_ADDRESS: u16 = 0xFFFF;

    /// Classify a destination address
    pub const fn from_address(address: u16) -> Option<Self> {
        match address {
            Self::SHALL_CONFIRM_ADDRESS => Some(Self::ShallConfirm),
            Self::DONT_CONFIRM_ADDRESS => Some(Self::DontConfirm),
            Self::OPTIONAL_CONFIRM_ADDRESS => Some(Self::OptionalConfirm),
            _ => None,
        }
    }

    pub const fn requires_confirm(self) -> bool {
        matches!(self, Self::ShallConfirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_addresses() {
        assert_eq!(BroadcastKind::from_address(0xFFFD), Some(BroadcastKind::ShallConfirm));
        assert_eq!(BroadcastKind::from_address(0xFFFF), Some(BroadcastKind::OptionalConfirm));
        assert_eq!(BroadcastKind::from_address(10), None);
        assert!(BroadcastKind::ShallConfirm.requires_confirm());
        assert!(!BroadcastKind::DontConfirm.requires_confirm());
    }
}
