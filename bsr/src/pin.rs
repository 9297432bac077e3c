//! Pin-level addressing and state tracked by the [`crate::Controller`]
//! (§3 "BSR Runtime").

use compact_str::CompactString;

/// Identifies one package pin of one device on a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinRef {
    pub chain_index: usize,
    pub device_name: CompactString,
    pub pin_name: CompactString,
}

impl PinRef {
    pub fn new(chain_index: usize, device_name: impl Into<CompactString>, pin_name: impl Into<CompactString>) -> Self {
        PinRef {
            chain_index,
            device_name: device_name.into(),
            pin_name: pin_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    HiZ,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinState {
    pub pin: PinRef,
    pub mode: PinMode,
    pub driven_val: Option<bool>,
    pub last_read: Option<bool>,
}

impl PinState {
    pub(crate) fn hiz(pin: PinRef) -> Self {
        PinState {
            pin,
            mode: PinMode::HiZ,
            driven_val: None,
            last_read: None,
        }
    }
}
