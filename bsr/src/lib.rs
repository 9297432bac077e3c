//! Boundary-scan runtime: chain-global DR layout, EXTEST programming,
//! pin drive/HiZ, and input capture/decoding (§4.7).

pub mod controller;
pub mod error;
pub mod layout;
pub mod pin;

pub use controller::{Controller, OtherDevicesPolicy};
pub use error::{Error, Result};
pub use layout::DrLayout;
pub use pin::{PinMode, PinRef, PinState};
