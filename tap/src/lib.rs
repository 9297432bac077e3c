//! IEEE 1149.1 TAP state machine, bit packing and adapter transport.

pub mod adapter;
pub mod bits;
pub mod error;
pub mod fsm;
mod transport;

pub use adapter::{Adapter, AdapterInfo};
pub use error::{Error, Result};
pub use fsm::{State, ALL_STATES};
pub use transport::Transport;
