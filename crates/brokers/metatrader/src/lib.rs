//! MetaTrader 5 terminal client.
//!
//! Communicates with MT5 via a socket bridge (a Python or MQL5 script
//! running next to the terminal) that executes the MetaTrader5 API calls
//! on the gateway's behalf.

pub mod client;
pub mod protocol;

pub use client::{MetaTraderConfig, MetaTraderTerminal};
