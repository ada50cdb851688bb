pub mod simulated;

pub use simulated::{
    SimulatedAccount, SimulatedSymbol, SimulatedTerminal, SimulatedTerminalConfig, MAX_BARS,
};
