use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Terminal Trait
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to a trading terminal.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Terminal error: {0}")]
    Remote(String),
    #[error("Terminal call timed out after {0}s")]
    Timeout(u64),
}

impl TerminalError {
    /// Whether the link to the terminal can no longer be trusted after this
    /// error: a request may be half-sent or its reply still in flight.
    pub fn breaks_link(&self) -> bool {
        matches!(
            self,
            TerminalError::ConnectionFailed(_)
                | TerminalError::Protocol(_)
                | TerminalError::Timeout(_)
        )
    }
}

/// The trading terminal capability: one physical connection to one
/// trading account at a time.
///
/// Methods take `&mut self`; callers sharing a terminal must serialize
/// access (a single mutex around the whole client).
#[async_trait]
pub trait TerminalClient: Send + Sync {
    /// Short name for logging (e.g. "metatrader", "simulated").
    fn name(&self) -> &str;

    /// Establish the link to the terminal process.
    async fn initialize(&mut self) -> Result<(), TerminalError>;

    /// Log into a trading account. `Ok(false)` means the login was rejected.
    async fn login(&mut self, credentials: &Credentials) -> Result<bool, TerminalError>;

    /// Look up a symbol. `Ok(None)` if the terminal does not know it.
    async fn symbol_info(&mut self, symbol: &str) -> Result<Option<SymbolInfo>, TerminalError>;

    /// Latest quote. `Ok(None)` if no quote is available.
    async fn symbol_tick(&mut self, symbol: &str) -> Result<Option<Tick>, TerminalError>;

    /// Fetch `count` bars starting `start_pos` bars back from the current one.
    /// `Ok(None)` if the terminal has no data for the request.
    async fn copy_rates_from_pos(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: u32,
        count: u32,
    ) -> Result<Option<Vec<RawRate>>, TerminalError>;

    /// Submit an order and report the terminal's verdict.
    async fn order_send(&mut self, order: &OrderSpec) -> Result<TradeResult, TerminalError>;

    /// Tear down the link. The next `initialize` starts from scratch.
    async fn disconnect(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_break_link() {
        assert!(TerminalError::Timeout(30).breaks_link());
        assert!(TerminalError::ConnectionFailed("reset".into()).breaks_link());
        assert!(TerminalError::Protocol("bad id".into()).breaks_link());
        assert!(!TerminalError::Remote("no such symbol".into()).breaks_link());
        assert!(!TerminalError::InitializationFailed("IPC".into()).breaks_link());
    }
}
