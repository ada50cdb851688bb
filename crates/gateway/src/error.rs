use mt5gw_core::TerminalError;

/// Every way a gateway operation can fail. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("MT5 initialization failed: {0}")]
    TerminalUnavailable(String),
    #[error("Failed to connect to account #{account_id}.")]
    AuthenticationFailed { account_id: u64 },
    #[error("User not connected to MT5.")]
    NotConnected,
    #[error("Symbol {0} not found.")]
    UnknownSymbol(String),
    #[error("No quote available for {0}.")]
    QuoteUnavailable(String),
    #[error("Failed to fetch rates for {symbol}.")]
    DataUnavailable { symbol: String },
    #[error("Trade failed: {code} ({comment})")]
    OrderRejected { code: u32, comment: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) => "INVALID_REQUEST",
            GatewayError::TerminalUnavailable(_) => "TERMINAL_UNAVAILABLE",
            GatewayError::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            GatewayError::NotConnected => "NOT_CONNECTED",
            GatewayError::UnknownSymbol(_) => "UNKNOWN_SYMBOL",
            GatewayError::QuoteUnavailable(_) => "QUOTE_UNAVAILABLE",
            GatewayError::DataUnavailable { .. } => "DATA_UNAVAILABLE",
            GatewayError::OrderRejected { .. } => "ORDER_REJECTED",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Terminal return code, for rejected orders.
    pub fn code(&self) -> Option<u32> {
        match self {
            GatewayError::OrderRejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Terminal failures outside the named taxonomy surface as internal errors.
impl From<TerminalError> for GatewayError {
    fn from(e: TerminalError) -> Self {
        GatewayError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_carries_code() {
        let err = GatewayError::OrderRejected {
            code: 10014,
            comment: "Invalid volume".to_string(),
        };
        assert_eq!(err.kind(), "ORDER_REJECTED");
        assert_eq!(err.code(), Some(10014));
        assert!(err.to_string().contains("10014"));
    }

    #[test]
    fn test_terminal_errors_become_internal() {
        let err: GatewayError = TerminalError::Timeout(30).into();
        assert_eq!(err.kind(), "INTERNAL_ERROR");
        assert_eq!(err.code(), None);
    }
}
