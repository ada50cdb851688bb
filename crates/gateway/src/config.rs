use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Order policy and terminal call limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Distance from entry to the take-profit, in price units.
    pub take_profit_offset: Decimal,
    /// Maximum slippage tolerated on market orders, in points.
    pub deviation: u32,
    /// Strategy identifier stamped on every order.
    pub magic: u64,
    /// Upper bound on any single terminal call.
    pub terminal_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            take_profit_offset: dec!(0.00010),
            deviation: 20,
            magic: 234000,
            terminal_timeout_secs: 30,
        }
    }
}

impl GatewayConfig {
    /// Check that the configuration can produce sane orders.
    pub fn validate(&self) -> Result<(), String> {
        if self.take_profit_offset <= Decimal::ZERO {
            return Err(format!(
                "take_profit_offset must be positive, got {}",
                self.take_profit_offset
            ));
        }
        if self.terminal_timeout_secs == 0 {
            return Err("terminal_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}
