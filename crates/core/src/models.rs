use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Login credentials for a trading account on a broker server.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub account_id: u64,
    pub password: String,
    pub server: String,
}

impl Credentials {
    pub fn new(account_id: u64, password: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            account_id,
            password: password.into(),
            server: server.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("password", &"[REDACTED]")
            .field("server", &self.server)
            .finish()
    }
}

/// The account/server pair the terminal is currently logged into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    pub account_id: u64,
    pub server: String,
    pub connected_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single OHLCV bar as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub open: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub high: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub low: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub close: Decimal,
    pub volume: u64,
}

/// A rate record exactly as the terminal reports it (epoch-second time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRate {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub tick_volume: u64,
    #[serde(default)]
    pub spread: i32,
    #[serde(default)]
    pub real_volume: u64,
}

impl RawRate {
    /// Convert to a [`Bar`]. Returns `None` if the timestamp is out of range.
    pub fn to_bar(&self) -> Option<Bar> {
        let timestamp = DateTime::from_timestamp(self.time, 0)?;
        Some(Bar {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.tick_volume,
        })
    }
}

/// Latest quote for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub time: i64,
    pub bid: Decimal,
    pub ask: Decimal,
    #[serde(default)]
    pub last: Decimal,
}

/// Static properties of a tradeable symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Number of decimal places in a quote.
    pub digits: u32,
    /// Smallest price increment.
    pub point: Decimal,
    pub volume_min: Decimal,
    pub volume_max: Decimal,
    pub volume_step: Decimal,
}

/// Bar timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Minute(u32),
    Hour(u32),
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    const MINUTE_STEPS: [u32; 11] = [1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30];
    const HOUR_STEPS: [u32; 7] = [1, 2, 3, 4, 6, 8, 12];

    /// Map a granularity in minutes onto a terminal timeframe.
    ///
    /// Only granularities the terminal natively serves are accepted; there is
    /// no resampling.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            m if Self::MINUTE_STEPS.contains(&m) => Some(Timeframe::Minute(m)),
            m if m % 60 == 0 && Self::HOUR_STEPS.contains(&(m / 60)) => {
                Some(Timeframe::Hour(m / 60))
            }
            1440 => Some(Timeframe::Daily),
            10080 => Some(Timeframe::Weekly),
            43200 => Some(Timeframe::Monthly),
            _ => None,
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::Minute(n) => *n,
            Timeframe::Hour(n) => n * 60,
            Timeframe::Daily => 1440,
            Timeframe::Weekly => 10080,
            Timeframe::Monthly => 43200,
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    /// Accepts `buy`/`sell` in any case, plus the dashboard's `U`/`D`
    /// (up/down) signals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" | "u" | "up" => Ok(Side::Buy),
            "sell" | "short" | "d" | "down" => Ok(Side::Sell),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Time-in-force of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTime {
    /// Good till cancelled.
    Gtc,
    Day,
}

/// Fill policy of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderFilling {
    /// Fill or kill.
    Fok,
    /// Immediate or cancel.
    Ioc,
    Return,
}

/// A fully resolved market order, ready for the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub symbol: String,
    pub volume: Decimal,
    pub side: Side,
    pub price: Decimal,
    pub take_profit: Decimal,
    /// Maximum tolerated slippage in points.
    pub deviation: u32,
    /// Strategy identifier stamped on the order.
    pub magic: u64,
    pub comment: String,
    pub type_time: OrderTime,
    pub type_filling: OrderFilling,
}

/// Return code the terminal reports for a completed request.
pub const TRADE_RETCODE_DONE: u32 = 10009;

/// Terminal response to an order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub retcode: u32,
    #[serde(default)]
    pub deal: u64,
    #[serde(default)]
    pub order: u64,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub comment: String,
}

impl TradeResult {
    pub fn is_done(&self) -> bool {
        self.retcode == TRADE_RETCODE_DONE
    }
}

/// Confirmation returned to the dashboard for an accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub symbol: String,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub execution_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub take_profit: Decimal,
    pub retcode: u32,
}
