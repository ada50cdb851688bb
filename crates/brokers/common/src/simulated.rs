use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mt5gw_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Return code for an order sent while no account is logged in.
pub const TRADE_RETCODE_CONNECTION: u32 = 10031;
/// Return code for an order on a symbol the terminal does not carry.
pub const TRADE_RETCODE_INVALID: u32 = 10013;
/// Most bars one history request returns, like the terminal's "max bars in chart".
pub const MAX_BARS: u32 = 100_000;

/// An account the simulated terminal accepts.
#[derive(Debug, Clone)]
pub struct SimulatedAccount {
    pub account_id: u64,
    pub password: String,
    pub server: String,
}

/// A symbol carried by the simulated terminal.
#[derive(Debug, Clone)]
pub struct SimulatedSymbol {
    pub info: SymbolInfo,
    /// Current `(bid, ask)`; `None` simulates a symbol without a live quote.
    pub quote: Option<(Decimal, Decimal)>,
}

impl SimulatedSymbol {
    pub fn new(name: &str, digits: u32, bid: Decimal, ask: Decimal) -> Self {
        Self {
            info: SymbolInfo {
                name: name.to_string(),
                description: String::new(),
                digits,
                point: Decimal::new(1, digits),
                volume_min: dec!(0.01),
                volume_max: dec!(100),
                volume_step: dec!(0.01),
            },
            quote: Some((bid, ask)),
        }
    }
}

/// Configuration for the simulated terminal.
#[derive(Debug, Clone)]
pub struct SimulatedTerminalConfig {
    pub accounts: Vec<SimulatedAccount>,
    pub symbols: HashMap<String, SimulatedSymbol>,
    /// Make `initialize` fail, as a terminal that is not running would.
    pub fail_initialize: bool,
    /// Return code reported for every accepted order.
    pub retcode: u32,
    /// Clock used to place synthetic bars; `None` means wall clock.
    pub now: Option<DateTime<Utc>>,
    /// Delay every call by this much, as a hung terminal would.
    pub stall: Option<Duration>,
    /// Fail every call with a connection error.
    pub link_down: bool,
}

impl Default for SimulatedTerminalConfig {
    fn default() -> Self {
        let symbols = [
            SimulatedSymbol::new("EURUSD", 5, dec!(1.08512), dec!(1.08527)),
            SimulatedSymbol::new("GBPUSD", 5, dec!(1.26340), dec!(1.26358)),
            SimulatedSymbol::new("USDJPY", 3, dec!(149.812), dec!(149.826)),
            SimulatedSymbol::new("BTCUSD", 2, dec!(64250.00), dec!(64275.50)),
        ]
        .into_iter()
        .map(|s| (s.info.name.clone(), s))
        .collect();

        Self {
            accounts: vec![SimulatedAccount {
                account_id: 123456789,
                password: "demo".to_string(),
                server: "MetaQuotes-Demo".to_string(),
            }],
            symbols,
            fail_initialize: false,
            retcode: TRADE_RETCODE_DONE,
            now: None,
            stall: None,
            link_down: false,
        }
    }
}

struct SimulatedState {
    config: SimulatedTerminalConfig,
    initialized: bool,
    logged_in: Option<u64>,
    rate_overrides: HashMap<String, Vec<RawRate>>,
    submitted: Vec<OrderSpec>,
    next_ticket: u64,
}

/// An in-memory terminal for tests and paper mode.
///
/// Cloning yields another handle onto the same terminal, so a test can keep
/// one handle for inspection while the gateway owns the other.
#[derive(Clone)]
pub struct SimulatedTerminal {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedTerminal {
    pub fn new(config: SimulatedTerminalConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                config,
                initialized: false,
                logged_in: None,
                rate_overrides: HashMap::new(),
                submitted: Vec::new(),
                next_ticket: 1,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the quote for a symbol (`None` removes it).
    pub fn set_quote(&self, symbol: &str, quote: Option<(Decimal, Decimal)>) {
        if let Some(sym) = self.state().config.symbols.get_mut(symbol) {
            sym.quote = quote;
        }
    }

    /// Set the return code reported for subsequent orders.
    pub fn set_retcode(&self, retcode: u32) {
        self.state().config.retcode = retcode;
    }

    /// Serve exactly these rates for a symbol instead of synthetic history.
    pub fn set_rates(&self, symbol: &str, rates: Vec<RawRate>) {
        self.state().rate_overrides.insert(symbol.to_string(), rates);
    }

    /// Delay subsequent calls (`None` answers immediately).
    pub fn set_stall(&self, stall: Option<Duration>) {
        self.state().config.stall = stall;
    }

    /// Make subsequent calls fail as if the terminal link were cut.
    pub fn set_link_down(&self, down: bool) {
        self.state().config.link_down = down;
    }

    /// Whether `initialize` has run since the last disconnect.
    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    /// Apply the configured stall and link failure ahead of a call.
    async fn transport(&self) -> Result<(), TerminalError> {
        let (stall, link_down) = {
            let state = self.state();
            (state.config.stall, state.config.link_down)
        };
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        if link_down {
            return Err(TerminalError::ConnectionFailed(
                "simulated link is down".to_string(),
            ));
        }
        Ok(())
    }

    /// Orders received so far, in submission order.
    pub fn submitted_orders(&self) -> Vec<OrderSpec> {
        self.state().submitted.clone()
    }

    /// Account currently logged in, if any.
    pub fn logged_in_account(&self) -> Option<u64> {
        self.state().logged_in
    }
}

impl Default for SimulatedTerminal {
    fn default() -> Self {
        Self::new(SimulatedTerminalConfig::default())
    }
}

/// Deterministic wobble around the mid price, in points.
fn wave(k: i64) -> Decimal {
    Decimal::from((k.rem_euclid(11)) - 5)
}

fn synthetic_rates(
    sym: &SimulatedSymbol,
    timeframe: Timeframe,
    now: DateTime<Utc>,
    start_pos: u32,
    count: u32,
) -> Vec<RawRate> {
    let (bid, ask) = sym.quote.unwrap_or((Decimal::ONE, Decimal::ONE));
    let mid = (bid + ask) / Decimal::TWO;
    let point = sym.info.point;
    let step = i64::from(timeframe.minutes()) * 60;
    let current_open = now.timestamp() - now.timestamp().rem_euclid(step);
    let count = count.min(MAX_BARS);

    (0..count)
        .map(|i| {
            // bars back from the current one
            let k = i64::from(start_pos) + i64::from(count - 1 - i);
            let open = mid + point * wave(k + 1);
            let close = mid + point * wave(k);
            RawRate {
                time: current_open - k * step,
                open,
                high: open.max(close) + point,
                low: open.min(close) - point,
                close,
                tick_volume: 100 + (k.rem_euclid(17) as u64) * 3,
                spread: 2,
                real_volume: 0,
            }
        })
        .collect()
}

#[async_trait]
impl TerminalClient for SimulatedTerminal {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn initialize(&mut self) -> Result<(), TerminalError> {
        self.transport().await?;
        let mut state = self.state();
        if state.config.fail_initialize {
            return Err(TerminalError::InitializationFailed(
                "simulated terminal is configured to fail".to_string(),
            ));
        }
        state.initialized = true;
        Ok(())
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<bool, TerminalError> {
        self.transport().await?;
        let mut state = self.state();
        if !state.initialized {
            return Err(TerminalError::ConnectionFailed(
                "terminal not initialized".to_string(),
            ));
        }
        let accepted = state.config.accounts.iter().any(|a| {
            a.account_id == credentials.account_id
                && a.password == credentials.password
                && a.server == credentials.server
        });
        if accepted {
            state.logged_in = Some(credentials.account_id);
            info!(account_id = credentials.account_id, "Simulated login accepted");
        }
        Ok(accepted)
    }

    async fn symbol_info(&mut self, symbol: &str) -> Result<Option<SymbolInfo>, TerminalError> {
        self.transport().await?;
        Ok(self.state().config.symbols.get(symbol).map(|s| s.info.clone()))
    }

    async fn symbol_tick(&mut self, symbol: &str) -> Result<Option<Tick>, TerminalError> {
        self.transport().await?;
        let state = self.state();
        let now = state.config.now.unwrap_or_else(Utc::now);
        Ok(state
            .config
            .symbols
            .get(symbol)
            .and_then(|s| s.quote)
            .map(|(bid, ask)| Tick {
                time: now.timestamp(),
                bid,
                ask,
                last: Decimal::ZERO,
            }))
    }

    async fn copy_rates_from_pos(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: u32,
        count: u32,
    ) -> Result<Option<Vec<RawRate>>, TerminalError> {
        self.transport().await?;
        let state = self.state();
        if let Some(rates) = state.rate_overrides.get(symbol) {
            let keep = (count.min(MAX_BARS) as usize).min(rates.len());
            return Ok(Some(rates[rates.len() - keep..].to_vec()));
        }
        let Some(sym) = state.config.symbols.get(symbol) else {
            return Ok(None);
        };
        let now = state.config.now.unwrap_or_else(Utc::now);
        Ok(Some(synthetic_rates(sym, timeframe, now, start_pos, count)))
    }

    async fn order_send(&mut self, order: &OrderSpec) -> Result<TradeResult, TerminalError> {
        self.transport().await?;
        let mut state = self.state();
        state.submitted.push(order.clone());

        let retcode = if state.logged_in.is_none() {
            TRADE_RETCODE_CONNECTION
        } else if !state.config.symbols.contains_key(&order.symbol) {
            TRADE_RETCODE_INVALID
        } else {
            state.config.retcode
        };

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        debug!(symbol = %order.symbol, side = %order.side, retcode, "Simulated order");

        let filled = retcode == TRADE_RETCODE_DONE;
        Ok(TradeResult {
            retcode,
            deal: if filled { ticket } else { 0 },
            order: if filled { ticket } else { 0 },
            volume: if filled { order.volume } else { Decimal::ZERO },
            price: if filled { order.price } else { Decimal::ZERO },
            comment: if filled {
                "Request executed".to_string()
            } else {
                "Request rejected".to_string()
            },
        })
    }

    async fn disconnect(&mut self) {
        let mut state = self.state();
        state.initialized = false;
        state.logged_in = None;
        debug!("Simulated terminal disconnected");
    }
}
