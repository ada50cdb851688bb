pub mod bars;
pub mod config;
pub mod error;
pub mod orders;
pub mod session;

pub use bars::BarRequest;
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use orders::OrderIntent;
pub use session::SessionStore;

use chrono::Utc;
use mt5gw_core::*;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Bound a terminal call by `secs` seconds.
async fn bounded<T, F>(secs: u64, call: F) -> Result<T, TerminalError>
where
    F: Future<Output = Result<T, TerminalError>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), call).await {
        Ok(result) => result,
        Err(_) => Err(TerminalError::Timeout(secs)),
    }
}

/// The gateway: one terminal connection shared by every request.
///
/// All terminal calls go through a single mutex so logins, quotes and orders
/// from concurrent requests never interleave. A multi-step operation holds
/// the lock for its whole duration.
pub struct Gateway {
    terminal: Mutex<Box<dyn TerminalClient>>,
    terminal_name: String,
    session: SessionStore,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(terminal: Box<dyn TerminalClient>, config: GatewayConfig) -> Self {
        Self {
            terminal_name: terminal.name().to_string(),
            terminal: Mutex::new(terminal),
            session: SessionStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn terminal_name(&self) -> &str {
        &self.terminal_name
    }

    pub async fn is_connected(&self) -> bool {
        self.session.is_connected().await
    }

    /// The account currently logged in, if any.
    pub async fn session(&self) -> Option<ConnectionDescriptor> {
        self.session.current().await
    }

    /// Cut the terminal link after a transport failure and end the session,
    /// so later calls report `NotConnected` until the next login.
    async fn drop_link(&self, terminal: &mut dyn TerminalClient, error: &TerminalError) {
        terminal.disconnect().await;
        let previous = self.session.clear().await;
        warn!(
            terminal = %self.terminal_name,
            account_id = previous.map(|d| d.account_id),
            error = %error,
            "Terminal link lost, session cleared"
        );
    }

    /// Map a terminal result, dropping the link if the call broke it.
    async fn settle<T>(
        &self,
        terminal: &mut dyn TerminalClient,
        result: Result<T, TerminalError>,
    ) -> Result<T, GatewayError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.breaks_link() {
                    self.drop_link(terminal, &e).await;
                }
                Err(e.into())
            }
        }
    }

    /// Initialize the terminal and log into an account.
    ///
    /// On success the stored session is replaced. A rejected login leaves it
    /// as it was; a broken link ends it.
    pub async fn connect(
        &self,
        credentials: Credentials,
    ) -> Result<ConnectionDescriptor, GatewayError> {
        if credentials.account_id == 0
            || credentials.password.is_empty()
            || credentials.server.trim().is_empty()
        {
            return Err(GatewayError::InvalidRequest(
                "Missing credentials.".to_string(),
            ));
        }
        let secs = self.config.terminal_timeout_secs;
        let mut terminal = self.terminal.lock().await;

        if let Err(e) = bounded(secs, terminal.initialize()).await {
            warn!(terminal = %self.terminal_name, error = %e, "Terminal initialization failed");
            if e.breaks_link() {
                self.drop_link(&mut **terminal, &e).await;
            }
            return Err(GatewayError::TerminalUnavailable(e.to_string()));
        }

        let login = bounded(secs, terminal.login(&credentials)).await;
        let authorized = self.settle(&mut **terminal, login).await?;
        if !authorized {
            warn!(
                account_id = credentials.account_id,
                server = %credentials.server,
                "Login rejected"
            );
            return Err(GatewayError::AuthenticationFailed {
                account_id: credentials.account_id,
            });
        }

        let descriptor = ConnectionDescriptor {
            account_id: credentials.account_id,
            server: credentials.server,
            connected_at: Utc::now(),
        };
        // Still holding the terminal lock: the stored session always matches
        // the last login the terminal saw.
        if let Some(previous) = self.session.replace(descriptor.clone()).await {
            if previous.account_id != descriptor.account_id {
                info!(
                    previous = previous.account_id,
                    "Replacing session of another account"
                );
            }
        }
        info!(
            account_id = descriptor.account_id,
            server = %descriptor.server,
            "Connected to MetaTrader5"
        );
        Ok(descriptor)
    }

    /// The most recent `count` bars, oldest first.
    pub async fn fetch_bars(&self, request: BarRequest) -> Result<Vec<Bar>, GatewayError> {
        if !self.session.is_connected().await {
            return Err(GatewayError::NotConnected);
        }
        let timeframe = request.validate()?;
        if request.count == 0 {
            return Ok(Vec::new());
        }

        let secs = self.config.terminal_timeout_secs;
        let rates = {
            let mut terminal = self.terminal.lock().await;
            let rates = bounded(
                secs,
                terminal.copy_rates_from_pos(&request.symbol, timeframe, 0, request.count),
            )
            .await;
            self.settle(&mut **terminal, rates).await?
        };

        match rates {
            Some(rates) if !rates.is_empty() => bars::normalize_rates(rates),
            _ => {
                warn!(symbol = %request.symbol, "Terminal returned no rates");
                Err(GatewayError::DataUnavailable {
                    symbol: request.symbol,
                })
            }
        }
    }

    /// Turn a directional intent into a market order and submit it.
    ///
    /// Validate → resolve symbol → resolve quote → derive prices → submit.
    /// The first failing step ends the request; nothing is retried.
    pub async fn execute_trade(
        &self,
        intent: OrderIntent,
    ) -> Result<ExecutionReport, GatewayError> {
        if !self.session.is_connected().await {
            return Err(GatewayError::NotConnected);
        }
        let secs = self.config.terminal_timeout_secs;
        let trade_id = Uuid::new_v4();
        let mut terminal = self.terminal.lock().await;

        let info = bounded(secs, terminal.symbol_info(&intent.symbol)).await;
        if self.settle(&mut **terminal, info).await?.is_none() {
            return Err(GatewayError::UnknownSymbol(intent.symbol));
        }

        let tick = bounded(secs, terminal.symbol_tick(&intent.symbol)).await;
        let tick = self
            .settle(&mut **terminal, tick)
            .await?
            .ok_or_else(|| GatewayError::QuoteUnavailable(intent.symbol.clone()))?;

        let order = orders::build_order(&intent, &tick, &self.config)?;
        info!(
            %trade_id,
            symbol = %order.symbol,
            side = %order.side,
            volume = %order.volume,
            price = %order.price,
            tp = %order.take_profit,
            "Submitting market order"
        );

        let sent = bounded(secs, terminal.order_send(&order)).await;
        if let Err(e) = &sent {
            // The order may have reached the broker; only the terminal knows.
            warn!(%trade_id, error = %e, "Order outcome unknown");
        }
        let result = self.settle(&mut **terminal, sent).await?;
        if !result.is_done() {
            warn!(%trade_id, retcode = result.retcode, comment = %result.comment, "Order rejected");
            return Err(GatewayError::OrderRejected {
                code: result.retcode,
                comment: result.comment,
            });
        }

        info!(%trade_id, deal = result.deal, "Order filled");
        Ok(ExecutionReport {
            symbol: order.symbol,
            side: order.side,
            volume: order.volume,
            execution_price: order.price,
            take_profit: order.take_profit,
            retcode: result.retcode,
        })
    }
}
