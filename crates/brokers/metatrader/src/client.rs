use async_trait::async_trait;
use mt5gw_core::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{self, InboundFrame, OutboundFrame, Request, Response, TradeRequest};

/// Configuration for connecting to the MetaTrader 5 bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaTraderConfig {
    /// Host address (e.g. "127.0.0.1").
    pub host: String,
    /// Port the MT5 bridge is listening on.
    pub port: u16,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Deadline for one request/response exchange, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for MetaTraderConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5556,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// MetaTrader 5 terminal client.
///
/// Talks to a bridge running next to the MT5 terminal over TCP using
/// length-prefixed JSON frames. Every request carries a fresh id and the
/// bridge answers each request with exactly one frame echoing it.
pub struct MetaTraderTerminal {
    config: MetaTraderConfig,
    stream: Option<TcpStream>,
}

impl MetaTraderTerminal {
    pub fn new(config: MetaTraderConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.stream.is_some()
    }

    async fn open_stream(&mut self) -> Result<(), TerminalError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Connecting to MetaTrader bridge at {}", addr);

        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                TerminalError::ConnectionFailed(format!("TCP connect to {} timed out", addr))
            })?
            .map_err(|e| TerminalError::ConnectionFailed(format!("TCP connect failed: {}", e)))?;

        // Frames are small request/response pairs.
        let _ = stream.set_nodelay(true);
        self.stream = Some(stream);
        Ok(())
    }

    /// Drop the link; the next `initialize` reconnects.
    async fn reset(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    /// Send one request and wait for its response.
    ///
    /// Any failure mid-exchange (I/O, deadline, id mismatch) drops the link,
    /// so a late reply can never be read as the answer to a later request.
    async fn call(&mut self, request: Request) -> Result<Response, TerminalError> {
        let kind = request.kind();
        let id = Uuid::new_v4().to_string();
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TerminalError::ConnectionFailed("Not connected".to_string()))?;

        let outbound = OutboundFrame {
            id: id.clone(),
            request,
        };
        debug!(request = kind, id = %id, "Sending bridge request");

        let exchange = async {
            protocol::write_frame(stream, &outbound).await?;
            protocol::read_frame::<_, InboundFrame>(stream).await
        };

        let deadline = Duration::from_secs(self.config.request_timeout_secs);
        let inbound = match tokio::time::timeout(deadline, exchange).await {
            Ok(Ok(frame)) => frame,
            Err(_) => {
                warn!(request = kind, id = %id, "Bridge request timed out");
                self.reset().await;
                return Err(TerminalError::Timeout(self.config.request_timeout_secs));
            }
            Ok(Err(e)) => {
                warn!(request = kind, error = %e, "Bridge link failed");
                self.reset().await;
                return Err(TerminalError::ConnectionFailed(format!(
                    "{} failed: {}",
                    kind, e
                )));
            }
        };

        if inbound.id != id {
            // The link is out of step; nothing after this can be trusted.
            self.reset().await;
            return Err(TerminalError::Protocol(format!(
                "response id {} does not match request {}",
                inbound.id, id
            )));
        }

        match inbound.response {
            Response::Error { message } => Err(TerminalError::Remote(message)),
            other => Ok(other),
        }
    }
}

fn unexpected(kind: &str, response: Response) -> TerminalError {
    TerminalError::Protocol(format!("unexpected response to {}: {:?}", kind, response))
}

#[async_trait]
impl TerminalClient for MetaTraderTerminal {
    fn name(&self) -> &str {
        "metatrader"
    }

    async fn initialize(&mut self) -> Result<(), TerminalError> {
        if self.stream.is_none() {
            self.open_stream().await?;
        }

        match self.call(Request::Initialize).await? {
            Response::Initialized { ok: true, .. } => {
                info!("MetaTrader terminal initialized");
                Ok(())
            }
            Response::Initialized { ok: false, message } => {
                Err(TerminalError::InitializationFailed(
                    message.unwrap_or_else(|| "terminal refused to initialize".to_string()),
                ))
            }
            other => Err(unexpected("initialize", other)),
        }
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<bool, TerminalError> {
        let request = Request::Login {
            login: credentials.account_id,
            password: credentials.password.clone(),
            server: credentials.server.clone(),
        };
        match self.call(request).await? {
            Response::LoginResult { authorized } => Ok(authorized),
            other => Err(unexpected("login", other)),
        }
    }

    async fn symbol_info(&mut self, symbol: &str) -> Result<Option<SymbolInfo>, TerminalError> {
        let request = Request::SymbolInfo {
            symbol: symbol.to_string(),
        };
        match self.call(request).await? {
            Response::SymbolInfo { info } => Ok(info),
            other => Err(unexpected("symbol_info", other)),
        }
    }

    async fn symbol_tick(&mut self, symbol: &str) -> Result<Option<Tick>, TerminalError> {
        let request = Request::SymbolInfoTick {
            symbol: symbol.to_string(),
        };
        match self.call(request).await? {
            Response::Tick { tick } => Ok(tick),
            other => Err(unexpected("symbol_info_tick", other)),
        }
    }

    async fn copy_rates_from_pos(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: u32,
        count: u32,
    ) -> Result<Option<Vec<RawRate>>, TerminalError> {
        let request = Request::CopyRatesFromPos {
            symbol: symbol.to_string(),
            timeframe: protocol::timeframe_code(timeframe),
            start_pos,
            count,
        };
        match self.call(request).await? {
            Response::Rates { rates } => Ok(rates),
            other => Err(unexpected("copy_rates_from_pos", other)),
        }
    }

    async fn order_send(&mut self, order: &OrderSpec) -> Result<TradeResult, TerminalError> {
        let request = Request::OrderSend {
            request: TradeRequest::from(order),
        };
        match self.call(request).await? {
            Response::OrderResult { result } => Ok(result),
            other => Err(unexpected("order_send", other)),
        }
    }

    async fn disconnect(&mut self) {
        if self.is_linked() {
            info!("Dropping MetaTrader bridge link");
            self.reset().await;
        }
    }
}
