use mt5gw_core::{
    OrderFilling, OrderSpec, OrderTime, RawRate, Side, SymbolInfo, Tick, Timeframe, TradeResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame either side may send.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

// MT5 trade request constants.
pub const TRADE_ACTION_DEAL: u32 = 1;
pub const ORDER_TYPE_BUY: u32 = 0;
pub const ORDER_TYPE_SELL: u32 = 1;
pub const ORDER_TIME_GTC: u32 = 0;
pub const ORDER_TIME_DAY: u32 = 1;
pub const ORDER_FILLING_FOK: u32 = 0;
pub const ORDER_FILLING_IOC: u32 = 1;
pub const ORDER_FILLING_RETURN: u32 = 2;

/// MT5 `TIMEFRAME_*` value for a timeframe.
pub fn timeframe_code(timeframe: Timeframe) -> u32 {
    match timeframe {
        Timeframe::Minute(n) => n,
        Timeframe::Hour(n) => 0x4000 | n,
        Timeframe::Daily => 0x4018,
        Timeframe::Weekly => 0x8001,
        Timeframe::Monthly => 0xC001,
    }
}

/// Trade request in the shape `order_send` expects on the MT5 side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub action: u32,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume: Decimal,
    #[serde(rename = "type")]
    pub order_type: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tp: Decimal,
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
    pub type_time: u32,
    pub type_filling: u32,
}

impl From<&OrderSpec> for TradeRequest {
    fn from(order: &OrderSpec) -> Self {
        Self {
            action: TRADE_ACTION_DEAL,
            symbol: order.symbol.clone(),
            volume: order.volume,
            order_type: match order.side {
                Side::Buy => ORDER_TYPE_BUY,
                Side::Sell => ORDER_TYPE_SELL,
            },
            price: order.price,
            tp: order.take_profit,
            deviation: order.deviation,
            magic: order.magic,
            comment: order.comment.clone(),
            type_time: match order.type_time {
                OrderTime::Gtc => ORDER_TIME_GTC,
                OrderTime::Day => ORDER_TIME_DAY,
            },
            type_filling: match order.type_filling {
                OrderFilling::Fok => ORDER_FILLING_FOK,
                OrderFilling::Ioc => ORDER_FILLING_IOC,
                OrderFilling::Return => ORDER_FILLING_RETURN,
            },
        }
    }
}

/// Requests sent from the gateway TO the MT5 bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "initialize")]
    Initialize,
    #[serde(rename = "login")]
    Login {
        login: u64,
        password: String,
        server: String,
    },
    #[serde(rename = "symbol_info")]
    SymbolInfo { symbol: String },
    #[serde(rename = "symbol_info_tick")]
    SymbolInfoTick { symbol: String },
    #[serde(rename = "copy_rates_from_pos")]
    CopyRatesFromPos {
        symbol: String,
        timeframe: u32,
        start_pos: u32,
        count: u32,
    },
    #[serde(rename = "order_send")]
    OrderSend { request: TradeRequest },
}

impl Request {
    /// Request name for logs; never includes credentials.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Initialize => "initialize",
            Request::Login { .. } => "login",
            Request::SymbolInfo { .. } => "symbol_info",
            Request::SymbolInfoTick { .. } => "symbol_info_tick",
            Request::CopyRatesFromPos { .. } => "copy_rates_from_pos",
            Request::OrderSend { .. } => "order_send",
        }
    }
}

/// Responses received FROM the MT5 bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    #[serde(rename = "initialized")]
    Initialized {
        ok: bool,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "login_result")]
    LoginResult { authorized: bool },
    #[serde(rename = "symbol_info")]
    SymbolInfo { info: Option<SymbolInfo> },
    #[serde(rename = "tick")]
    Tick { tick: Option<Tick> },
    #[serde(rename = "rates")]
    Rates { rates: Option<Vec<RawRate>> },
    #[serde(rename = "order_result")]
    OrderResult { result: TradeResult },
    #[serde(rename = "error")]
    Error { message: String },
}

/// A request tagged with the id the bridge must echo back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub id: String,
    pub request: Request,
}

/// A response and the id of the request it answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundFrame {
    pub id: String,
    pub response: Response,
}

/// Frame a message with a 4-byte length prefix (big-endian).
pub fn frame_message(msg: &[u8]) -> Vec<u8> {
    let len = msg.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(msg);
    framed
}

/// Serialize `msg` as JSON and write it as one frame.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_vec(msg)?;
    writer.write_all(&frame_message(&json)).await?;
    writer.flush().await
}

/// Read one frame and decode its JSON body.
pub async fn read_frame<R, T>(reader: &mut R) -> std::io::Result<T>
where
    R: AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_frame_prefix() {
        let framed = frame_message(b"{}");
        assert_eq!(framed, vec![0, 0, 0, 2, b'{', b'}']);
    }

    #[test]
    fn test_timeframe_codes() {
        assert_eq!(timeframe_code(Timeframe::Minute(5)), 5);
        assert_eq!(timeframe_code(Timeframe::Hour(1)), 16385);
        assert_eq!(timeframe_code(Timeframe::Hour(4)), 16388);
        assert_eq!(timeframe_code(Timeframe::Daily), 16408);
        assert_eq!(timeframe_code(Timeframe::Weekly), 32769);
        assert_eq!(timeframe_code(Timeframe::Monthly), 49153);
    }

    #[test]
    fn test_sell_order_wire_shape() {
        let order = OrderSpec {
            symbol: "EURUSD".to_string(),
            volume: dec!(0.1),
            side: Side::Sell,
            price: dec!(1.08512),
            take_profit: dec!(1.08502),
            deviation: 20,
            magic: 234000,
            comment: "Trade sell".to_string(),
            type_time: OrderTime::Gtc,
            type_filling: OrderFilling::Ioc,
        };
        let frame = OutboundFrame {
            id: "1".to_string(),
            request: Request::OrderSend {
                request: TradeRequest::from(&order),
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        let req = &json["request"];
        assert_eq!(req["type"], "order_send");
        assert_eq!(req["request"]["action"], 1);
        assert_eq!(req["request"]["type"], 1);
        assert_eq!(req["request"]["type_filling"], 1);
        assert_eq!(req["request"]["type_time"], 0);
        let price = req["request"]["price"].as_f64().unwrap();
        let tp = req["request"]["tp"].as_f64().unwrap();
        assert!((price - 1.08512).abs() < 1e-12);
        assert!((tp - 1.08502).abs() < 1e-12);
    }

    #[test]
    fn test_decode_rates_response() {
        let raw = r#"{"id":"7","response":{"type":"rates","rates":[
            {"time":1700000000,"open":1.1,"high":1.2,"low":1.0,"close":1.15,"tick_volume":12}
        ]}}"#;
        let frame: InboundFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.id, "7");
        match frame.response {
            Response::Rates { rates: Some(rates) } => {
                assert_eq!(rates.len(), 1);
                assert_eq!(rates[0].close, dec!(1.15));
                assert_eq!(rates[0].spread, 0);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_decode_null_rates() {
        let raw = r#"{"id":"8","response":{"type":"rates","rates":null}}"#;
        let frame: InboundFrame = serde_json::from_str(raw).unwrap();
        assert!(matches!(frame.response, Response::Rates { rates: None }));
    }

    #[tokio::test]
    async fn test_frame_io_roundtrip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let frame = OutboundFrame {
            id: "abc".to_string(),
            request: Request::SymbolInfo {
                symbol: "EURUSD".to_string(),
            },
        };
        write_frame(&mut a, &frame).await.unwrap();
        let got: OutboundFrame = read_frame(&mut b).await.unwrap();
        assert_eq!(got.id, "abc");
        assert_eq!(got.request.kind(), "symbol_info");
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&(u32::MAX).to_be_bytes()).await.unwrap();
        let err = read_frame::<_, InboundFrame>(&mut b).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
