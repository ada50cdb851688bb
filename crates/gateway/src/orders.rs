use mt5gw_core::{OrderFilling, OrderSpec, OrderTime, Side, Tick};
use rust_decimal::Decimal;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// A directional trade request from the dashboard, validated but not yet
/// resolved against the terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: Side,
    /// Direction as the dashboard sent it; echoed in the order comment.
    pub direction: String,
    pub lot_size: Decimal,
}

impl OrderIntent {
    /// Validate raw request fields. Every field is required and the lot size
    /// must be strictly positive.
    pub fn from_parts(
        symbol: Option<&str>,
        direction: Option<&str>,
        lot_size: Option<Decimal>,
    ) -> Result<Self, GatewayError> {
        let symbol = symbol
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::InvalidRequest("symbol is required".to_string()))?;
        let direction = direction
            .map(str::trim)
            .ok_or_else(|| GatewayError::InvalidRequest("direction is required".to_string()))?;
        let side = direction
            .parse::<Side>()
            .map_err(GatewayError::InvalidRequest)?;
        let lot_size = lot_size
            .ok_or_else(|| GatewayError::InvalidRequest("lotSize is required".to_string()))?;
        if lot_size <= Decimal::ZERO {
            return Err(GatewayError::InvalidRequest(format!(
                "lotSize must be positive, got {}",
                lot_size
            )));
        }

        Ok(Self {
            symbol: symbol.to_string(),
            side,
            direction: direction.to_string(),
            lot_size,
        })
    }
}

/// Market orders fill on the side of the book they consume.
pub fn entry_price(side: Side, tick: &Tick) -> Decimal {
    match side {
        Side::Buy => tick.ask,
        Side::Sell => tick.bid,
    }
}

/// Take-profit on the favorable side of entry.
pub fn take_profit(side: Side, price: Decimal, offset: Decimal) -> Decimal {
    match side {
        Side::Buy => price + offset,
        Side::Sell => price - offset,
    }
}

/// Resolve an intent and a live quote into a broker-ready market order.
pub fn build_order(
    intent: &OrderIntent,
    tick: &Tick,
    config: &GatewayConfig,
) -> Result<OrderSpec, GatewayError> {
    let price = entry_price(intent.side, tick);
    if price <= Decimal::ZERO {
        // Closed markets report zeroed quotes.
        return Err(GatewayError::QuoteUnavailable(intent.symbol.clone()));
    }

    Ok(OrderSpec {
        symbol: intent.symbol.clone(),
        volume: intent.lot_size,
        side: intent.side,
        price,
        take_profit: take_profit(intent.side, price, config.take_profit_offset),
        deviation: config.deviation,
        magic: config.magic,
        comment: format!("Trade {}", intent.direction),
        type_time: OrderTime::Gtc,
        type_filling: OrderFilling::Ioc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tick(bid: Decimal, ask: Decimal) -> Tick {
        Tick {
            time: 0,
            bid,
            ask,
            last: Decimal::ZERO,
        }
    }

    fn intent(side: Side) -> OrderIntent {
        OrderIntent {
            symbol: "EURUSD".to_string(),
            side,
            direction: side.to_string(),
            lot_size: dec!(0.1),
        }
    }

    #[test]
    fn test_buy_uses_ask_and_tp_above() {
        let order = build_order(
            &intent(Side::Buy),
            &tick(dec!(1.08512), dec!(1.08527)),
            &GatewayConfig::default(),
        )
        .unwrap();
        assert_eq!(order.price, dec!(1.08527));
        assert_eq!(order.take_profit, dec!(1.08537));
        assert_eq!(order.comment, "Trade buy");
    }

    #[test]
    fn test_sell_uses_bid_and_tp_below() {
        let order = build_order(
            &intent(Side::Sell),
            &tick(dec!(1.08512), dec!(1.08527)),
            &GatewayConfig::default(),
        )
        .unwrap();
        assert_eq!(order.price, dec!(1.08512));
        assert_eq!(order.take_profit, dec!(1.08502));
    }

    #[test]
    fn test_order_policy_fields() {
        let config = GatewayConfig {
            deviation: 5,
            magic: 7,
            ..Default::default()
        };
        let order = build_order(&intent(Side::Buy), &tick(dec!(1), dec!(2)), &config).unwrap();
        assert_eq!(order.deviation, 5);
        assert_eq!(order.magic, 7);
        assert_eq!(order.volume, dec!(0.1));
        assert_eq!(order.type_time, OrderTime::Gtc);
        assert_eq!(order.type_filling, OrderFilling::Ioc);
    }

    #[test]
    fn test_zero_quote_is_unavailable() {
        let err = build_order(
            &intent(Side::Sell),
            &tick(Decimal::ZERO, dec!(1.1)),
            &GatewayConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::QuoteUnavailable(_)));
    }

    #[test]
    fn test_intent_requires_all_fields() {
        assert!(OrderIntent::from_parts(None, Some("buy"), Some(dec!(1))).is_err());
        assert!(OrderIntent::from_parts(Some("  "), Some("buy"), Some(dec!(1))).is_err());
        assert!(OrderIntent::from_parts(Some("EURUSD"), None, Some(dec!(1))).is_err());
        assert!(OrderIntent::from_parts(Some("EURUSD"), Some("buy"), None).is_err());
    }

    #[test]
    fn test_intent_rejects_non_positive_lots() {
        for lots in [dec!(0), dec!(-0.1)] {
            let err = OrderIntent::from_parts(Some("EURUSD"), Some("buy"), Some(lots)).unwrap_err();
            assert_eq!(err.kind(), "INVALID_REQUEST");
        }
    }

    #[test]
    fn test_intent_accepts_dashboard_signals() {
        let up = OrderIntent::from_parts(Some("EURUSD"), Some("U"), Some(dec!(0.1))).unwrap();
        let down = OrderIntent::from_parts(Some("EURUSD"), Some("D"), Some(dec!(0.1))).unwrap();
        assert_eq!(up.side, Side::Buy);
        assert_eq!(down.side, Side::Sell);
        assert_eq!(down.direction, "D");
        assert!(OrderIntent::from_parts(Some("EURUSD"), Some("X"), Some(dec!(0.1))).is_err());
    }

    #[test]
    fn test_comment_echoes_dashboard_signal() {
        let intent = OrderIntent::from_parts(Some("EURUSD"), Some(" U "), Some(dec!(0.1))).unwrap();
        let order = build_order(
            &intent,
            &tick(dec!(1.08512), dec!(1.08527)),
            &GatewayConfig::default(),
        )
        .unwrap();
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.comment, "Trade U");
    }
}
