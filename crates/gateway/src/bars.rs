use mt5gw_core::{Bar, RawRate, Timeframe};

use crate::error::GatewayError;

/// A request for the most recent `count` bars of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRequest {
    pub symbol: String,
    pub timeframe_minutes: u32,
    pub count: u32,
}

impl BarRequest {
    pub fn new(symbol: impl Into<String>, timeframe_minutes: u32, count: u32) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe_minutes,
            count,
        }
    }

    /// Check the request and resolve its terminal timeframe.
    pub fn validate(&self) -> Result<Timeframe, GatewayError> {
        if self.symbol.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("symbol is required".to_string()));
        }
        Timeframe::from_minutes(self.timeframe_minutes).ok_or_else(|| {
            GatewayError::InvalidRequest(format!(
                "unsupported timeframe: {} minutes",
                self.timeframe_minutes
            ))
        })
    }
}

/// Convert terminal rates to bars ordered oldest to newest.
///
/// Granularity is passed through untouched: no gap filling, no resampling.
pub fn normalize_rates(rates: Vec<RawRate>) -> Result<Vec<Bar>, GatewayError> {
    let mut bars = rates
        .iter()
        .map(|r| {
            r.to_bar().ok_or_else(|| {
                GatewayError::Internal(format!("terminal returned invalid bar time {}", r.time))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(time: i64) -> RawRate {
        RawRate {
            time,
            open: dec!(1),
            high: dec!(1),
            low: dec!(1),
            close: dec!(1),
            tick_volume: 1,
            spread: 0,
            real_volume: 0,
        }
    }

    #[test]
    fn test_validate_resolves_timeframe() {
        let req = BarRequest::new("EURUSD", 15, 10);
        assert_eq!(req.validate().unwrap(), Timeframe::Minute(15));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(matches!(
            BarRequest::new("", 5, 10).validate(),
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            BarRequest::new("EURUSD", 7, 10).validate(),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_normalize_sorts_oldest_first() {
        let bars = normalize_rates(vec![rate(300), rate(0), rate(600)]).unwrap();
        let times: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp()).collect();
        assert_eq!(times, vec![0, 300, 600]);
    }

    #[test]
    fn test_normalize_keeps_gaps() {
        let bars = normalize_rates(vec![rate(0), rate(3600)]).unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn test_normalize_rejects_out_of_range_time() {
        assert!(matches!(
            normalize_rates(vec![rate(i64::MAX)]),
            Err(GatewayError::Internal(_))
        ));
    }
}
