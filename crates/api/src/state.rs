use chrono::{DateTime, Utc};
use mt5gw_gateway::Gateway;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    pub gateway: Gateway,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            started_at: Utc::now(),
        }
    }
}
