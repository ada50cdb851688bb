use mt5gw_core::ConnectionDescriptor;
use tokio::sync::RwLock;

/// Holds the one account/server pair the terminal is logged into.
///
/// The terminal is a single process-wide connection, so this is shared by
/// every client of the gateway: a login from any client replaces it for all.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<ConnectionDescriptor>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_connected(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn current(&self) -> Option<ConnectionDescriptor> {
        self.current.read().await.clone()
    }

    /// Store `descriptor`, returning whatever it replaced.
    pub async fn replace(&self, descriptor: ConnectionDescriptor) -> Option<ConnectionDescriptor> {
        self.current.write().await.replace(descriptor)
    }

    /// Forget the session, returning it.
    pub async fn clear(&self) -> Option<ConnectionDescriptor> {
        self.current.write().await.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn descriptor(account_id: u64) -> ConnectionDescriptor {
        ConnectionDescriptor {
            account_id,
            server: "MetaQuotes-Demo".to_string(),
            connected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_starts_disconnected() {
        let store = SessionStore::new();
        assert!(!store.is_connected().await);
        assert!(store.current().await.is_none());
    }

    #[tokio::test]
    async fn test_replace_overwrites() {
        let store = SessionStore::new();
        assert!(store.replace(descriptor(1)).await.is_none());
        let previous = store.replace(descriptor(2)).await;
        assert_eq!(previous.map(|d| d.account_id), Some(1));
        assert_eq!(store.current().await.map(|d| d.account_id), Some(2));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SessionStore::new();
        store.replace(descriptor(1)).await;
        assert_eq!(store.clear().await.map(|d| d.account_id), Some(1));
        assert!(!store.is_connected().await);
        assert!(store.clear().await.is_none());
    }
}
