use anyhow::{Context, Result};
use mt5gw_brokers_metatrader::MetaTraderConfig;
use mt5gw_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of the optional TOML config file. Every section defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub gateway: GatewayConfig,
    pub metatrader: MetaTraderConfig,
}

impl FileConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: FileConfig = toml::from_str(s).context("invalid config file")?;
        config
            .gateway
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [gateway] section: {}", e))?;
        Ok(config)
    }

    /// Load from `path`, or defaults if no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_file_is_defaults() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert_eq!(config.gateway, GatewayConfig::default());
        assert_eq!(config.metatrader.port, 5556);
        assert_eq!(config.metatrader.request_timeout_secs, 30);
    }

    #[test]
    fn test_sections_override() {
        let config = FileConfig::from_toml_str(
            r#"
            [gateway]
            take_profit_offset = "0.0002"
            magic = 99

            [metatrader]
            host = "10.0.0.5"
            port = 7000
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.take_profit_offset, dec!(0.0002));
        assert_eq!(config.gateway.magic, 99);
        assert_eq!(config.gateway.deviation, 20);
        assert_eq!(config.metatrader.host, "10.0.0.5");
        assert_eq!(config.metatrader.port, 7000);
        assert_eq!(config.metatrader.connect_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_offset_rejected() {
        let err = FileConfig::from_toml_str("[gateway]\ntake_profit_offset = \"0\"").unwrap_err();
        assert!(err.to_string().contains("gateway"));
    }

    #[test]
    fn test_missing_file() {
        assert!(FileConfig::load(Some(Path::new("/nonexistent/mt5gw.toml"))).is_err());
    }
}
