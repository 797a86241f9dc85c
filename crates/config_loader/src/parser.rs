//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON 格式。

use contracts::{ContractError, GatewayConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<GatewayConfig, ContractError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| ContractError::ConfigParse {
            message: format!("TOML parse error: {e}"),
            source: Some(Box::new(e)),
        }),
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
                message: format!("JSON parse error: {e}"),
                source: Some(Box::new(e)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CleanupMode, RegistryBackend};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
version = "V1"

[gateway]
name = "chat-app-api"
stage = "dev"

[dispatcher]
max_concurrency = 8
cleanup = "sync"
send_timeout_ms = 500

[registry]
backend = "file"
path = "/tmp/connections.json"

[transport]
queue_capacity = 4
"#;
        let config = parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.gateway.name, "chat-app-api");
        assert_eq!(config.gateway.stage, "dev");
        assert_eq!(config.dispatcher.max_concurrency, 8);
        assert_eq!(config.dispatcher.cleanup, CleanupMode::Sync);
        assert_eq!(config.dispatcher.send_timeout_ms, Some(500));
        assert_eq!(config.registry.backend, RegistryBackend::File);
        assert_eq!(config.transport.queue_capacity, 4);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "gateway": { "name": "chat" },
            "registry": { "seed": ["a", "b"] }
        }"#;
        let config = parse(content, ConfigFormat::Json).unwrap();
        assert_eq!(config.registry.seed, vec!["a", "b"]);
        assert_eq!(config.dispatcher.cleanup, CleanupMode::Async);
    }

    #[test]
    fn test_unknown_cleanup_mode_rejected() {
        let content = r#"
[gateway]
name = "chat"

[dispatcher]
cleanup = "sometimes"
"#;
        let err = parse(content, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse("invalid toml [[[", ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().starts_with("config parse error: TOML parse error"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
