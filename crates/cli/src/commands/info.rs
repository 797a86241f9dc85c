//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{CleanupMode, GatewayConfig, RegistryBackend};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    gateway: GatewayInfo,
    dispatcher: DispatcherInfo,
    registry: RegistryInfo,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct GatewayInfo {
    name: String,
    stage: String,
}

#[derive(Serialize)]
struct DispatcherInfo {
    max_concurrency: usize,
    cleanup: CleanupMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    send_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    broadcast_timeout_ms: Option<u64>,
}

#[derive(Serialize)]
struct RegistryInfo {
    backend: RegistryBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    seed: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;
    let info = build_config_info(&config);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &GatewayConfig) -> ConfigInfo {
    let dispatcher = &config.dispatcher;
    ConfigInfo {
        version: format!("{:?}", config.version),
        gateway: GatewayInfo {
            name: config.gateway.name.clone(),
            stage: config.gateway.stage.clone(),
        },
        dispatcher: DispatcherInfo {
            max_concurrency: dispatcher.max_concurrency,
            cleanup: dispatcher.cleanup,
            send_timeout_ms: dispatcher.send_timeout_ms,
            broadcast_timeout_ms: dispatcher.broadcast_timeout_ms,
        },
        registry: RegistryInfo {
            backend: config.registry.backend,
            path: config
                .registry
                .path
                .as_ref()
                .map(|p| p.display().to_string()),
            seed: config.registry.seed.clone(),
        },
        queue_capacity: config.transport.queue_capacity,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== Gateway Configuration ===\n");
    println!("Version: {}", info.version);
    println!("Gateway: {} (stage: {})", info.gateway.name, info.gateway.stage);

    println!("\nDispatcher:");
    println!("  Max concurrency: {}", info.dispatcher.max_concurrency);
    println!("  Stale cleanup: {:?}", info.dispatcher.cleanup);
    match info.dispatcher.send_timeout_ms {
        Some(ms) => println!("  Send timeout: {}ms", ms),
        None => println!("  Send timeout: none"),
    }
    match info.dispatcher.broadcast_timeout_ms {
        Some(ms) => println!("  Broadcast timeout: {}ms", ms),
        None => println!("  Broadcast timeout: none"),
    }

    println!("\nRegistry:");
    println!("  Backend: {:?}", info.registry.backend);
    if let Some(ref path) = info.registry.path {
        println!("  Path: {}", path);
    }
    if !info.registry.seed.is_empty() {
        println!("  Seed ({}):", info.registry.seed.len());
        for id in &info.registry.seed {
            println!("    - {}", id);
        }
    }

    println!("\nTransport:");
    println!("  Queue capacity: {}", info.queue_capacity);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_json_shape() {
        let config = config_loader::ConfigLoader::load_from_str(
            r#"
[gateway]
name = "chat"

[registry]
seed = ["a", "b"]
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let json = serde_json::to_value(build_config_info(&config)).unwrap();
        assert_eq!(json["gateway"]["stage"], "production");
        assert_eq!(json["dispatcher"]["cleanup"], "async");
        assert_eq!(json["registry"]["backend"], "memory");
        assert_eq!(json["registry"]["seed"].as_array().unwrap().len(), 2);
        assert!(json["dispatcher"].get("send_timeout_ms").is_none());
    }
}
