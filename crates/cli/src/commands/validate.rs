//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CleanupMode, GatewayConfig, RegistryBackend};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    name: String,
    stage: String,
    max_concurrency: usize,
    cleanup: CleanupMode,
    registry_backend: RegistryBackend,
    seeded_connections: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_config(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&config),
            summary: Some(ConfigSummary {
                version: format!("{:?}", config.version),
                name: config.gateway.name.clone(),
                stage: config.gateway.stage.clone(),
                max_concurrency: config.dispatcher.max_concurrency,
                cleanup: config.dispatcher.cleanup,
                registry_backend: config.registry.backend,
                seeded_connections: config.registry.seed.len(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("{e:#}")),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Non-fatal issues worth pointing out
fn collect_warnings(config: &GatewayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.registry.backend == RegistryBackend::Memory && config.registry.seed.is_empty() {
        warnings.push(
            "Memory registry has no seed - only $connect events will register connections"
                .to_string(),
        );
    }

    if config.dispatcher.cleanup == CleanupMode::Disabled {
        warnings.push(
            "dispatcher.cleanup = \"disabled\" - stale connections stay in the registry"
                .to_string(),
        );
    }

    if config.dispatcher.send_timeout_ms.is_none() {
        warnings.push("No dispatcher.send_timeout_ms - a hung send holds a slot forever".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if !result.valid {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
        return;
    }

    println!("✓ Configuration is valid: {}", result.config_path);
    if let Some(ref summary) = result.summary {
        println!("\n  Version: {}", summary.version);
        println!("  Gateway: {} ({})", summary.name, summary.stage);
        println!("  Max concurrency: {}", summary.max_concurrency);
        println!("  Cleanup: {:?}", summary.cleanup);
        println!(
            "  Registry: {:?} ({} seeded)",
            summary.registry_backend, summary.seeded_connections
        );
    }

    if !result.warnings.is_empty() {
        println!("\n⚠ Warnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config(
            r#"

[gateway]
name = "chat"

[dispatcher]
cleanup = "disabled"
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });

        assert!(result.valid, "{:?}", result.error);
        assert_eq!(result.summary.as_ref().unwrap().max_concurrency, 20);
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/gateway.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
