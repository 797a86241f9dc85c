//! 配置校验模块
//!
//! 校验规则：
//! - 字段约束 (由 `validator` derive 声明)：max_concurrency >= 1、超时 > 0、
//!   queue_capacity >= 1、gateway.name 非空
//! - file 后端必须给出 path
//! - seed 连接非空且唯一

use std::collections::HashSet;

use contracts::{ContractError, GatewayConfig, RegistryBackend};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 GatewayConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &GatewayConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_registry(config)?;
    Ok(())
}

/// 执行 derive 声明的字段约束
fn validate_fields(config: &GatewayConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 把嵌套的 ValidationErrors 展平成 (字段路径, 消息)
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                (path.clone(), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_violation(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_violation(inner, &format!("{path}[{idx}]"))),
        };

        if found.is_some() {
            return found;
        }
    }
    None
}

/// 校验注册表设置
fn validate_registry(config: &GatewayConfig) -> Result<(), ContractError> {
    let registry = &config.registry;

    if registry.backend == RegistryBackend::File && registry.path.is_none() {
        return Err(ContractError::config_validation(
            "registry.path",
            "file backend requires a path",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, id) in registry.seed.iter().enumerate() {
        if id.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("registry.seed[{idx}]"),
                "connection id cannot be empty",
            ));
        }
        if !seen.insert(id.as_str()) {
            return Err(ContractError::config_validation(
                format!("registry.seed[{idx}]"),
                format!("duplicate connection id '{id}'"),
            ));
        }
    }

    Ok(())
}
