use std::env;
use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::json;
use toml::Value;

use crate::commands::CommandResult;
use callplan_core::config::{resolve_config_path, AppConfig, LoadOptions};

#[derive(Debug, Serialize)]
struct EffectiveField {
    key: &'static str,
    value: String,
    source: String,
}

/// Prints every effective setting with where it came from. Secrets are never printed.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key: &'static str, env_keys: &[&str]| {
        field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let webhook_token = match &config.notifications.webhook_token {
        Some(token) => redact_token(token.expose_secret()),
        None => "<unset>".to_string(),
    };

    let fields = vec![
        field("database.url", config.database.url.clone(), &source, &["CALLPLAN_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &source,
            &["CALLPLAN_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &source,
            &["CALLPLAN_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &source,
            &["CALLPLAN_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &source, &["CALLPLAN_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &source,
            &["CALLPLAN_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "notifications.enabled",
            config.notifications.enabled.to_string(),
            &source,
            &["CALLPLAN_NOTIFICATIONS_ENABLED"],
        ),
        field(
            "notifications.webhook_url",
            config.notifications.webhook_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &source,
            &["CALLPLAN_NOTIFICATIONS_WEBHOOK_URL"],
        ),
        field(
            "notifications.webhook_token",
            webhook_token,
            &source,
            &["CALLPLAN_NOTIFICATIONS_WEBHOOK_TOKEN"],
        ),
        field(
            "notifications.queue_capacity",
            config.notifications.queue_capacity.to_string(),
            &source,
            &["CALLPLAN_NOTIFICATIONS_QUEUE_CAPACITY"],
        ),
        field(
            "workflow.require_approved_plan_for_check_in",
            config.workflow.require_approved_plan_for_check_in.to_string(),
            &source,
            &["CALLPLAN_WORKFLOW_REQUIRE_APPROVED_PLAN_FOR_CHECK_IN"],
        ),
        field(
            "workflow.require_rejection_reason",
            config.workflow.require_rejection_reason.to_string(),
            &source,
            &["CALLPLAN_WORKFLOW_REQUIRE_REJECTION_REASON"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &source,
            &["CALLPLAN_LOGGING_LEVEL", "CALLPLAN_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &source,
            &["CALLPLAN_LOGGING_FORMAT", "CALLPLAN_LOG_FORMAT"],
        ),
    ];

    CommandResult::success_with(
        "config",
        "effective config (source precedence: env > file > default)",
        Some(json!({
            "config_file": config_file_path.map(|path| path.display().to_string()),
            "fields": fields,
        })),
    )
}

fn field(
    key: &'static str,
    value: String,
    source: &impl Fn(&'static str, &[&str]) -> String,
    env_keys: &[&str],
) -> EffectiveField {
    EffectiveField { key, value, source: source(key, env_keys) }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_token(token: &str) -> String {
    if token.trim().is_empty() {
        return "<empty>".to_string();
    }
    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, field_source, redact_token};

    #[test]
    fn nested_keys_are_found_in_the_file() {
        let doc: toml::Value =
            "[notifications]\nwebhook_url = \"https://hooks.example\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "notifications.webhook_url"));
        assert!(!contains_path(&doc, "notifications.webhook_token"));
        assert_eq!(
            field_source("notifications.webhook_url", &[], Some(&doc), None),
            "file (config file)"
        );
        assert_eq!(field_source("server.port", &[], Some(&doc), None), "default");
    }

    #[test]
    fn tokens_never_render() {
        assert_eq!(redact_token("hook-secret-123"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }
}
