//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `HERALD_DISCORD_TOKEN` - Discord bot token
//! - `HERALD_POLL_INTERVAL` - Worker poll interval in seconds
//! - `HERALD_QUEUE_CAPACITY` - Capacity of each bridge channel
//!
//! Overrides are applied to the raw document so that they go through the
//! same type checks as values read from the config file.

use std::env;

use hocon::Hocon;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "HERALD";

/// Apply environment variable overrides to a raw config document.
pub fn apply_env_overrides(doc: &mut Hocon) {
    apply_overrides_from(doc, |name| env::var(name).ok());
}

/// Apply overrides using an arbitrary variable lookup.
pub fn apply_overrides_from(doc: &mut Hocon, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup(&format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        set_value(doc, "discord", "token", Hocon::String(token));
    }

    if let Some(interval) = lookup(&format!("{}_POLL_INTERVAL", ENV_PREFIX)) {
        let value = match interval.trim().parse::<f64>() {
            Ok(secs) => Hocon::Real(secs),
            Err(_) => Hocon::String(interval),
        };
        set_value(doc, "discord", "poll_interval", value);
    }

    if let Some(capacity) = lookup(&format!("{}_QUEUE_CAPACITY", ENV_PREFIX)) {
        let value = match capacity.trim().parse::<i64>() {
            Ok(n) => Hocon::Integer(n),
            Err(_) => Hocon::String(capacity),
        };
        set_value(doc, "bridge", "queue_capacity", value);
    }
}

fn set_value(doc: &mut Hocon, section: &str, key: &str, value: Hocon) {
    if !matches!(doc, Hocon::Hash(_)) {
        *doc = Hocon::Hash(Default::default());
    }
    if let Hocon::Hash(root) = doc {
        let section = root
            .entry(section.to_string())
            .or_insert_with(|| Hocon::Hash(Default::default()));
        if !matches!(section, Hocon::Hash(_)) {
            *section = Hocon::Hash(Default::default());
        }
        if let Hocon::Hash(map) = section {
            map.insert(key.to_string(), value);
        }
    }
}

/// Check if any override variables are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_DISCORD_TOKEN", ENV_PREFIX),
        format!("{}_POLL_INTERVAL", ENV_PREFIX),
        format!("{}_QUEUE_CAPACITY", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `HERALD_CONFIG` environment variable, otherwise returns "herald.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "herald.conf".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::common::error::ConfigError;
    use crate::config::parser::{config_from_document, empty_document, parse_document};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "HERALD");
    }

    #[test]
    fn test_token_from_env_without_file() {
        let mut doc = empty_document();
        apply_overrides_from(&mut doc, lookup(&[("HERALD_DISCORD_TOKEN", "env_token")]));

        let config = config_from_document(&doc).unwrap();
        assert_eq!(config.discord.token, "env_token");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut doc = parse_document(r#"discord { token = "file_token", poll_interval = 1.0 }"#).unwrap();
        apply_overrides_from(
            &mut doc,
            lookup(&[
                ("HERALD_DISCORD_TOKEN", "env_token"),
                ("HERALD_POLL_INTERVAL", "0.25"),
                ("HERALD_QUEUE_CAPACITY", "4"),
            ]),
        );

        let config = config_from_document(&doc).unwrap();
        assert_eq!(config.discord.token, "env_token");
        assert_eq!(config.discord.poll_interval, 0.25);
        assert_eq!(config.bridge.queue_capacity, 4);
    }

    #[test]
    fn test_non_numeric_env_interval_is_rejected() {
        let mut doc = parse_document(r#"discord { token = "file_token" }"#).unwrap();
        apply_overrides_from(&mut doc, lookup(&[("HERALD_POLL_INTERVAL", "fast")]));

        let result = config_from_document(&doc);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_override_creates_missing_section() {
        let mut doc = parse_document(r#"bridge { queue_capacity = 8 }"#).unwrap();
        apply_overrides_from(&mut doc, lookup(&[("HERALD_DISCORD_TOKEN", "env_token")]));

        let config = config_from_document(&doc).unwrap();
        assert_eq!(config.discord.token, "env_token");
        assert_eq!(config.bridge.queue_capacity, 8);
    }

    #[test]
    fn test_override_replaces_scalar_section() {
        let mut doc = parse_document(r#"discord = "oops""#).unwrap();
        apply_overrides_from(&mut doc, lookup(&[("HERALD_DISCORD_TOKEN", "env_token")]));

        let config = config_from_document(&doc).unwrap();
        assert_eq!(config.discord.token, "env_token");
    }

    #[test]
    fn test_no_vars_leaves_document_unchanged() {
        let mut doc = parse_document(r#"discord { token = "file_token" }"#).unwrap();
        apply_overrides_from(&mut doc, lookup(&[]));

        let config = config_from_document(&doc).unwrap();
        assert_eq!(config.discord.token, "file_token");
    }
}
