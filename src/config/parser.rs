//! Configuration file parsing (HOCON format).
//!
//! Values are type-checked against the raw document rather than through a
//! derived deserializer so that a missing token, a non-string token and a
//! non-numeric interval each fail with their own error.

use std::path::Path;

use hocon::{Hocon, HoconLoader};

use crate::common::error::ConfigError;
use crate::config::types::{
    BridgeConfig, Config, DiscordConfig, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_QUEUE_CAPACITY,
};

/// Load the raw HOCON document from a file.
pub fn load_document(path: impl AsRef<Path>) -> Result<Hocon, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?
        .hocon()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Parse a raw HOCON document from a string.
pub fn parse_document(content: &str) -> Result<Hocon, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .hocon()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// An empty document, used when no config file exists.
pub fn empty_document() -> Hocon {
    Hocon::Hash(Default::default())
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    config_from_document(&parse_document(content)?)
}

/// Build a typed configuration from a raw document.
pub fn config_from_document(doc: &Hocon) -> Result<Config, ConfigError> {
    let token = match &doc["discord"]["token"] {
        Hocon::String(token) => token.clone(),
        Hocon::BadValue(_) | Hocon::Null => {
            return Err(ConfigError::MissingField {
                field: "discord.token".to_string(),
            })
        }
        other => {
            return Err(ConfigError::InvalidValue {
                field: "discord.token".to_string(),
                message: format!("must be a string, got {}", kind_of(other)),
            })
        }
    };

    let poll_interval = match &doc["discord"]["poll_interval"] {
        Hocon::BadValue(_) | Hocon::Null => DEFAULT_POLL_INTERVAL_SECS,
        Hocon::Real(value) => *value,
        Hocon::Integer(value) => *value as f64,
        other => {
            return Err(ConfigError::InvalidValue {
                field: "discord.poll_interval".to_string(),
                message: format!("must be an integer or float value, got {}", kind_of(other)),
            })
        }
    };

    let queue_capacity = match &doc["bridge"]["queue_capacity"] {
        Hocon::BadValue(_) | Hocon::Null => DEFAULT_QUEUE_CAPACITY,
        Hocon::Integer(value) if *value >= 0 => *value as usize,
        other => {
            return Err(ConfigError::InvalidValue {
                field: "bridge.queue_capacity".to_string(),
                message: format!("must be a non-negative integer, got {}", kind_of(other)),
            })
        }
    };

    Ok(Config {
        discord: DiscordConfig {
            token,
            poll_interval,
        },
        bridge: BridgeConfig { queue_capacity },
    })
}

fn kind_of(value: &Hocon) -> &'static str {
    match value {
        Hocon::Real(_) => "float",
        Hocon::Integer(_) => "integer",
        Hocon::String(_) => "string",
        Hocon::Boolean(_) => "boolean",
        Hocon::Array(_) => "array",
        Hocon::Hash(_) => "object",
        Hocon::Null => "null",
        Hocon::BadValue(_) => "missing value",
        #[allow(unreachable_patterns)]
        _ => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load_config_str(r#"discord { token = "abc" }"#).unwrap();
        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.discord.poll_interval, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(config.bridge.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_full_config() {
        let config = load_config_str(
            r#"
            discord {
                token = "abc"
                poll_interval = 2
            }
            bridge {
                queue_capacity = 8
            }
            "#,
        )
        .unwrap();
        assert_eq!(config.discord.poll_interval, 2.0);
        assert_eq!(config.bridge.queue_capacity, 8);
    }

    #[test]
    fn test_missing_token_fails() {
        let result = load_config_str(r#"discord { poll_interval = 0.5 }"#);
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_empty_document_reports_missing_token() {
        let doc = empty_document();
        assert!(matches!(doc, Hocon::Hash(ref map) if map.is_empty()));

        let result = config_from_document(&doc);
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_numeric_token_fails() {
        let result = load_config_str(r#"discord { token = 12345 }"#);
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_non_numeric_interval_fails() {
        let result = load_config_str(r#"discord { token = "abc", poll_interval = "soon" }"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("discord.poll_interval"));
    }

    #[test]
    fn test_negative_capacity_fails() {
        let result = load_config_str(
            r#"
            discord { token = "abc" }
            bridge { queue_capacity = -1 }
            "#,
        );
        assert!(result.is_err());
    }
}
