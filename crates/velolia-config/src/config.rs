//! Configuration types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use velolia_telemetry::{create_env_filter, LogConfig, LogFormat};

use crate::ConfigError;

/// Complete application configuration.
///
/// The typed sections cover what the framework itself reads. Any other
/// top-level section lands in [`extra`](Self::extra) and is reachable with
/// dotted keys through [`get`](Self::get).
///
/// # Example
///
/// ```
/// use velolia_config::VeloliaConfig;
///
/// let config = VeloliaConfig::default();
/// assert_eq!(config.app.name, "Velolia");
/// assert_eq!(config.get("app.debug"), Some(serde_json::json!(false)));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VeloliaConfig {
    /// Application identity and mode.
    #[serde(default)]
    pub app: AppConfig,

    /// Request handling.
    #[serde(default)]
    pub http: HttpConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sections the framework does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `[app]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Application name.
    pub name: String,
    /// Environment name, e.g. `production` or `local`.
    pub env: String,
    /// Whether error responses carry internal messages.
    pub debug: bool,
    /// Base URL used for absolute route URLs.
    pub url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Velolia".to_string(),
            env: "production".to_string(),
            debug: false,
            url: None,
        }
    }
}

/// The `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Global middleware aliases, outermost first.
    pub middleware: Vec<String>,
    /// Whether to reuse a well-formed incoming `x-request-id`.
    pub trust_request_id: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            middleware: vec!["request_id".to_string(), "log_requests".to_string()],
            trust_request_id: false,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether to install a subscriber.
    pub enabled: bool,
    /// `EnvFilter` directive.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// The subscriber settings for this section.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty | LogFormat::Compact => LogConfig::development(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            ..base
        }
    }
}

impl VeloliaConfig {
    /// Local development: debug output and messages, pretty logs.
    ///
    /// ```
    /// use velolia_config::VeloliaConfig;
    ///
    /// let config = VeloliaConfig::development();
    /// assert!(config.app.debug);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.app.env = "local".to_string();
        config.app.debug = true;
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config
    }

    /// Production: JSON logs at `info`, internal messages hidden.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Checks the loaded values.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("app.name", "must not be empty"));
        }
        if self.app.env.trim().is_empty() {
            return Err(ConfigError::invalid_value("app.env", "must not be empty"));
        }
        if let Some(url) = &self.app.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid_value(
                    "app.url",
                    "must start with http:// or https://",
                ));
            }
        }
        if let Some(position) = self.http.middleware.iter().position(|alias| alias.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                format!("http.middleware.{position}"),
                "middleware alias must not be empty",
            ));
        }
        if self.logging.enabled {
            create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }
        Ok(())
    }

    /// Whether the application runs in `env`.
    #[must_use]
    pub fn is_env(&self, env: &str) -> bool {
        self.app.env.eq_ignore_ascii_case(env)
    }

    /// Reads a value by dotted key, e.g. `app.name` or `mail.smtp.port`.
    ///
    /// A key that is present verbatim at the top level wins over the dotted
    /// interpretation.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let tree = self.to_tree();
        if let Some(value) = tree.get(key) {
            return Some(value.clone());
        }
        lookup(&tree, key).cloned()
    }

    /// Reads and deserializes a value, falling back to `default` when the
    /// key is missing or has another shape.
    ///
    /// ```
    /// use velolia_config::VeloliaConfig;
    ///
    /// let config = VeloliaConfig::default();
    /// assert_eq!(config.get_or("cache.ttl", 60_u64), 60);
    /// ```
    pub fn get_or<T: serde::de::DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or(default)
    }

    /// Whether a dotted key is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets a value by dotted key, creating intermediate sections.
    ///
    /// # Errors
    ///
    /// `ConfigError::JsonError` when the value does not fit a typed section,
    /// e.g. a string for `app.debug`.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let mut tree = self.to_tree();
        assign(&mut tree, key, value.into());
        *self = serde_json::from_value(Value::Object(tree))?;
        Ok(())
    }

    fn to_tree(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn lookup<'a>(tree: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let first = tree.get(segments.next()?)?;
    segments.try_fold(first, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

pub(crate) fn assign(tree: &mut Map<String, Value>, key: &str, value: Value) {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = tree;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

/// Deep-merges `overlay` into `base`; objects merge, everything else
/// replaces.
pub(crate) fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = VeloliaConfig::default();
        assert_eq!(config.app.env, "production");
        assert!(!config.app.debug);
        assert_eq!(config.http.middleware, vec!["request_id", "log_requests"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let dev = VeloliaConfig::development();
        assert!(dev.is_env("LOCAL"));
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert_eq!(VeloliaConfig::production(), VeloliaConfig::default());
    }

    #[test]
    fn test_validate_url() {
        let mut config = VeloliaConfig::default();
        config.app.url = Some("example.com".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("app.url"));

        config.app.url = Some("https://example.com".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = VeloliaConfig::default();
        config.logging.level = "velolia=shouty".into();
        assert!(config.validate().is_err());

        config.logging.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_middleware_alias() {
        let mut config = VeloliaConfig::default();
        config.http.middleware.push(" ".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http.middleware.2"));
    }

    #[test]
    fn test_dotted_get_and_set() {
        let mut config = VeloliaConfig::default();
        config.set("mail.smtp.port", 2525).unwrap();
        config.set("app.debug", true).unwrap();

        assert!(config.app.debug);
        assert_eq!(config.get("mail.smtp.port"), Some(json!(2525)));
        assert_eq!(config.get("mail"), Some(json!({"smtp": {"port": 2525}})));
        assert!(config.has("mail.smtp"));
        assert!(!config.has("mail.imap"));
        assert_eq!(config.get_or("mail.smtp.port", 25_u16), 2525);
        assert_eq!(config.get_or("mail.smtp.host", "localhost".to_string()), "localhost");
    }

    #[test]
    fn test_set_rejects_wrong_type_for_typed_section() {
        let mut config = VeloliaConfig::default();
        assert!(config.set("app.debug", "yes").is_err());
        assert!(!config.app.debug);
    }

    #[test]
    fn test_verbatim_key_wins() {
        let mut config = VeloliaConfig::default();
        config.extra.insert("feature.flags".into(), json!("literal"));
        assert_eq!(config.get("feature.flags"), Some(json!("literal")));
    }

    #[test]
    fn test_merge() {
        let mut base = json!({"app": {"name": "A", "debug": false}, "list": [1, 2]});
        merge(&mut base, json!({"app": {"debug": true}, "list": [3]}));
        assert_eq!(base, json!({"app": {"name": "A", "debug": true}, "list": [3]}));
    }

    #[test]
    fn test_logging_section_to_log_config() {
        let section = LoggingConfig {
            enabled: true,
            level: "warn".into(),
            format: LogFormat::Compact,
        };
        let log = section.to_log_config();
        assert_eq!(log.format, LogFormat::Compact);
        assert_eq!(log.level, "warn");
        assert!(log.file_line_info);
    }
}
