//! Layered configuration loading.
//!
//! Sources apply in order, later ones winning: built-in defaults (or a
//! preset), then files and strings, then `PREFIX__SECTION__KEY` environment
//! variables.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;
use velolia_telemetry::LogFormat;

use crate::config::{assign, merge};
use crate::{ConfigError, VeloliaConfig};

/// Builds a [`VeloliaConfig`] from layered sources.
///
/// # Example
///
/// ```no_run
/// use velolia_config::ConfigLoader;
///
/// # fn main() -> Result<(), velolia_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_optional_file("config/app.toml")?
///     .with_env_prefix("VELOLIA")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: VeloliaConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: VeloliaConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to the defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = VeloliaConfig::default();
        self
    }

    /// Resets to the development preset.
    ///
    /// ```
    /// use velolia_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert!(config.app.debug);
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = VeloliaConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = VeloliaConfig::production();
        self
    }

    /// Merges a `.toml` or `.json` file.
    ///
    /// Sections merge key by key, so a file only needs the settings it
    /// changes.
    ///
    /// # Errors
    ///
    /// A missing or unreadable file, a parse failure, an unknown extension,
    /// or an unknown key inside a typed section.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| {
                ConfigError::validation_error(format!(
                    "unsupported configuration file format: {}",
                    path.display()
                ))
            })?;

        let overlay = parse(&content, &format)?;
        self.merge_value(overlay)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Same as `with_file` for a file that exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration text in `format` (`toml` or `json`).
    ///
    /// ```
    /// use velolia_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[app]\nname = \"Blog\"\n\n[mail]\nfrom = \"hi@blog.test\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.app.name, "Blog");
    /// assert_eq!(config.get("mail.from"), Some(serde_json::json!("hi@blog.test")));
    /// ```
    ///
    /// # Errors
    ///
    /// A parse failure, an unknown format, or an unknown key inside a typed
    /// section.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let overlay = parse(content, &format.to_lowercase())?;
        self.merge_value(overlay)?;
        Ok(self)
    }

    /// Reads `PREFIX__SECTION__KEY` variables from the process environment
    /// when [`load`](Self::load) runs.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the working directory or a parent, if there is one.
    ///
    /// Variables already set in the environment are kept.
    ///
    /// # Errors
    ///
    /// A `.env` file that exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Loads a specific env file.
    ///
    /// # Errors
    ///
    /// A missing or malformed file.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref()).map_err(|e| ConfigError::Dotenv(e.to_string()))?;
        Ok(self)
    }

    /// Applies overrides from explicit `(name, value)` pairs, as if they
    /// were environment variables.
    ///
    /// ```
    /// use velolia_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_env_vars("APP", [("APP__APP__DEBUG", "true")])
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert!(config.app.debug);
    /// ```
    ///
    /// # Errors
    ///
    /// A value that does not parse for its setting.
    pub fn with_env_vars<I, K, V>(mut self, prefix: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefix = prefix.to_uppercase();
        for (key, value) in vars {
            self.apply_env_var(key.as_ref(), value.as_ref(), &prefix)?;
        }
        Ok(self)
    }

    /// Applies environment overrides, validates and returns the result.
    ///
    /// # Errors
    ///
    /// An unparsable override or a failed [`VeloliaConfig::validate`].
    pub fn load(mut self) -> Result<VeloliaConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars().collect();
            self = self.with_env_vars(&prefix, vars)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration as loaded so far, without environment
    /// overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> VeloliaConfig {
        self.config
    }

    fn merge_value(&mut self, overlay: Value) -> Result<(), ConfigError> {
        let mut current = serde_json::to_value(&self.config)?;
        merge(&mut current, overlay);
        self.config = serde_json::from_value(current)?;
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };
        let parts: Vec<&str> = rest.split("__").collect();

        match parts.as_slice() {
            ["APP", "NAME"] => self.config.app.name = value.to_string(),
            ["APP", "ENV"] => self.config.app.env = value.to_string(),
            ["APP", "DEBUG"] => {
                self.config.app.debug =
                    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["APP", "URL"] => {
                self.config.app.url = if value.is_empty() { None } else { Some(value.to_string()) };
            }

            ["HTTP", "MIDDLEWARE"] => {
                self.config.http.middleware = value
                    .split(',')
                    .map(str::trim)
                    .filter(|alias| !alias.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ["HTTP", "TRUST_REQUEST_ID"] => {
                self.config.http.trust_request_id =
                    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled =
                    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected 'json', 'pretty' or 'compact'"))?;
            }

            // Typed sections reject keys they do not know.
            ["APP" | "HTTP" | "LOGGING", ..] => {
                return Err(ConfigError::env_parse_error(key, "unknown setting"));
            }

            [] | [""] => {}

            path => {
                let dotted = path
                    .iter()
                    .map(|segment| segment.to_lowercase())
                    .collect::<Vec<_>>()
                    .join(".");
                let mut tree = match serde_json::to_value(&self.config)? {
                    Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                assign(&mut tree, &dotted, Value::String(value.to_string()));
                self.config = serde_json::from_value(Value::Object(tree))?;
            }
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<Value, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::validation_error(format!(
            "unsupported configuration format: {other}"
        ))),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, VeloliaConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let dev = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(dev.app.env, "local");

        let prod = ConfigLoader::new().with_development().with_production().load().unwrap();
        assert!(!prod.app.debug);
    }

    #[test]
    fn test_string_merges_over_preset() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string("[app]\nname = \"Blog\"", "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.app.name, "Blog");
        // untouched keys keep the preset
        assert!(config.app.debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_string_json() {
        let config = ConfigLoader::new()
            .with_string(r#"{"http": {"middleware": ["log_requests"]}, "cache": {"ttl": 30}}"#, "JSON")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.http.middleware, vec!["log_requests"]);
        assert_eq!(config.get("cache.ttl"), Some(json!(30)));
    }

    #[test]
    fn test_unknown_key_in_typed_section() {
        let result = ConfigLoader::new().with_string("[app]\nnmae = \"typo\"", "toml");
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[app]\nurl = \"https://blog.test\"\n\n[logging]\nlevel = \"warn\"").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.app.url.as_deref(), Some("https://blog.test"));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_with_file_without_extension() {
        let file = NamedTempFile::new().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/velolia.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/velolia.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.app.name, "Velolia");
    }

    #[test]
    fn test_with_dotenv_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "VELOLIA_TEST_DOTENV_MARKER=present").unwrap();

        ConfigLoader::new().with_dotenv_file(file.path()).unwrap();
        assert_eq!(env::var("VELOLIA_TEST_DOTENV_MARKER").unwrap(), "present");
    }

    #[test]
    fn test_with_dotenv_file_missing() {
        let result = ConfigLoader::new().with_dotenv_file("/nonexistent/.env");
        assert!(matches!(result, Err(ConfigError::Dotenv(_))));
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigLoader::new()
            .with_env_vars(
                "velolia",
                [
                    ("VELOLIA__APP__NAME", "Shop"),
                    ("VELOLIA__APP__DEBUG", "on"),
                    ("VELOLIA__HTTP__MIDDLEWARE", "request_id, auth ,"),
                    ("VELOLIA__LOGGING__FORMAT", "compact"),
                    ("VELOLIA__MAIL__SMTP__HOST", "smtp.shop.test"),
                    ("OTHER__APP__NAME", "ignored"),
                ],
            )
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.app.name, "Shop");
        assert!(config.app.debug);
        assert_eq!(config.http.middleware, vec!["request_id", "auth"]);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.get("mail.smtp.host"), Some(json!("smtp.shop.test")));
    }

    #[test]
    fn test_env_override_errors() {
        let bad_bool = ConfigLoader::new().with_env_vars("V", [("V__APP__DEBUG", "maybe")]);
        assert!(matches!(bad_bool, Err(ConfigError::EnvParseError { .. })));

        let bad_format = ConfigLoader::new().with_env_vars("V", [("V__LOGGING__FORMAT", "xml")]);
        assert!(matches!(bad_format, Err(ConfigError::EnvParseError { .. })));

        let unknown = ConfigLoader::new().with_env_vars("V", [("V__APP__PORT", "80")]);
        assert!(matches!(unknown, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_env_empty_url_clears() {
        let config = ConfigLoader::new()
            .with_string("[app]\nurl = \"https://blog.test\"", "toml")
            .unwrap()
            .with_env_vars("V", [("V__APP__URL", "")])
            .unwrap()
            .load_unvalidated();
        assert!(config.app.url.is_none());
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .with_string("[app]\nurl = \"blog.test\"", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
