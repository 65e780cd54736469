//! Configuration loader.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

const ENV_VAR_PATTERN: &str = r"\$\{([^}]+)\}";

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    ///
    /// `~` in `backend.path` is expanded after parsing.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        let raw_path = config.backend.path.to_string_lossy().into_owned();
        config.backend.path = Self::expand_path(&raw_path).into();
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = Regex::new(ENV_VAR_PATTERN).map_err(|e| ConfigError::InvalidValue {
            field: "env".to_string(),
            message: e.to_string(),
        })?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.ackqueue`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BackendKind, CodecKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.queue.name, "default");
        assert_eq!(config.backend.kind, BackendKind::Sqlite);
    }

    #[test]
    fn test_expand_path() {
        let expanded = ConfigLoader::expand_path("~/.ackqueue");
        assert!(!expanded.starts_with('~'));
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [queue]
            name = "emails"
            autoclean_interval_secs = 2.5
            codec = "json"

            [backend]
            kind = "sqlite"
            path = "/var/lib/ackqueue/emails.db"
            poll_interval_ms = 100

            [backend.options]
            journal_mode = "WAL"
            synchronous = 1
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.queue.name, "emails");
        assert_eq!(config.queue.autoclean_interval_secs, 2.5);
        assert_eq!(config.queue.codec, CodecKind::Json);
        assert_eq!(config.backend.kind, BackendKind::Sqlite);
        assert_eq!(config.backend.path.to_str(), Some("/var/lib/ackqueue/emails.db"));
        assert_eq!(config.backend.poll_interval_ms, 100);
        assert_eq!(config.backend.options.len(), 2);
    }

    #[test]
    fn test_load_expands_tilde_in_db_path() {
        let content = r#"
            [backend]
            path = "~/queues/q.db"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(!config.backend.path.to_string_lossy().starts_with('~'));
        assert!(config.backend.path.ends_with("queues/q.db"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[queue]").unwrap();
        writeln!(file, "name = \"from-file\"").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.queue.name, "from-file");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/ackqueue.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_load_unknown_codec() {
        let content = r#"
            [queue]
            codec = "msgpack"
        "#;
        assert!(ConfigLoader::load_str(content).is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-only variable name not read anywhere else
        unsafe {
            std::env::set_var("ACKQUEUE_TEST_QUEUE_NAME", "from_env");
        }
        let content = "[queue]\nname = \"${ACKQUEUE_TEST_QUEUE_NAME}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.queue.name, "from_env");
        unsafe {
            std::env::remove_var("ACKQUEUE_TEST_QUEUE_NAME");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_ACKQUEUE_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(ref v)) if v == "NONEXISTENT_ACKQUEUE_VAR_12345"));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }
}
