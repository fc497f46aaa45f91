use crate::config::settings::Settings;
use crate::utils::error::{BotError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"))
}

impl Settings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BotError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content, |name| std::env::var(name).ok());

        let settings: Settings =
            toml::from_str(&processed_content).map_err(|e| BotError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        Ok(settings.without_blank_values())
    }

    /// Environment first, then the optional file on top.
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let settings = Self::from_env();
        match config_file {
            Some(path) => {
                tracing::debug!("Loading configuration overrides from {}", path);
                Ok(settings.merge(Self::from_file(path)?))
            }
            None => Ok(settings),
        }
    }
}

/// 替換 ${VAR} 形式的環境變數，找不到的換成空字串（之後視為未設定）
pub fn substitute_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_var_pattern()
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            lookup(var_name).unwrap_or_else(|| {
                tracing::warn!("Environment variable {} is not set; treating it as missing", var_name);
                String::new()
            })
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[analysis]
api_token = "bedrock-key"
region = "us-east-1"

[publish]
url = "https://example.atlassian.net"
username = "analyst@example.com"
api_token = "conf-token"
space_key = "BI"

[output]
directory = "./reports"
"#;

        let config = Settings::from_toml_str(toml_content).unwrap();

        assert_eq!(config.region(), "us-east-1");
        assert_eq!(config.output_dir(), "./reports");
        assert_eq!(config.publish_settings().unwrap().space_key, "BI");
        assert!(config.warehouse_settings().is_err());
    }

    #[test]
    #[serial]
    fn test_env_var_substitution() {
        std::env::set_var("HOWTO_TEST_CONFLUENCE_TOKEN", "from-env");

        let toml_content = r#"
[publish]
api_token = "${HOWTO_TEST_CONFLUENCE_TOKEN}"
username = "${HOWTO_TEST_UNSET_VARIABLE}"
"#;

        let config = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(config.publish.api_token.as_deref(), Some("from-env"));
        assert_eq!(config.publish.username, None);

        std::env::remove_var("HOWTO_TEST_CONFLUENCE_TOKEN");
    }

    #[test]
    #[serial]
    fn test_unset_reference_is_a_missing_credential() {
        std::env::remove_var("HOWTO_TEST_UNSET_TOKEN");

        let toml_content = r#"
[publish]
url = "https://example.atlassian.net"
username = "analyst@example.com"
api_token = "${HOWTO_TEST_UNSET_TOKEN}"
space_key = "BI"
"#;

        let config = Settings::from_toml_str(toml_content).unwrap();
        match config.publish_settings() {
            Err(BotError::MissingConfigError { field }) => {
                assert_eq!(field, "CONFLUENCE_API_TOKEN")
            }
            other => panic!("expected missing token, got {:?}", other),
        }
    }

    #[test]
    fn test_unset_reference_does_not_mask_environment() {
        let env = Settings::from_lookup(|key| {
            (key == "CONFLUENCE_API_TOKEN").then(|| "env-token".to_string())
        });
        let file = Settings::from_toml_str("[publish]\napi_token = \"${HOWTO_TEST_NEVER_SET}\"\n").unwrap();

        let merged = env.merge(file);
        assert_eq!(merged.publish.api_token.as_deref(), Some("env-token"));
    }

    #[test]
    fn test_substitute_with_lookup() {
        let out = substitute_env_vars("a=${A}, b=${B}", |name| {
            (name == "A").then(|| "1".to_string())
        });
        assert_eq!(out, "a=1, b=");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = Settings::from_toml_str("[publish\nurl = 1");
        assert!(matches!(
            result,
            Err(BotError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[warehouse]
endpoint = "https://redshift-data.us-west-2.amazonaws.com"
api_token = "token"
cluster_id = "analytics"
database = "dev"
user = "reporter"
max_polls = 5
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Settings::from_file(temp_file.path()).unwrap();
        let warehouse = config.warehouse_settings().unwrap();
        assert_eq!(warehouse.cluster_id, "analytics");
        assert_eq!(warehouse.max_polls, 5);
    }
}
