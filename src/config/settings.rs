use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_POLLS: u32 = 120;

/// Raw settings as read from the environment and/or a TOML file.
/// Every field is optional here; the typed accessors validate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisSection,
    pub warehouse: WarehouseSection,
    pub publish: PublishSection,
    pub quicksight: QuickSightSection,
    pub output: OutputSection,
    pub http: HttpSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub api_token: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub model_id: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseSection {
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub cluster_id: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_polls: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSection {
    pub url: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub space_key: Option<String>,
    pub parent_page_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickSightSection {
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_seconds: Option<u64>,
}

/// Validated settings for the analysis service.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub endpoint: String,
    pub api_token: String,
    pub model_id: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct WarehouseSettings {
    pub endpoint: String,
    pub api_token: String,
    pub cluster_id: String,
    pub database: String,
    pub user: String,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub url: String,
    pub username: String,
    pub api_token: String,
    pub space_key: String,
    pub parent_page_id: Option<String>,
    pub timeout_seconds: u64,
}

/// Validated settings for the dashboard catalog.
#[derive(Debug, Clone)]
pub struct QuickSightSettings {
    pub endpoint: String,
    pub api_token: String,
    pub account_id: String,
    pub timeout_seconds: u64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// 從環境變數載入設定（會先讀取 .env）
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Tests pass a map instead of mutating the process env.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));
        let parse_u64 = |key: &str| get(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            analysis: AnalysisSection {
                api_token: get("AWS_BEARER_TOKEN_BEDROCK"),
                region: get("AWS_REGION"),
                endpoint: get("BEDROCK_ENDPOINT"),
                model_id: get("BEDROCK_MODEL_ID"),
                temperature: get("BEDROCK_TEMPERATURE").and_then(|v| v.trim().parse().ok()),
            },
            warehouse: WarehouseSection {
                endpoint: get("REDSHIFT_DATA_ENDPOINT"),
                api_token: get("REDSHIFT_DATA_TOKEN"),
                cluster_id: get("REDSHIFT_CLUSTER_ID"),
                database: get("REDSHIFT_DATABASE"),
                user: get("REDSHIFT_USER"),
                poll_interval_ms: parse_u64("REDSHIFT_POLL_INTERVAL_MS"),
                max_polls: get("REDSHIFT_MAX_POLLS").and_then(|v| v.trim().parse().ok()),
            },
            publish: PublishSection {
                url: get("CONFLUENCE_URL"),
                username: get("CONFLUENCE_USERNAME"),
                api_token: get("CONFLUENCE_API_TOKEN"),
                space_key: get("CONFLUENCE_SPACE_KEY"),
                parent_page_id: get("CONFLUENCE_PARENT_PAGE_ID"),
            },
            quicksight: QuickSightSection {
                endpoint: get("QUICKSIGHT_ENDPOINT"),
                api_token: get("QUICKSIGHT_API_TOKEN"),
                account_id: get("QUICKSIGHT_ACCOUNT_ID"),
            },
            output: OutputSection {
                directory: get("HOWTO_OUTPUT_DIR"),
            },
            http: HttpSection {
                timeout_seconds: parse_u64("HOWTO_HTTP_TIMEOUT_SECS"),
            },
        }
    }

    /// Blank strings count as unset, so they never override another source.
    pub fn without_blank_values(mut self) -> Self {
        let fields = [
            &mut self.analysis.api_token,
            &mut self.analysis.region,
            &mut self.analysis.endpoint,
            &mut self.analysis.model_id,
            &mut self.warehouse.endpoint,
            &mut self.warehouse.api_token,
            &mut self.warehouse.cluster_id,
            &mut self.warehouse.database,
            &mut self.warehouse.user,
            &mut self.publish.url,
            &mut self.publish.username,
            &mut self.publish.api_token,
            &mut self.publish.space_key,
            &mut self.publish.parent_page_id,
            &mut self.quicksight.endpoint,
            &mut self.quicksight.api_token,
            &mut self.quicksight.account_id,
            &mut self.output.directory,
        ];
        for field in fields {
            *field = non_blank(field.take());
        }
        self
    }

    /// Values present in `other` win.
    pub fn merge(mut self, other: Settings) -> Self {
        fn overlay<T>(base: &mut Option<T>, top: Option<T>) {
            if top.is_some() {
                *base = top;
            }
        }

        let a = other.analysis;
        overlay(&mut self.analysis.api_token, a.api_token);
        overlay(&mut self.analysis.region, a.region);
        overlay(&mut self.analysis.endpoint, a.endpoint);
        overlay(&mut self.analysis.model_id, a.model_id);
        overlay(&mut self.analysis.temperature, a.temperature);

        let w = other.warehouse;
        overlay(&mut self.warehouse.endpoint, w.endpoint);
        overlay(&mut self.warehouse.api_token, w.api_token);
        overlay(&mut self.warehouse.cluster_id, w.cluster_id);
        overlay(&mut self.warehouse.database, w.database);
        overlay(&mut self.warehouse.user, w.user);
        overlay(&mut self.warehouse.poll_interval_ms, w.poll_interval_ms);
        overlay(&mut self.warehouse.max_polls, w.max_polls);

        let p = other.publish;
        overlay(&mut self.publish.url, p.url);
        overlay(&mut self.publish.username, p.username);
        overlay(&mut self.publish.api_token, p.api_token);
        overlay(&mut self.publish.space_key, p.space_key);
        overlay(&mut self.publish.parent_page_id, p.parent_page_id);

        let q = other.quicksight;
        overlay(&mut self.quicksight.endpoint, q.endpoint);
        overlay(&mut self.quicksight.api_token, q.api_token);
        overlay(&mut self.quicksight.account_id, q.account_id);

        overlay(&mut self.output.directory, other.output.directory);
        overlay(&mut self.http.timeout_seconds, other.http.timeout_seconds);
        self
    }

    pub fn region(&self) -> &str {
        self.analysis.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn output_dir(&self) -> &str {
        self.output.directory.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.http.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn analysis_settings(&self) -> Result<AnalysisSettings> {
        let api_token = validate_required_field("AWS_BEARER_TOKEN_BEDROCK", &self.analysis.api_token)?;
        let endpoint = self
            .analysis
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region()));
        validate_url("BEDROCK_ENDPOINT", &endpoint)?;

        let model_id = self
            .analysis
            .model_id
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
        validate_non_empty_string("BEDROCK_MODEL_ID", &model_id)?;

        let temperature = self.analysis.temperature.unwrap_or(0.1);
        validate_range("BEDROCK_TEMPERATURE", temperature, 0.0, 1.0)?;

        let timeout_seconds = self.timeout_seconds();
        validate_positive_number("HOWTO_HTTP_TIMEOUT_SECS", timeout_seconds, 1)?;

        Ok(AnalysisSettings {
            endpoint,
            api_token: api_token.to_string(),
            model_id,
            temperature,
            timeout_seconds,
        })
    }

    pub fn warehouse_settings(&self) -> Result<WarehouseSettings> {
        let w = &self.warehouse;
        let endpoint = validate_required_field("REDSHIFT_DATA_ENDPOINT", &w.endpoint)?;
        validate_url("REDSHIFT_DATA_ENDPOINT", endpoint)?;
        let api_token = validate_required_field("REDSHIFT_DATA_TOKEN", &w.api_token)?;
        let cluster_id = validate_required_field("REDSHIFT_CLUSTER_ID", &w.cluster_id)?;
        let database = validate_required_field("REDSHIFT_DATABASE", &w.database)?;
        let user = validate_required_field("REDSHIFT_USER", &w.user)?;

        let max_polls = w.max_polls.unwrap_or(DEFAULT_MAX_POLLS);
        validate_positive_number("REDSHIFT_MAX_POLLS", u64::from(max_polls), 1)?;

        Ok(WarehouseSettings {
            endpoint: endpoint.to_string(),
            api_token: api_token.to_string(),
            cluster_id: cluster_id.to_string(),
            database: database.to_string(),
            user: user.to_string(),
            poll_interval_ms: w.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            max_polls,
            timeout_seconds: self.timeout_seconds(),
        })
    }

    pub fn publish_settings(&self) -> Result<PublishSettings> {
        let p = &self.publish;
        let url = validate_required_field("CONFLUENCE_URL", &p.url)?;
        validate_url("CONFLUENCE_URL", url)?;
        let username = validate_required_field("CONFLUENCE_USERNAME", &p.username)?;
        let api_token = validate_required_field("CONFLUENCE_API_TOKEN", &p.api_token)?;
        let space_key = validate_required_field("CONFLUENCE_SPACE_KEY", &p.space_key)?;

        Ok(PublishSettings {
            url: url.to_string(),
            username: username.to_string(),
            api_token: api_token.to_string(),
            space_key: space_key.to_string(),
            parent_page_id: non_blank(p.parent_page_id.clone()),
            timeout_seconds: self.timeout_seconds(),
        })
    }

    pub fn quicksight_settings(&self) -> Result<QuickSightSettings> {
        let q = &self.quicksight;
        let api_token = validate_required_field("QUICKSIGHT_API_TOKEN", &q.api_token)?;
        let account_id = validate_required_field("QUICKSIGHT_ACCOUNT_ID", &q.account_id)?;
        let endpoint = q
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://quicksight.{}.amazonaws.com", self.region()));
        validate_url("QUICKSIGHT_ENDPOINT", &endpoint)?;

        Ok(QuickSightSettings {
            endpoint,
            api_token: api_token.to_string(),
            account_id: account_id.trim().to_string(),
            timeout_seconds: self.timeout_seconds(),
        })
    }
}

impl Validate for Settings {
    /// Checks values that are present; missing credentials only fail when a concern is requested.
    fn validate(&self) -> Result<()> {
        validate_path("HOWTO_OUTPUT_DIR", self.output_dir())?;
        validate_positive_number("HOWTO_HTTP_TIMEOUT_SECS", self.timeout_seconds(), 1)?;
        if let Some(endpoint) = &self.analysis.endpoint {
            validate_url("BEDROCK_ENDPOINT", endpoint)?;
        }
        if let Some(endpoint) = &self.warehouse.endpoint {
            validate_url("REDSHIFT_DATA_ENDPOINT", endpoint)?;
        }
        if let Some(url) = &self.publish.url {
            validate_url("CONFLUENCE_URL", url)?;
        }
        if let Some(endpoint) = &self.quicksight.endpoint {
            validate_url("QUICKSIGHT_ENDPOINT", endpoint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::BotError;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_publish_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CONFLUENCE_URL", "https://example.atlassian.net"),
            ("CONFLUENCE_USERNAME", "analyst@example.com"),
            ("CONFLUENCE_API_TOKEN", "token-123"),
            ("CONFLUENCE_SPACE_KEY", "BI"),
        ]
    }

    #[test]
    fn test_publish_settings_complete() {
        let settings = Settings::from_lookup(lookup_from(&full_publish_env()));
        let publish = settings.publish_settings().unwrap();
        assert_eq!(publish.space_key, "BI");
        assert_eq!(publish.parent_page_id, None);
        assert_eq!(publish.timeout_seconds, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_each_missing_publish_credential_is_rejected() {
        for missing in [
            "CONFLUENCE_URL",
            "CONFLUENCE_USERNAME",
            "CONFLUENCE_API_TOKEN",
            "CONFLUENCE_SPACE_KEY",
        ] {
            let env: Vec<_> = full_publish_env()
                .into_iter()
                .filter(|(k, _)| *k != missing)
                .collect();
            let settings = Settings::from_lookup(lookup_from(&env));
            match settings.publish_settings() {
                Err(BotError::MissingConfigError { field }) => assert_eq!(field, missing),
                other => panic!("expected missing {}, got {:?}", missing, other),
            }
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut env = full_publish_env();
        env[2] = ("CONFLUENCE_API_TOKEN", "  ");
        let settings = Settings::from_lookup(lookup_from(&env));
        assert!(matches!(
            settings.publish_settings(),
            Err(BotError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_each_missing_warehouse_credential_is_rejected() {
        let full = [
            ("REDSHIFT_DATA_ENDPOINT", "https://redshift-data.example.com"),
            ("REDSHIFT_DATA_TOKEN", "secret"),
            ("REDSHIFT_CLUSTER_ID", "analytics"),
            ("REDSHIFT_DATABASE", "dev"),
            ("REDSHIFT_USER", "reporter"),
        ];
        assert!(Settings::from_lookup(lookup_from(&full))
            .warehouse_settings()
            .is_ok());

        for (missing, _) in full {
            let env: Vec<_> = full.iter().copied().filter(|(k, _)| *k != missing).collect();
            let result = Settings::from_lookup(lookup_from(&env)).warehouse_settings();
            assert!(
                matches!(result, Err(BotError::MissingConfigError { ref field }) if field == missing),
                "expected {} to be reported missing",
                missing
            );
        }
    }

    #[test]
    fn test_analysis_defaults_from_region() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("AWS_BEARER_TOKEN_BEDROCK", "bedrock-key"),
            ("AWS_REGION", "eu-west-1"),
        ]));
        let analysis = settings.analysis_settings().unwrap();
        assert_eq!(
            analysis.endpoint,
            "https://bedrock-runtime.eu-west-1.amazonaws.com"
        );
        assert_eq!(analysis.model_id, DEFAULT_MODEL_ID);

        let missing = Settings::from_lookup(lookup_from(&[("AWS_REGION", "eu-west-1")]));
        assert!(missing.analysis_settings().is_err());
    }

    #[test]
    fn test_quicksight_settings() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("AWS_REGION", "eu-west-1"),
            ("QUICKSIGHT_API_TOKEN", "qs-token"),
            ("QUICKSIGHT_ACCOUNT_ID", "123456789012"),
        ]));
        let quicksight = settings.quicksight_settings().unwrap();
        assert_eq!(quicksight.endpoint, "https://quicksight.eu-west-1.amazonaws.com");
        assert_eq!(quicksight.account_id, "123456789012");

        let missing = Settings::from_lookup(lookup_from(&[("QUICKSIGHT_API_TOKEN", "qs-token")]));
        assert!(matches!(
            missing.quicksight_settings(),
            Err(BotError::MissingConfigError { ref field }) if field == "QUICKSIGHT_ACCOUNT_ID"
        ));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut env = full_publish_env();
        env[0] = ("CONFLUENCE_URL", "example.atlassian.net");
        let settings = Settings::from_lookup(lookup_from(&env));
        assert!(matches!(
            settings.publish_settings(),
            Err(BotError::InvalidConfigValueError { .. })
        ));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_merge_prefers_overlay_values() {
        let base = Settings::from_lookup(lookup_from(&full_publish_env()));
        let mut overlay = Settings::default();
        overlay.publish.space_key = Some("DOCS".to_string());
        overlay.output.directory = Some("reports".to_string());

        let merged = base.merge(overlay);
        assert_eq!(merged.publish.space_key.as_deref(), Some("DOCS"));
        assert_eq!(merged.publish.username.as_deref(), Some("analyst@example.com"));
        assert_eq!(merged.output_dir(), "reports");
    }
}
