use super::{build_client, ensure_success, trim_base};
use crate::config::QuickSightSettings;
use crate::core::dashboard_metadata::referenced_dataset_ids;
use crate::core::{DashboardCatalog, DashboardDetails, DashboardSummary};
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

const SERVICE: &str = "QuickSight";
/// API 單頁上限
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DashboardPage {
    #[serde(default)]
    dashboard_summary_list: Vec<Value>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DataSetPage {
    #[serde(default)]
    data_set_summaries: Vec<Value>,
    #[serde(default)]
    next_token: Option<String>,
}

fn summary(value: &Value) -> Option<DashboardSummary> {
    use crate::core::dashboard_metadata::timestamp;
    Some(DashboardSummary {
        dashboard_id: value.get("DashboardId")?.as_str()?.to_string(),
        name: value
            .get("Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        created_time: timestamp(value.get("CreatedTime")),
        last_updated_time: timestamp(value.get("LastUpdatedTime")),
    })
}

/// Read-only client for the QuickSight REST API, reached through a bearer-token gateway.
pub struct QuickSightClient {
    client: Client,
    endpoint: String,
    api_token: String,
    account_id: String,
}

impl QuickSightClient {
    pub fn new(settings: &QuickSightSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings.timeout_seconds)?,
            endpoint: trim_base(&settings.endpoint),
            api_token: settings.api_token.clone(),
            account_id: settings.account_id.clone(),
        })
    }

    /// GET an account-scoped path. A 404 comes back as `None`.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Option<Value>> {
        let url = format!("{}/accounts/{}/{}", self.endpoint, self.account_id, path);
        tracing::debug!("{} GET {}", SERVICE, url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(query)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(SERVICE, response).await?;
        let text = response.text().await?;
        let value = serde_json::from_str(&text)
            .map_err(|e| BotError::response_format(SERVICE, format!("{}: {}", path, e)))?;
        Ok(Some(value))
    }

    fn page_query(limit: usize, next_token: &Option<String>) -> Vec<(&'static str, String)> {
        let mut query = vec![("max-results", limit.min(PAGE_SIZE).to_string())];
        if let Some(token) = next_token {
            query.push(("next-token", token.clone()));
        }
        query
    }

    /// Lists up to `max_results` dashboards, following `NextToken`.
    pub async fn list_dashboards(&self, max_results: usize) -> Result<Vec<DashboardSummary>> {
        let mut dashboards = Vec::new();
        let mut next_token: Option<String> = None;

        while dashboards.len() < max_results {
            let query = Self::page_query(max_results - dashboards.len(), &next_token);
            let Some(body) = self.get("dashboards", &query).await? else {
                break;
            };
            let page: DashboardPage = serde_json::from_value(body)
                .map_err(|e| BotError::response_format(SERVICE, e.to_string()))?;
            dashboards.extend(page.dashboard_summary_list.iter().filter_map(summary));

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        dashboards.truncate(max_results);
        tracing::info!("📋 Found {} dashboard(s)", dashboards.len());
        Ok(dashboards)
    }

    pub async fn get_dashboard(&self, dashboard_id: &str) -> Result<Option<Value>> {
        let body = self.get(&format!("dashboards/{}", dashboard_id), &[]).await?;
        Ok(body.and_then(|mut b| b.get_mut("Dashboard").map(Value::take)))
    }

    pub async fn get_dashboard_definition(&self, dashboard_id: &str) -> Result<Option<Value>> {
        let body = self
            .get(&format!("dashboards/{}/definition", dashboard_id), &[])
            .await?;
        Ok(body.and_then(|mut b| b.get_mut("Definition").map(Value::take)))
    }

    pub async fn list_datasets(&self, max_results: usize) -> Result<Vec<Value>> {
        let mut datasets = Vec::new();
        let mut next_token: Option<String> = None;

        while datasets.len() < max_results {
            let query = Self::page_query(max_results - datasets.len(), &next_token);
            let Some(body) = self.get("data-sets", &query).await? else {
                break;
            };
            let page: DataSetPage = serde_json::from_value(body)
                .map_err(|e| BotError::response_format(SERVICE, e.to_string()))?;
            datasets.extend(page.data_set_summaries);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        datasets.truncate(max_results);
        Ok(datasets)
    }

    pub async fn get_dataset(&self, dataset_id: &str) -> Result<Option<Value>> {
        let body = self.get(&format!("data-sets/{}", dataset_id), &[]).await?;
        Ok(body.and_then(|mut b| b.get_mut("DataSet").map(Value::take)))
    }

    pub async fn get_data_source(&self, data_source_id: &str) -> Result<Option<Value>> {
        let body = self
            .get(&format!("data-sources/{}", data_source_id), &[])
            .await?;
        Ok(body.and_then(|mut b| b.get_mut("DataSource").map(Value::take)))
    }
}

#[async_trait]
impl DashboardCatalog for QuickSightClient {
    /// Case-insensitive substring match on the dashboard name.
    async fn search_dashboards(&self, keyword: &str) -> Result<Vec<DashboardSummary>> {
        let needle = keyword.to_lowercase();
        let matches: Vec<DashboardSummary> = self
            .list_dashboards(usize::MAX)
            .await?
            .into_iter()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .collect();
        tracing::info!("🔍 {} dashboard(s) match '{}'", matches.len(), keyword);
        Ok(matches)
    }

    async fn dashboard_details(&self, dashboard_id: &str) -> Result<Option<DashboardDetails>> {
        let Some(dashboard) = self.get_dashboard(dashboard_id).await? else {
            return Ok(None);
        };

        // 沒有定義權限時仍可用基本資訊分析
        let definition = match self.get_dashboard_definition(dashboard_id).await {
            Ok(definition) => definition,
            Err(e) => {
                tracing::warn!("Could not read definition of {}: {}", dashboard_id, e);
                None
            }
        };

        let mut datasets = Vec::new();
        if let Some(definition) = &definition {
            for id in referenced_dataset_ids(definition) {
                match self.get_dataset(&id).await {
                    Ok(Some(dataset)) => datasets.push(dataset),
                    Ok(None) => tracing::warn!("Dataset {} not found", id),
                    Err(e) => tracing::warn!("Could not read dataset {}: {}", id, e),
                }
            }
        }

        Ok(Some(DashboardDetails {
            dashboard,
            definition,
            datasets,
        }))
    }
}
