use super::{build_client, ensure_success, trim_base};
use crate::config::WarehouseSettings;
use crate::core::{QueryResult, Warehouse};
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SERVICE: &str = "Redshift Data API";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecuteStatementResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStatementResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetStatementResultResponse {
    #[serde(default)]
    column_metadata: Vec<ColumnMetadata>,
    #[serde(default)]
    records: Vec<Vec<Field>>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ColumnMetadata {
    name: String,
}

/// Data API 的欄位值，一次只會有一個欄位有值
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Field {
    string_value: Option<String>,
    long_value: Option<i64>,
    double_value: Option<f64>,
    boolean_value: Option<bool>,
    is_null: Option<bool>,
}

impl Field {
    fn into_value(self) -> Value {
        if self.is_null == Some(true) {
            return Value::Null;
        }
        if let Some(s) = self.string_value {
            return Value::String(s);
        }
        if let Some(n) = self.long_value {
            return json!(n);
        }
        if let Some(d) = self.double_value {
            return json!(d);
        }
        if let Some(b) = self.boolean_value {
            return Value::Bool(b);
        }
        Value::Null
    }
}

/// Runs SQL through the Redshift Data API: submit, poll, then page through the result.
pub struct WarehouseClient {
    client: Client,
    endpoint: String,
    api_token: String,
    cluster_id: String,
    database: String,
    user: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl WarehouseClient {
    pub fn new(settings: &WarehouseSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings.timeout_seconds)?,
            endpoint: trim_base(&settings.endpoint),
            api_token: settings.api_token.clone(),
            cluster_id: settings.cluster_id.clone(),
            database: settings.database.clone(),
            user: settings.user.clone(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_polls: settings.max_polls,
        })
    }

    async fn call<T: DeserializeOwned>(&self, operation: &str, body: Value) -> Result<T> {
        tracing::debug!("{} {}", SERVICE, operation);
        let response = self
            .client
            .post(format!("{}/", self.endpoint))
            .bearer_auth(&self.api_token)
            .header("X-Amz-Target", format!("RedshiftData.{}", operation))
            .header("Content-Type", CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| BotError::response_format(SERVICE, format!("{}: {}", operation, e)))
    }

    pub async fn execute_statement(&self, sql: &str) -> Result<String> {
        let response: ExecuteStatementResponse = self
            .call(
                "ExecuteStatement",
                json!({
                    "ClusterIdentifier": self.cluster_id,
                    "Database": self.database,
                    "DbUser": self.user,
                    "Sql": sql,
                }),
            )
            .await?;
        tracing::info!("📨 Query submitted, statement id {}", response.id);
        Ok(response.id)
    }

    /// Polls until the statement finishes. Fails on FAILED/ABORTED or after `max_polls` checks.
    pub async fn wait_for_statement(&self, id: &str) -> Result<()> {
        for attempt in 1..=self.max_polls {
            let response: DescribeStatementResponse = self
                .call("DescribeStatement", json!({ "Id": id }))
                .await?;

            match response.status.as_str() {
                "FINISHED" => {
                    tracing::info!("✅ Query finished after {} check(s)", attempt);
                    return Ok(());
                }
                "FAILED" | "ABORTED" => {
                    return Err(BotError::ProcessingError {
                        message: format!(
                            "Query {}: {}",
                            response.status.to_lowercase(),
                            response.error.unwrap_or_else(|| "no error detail".to_string())
                        ),
                    });
                }
                other => {
                    tracing::debug!("Query status {} (check {}/{})", other, attempt, self.max_polls);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        Err(BotError::ProcessingError {
            message: format!(
                "Query {} did not finish after {} status checks",
                id, self.max_polls
            ),
        })
    }

    pub async fn fetch_results(&self, id: &str) -> Result<QueryResult> {
        let mut result = QueryResult::default();
        let mut next_token: Option<String> = None;

        loop {
            let mut body = json!({ "Id": id });
            if let Some(token) = &next_token {
                body["NextToken"] = json!(token);
            }
            let page: GetStatementResultResponse = self.call("GetStatementResult", body).await?;

            if result.columns.is_empty() {
                result.columns = page.column_metadata.into_iter().map(|c| c.name).collect();
            }
            result.rows.extend(
                page.records
                    .into_iter()
                    .map(|row| row.into_iter().map(Field::into_value).collect::<Vec<_>>()),
            );

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        tracing::info!("📊 Retrieved {} row(s)", result.len());
        Ok(result)
    }
}

#[async_trait]
impl Warehouse for WarehouseClient {
    async fn run_query(&self, sql: &str) -> Result<QueryResult> {
        let id = self.execute_statement(sql).await?;
        self.wait_for_statement(&id).await?;
        self.fetch_results(&id).await
    }
}

/// Writes the result as CSV with a header row.
pub fn to_csv(result: &QueryResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&result.columns)?;
    for row in &result.rows {
        writer.write_record(row.iter().map(|value| match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))?;
    }
    let bytes = writer.into_inner().map_err(|e| BotError::ProcessingError {
        message: format!("Failed to finish CSV output: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| BotError::ProcessingError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_fields_map_to_json() {
        let row: Vec<Field> = serde_json::from_value(json!([
            {"stringValue": "01-2025"},
            {"longValue": 42},
            {"doubleValue": 1.5},
            {"booleanValue": true},
            {"isNull": true}
        ]))
        .unwrap();
        let values: Vec<Value> = row.into_iter().map(Field::into_value).collect();
        assert_eq!(values, vec![json!("01-2025"), json!(42), json!(1.5), json!(true), Value::Null]);
    }

    #[test]
    fn test_to_csv() {
        let result = QueryResult {
            columns: vec!["month".into(), "value".into()],
            rows: vec![vec![json!("01-2025"), json!(3.5)], vec![json!("02-2025"), Value::Null]],
        };
        assert_eq!(to_csv(&result).unwrap(), "month,value\n01-2025,3.5\n02-2025,\n");
    }
}
