pub mod bedrock;
pub mod confluence;
pub mod quicksight;
pub mod storage;
pub mod warehouse;

pub use bedrock::BedrockClient;
pub use confluence::ConfluenceClient;
pub use quicksight::QuickSightClient;
pub use storage::LocalStorage;
pub use warehouse::WarehouseClient;

use crate::utils::error::{BotError, Result};
use std::time::Duration;

pub(crate) fn build_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?;
    Ok(client)
}

/// Non-2xx responses become a service error carrying the status and body.
pub(crate) async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    tracing::debug!("{} response status: {}", service, status);
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BotError::service(service, status.as_u16(), body))
}

pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
