use super::{build_client, ensure_success, trim_base};
use crate::config::PublishSettings;
use crate::core::images::media_type;
use crate::core::storage_format::{embed_images, to_storage};
use crate::core::{PageDraft, PublishedPage, Publisher};
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

const SERVICE: &str = "Confluence";

#[derive(Debug, Clone, Deserialize)]
pub struct PageVersion {
    pub number: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub webui: Option<String>,
}

/// Content 物件中會用到的欄位
#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub id: String,
    pub title: String,
    pub version: Option<PageVersion>,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

impl PageInfo {
    pub fn version_number(&self) -> u64 {
        self.version.as_ref().map(|v| v.number).unwrap_or(1)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct AttachmentResponse {
    #[serde(default)]
    results: Vec<AttachmentInfo>,
}

#[derive(Debug, Deserialize)]
struct AttachmentInfo {
    title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

/// Confluence Cloud REST v1 client with basic auth.
pub struct ConfluenceClient {
    client: Client,
    wiki_url: String,
    username: String,
    api_token: String,
    space_key: String,
    parent_page_id: Option<String>,
}

/// `https://x.atlassian.net` and `https://x.atlassian.net/wiki` both address the wiki root.
pub fn wiki_base(url: &str) -> String {
    let base = trim_base(url);
    if base.ends_with("/wiki") {
        base
    } else {
        format!("{}/wiki", base)
    }
}

/// Title shown above an embedded screenshot.
pub fn display_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.strip_prefix("Screenshot ").unwrap_or(&stem).to_string()
}

impl ConfluenceClient {
    pub fn new(settings: &PublishSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings.timeout_seconds)?,
            wiki_url: wiki_base(&settings.url),
            username: settings.username.clone(),
            api_token: settings.api_token.clone(),
            space_key: settings.space_key.clone(),
            parent_page_id: settings.parent_page_id.clone(),
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/{}", self.wiki_url, path)
    }

    fn page_url(&self, page: &PageInfo) -> String {
        let base = page.links.base.clone().unwrap_or_else(|| self.wiki_url.clone());
        match &page.links.webui {
            Some(webui) => format!("{}{}", base, webui),
            None => format!("{}/pages/viewpage.action?pageId={}", base, page.id),
        }
    }

    fn published(&self, page: &PageInfo) -> PublishedPage {
        PublishedPage {
            id: page.id.clone(),
            url: self.page_url(page),
            version: page.version_number(),
        }
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
        let response = ensure_success(SERVICE, response).await?;
        response
            .json()
            .await
            .map_err(|e| BotError::response_format(SERVICE, e.to_string()))
    }

    pub async fn test_connection(&self) -> Result<CurrentUser> {
        let response = self
            .client
            .get(self.api("user/current"))
            .basic_auth(&self.username, Some(&self.api_token))
            .send()
            .await?;
        let user: CurrentUser = Self::parse(response).await?;
        tracing::info!(
            "🔗 Connected to Confluence as {}",
            user.display_name.as_deref().unwrap_or(&self.username)
        );
        Ok(user)
    }

    pub async fn find_page_by_title(&self, title: &str) -> Result<Option<PageInfo>> {
        let response = self
            .client
            .get(self.api("content"))
            .basic_auth(&self.username, Some(&self.api_token))
            .query(&[
                ("title", title),
                ("spaceKey", self.space_key.as_str()),
                ("expand", "version"),
            ])
            .send()
            .await?;
        let search: SearchResponse = Self::parse(response).await?;
        Ok(search.results.into_iter().next())
    }

    fn page_body(&self, title: &str, storage: &str) -> Value {
        let mut body = json!({
            "type": "page",
            "title": title,
            "space": { "key": self.space_key },
            "body": {
                "storage": { "value": storage, "representation": "storage" }
            }
        });
        if let Some(parent) = &self.parent_page_id {
            body["ancestors"] = json!([{ "id": parent }]);
        }
        body
    }

    pub async fn create_page(&self, title: &str, storage: &str) -> Result<PageInfo> {
        let response = self
            .client
            .post(self.api("content"))
            .basic_auth(&self.username, Some(&self.api_token))
            .json(&self.page_body(title, storage))
            .send()
            .await?;
        let page: PageInfo = Self::parse(response).await?;
        tracing::info!("📄 Created page '{}' ({})", page.title, page.id);
        Ok(page)
    }

    /// `current_version` is the version on the server; the update stores `current_version + 1`.
    pub async fn update_page(
        &self,
        page_id: &str,
        title: &str,
        storage: &str,
        current_version: u64,
    ) -> Result<PageInfo> {
        let mut body = self.page_body(title, storage);
        body["id"] = json!(page_id);
        body["version"] = json!({ "number": current_version + 1 });

        let response = self
            .client
            .put(self.api(&format!("content/{}", page_id)))
            .basic_auth(&self.username, Some(&self.api_token))
            .json(&body)
            .send()
            .await?;
        let page: PageInfo = Self::parse(response).await?;
        tracing::info!("📝 Updated page '{}' to version {}", page.title, page.version_number());
        Ok(page)
    }

    /// Uploads `path` under `file_name` and returns the stored attachment name.
    pub async fn upload_attachment(&self, page_id: &str, path: &Path, file_name: &str) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(media_type(path))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.api(&format!("content/{}/child/attachment", page_id)))
            .basic_auth(&self.username, Some(&self.api_token))
            .header("X-Atlassian-Token", "no-check")
            .multipart(form)
            .send()
            .await?;
        let uploaded: AttachmentResponse = Self::parse(response).await?;
        let stored = uploaded
            .results
            .into_iter()
            .next()
            .map(|a| a.title)
            .unwrap_or_else(|| file_name.to_string());
        tracing::info!("🖼️ Uploaded attachment {}", stored);
        Ok(stored)
    }

    /// Failed uploads are logged and left out of the page.
    async fn upload_attachments(&self, page_id: &str, draft: &PageDraft) -> Vec<(String, String)> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut uploaded = Vec::new();

        for (i, path) in draft.attachments.iter().enumerate() {
            let original = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| format!("image_{}", i + 1));
            let unique = format!("{}_{}_{}", stamp, i + 1, original);

            match self.upload_attachment(page_id, path, &unique).await {
                Ok(stored) => uploaded.push((stored, display_name(path))),
                Err(e) => tracing::warn!("⚠️ Could not upload {}: {}", path.display(), e),
            }
        }
        uploaded
    }
}

#[async_trait]
impl Publisher for ConfluenceClient {
    /// Creates the page or updates the one with the same title, then attaches and embeds the images.
    async fn publish(&self, draft: &PageDraft) -> Result<PublishedPage> {
        let storage = to_storage(&draft.content);
        let existing = self.find_page_by_title(&draft.title).await?;

        let (page_id, version) = match existing {
            Some(page) => {
                tracing::info!("Updating existing page: {}", draft.title);
                (page.id.clone(), page.version_number())
            }
            None if draft.attachments.is_empty() => {
                let page = self.create_page(&draft.title, &storage).await?;
                return Ok(self.published(&page));
            }
            None => {
                // attachments need a page id, so create first and fill in afterwards
                let page = self.create_page(&draft.title, &storage).await?;
                (page.id.clone(), page.version_number())
            }
        };

        let uploaded = self.upload_attachments(&page_id, draft).await;
        let content = embed_images(&storage, &uploaded);
        let page = self
            .update_page(&page_id, &draft.title, &content, version)
            .await?;
        Ok(self.published(&page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiki_base_appends_wiki_once() {
        assert_eq!(wiki_base("https://acme.atlassian.net"), "https://acme.atlassian.net/wiki");
        assert_eq!(wiki_base("https://acme.atlassian.net/wiki/"), "https://acme.atlassian.net/wiki");
    }

    #[test]
    fn test_display_name_strips_screenshot_prefix() {
        assert_eq!(
            display_name(Path::new("/tmp/Screenshot 2025-06-01 at 10.00.png")),
            "2025-06-01 at 10.00"
        );
        assert_eq!(display_name(Path::new("sales_view.jpg")), "sales_view");
    }
}
