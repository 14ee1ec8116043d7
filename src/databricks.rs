use tracing::debug;

use crate::error::ApiError;
use crate::types::{AccountConfig, AppRecord, AppsPage};

pub const PAGE_SIZE: u32 = 100;

/// Reply to a start request: the status and the raw body text.
#[derive(Debug, Clone)]
pub struct StartReply {
    pub success: bool,
    pub status: u16,
    pub body: String,
}

/// Thin client for the Databricks Apps REST API.
#[derive(Debug, Clone, Default)]
pub struct AppsClient {
    client: reqwest::Client,
}

impl AppsClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetches every page of apps for one account.
    pub async fn list_apps(&self, account: &AccountConfig) -> Result<Vec<AppRecord>, ApiError> {
        let url = format!("{}/api/2.0/apps", base_url(account));
        let transport = |source| ApiError::Transport {
            account: account.name.clone(),
            source,
        };

        let mut apps = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("page_size", PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let res = self
                .client
                .get(&url)
                .bearer_auth(&account.token)
                .query(&query)
                .send()
                .await
                .map_err(transport)?;

            let status = res.status();
            let body = res.text().await.map_err(transport)?;
            let remote = |body: String| ApiError::Remote {
                account: account.name.clone(),
                status: status.as_u16(),
                body,
            };
            if !status.is_success() {
                return Err(remote(body));
            }

            let page: AppsPage = match serde_json::from_str(&body) {
                Ok(page) => page,
                Err(e) => {
                    debug!("account [{}] undecodable apps page: {}", account.name, e);
                    return Err(remote(body));
                }
            };
            debug!("account [{}] fetched {} apps", account.name, page.apps.len());
            apps.extend(page.apps.into_iter().map(|app| app.into_record(&account.name)));

            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                break;
            }
        }
        Ok(apps)
    }

    /// Issues the start call for one app.
    pub async fn start_app(
        &self,
        account: &AccountConfig,
        app_name: &str,
    ) -> Result<StartReply, reqwest::Error> {
        let url = format!(
            "{}/api/2.0/apps/{}/start",
            base_url(account),
            urlencoding::encode(app_name)
        );
        let res = self
            .client
            .post(&url)
            .bearer_auth(&account.token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let success = res.status().is_success();
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(StartReply { success, status, body })
    }
}

fn base_url(account: &AccountConfig) -> &str {
    account.host.trim_end_matches('/')
}
