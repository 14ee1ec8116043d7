use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Where a resolved account field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Environment,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSource {
    pub host: ValueSource,
    pub token: ValueSource,
}

/// One tenant's control API endpoint and credential, plus optional chat settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountConfig {
    pub name: String,
    pub host: String,
    pub token: String,
    pub chat_id: Option<String>,
    pub bot_token: Option<String>,
    pub source: AccountSource,
}

impl AccountConfig {
    pub fn notifications_enabled(&self) -> bool {
        self.chat_id.is_some() && self.bot_token.is_some()
    }
}

/// A code-level account record used when the environment is silent for a slot.
#[derive(Debug, Clone, Copy)]
pub struct DefaultAccount {
    pub name: &'static str,
    pub host: &'static str,
    pub token: &'static str,
    pub chat_id: &'static str,
    pub bot_token: &'static str,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub bind_addr: std::net::SocketAddr,
    pub check_interval_secs: u64,
    pub telegram_api_base: String,
    pub run_once: bool,
}

/// Platform-reported lifecycle state of an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Active,
    Stopped,
    Unknown,
    Other(String),
}

impl RunState {
    pub fn from_platform(state: Option<&str>) -> Self {
        match state {
            None | Some("") => RunState::Unknown,
            Some("ACTIVE") => RunState::Active,
            Some("STOPPED") => RunState::Stopped,
            Some("UNKNOWN") => RunState::Unknown,
            Some(other) => RunState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunState::Active => "ACTIVE",
            RunState::Stopped => "STOPPED",
            RunState::Unknown => "UNKNOWN",
            RunState::Other(s) => s,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RunState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub account: String,
    pub name: String,
    pub id: String,
    pub state: RunState,
    pub url: Option<String>,
    pub created_at: Option<String>,
}

/// Raw app shape returned by `GET /api/2.0/apps`.
#[derive(Debug, Deserialize)]
pub struct RemoteApp {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub compute_status: Option<ComputeStatus>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub creation_timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComputeStatus {
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppsPage {
    #[serde(default)]
    pub apps: Vec<RemoteApp>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl RemoteApp {
    pub fn into_record(self, account: &str) -> AppRecord {
        AppRecord {
            account: account.to_string(),
            state: RunState::from_platform(
                self.compute_status.as_ref().and_then(|c| c.state.as_deref()),
            ),
            name: self.name,
            id: self.id.unwrap_or_default(),
            url: self.url,
            created_at: self.creation_timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Healthy,
    Started,
    StartFailed,
    Error,
}

impl Outcome {
    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::StartFailed | Outcome::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    pub status: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_state: Option<RunState>,
}

impl OperationResult {
    pub fn healthy(app: &AppRecord) -> Self {
        Self {
            account: app.account.clone(),
            app: Some(app.name.clone()),
            app_id: Some(app.id.clone()),
            status: Outcome::Healthy,
            error: None,
            compute_state: Some(app.state.clone()),
        }
    }

    pub fn for_app(account: &str, app: &AppRecord, status: Outcome, error: Option<String>) -> Self {
        Self {
            account: account.to_string(),
            app: Some(app.name.clone()),
            app_id: Some(app.id.clone()),
            status,
            error,
            compute_state: None,
        }
    }

    /// Result recorded when an account's app listing fails.
    pub fn account_error(account: &str, error: String) -> Self {
        Self {
            account: account.to_string(),
            app: None,
            app_id: None,
            status: Outcome::Error,
            error: Some(error),
            compute_state: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountFailure {
    pub account: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusEntry {
    App(AppRecord),
    Failed(AccountFailure),
}

impl StatusEntry {
    pub fn account(&self) -> &str {
        match self {
            StatusEntry::App(app) => &app.account,
            StatusEntry::Failed(f) => &f.account,
        }
    }

    pub fn state(&self) -> Option<&RunState> {
        match self {
            StatusEntry::App(app) => Some(&app.state),
            StatusEntry::Failed(_) => None,
        }
    }
}

#[derive(Serialize)]
pub struct TelegramMessage<'a> {
    pub chat_id: &'a str,
    pub text: String,
    pub parse_mode: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_state_is_unknown() {
        let app: RemoteApp = serde_json::from_value(serde_json::json!({
            "name": "etl",
            "id": "a1"
        }))
        .unwrap();
        let record = app.into_record("acct");
        assert_eq!(record.state, RunState::Unknown);
        assert_eq!(record.account, "acct");

        let app: RemoteApp = serde_json::from_value(serde_json::json!({
            "name": "etl",
            "compute_status": {}
        }))
        .unwrap();
        assert_eq!(app.into_record("acct").state, RunState::Unknown);
    }

    #[test]
    fn test_platform_states() {
        assert_eq!(RunState::from_platform(Some("ACTIVE")), RunState::Active);
        assert_eq!(RunState::from_platform(Some("STOPPED")), RunState::Stopped);
        assert_eq!(
            RunState::from_platform(Some("STARTING")),
            RunState::Other("STARTING".to_string())
        );
        assert_eq!(RunState::Other("ERROR".into()).to_string(), "ERROR");
    }

    #[test]
    fn test_operation_result_serialization() {
        let err = OperationResult::account_error("a", "boom".into());
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v, serde_json::json!({"account": "a", "status": "error", "error": "boom"}));

        let app = AppRecord {
            account: "a".into(),
            name: "web".into(),
            id: "1".into(),
            state: RunState::Active,
            url: None,
            created_at: None,
        };
        let v = serde_json::to_value(OperationResult::healthy(&app)).unwrap();
        assert_eq!(v["status"], "healthy");
        assert_eq!(v["appId"], "1");
        assert_eq!(v["computeState"], "ACTIVE");
    }
}
