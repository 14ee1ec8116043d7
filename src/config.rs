use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::debug;

use crate::types::{AccountConfig, AccountSource, DefaultAccount, ServiceSettings, ValueSource};

const NOT_SET: &str = "not set";

/// Upper bound on the per-account slot scan.
pub const MAX_ACCOUNT_SLOTS: usize = 32;

/// Accounts used for any slot the environment leaves empty.
pub const DEFAULT_ACCOUNTS: &[DefaultAccount] = &[];

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;

    /// Like `get_var`, but treats an empty value as unset.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get_var(key).filter(|v| !v.is_empty())
    }
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default, Clone)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Per-slot environment inputs, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSlot {
    pub host: Option<String>,
    pub token: Option<String>,
    pub name: Option<String>,
    pub chat_id: Option<String>,
    pub bot_token: Option<String>,
}

impl AccountSlot {
    fn read<E: EnvironmentProvider + ?Sized>(env: &E, index: usize) -> Self {
        Self {
            host: env.get_non_empty(&format!("DATABRICKS_HOST_{index}")),
            token: env.get_non_empty(&format!("DATABRICKS_TOKEN_{index}")),
            name: env.get_non_empty(&format!("ACCOUNT_NAME_{index}")),
            chat_id: env.get_non_empty(&format!("CHAT_ID_{index}")),
            bot_token: env.get_non_empty(&format!("BOT_TOKEN_{index}")),
        }
    }
}

/// Reads slots `1..=MAX_ACCOUNT_SLOTS`, stopping before the first slot that has
/// neither an environment host nor a default record.
pub fn read_slots<E: EnvironmentProvider + ?Sized>(
    env: &E,
    defaults: &[DefaultAccount],
) -> Vec<AccountSlot> {
    let mut slots = Vec::new();
    for index in 1..=MAX_ACCOUNT_SLOTS {
        let slot = AccountSlot::read(env, index);
        if slot.host.is_none() && defaults.get(index - 1).is_none() {
            break;
        }
        slots.push(slot);
    }
    slots
}

pub fn resolve_accounts<E: EnvironmentProvider + ?Sized>(env: &E) -> Vec<AccountConfig> {
    resolve_accounts_with_defaults(env, DEFAULT_ACCOUNTS)
}

pub fn resolve_accounts_with_defaults<E: EnvironmentProvider + ?Sized>(
    env: &E,
    defaults: &[DefaultAccount],
) -> Vec<AccountConfig> {
    let global_chat_id = env.get_non_empty("CHAT_ID");
    let global_bot_token = env.get_non_empty("BOT_TOKEN");

    let mut accounts = Vec::new();
    for (i, slot) in read_slots(env, defaults).into_iter().enumerate() {
        let index = i + 1;
        let default = defaults.get(i);
        let from_default = |pick: fn(&DefaultAccount) -> &'static str| {
            default.map(pick).filter(|v| !v.is_empty()).map(str::to_string)
        };

        let host_source = source_of(&slot.host);
        let token_source = source_of(&slot.token);
        let host = slot.host.or_else(|| from_default(|d| d.host));
        let token = slot.token.or_else(|| from_default(|d| d.token));
        let (Some(host), Some(token)) = (host, token) else {
            debug!("account slot {} has no host/token pair, skipping", index);
            continue;
        };

        let chat_id = slot
            .chat_id
            .or_else(|| from_default(|d| d.chat_id))
            .or_else(|| global_chat_id.clone());
        let bot_token = slot
            .bot_token
            .or_else(|| from_default(|d| d.bot_token))
            .or_else(|| global_bot_token.clone());
        let name = slot
            .name
            .or_else(|| from_default(|d| d.name))
            .unwrap_or_else(|| format!("Account {index}"));

        accounts.push(AccountConfig {
            name,
            host,
            token,
            chat_id,
            bot_token,
            source: AccountSource {
                host: host_source,
                token: token_source,
            },
        });
    }
    accounts
}

fn source_of(value: &Option<String>) -> ValueSource {
    if value.is_some() {
        ValueSource::Environment
    } else {
        ValueSource::Default
    }
}

/// Account view safe to expose over `GET /config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactedAccount {
    pub name: String,
    pub host: String,
    pub token: String,
    pub chat_id: String,
    pub bot_token: String,
    pub source: AccountSource,
}

impl From<&AccountConfig> for RedactedAccount {
    fn from(account: &AccountConfig) -> Self {
        Self {
            name: account.name.clone(),
            host: account.host.clone(),
            token: format!("dapi...{}", last_chars(&account.token, 4)),
            chat_id: account.chat_id.clone().unwrap_or_else(|| NOT_SET.to_string()),
            bot_token: account
                .bot_token
                .as_deref()
                .map(|t| format!("...{}", last_chars(t, 4)))
                .unwrap_or_else(|| NOT_SET.to_string()),
            source: account.source,
        }
    }
}

fn last_chars(s: &str, n: usize) -> &str {
    let start = s.char_indices().rev().nth(n - 1).map(|(i, _)| i).unwrap_or(0);
    &s[start..]
}

pub fn load_settings() -> Result<ServiceSettings> {
    load_settings_with_env(&SystemEnvironment)
}

pub fn load_settings_with_env<E: EnvironmentProvider + ?Sized>(env: &E) -> Result<ServiceSettings> {
    let bind_addr: SocketAddr = env
        .get_var("BIND_ADDR")
        .unwrap_or_else(|| "0.0.0.0:8080".to_string())
        .parse()
        .context("Invalid BIND_ADDR")?;

    let check_interval_secs: u64 = env
        .get_var("CHECK_INTERVAL_SECS")
        .unwrap_or_else(|| "0".to_string())
        .parse()
        .context("Invalid CHECK_INTERVAL_SECS")?;

    let telegram_api_base = env
        .get_non_empty("TELEGRAM_API_BASE")
        .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string())
        .trim_end_matches('/')
        .to_string();

    let run_once = env
        .get_var("RUN_ONCE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false);

    Ok(ServiceSettings {
        bind_addr,
        check_interval_secs,
        telegram_api_base,
        run_once,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_DEFAULTS: &[DefaultAccount] = &[
        DefaultAccount {
            name: "default-one",
            host: "https://one.cloud.databricks.com",
            token: "dapi-one",
            chat_id: "",
            bot_token: "",
        },
        DefaultAccount {
            name: "default-two",
            host: "https://two.cloud.databricks.com",
            token: "dapi-two",
            chat_id: "200",
            bot_token: "bot-two",
        },
    ];

    fn two_slot_env() -> MockEnvironment {
        MockEnvironment::new()
            .with_var("DATABRICKS_HOST_1", "https://a.cloud.databricks.com")
            .with_var("DATABRICKS_TOKEN_1", "dapi-a")
            .with_var("ACCOUNT_NAME_1", "alpha")
            .with_var("DATABRICKS_HOST_2", "https://b.cloud.databricks.com")
            .with_var("DATABRICKS_TOKEN_2", "dapi-b")
    }

    #[test]
    fn test_two_slots_in_order() {
        let accounts = resolve_accounts_with_defaults(&two_slot_env(), &[]);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "alpha");
        assert_eq!(accounts[0].host, "https://a.cloud.databricks.com");
        assert_eq!(accounts[1].name, "Account 2");
        assert_eq!(accounts[1].token, "dapi-b");
        assert_eq!(accounts[1].source.host, ValueSource::Environment);
    }

    #[test]
    fn test_scan_stops_at_first_empty_slot() {
        // slot 4 is unreachable because slot 3 is the sentinel
        let env = two_slot_env()
            .with_var("DATABRICKS_HOST_4", "https://d.cloud.databricks.com")
            .with_var("DATABRICKS_TOKEN_4", "dapi-d");
        let accounts = resolve_accounts_with_defaults(&env, &[]);
        assert_eq!(accounts.len(), 2);
    }

    #[test]
    fn test_environment_wins_over_default() {
        let env = MockEnvironment::new().with_var("DATABRICKS_HOST_1", "https://env.cloud.databricks.com");
        let accounts = resolve_accounts_with_defaults(&env, TWO_DEFAULTS);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].host, "https://env.cloud.databricks.com");
        assert_eq!(accounts[0].token, "dapi-one");
        assert_eq!(accounts[0].name, "default-one");
        assert_eq!(accounts[0].source.host, ValueSource::Environment);
        assert_eq!(accounts[0].source.token, ValueSource::Default);
        assert_eq!(accounts[1].host, "https://two.cloud.databricks.com");
        assert_eq!(accounts[1].source.host, ValueSource::Default);
    }

    #[test]
    fn test_partial_slot_is_skipped() {
        let env = MockEnvironment::new()
            .with_var("DATABRICKS_HOST_1", "https://a.cloud.databricks.com")
            .with_var("DATABRICKS_HOST_2", "https://b.cloud.databricks.com")
            .with_var("DATABRICKS_TOKEN_2", "dapi-b");
        let accounts = resolve_accounts_with_defaults(&env, &[]);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Account 2");
    }

    #[test]
    fn test_token_without_host_terminates_scan() {
        let env = MockEnvironment::new()
            .with_var("DATABRICKS_TOKEN_1", "dapi-a")
            .with_var("DATABRICKS_HOST_2", "https://b.cloud.databricks.com")
            .with_var("DATABRICKS_TOKEN_2", "dapi-b");
        assert!(resolve_accounts_with_defaults(&env, &[]).is_empty());
    }

    #[test]
    fn test_empty_values_are_absent() {
        let env = two_slot_env().with_var("DATABRICKS_HOST_1", "");
        assert!(resolve_accounts_with_defaults(&env, &[]).is_empty());
    }

    #[test]
    fn test_notification_fallbacks() {
        let env = two_slot_env()
            .with_var("CHAT_ID_1", "111")
            .with_var("BOT_TOKEN_1", "bot-one")
            .with_var("CHAT_ID", "999")
            .with_var("BOT_TOKEN", "bot-global");
        let accounts = resolve_accounts_with_defaults(&env, &[]);
        assert_eq!(accounts[0].chat_id.as_deref(), Some("111"));
        assert_eq!(accounts[0].bot_token.as_deref(), Some("bot-one"));
        assert_eq!(accounts[1].chat_id.as_deref(), Some("999"));
        assert_eq!(accounts[1].bot_token.as_deref(), Some("bot-global"));
        assert!(accounts[1].notifications_enabled());

        // default record beats the global value
        let env = MockEnvironment::new().with_var("CHAT_ID", "999");
        let accounts = resolve_accounts_with_defaults(&env, TWO_DEFAULTS);
        assert_eq!(accounts[0].chat_id.as_deref(), Some("999"));
        assert_eq!(accounts[0].bot_token, None);
        assert!(!accounts[0].notifications_enabled());
        assert_eq!(accounts[1].chat_id.as_deref(), Some("200"));
    }

    #[test]
    fn test_read_slots_is_bounded() {
        let mut env = MockEnvironment::new();
        for i in 1..=MAX_ACCOUNT_SLOTS + 5 {
            env.set_var(format!("DATABRICKS_HOST_{i}"), "https://x.cloud.databricks.com");
        }
        assert_eq!(read_slots(&env, &[]).len(), MAX_ACCOUNT_SLOTS);
    }

    #[test]
    fn test_redacted_account() {
        let env = two_slot_env()
            .with_var("CHAT_ID_1", "111")
            .with_var("BOT_TOKEN_1", "123456:ABCDEF");
        let accounts = resolve_accounts_with_defaults(&env, &[]);

        let view = RedactedAccount::from(&accounts[0]);
        assert_eq!(view.token, "dapi...pi-a");
        assert_eq!(view.chat_id, "111");
        assert_eq!(view.bot_token, "...CDEF");
        assert_eq!(view.host, "https://a.cloud.databricks.com");

        let view = RedactedAccount::from(&accounts[1]);
        assert_eq!(view.chat_id, "not set");
        assert_eq!(view.bot_token, "not set");
    }

    #[test]
    fn test_last_chars_short_input() {
        assert_eq!(last_chars("ab", 4), "ab");
        assert_eq!(last_chars("", 4), "");
        assert_eq!(last_chars("дапи-ключ", 4), "ключ");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = load_settings_with_env(&MockEnvironment::new()).unwrap();
        assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(settings.check_interval_secs, 0);
        assert_eq!(settings.telegram_api_base, DEFAULT_TELEGRAM_API_BASE);
        assert!(!settings.run_once);
    }

    #[test]
    fn test_settings_with_env() {
        let env = MockEnvironment::new()
            .with_var("BIND_ADDR", "127.0.0.1:9000")
            .with_var("CHECK_INTERVAL_SECS", "600")
            .with_var("TELEGRAM_API_BASE", "http://localhost:1234/")
            .with_var("RUN_ONCE", "true");
        let settings = load_settings_with_env(&env).unwrap();
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.check_interval_secs, 600);
        assert_eq!(settings.telegram_api_base, "http://localhost:1234");
        assert!(settings.run_once);
    }

    #[test]
    fn test_settings_invalid_values() {
        let env = MockEnvironment::new().with_var("BIND_ADDR", "not-an-addr");
        let result = load_settings_with_env(&env);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("BIND_ADDR"));

        let env = MockEnvironment::new().with_var("CHECK_INTERVAL_SECS", "soon");
        let result = load_settings_with_env(&env);
        assert!(result.unwrap_err().to_string().contains("CHECK_INTERVAL_SECS"));
    }
}
