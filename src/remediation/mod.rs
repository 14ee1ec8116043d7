use tracing::{error, info, warn};

use crate::databricks::AppsClient;
use crate::error::RemoteErrorBody;
use crate::report::StatusReport;
use crate::telegram::{templates, Notifier};
use crate::types::*;

/// Label used in the aggregate notification sent by `start_stopped`.
pub const MANUAL_START_OPERATION: &str = "manual start";

/// Inspects and restarts apps across accounts, one account at a time.
pub struct Remediator<'a> {
    apps: &'a AppsClient,
    notifier: &'a Notifier,
}

impl<'a> Remediator<'a> {
    pub fn new(apps: &'a AppsClient, notifier: &'a Notifier) -> Self {
        Self { apps, notifier }
    }

    /// Lists every account's apps. A failed account becomes one error entry.
    pub async fn status(&self, accounts: &[AccountConfig]) -> StatusReport {
        let mut report = StatusReport::new();
        for account in accounts {
            match self.apps.list_apps(account).await {
                Ok(apps) => report.add_apps(apps),
                Err(e) => {
                    error!("{}", e);
                    report.add_failure(&account.name, e.to_string());
                }
            }
        }
        report.finish()
    }

    /// Restarts every stopped app, announcing each one as offline first.
    pub async fn check_and_start(&self, accounts: &[AccountConfig]) -> Vec<OperationResult> {
        let mut results = Vec::new();
        for account in accounts {
            let apps = match self.apps.list_apps(account).await {
                Ok(apps) => apps,
                Err(e) => {
                    error!("checking account [{}] failed: {}", account.name, e);
                    results.push(OperationResult::account_error(&account.name, e.to_string()));
                    continue;
                }
            };

            for app in &apps {
                if app.state != RunState::Stopped {
                    results.push(OperationResult::healthy(app));
                    continue;
                }
                info!("app [{}] is stopped, restarting | account: {}", app.name, account.name);
                self.notifier
                    .notify(account, &templates::offline(&app.name, &app.id))
                    .await;
                results.push(self.restart(app, account).await);
            }
        }
        results
    }

    /// Restarts every stopped app and sends one summary per account that had any.
    pub async fn start_stopped(&self, accounts: &[AccountConfig]) -> Vec<OperationResult> {
        let mut results = Vec::new();
        for account in accounts {
            let apps = match self.apps.list_apps(account).await {
                Ok(apps) => apps,
                Err(e) => {
                    error!("starting apps for account [{}] failed: {}", account.name, e);
                    results.push(OperationResult::account_error(&account.name, e.to_string()));
                    continue;
                }
            };

            let stopped: Vec<&AppRecord> = apps.iter().filter(|a| a.state == RunState::Stopped).collect();
            info!("account [{}] has {} stopped apps", account.name, stopped.len());

            let mut account_results = Vec::with_capacity(stopped.len());
            for app in stopped {
                account_results.push(self.restart(app, account).await);
            }

            if !account_results.is_empty() {
                self.notifier
                    .notify(
                        account,
                        &templates::manual_operation(MANUAL_START_OPERATION, &account_results),
                    )
                    .await;
            }
            results.extend(account_results);
        }
        results
    }

    /// Issues one start call and sends exactly one notification about it.
    pub async fn restart(&self, app: &AppRecord, account: &AccountConfig) -> OperationResult {
        match self.apps.start_app(account, &app.name).await {
            Ok(reply) if reply.success => {
                info!("app [{}] started | account: {}", app.name, account.name);
                self.notifier
                    .notify(account, &templates::start_succeeded(&app.name, &app.id))
                    .await;
                OperationResult::for_app(&account.name, app, Outcome::Started, None)
            }
            Ok(reply) => {
                let message = RemoteErrorBody::parse(&reply.body).into_message();
                warn!(
                    "app [{}] failed to start ({}): {} | account: {}",
                    app.name, reply.status, message, account.name
                );
                self.notifier
                    .notify(account, &templates::start_failed(&app.name, &app.id, &message))
                    .await;
                OperationResult::for_app(&account.name, app, Outcome::StartFailed, Some(message))
            }
            Err(e) => {
                let message = e.to_string();
                error!(
                    "start request for app [{}] errored: {} | account: {}",
                    app.name, message, account.name
                );
                self.notifier
                    .notify(account, &templates::start_failed(&app.name, &app.id, &message))
                    .await;
                OperationResult::for_app(&account.name, app, Outcome::Error, Some(message))
            }
        }
    }
}
