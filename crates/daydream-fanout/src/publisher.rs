// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent delivery of a promoted prompt to every configured gateway.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use daydream_config::model::FanoutConfig;
use daydream_core::{AdapterType, DaydreamError, HealthStatus, PluginAdapter, PromptPublisher};

use crate::directives::Directives;
use crate::registry::GatewayRegistry;
use crate::retry::RetryPolicy;
use crate::workflow;

/// One target that did not accept an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetFailure {
    pub target: String,
    /// 1-based attempt number; 0 for targets that never resolved.
    pub attempt: u32,
    pub reason: String,
}

/// Outcome of one batch. Telemetry only: nothing here is surfaced upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    pub attempts: u32,
    pub delivered: Vec<String>,
    pub failures: Vec<TargetFailure>,
}

impl FanoutReport {
    pub fn succeeded(&self) -> bool {
        !self.delivered.is_empty()
    }
}

struct Credentials {
    user: String,
    password: SecretString,
}

/// Publishes every promoted prompt to a fixed set of stream targets.
///
/// The whole batch is retried only when an attempt reaches no target at
/// all; a partially delivered batch is final.
pub struct GatewayFanout {
    client: reqwest::Client,
    registry: GatewayRegistry,
    targets: Vec<String>,
    credentials: Option<Credentials>,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl GatewayFanout {
    pub fn new(config: &FanoutConfig) -> Result<Self, DaydreamError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DaydreamError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let credentials = match (&config.api_user, &config.api_password) {
            (Some(user), Some(password)) => Some(Credentials {
                user: user.clone(),
                password: SecretString::from(password.clone()),
            }),
            _ => None,
        };

        Ok(Self {
            client,
            registry: GatewayRegistry::new(config.gateways.clone()),
            targets: config.targets.clone(),
            credentials,
            retry: RetryPolicy::from_config(config),
            request_timeout: config.request_timeout(),
        })
    }

    /// Replaces the retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Delivers `prompt_text` to `targets`, retrying the batch while no
    /// target has accepted it.
    pub async fn publish_to(&self, prompt_text: &str, targets: &[String]) -> FanoutReport {
        let mut report = FanoutReport::default();

        let mut resolved = Vec::with_capacity(targets.len());
        for target in targets {
            match self.registry.update_url(target) {
                Some(url) => resolved.push((target.as_str(), url)),
                None => {
                    warn!(target = %target, "no gateway registered for target");
                    report.failures.push(TargetFailure {
                        target: target.clone(),
                        attempt: 0,
                        reason: "no gateway registered".to_string(),
                    });
                }
            }
        }
        if resolved.is_empty() {
            if !targets.is_empty() {
                error!("no fanout target resolves to a gateway; update dropped");
            }
            return report;
        }

        let directives = Directives::parse(prompt_text);
        let body = workflow::build_update(&directives);
        debug!(
            quality = directives.quality,
            creativity = directives.creativity,
            targets = resolved.len(),
            "fanning out prompt"
        );

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay(attempt - 1);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying fanout batch"
                );
                tokio::time::sleep(delay).await;
            }
            report.attempts += 1;

            let body = &body;
            let sends = resolved
                .iter()
                .map(|(target, url)| async move { (*target, self.send(url, body).await) });
            for (target, result) in join_all(sends).await {
                match result {
                    Ok(()) => report.delivered.push(target.to_string()),
                    Err(e) => {
                        warn!(
                            target = %target,
                            attempt = attempt + 1,
                            error = %e,
                            "gateway update failed"
                        );
                        report.failures.push(TargetFailure {
                            target: target.to_string(),
                            attempt: attempt + 1,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            if report.succeeded() {
                info!(
                    delivered = report.delivered.len(),
                    attempts = report.attempts,
                    "prompt delivered"
                );
                return report;
            }
        }

        error!(
            attempts = report.attempts,
            targets = resolved.len(),
            "fanout exhausted without reaching any gateway"
        );
        report
    }

    async fn send(&self, url: &str, body: &serde_json::Value) -> Result<(), DaydreamError> {
        let mut request = self.client.post(url).json(body);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.user, Some(creds.password.expose_secret()));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DaydreamError::Timeout {
                    duration: self.request_timeout,
                }
            } else {
                DaydreamError::Gateway {
                    message: format!("request to {url} failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error response".to_string());
        Err(DaydreamError::Gateway {
            message: format!("gateway returned {status}: {detail}"),
            source: None,
        })
    }
}

#[async_trait]
impl PluginAdapter for GatewayFanout {
    fn name(&self) -> &str {
        "gateway-fanout"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Publisher
    }

    async fn health_check(&self) -> Result<HealthStatus, DaydreamError> {
        if self.targets.is_empty() {
            return Ok(HealthStatus::Degraded("no fanout targets configured".into()));
        }
        let unresolved: Vec<&str> = self
            .targets
            .iter()
            .filter(|t| self.registry.update_url(t).is_none())
            .map(String::as_str)
            .collect();
        if unresolved.len() == self.targets.len() {
            Ok(HealthStatus::Unhealthy("no target resolves to a gateway".into()))
        } else if !unresolved.is_empty() {
            Ok(HealthStatus::Degraded(format!(
                "unresolved targets: {}",
                unresolved.join(", ")
            )))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), DaydreamError> {
        Ok(())
    }
}

#[async_trait]
impl PromptPublisher for GatewayFanout {
    async fn publish(&self, prompt_text: &str) {
        let report = self.publish_to(prompt_text, &self.targets).await;
        debug!(
            attempts = report.attempts,
            delivered = report.delivered.len(),
            failures = report.failures.len(),
            "fanout finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config(targets: &[&str]) -> FanoutConfig {
        FanoutConfig {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            gateways: BTreeMap::from([("known".to_string(), "gw.example.com".to_string())]),
            api_user: Some("user".into()),
            api_password: Some("secret".into()),
            ..FanoutConfig::default()
        }
    }

    #[test]
    fn credentials_are_held_as_secrets() {
        let fanout = GatewayFanout::new(&config(&["known"])).unwrap();
        let creds = fanout.credentials.as_ref().unwrap();
        assert_eq!(creds.user, "user");
        assert_eq!(creds.password.expose_secret(), "secret");
    }

    #[tokio::test]
    async fn unresolvable_targets_fail_once_without_requests() {
        let fanout = GatewayFanout::new(&config(&["ghost"])).unwrap();
        let report = fanout.publish_to("hello", fanout.targets()).await;
        assert_eq!(report.attempts, 0);
        assert!(report.delivered.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].target, "ghost");
        assert_eq!(report.failures[0].attempt, 0);
    }

    #[tokio::test]
    async fn health_reflects_target_resolution() {
        let none = GatewayFanout::new(&config(&[])).unwrap();
        assert!(matches!(none.health_check().await.unwrap(), HealthStatus::Degraded(_)));

        let ghost = GatewayFanout::new(&config(&["ghost"])).unwrap();
        assert!(matches!(ghost.health_check().await.unwrap(), HealthStatus::Unhealthy(_)));

        let mixed = GatewayFanout::new(&config(&["known", "ghost"])).unwrap();
        assert!(matches!(mixed.health_check().await.unwrap(), HealthStatus::Degraded(_)));

        let ok = GatewayFanout::new(&config(&["known"])).unwrap();
        assert_eq!(ok.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
