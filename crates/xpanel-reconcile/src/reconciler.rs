//! Expiry and quota enforcement.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};
use xpanel_config::Config;
use xpanel_core::Client;
use xpanel_engine::{
    Direction, EngineControl, EngineError, Systemctl, TrafficStats, XrayApi, resolve_binary,
};
use xpanel_render::Synthesizer;
use xpanel_store::{FlatFileStore, RecordStore};

use crate::error::ReconcileError;
use crate::report::{PassReport, UsageUpdate};

/// Applies expiry and quota decisions to the record store and brings the
/// engine in line afterwards.
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    synthesizer: Synthesizer,
    stats: Arc<dyn TrafficStats>,
    control: Arc<dyn EngineControl>,
    stats_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        synthesizer: Synthesizer,
        stats: Arc<dyn TrafficStats>,
        control: Arc<dyn EngineControl>,
    ) -> Self {
        Self {
            store,
            synthesizer,
            stats,
            control,
            stats_timeout: Duration::from_secs(xpanel_core::DEFAULT_STATS_TIMEOUT_SECS),
        }
    }

    /// Bound for a single counter read.
    pub fn with_stats_timeout(mut self, timeout: Duration) -> Self {
        self.stats_timeout = timeout;
        self
    }

    /// Wire the flat-file store, the `xray` stats API and `systemctl` from
    /// the panel configuration.
    pub fn from_config(config: &Config) -> Result<Self, ReconcileError> {
        let store = FlatFileStore::new(&config.store.clients_path, &config.store.inbounds_path);
        let binary = resolve_binary(config.engine.binary.as_deref().map(Path::new))?;
        let stats_timeout = Duration::from_secs(config.reconcile.stats_timeout_secs);
        let stats = XrayApi::new(binary).with_timeout(stats_timeout);
        let control = Systemctl::new(&config.engine.service).with_timeout(Duration::from_secs(
            config.reconcile.control_timeout_secs,
        ));

        Ok(Self::new(
            Arc::new(store),
            Synthesizer::from_config(&config.engine),
            Arc::new(stats),
            Arc::new(control),
        )
        .with_stats_timeout(stats_timeout))
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Delete every client whose expiry lies before `now`.
    pub async fn expiry_pass(&self, now: NaiveDateTime) -> Result<PassReport, ReconcileError> {
        let clients = unique_clients(self.store.list_clients().await?.into_records());
        let mut report = PassReport {
            checked: clients.len(),
            ..Default::default()
        };

        for client in clients.iter().filter(|c| c.is_expired(now)) {
            match self.store.delete_client(&client.username).await {
                Ok(0) => {}
                Ok(_) => {
                    info!(
                        username = %client.username,
                        expiry = %client.expiry,
                        "expired client removed"
                    );
                    report.removed.push(client.username.clone());
                }
                Err(e) => {
                    warn!(username = %client.username, error = %e, "failed to remove expired client");
                    report.fail(Some(&client.username), e);
                }
            }
        }

        self.apply(&mut report, now).await;
        Ok(report)
    }

    /// Fold fresh traffic into `used` and delete clients over their quota.
    ///
    /// Counter reads are destructive, so every non-zero delta is written to
    /// the store before the client is judged.
    pub async fn quota_pass(&self, now: NaiveDateTime) -> Result<PassReport, ReconcileError> {
        let clients = unique_clients(self.store.list_clients().await?.into_records());
        let mut report = PassReport {
            checked: clients.len(),
            ..Default::default()
        };

        for mut client in clients {
            let delta = self.fetch_delta(&client.username, &mut report).await;

            if delta > 0 {
                let mut add = |c: &mut Client| c.used += delta as f64;
                let result = self.store.update_client(&client.username, &mut add).await;
                match result {
                    Ok(updated) => {
                        debug!(username = %client.username, bytes = delta, used = updated.used, "usage recorded");
                        report.usage_updates.push(UsageUpdate {
                            username: client.username.clone(),
                            bytes: delta,
                            used: updated.used,
                        });
                        client = updated;
                    }
                    Err(e) => {
                        warn!(
                            username = %client.username,
                            bytes = delta,
                            error = %e,
                            "failed to record usage"
                        );
                        report.fail(Some(&client.username), e);
                        client.used += delta as f64;
                    }
                }
            }

            // expired accounts are left to the expiry pass
            if !client.is_over_quota() || client.is_expired(now) {
                continue;
            }

            match self.store.delete_client(&client.username).await {
                Ok(0) => {}
                Ok(_) => {
                    info!(
                        username = %client.username,
                        used = client.used,
                        quota_gb = client.quota,
                        "client over quota removed"
                    );
                    report.removed.push(client.username.clone());
                }
                Err(e) => {
                    warn!(username = %client.username, error = %e, "failed to remove client over quota");
                    report.fail(Some(&client.username), e);
                }
            }
        }

        self.apply(&mut report, now).await;
        Ok(report)
    }

    /// Expiry pass followed by quota pass.
    pub async fn run_all(&self, now: NaiveDateTime) -> Result<PassReport, ReconcileError> {
        let mut report = self.expiry_pass(now).await?;
        report.merge(self.quota_pass(now).await?);
        Ok(report)
    }

    /// [`run_all`](Self::run_all) at the current local time.
    pub async fn run_now(&self) -> Result<PassReport, ReconcileError> {
        self.run_all(Local::now().naive_local()).await
    }

    /// Uplink plus downlink since the last read. Failed reads count as zero
    /// for this cycle.
    async fn fetch_delta(&self, username: &str, report: &mut PassReport) -> u64 {
        let mut total = 0u64;
        for direction in Direction::BOTH {
            let read = tokio::time::timeout(
                self.stats_timeout,
                self.stats.fetch_and_reset(username, direction),
            )
            .await
            .unwrap_or_else(|_| {
                Err(EngineError::Timeout {
                    program: "stats".to_string(),
                    timeout: self.stats_timeout,
                })
            });

            match read {
                Ok(bytes) => total = total.saturating_add(bytes),
                Err(e) => {
                    warn!(%username, %direction, error = %e, "traffic counter unavailable");
                    report.fail(Some(username), e);
                }
            }
        }
        total
    }

    /// Resync and restart when the pass removed anyone.
    async fn apply(&self, report: &mut PassReport, now: NaiveDateTime) {
        if report.removed.is_empty() {
            return;
        }

        match self.synthesizer.sync_at(self.store.as_ref(), now).await {
            Ok(_) => report.resynced = true,
            Err(e) => {
                warn!(error = %e, "engine config resync failed, restart skipped");
                report.fail(None, e);
                return;
            }
        }

        match self.control.restart().await {
            Ok(()) => {
                info!(removed = report.removed.len(), "engine restarted");
                report.restarted = true;
            }
            Err(e) => {
                warn!(error = %e, "engine restart failed");
                report.fail(None, e);
            }
        }
    }
}

/// First record per username, in storage order.
fn unique_clients(clients: Vec<Client>) -> Vec<Client> {
    let mut seen = HashSet::new();
    clients
        .into_iter()
        .filter(|c| seen.insert(c.username.clone()))
        .collect()
}
