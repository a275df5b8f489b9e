//! Caller-facing client and inbound operations.
//!
//! Every mutation goes store first, then engine config, then engine restart.
//! An error at any step is returned as is; nothing later runs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use tracing::info;
use xpanel_config::Config;
use xpanel_core::{Client, Endpoint, Family, Protocol, Transport};
use xpanel_engine::{AccessLog, EngineControl, Systemctl};
use xpanel_render::{Rendered, Synthesizer};
use xpanel_store::{FlatFileStore, Loaded, RecordStore, StoreError};

use crate::credential::generate_credential;
use crate::error::AdminError;

/// Request to create a client.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub username: String,
    /// Quota in GB, 0 for unlimited.
    pub quota: f64,
    /// Validity from now, in days.
    pub days: i64,
    /// Tag of an existing inbound.
    pub tag: String,
    /// Credential to use instead of a generated one.
    pub credential: Option<String>,
}

/// Changes to an existing client. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct ClientEdit {
    pub quota: Option<f64>,
    /// Days added to the current expiry.
    pub add_days: Option<i64>,
    pub reset_usage: bool,
}

impl ClientEdit {
    pub fn is_empty(&self) -> bool {
        self.quota.is_none() && self.add_days.is_none() && !self.reset_usage
    }
}

/// The store, the engine config it renders to, and the engine service.
pub struct Panel {
    store: Arc<dyn RecordStore>,
    synthesizer: Synthesizer,
    control: Arc<dyn EngineControl>,
    access_log: AccessLog,
}

impl Panel {
    pub fn new(
        store: Arc<dyn RecordStore>,
        synthesizer: Synthesizer,
        control: Arc<dyn EngineControl>,
    ) -> Self {
        Self {
            store,
            synthesizer,
            control,
            access_log: AccessLog::default(),
        }
    }

    /// Read online state from `log` instead of the default access log.
    pub fn with_access_log(mut self, log: AccessLog) -> Self {
        self.access_log = log;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let store = FlatFileStore::new(&config.store.clients_path, &config.store.inbounds_path);
        let control = Systemctl::new(&config.engine.service).with_timeout(Duration::from_secs(
            config.reconcile.control_timeout_secs,
        ));
        Self::new(
            Arc::new(store),
            Synthesizer::from_config(&config.engine),
            Arc::new(control),
        )
        .with_access_log(AccessLog::new(&config.engine.access_log))
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn clients(&self) -> Result<Loaded<Client>, AdminError> {
        Ok(self.store.list_clients().await?)
    }

    pub async fn endpoints(&self) -> Result<Loaded<Endpoint>, AdminError> {
        Ok(self.store.list_endpoints().await?)
    }

    /// First client named `username`.
    pub async fn find_client(&self, username: &str) -> Result<Client, AdminError> {
        self.clients()
            .await?
            .records
            .into_iter()
            .find(|c| c.username == username)
            .ok_or_else(|| StoreError::NotFound(username.to_string()).into())
    }

    pub async fn create_client(&self, request: NewClient) -> Result<Client, AdminError> {
        self.create_client_at(request, Local::now().naive_local())
            .await
    }

    /// Validate, append, resync and restart.
    pub async fn create_client_at(
        &self,
        request: NewClient,
        now: NaiveDateTime,
    ) -> Result<Client, AdminError> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(AdminError::invalid("username", "must not be empty"));
        }
        check_quota(request.quota)?;
        if request.days < 0 {
            return Err(AdminError::invalid("days", "must not be negative"));
        }

        let endpoints = self.endpoints().await?.into_records();
        let Some(endpoint) = endpoints.iter().find(|e| e.tag == request.tag) else {
            return Err(AdminError::UnknownEndpoint(request.tag));
        };
        let family = endpoint.protocol.family;

        let clients = self.clients().await?.into_records();
        if clients.iter().any(|c| c.username == username) {
            return Err(AdminError::DuplicateUsername(username));
        }

        let credential = match request.credential.map(|c| c.trim().to_string()) {
            Some(c) if c.is_empty() => {
                return Err(AdminError::invalid("credential", "must not be empty"));
            }
            Some(c) => c,
            None => generate_credential(family),
        };

        let expiry = shift_expiry(now, request.days, "days")?;
        let client = Client {
            username,
            quota: request.quota,
            used: 0.0,
            expiry,
            protocol: request.tag,
            uuid: credential,
        };
        self.store.append_client(&client).await?;
        info!(username = %client.username, tag = %client.protocol, expiry = %client.expiry, "client created");

        self.sync_and_restart_at(now).await?;
        Ok(client)
    }

    /// Apply `edit` to the first client named `username`, then resync.
    pub async fn edit_client(&self, username: &str, edit: ClientEdit) -> Result<Client, AdminError> {
        self.edit_client_at(username, edit, Local::now().naive_local())
            .await
    }

    pub async fn edit_client_at(
        &self,
        username: &str,
        edit: ClientEdit,
        now: NaiveDateTime,
    ) -> Result<Client, AdminError> {
        if let Some(quota) = edit.quota {
            check_quota(quota)?;
        }
        if let Some(days) = edit.add_days {
            if days < 0 {
                return Err(AdminError::invalid("add_days", "must not be negative"));
            }
            let current = self.find_client(username).await?;
            shift_expiry(current.expiry, days, "add_days")?;
        }

        // the record can change between the check above and the update
        let mut overflow = None;
        let mut apply = |c: &mut Client| {
            if let Some(days) = edit.add_days {
                match shift_expiry(c.expiry, days, "add_days") {
                    Ok(expiry) => c.expiry = expiry,
                    Err(e) => {
                        overflow = Some(e);
                        return;
                    }
                }
            }
            if let Some(quota) = edit.quota {
                c.quota = quota;
            }
            if edit.reset_usage {
                c.used = 0.0;
            }
        };
        let updated = self.store.update_client(username, &mut apply).await?;
        if let Some(e) = overflow {
            return Err(e);
        }
        info!(%username, quota = updated.quota, expiry = %updated.expiry, "client updated");

        self.sync_and_restart_at(now).await?;
        Ok(updated)
    }

    /// Remove every client named `username`. Returns how many went away;
    /// the engine is only touched when that is non-zero.
    pub async fn delete_client(&self, username: &str) -> Result<usize, AdminError> {
        let removed = self.store.delete_client(username).await?;
        if removed > 0 {
            info!(%username, removed, "client deleted");
            self.sync_and_restart().await?;
        }
        Ok(removed)
    }

    /// Add an inbound and bring the engine config in line.
    pub async fn add_endpoint(&self, protocol: Protocol, port: u16) -> Result<Endpoint, AdminError> {
        if protocol.family == Family::Vmess && protocol.transport == Transport::Xtls {
            return Err(AdminError::UnsupportedProtocol(protocol));
        }
        let endpoint = self.store.add_endpoint(protocol, port).await?;
        info!(tag = %endpoint.tag, port, "inbound added");

        self.sync_and_restart().await?;
        Ok(endpoint)
    }

    pub async fn delete_endpoint(&self, port: u16) -> Result<usize, AdminError> {
        let removed = self.store.delete_endpoint(port).await?;
        if removed > 0 {
            info!(port, removed, "inbound deleted");
            self.sync_and_restart().await?;
        }
        Ok(removed)
    }

    pub async fn sync_and_restart(&self) -> Result<Rendered, AdminError> {
        self.sync_and_restart_at(Local::now().naive_local()).await
    }

    /// Rewrite the engine config from the store, then restart the engine.
    pub async fn sync_and_restart_at(&self, now: NaiveDateTime) -> Result<Rendered, AdminError> {
        let rendered = self.synthesizer.sync_at(self.store.as_ref(), now).await?;
        self.control.restart().await?;
        Ok(rendered)
    }

    /// Connection link for `username` against `domain`.
    pub async fn link(&self, username: &str, domain: &str) -> Result<String, AdminError> {
        let client = self.find_client(username).await?;
        self.link_for(&client, domain).await
    }

    pub async fn link_for(&self, client: &Client, domain: &str) -> Result<String, AdminError> {
        let endpoints = self.endpoints().await?.into_records();
        xpanel_link::encode_for(client, domain, &endpoints).ok_or_else(|| AdminError::NoLink {
            username: client.username.clone(),
            tag: client.protocol.clone(),
        })
    }

    /// Usernames with accepted connections in the recent access log.
    pub async fn online_users(&self) -> Result<HashSet<String>, AdminError> {
        Ok(self.access_log.online_users().await?)
    }

    /// Whether the engine service is running.
    pub async fn status(&self) -> Result<bool, AdminError> {
        Ok(self.control.is_active().await?)
    }
}

/// `from` moved forward by `days`, or an error naming `field` when the result
/// is out of range.
fn shift_expiry(
    from: NaiveDateTime,
    days: i64,
    field: &'static str,
) -> Result<NaiveDateTime, AdminError> {
    TimeDelta::try_days(days)
        .and_then(|delta| from.checked_add_signed(delta))
        .ok_or_else(|| AdminError::invalid(field, format!("{days} days is out of range")))
}

fn check_quota(quota: f64) -> Result<(), AdminError> {
    if !quota.is_finite() || quota < 0.0 {
        return Err(AdminError::invalid("quota", format!("{quota} is not a size in GB")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use xpanel_engine::fake::RecordingControl;
    use xpanel_render::RenderSettings;
    use xpanel_store::MemoryStore;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        control: Arc<RecordingControl>,
        panel: Panel,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let control = Arc::new(RecordingControl::new());
        let panel = Panel::new(
            store.clone(),
            Synthesizer::new(dir.path().join("config.json"), RenderSettings::default()),
            control.clone(),
        );
        Fixture {
            store,
            control,
            panel,
            dir,
        }
    }

    fn request(name: &str, tag: &str) -> NewClient {
        NewClient {
            username: name.into(),
            quota: 5.0,
            days: 30,
            tag: tag.into(),
            credential: None,
        }
    }

    fn vless_ws() -> Protocol {
        Protocol::new(Family::Vless, Transport::Ws)
    }

    #[tokio::test]
    async fn create_requires_existing_inbound() {
        let f = fixture();
        let err = f
            .panel
            .create_client_at(request("alice", "vless-ws"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::UnknownEndpoint(ref t) if t == "vless-ws"));
        assert!(err.is_rejected());
        assert!(f.store.clients().is_empty());
        assert_eq!(f.control.restarts(), 0);
    }

    #[tokio::test]
    async fn create_generates_credential_and_restarts() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();
        let client = f
            .panel
            .create_client_at(request("alice", "vless-ws"), now())
            .await
            .unwrap();

        assert_eq!(client.expiry, now() + TimeDelta::days(30));
        assert_eq!(client.uuid.len(), 36);
        assert_eq!(f.store.clients(), vec![client.clone()]);
        assert_eq!(f.control.restarts(), 2);

        let text = std::fs::read_to_string(f.dir.path().join("config.json")).unwrap();
        assert!(text.contains(&client.uuid));
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();
        f.panel
            .create_client_at(request("alice", "vless-ws"), now())
            .await
            .unwrap();
        let err = f
            .panel
            .create_client_at(request(" alice ", "vless-ws"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::DuplicateUsername(_)));
        assert_eq!(f.store.clients().len(), 1);
    }

    #[tokio::test]
    async fn invalid_requests_rejected() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();

        let mut bad = request("  ", "vless-ws");
        assert!(f.panel.create_client_at(bad.clone(), now()).await.is_err());
        bad.username = "bob".into();
        bad.quota = -1.0;
        assert!(f.panel.create_client_at(bad.clone(), now()).await.is_err());
        bad.quota = 1.0;
        bad.credential = Some("a;b".into());
        let err = f.panel.create_client_at(bad, now()).await.unwrap_err();
        assert!(matches!(err, AdminError::Store(StoreError::Delimiter { .. })));
        assert!(f.store.clients().is_empty());
    }

    #[tokio::test]
    async fn edit_extends_from_current_expiry() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();
        f.panel
            .create_client_at(request("alice", "vless-ws"), now())
            .await
            .unwrap();
        f.panel
            .store()
            .update_client("alice", &mut |c: &mut Client| c.used = 500.0)
            .await
            .unwrap();

        let edit = ClientEdit {
            quota: Some(10.0),
            add_days: Some(5),
            reset_usage: true,
        };
        let updated = f.panel.edit_client_at("alice", edit, now()).await.unwrap();
        assert_eq!(updated.quota, 10.0);
        assert_eq!(updated.expiry, now() + TimeDelta::days(35));
        assert_eq!(updated.used, 0.0);
    }

    #[tokio::test]
    async fn create_with_out_of_range_days_rejected() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();

        for days in [1_000_000_000, i64::MAX] {
            let mut req = request("alice", "vless-ws");
            req.days = days;
            let err = f.panel.create_client_at(req, now()).await.unwrap_err();
            assert!(
                matches!(err, AdminError::Invalid { field: "days", .. }),
                "{err}"
            );
        }
        assert!(f.store.clients().is_empty());
        assert_eq!(f.control.restarts(), 1);
    }

    #[tokio::test]
    async fn edit_with_out_of_range_days_rejected() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();
        let created = f
            .panel
            .create_client_at(request("alice", "vless-ws"), now())
            .await
            .unwrap();

        for days in [1_000_000_000, i64::MAX] {
            let edit = ClientEdit {
                quota: Some(99.0),
                add_days: Some(days),
                reset_usage: false,
            };
            let err = f
                .panel
                .edit_client_at("alice", edit, now())
                .await
                .unwrap_err();
            assert!(
                matches!(err, AdminError::Invalid { field: "add_days", .. }),
                "{err}"
            );
        }
        assert_eq!(f.store.clients(), vec![created]);
        assert_eq!(f.control.restarts(), 2);
    }

    #[tokio::test]
    async fn edit_missing_client_is_not_found() {
        let f = fixture();
        let err = f
            .panel
            .edit_client_at("ghost", ClientEdit::default(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Store(StoreError::NotFound(_))));
        assert_eq!(f.control.restarts(), 0);
    }

    #[tokio::test]
    async fn delete_missing_client_leaves_engine_alone() {
        let f = fixture();
        assert_eq!(f.panel.delete_client("ghost").await.unwrap(), 0);
        assert_eq!(f.control.restarts(), 0);
    }

    #[tokio::test]
    async fn vmess_xtls_rejected() {
        let f = fixture();
        let err = f
            .panel
            .add_endpoint(Protocol::new(Family::Vmess, Transport::Xtls), 443)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::UnsupportedProtocol(_)));
        assert!(f.store.endpoints().is_empty());
    }

    #[tokio::test]
    async fn add_endpoint_conflict_does_not_restart() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();
        let err = f
            .panel
            .add_endpoint(Protocol::new(Family::Trojan, Transport::Grpc), 8080)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Store(StoreError::Conflict { .. })));
        assert_eq!(f.control.restarts(), 1);
    }

    #[tokio::test]
    async fn restart_failure_surfaces_after_write() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();
        f.control.set_fail_restart(true);

        let err = f
            .panel
            .create_client_at(request("alice", "vless-ws"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Engine(_)));
        // the record is stored, the caller only learns that the engine did not reload
        assert_eq!(f.store.clients().len(), 1);
    }

    #[tokio::test]
    async fn link_uses_endpoint_port() {
        let f = fixture();
        f.panel.add_endpoint(vless_ws(), 8080).await.unwrap();
        let mut req = request("alice", "vless-ws");
        req.credential = Some("U1".into());
        f.panel.create_client_at(req, now()).await.unwrap();

        let link = f.panel.link("alice", "vpn.example.com").await.unwrap();
        assert!(link.starts_with("vless://U1@vpn.example.com:8080?"), "{link}");
        assert!(link.ends_with("#alice"));
    }

    #[tokio::test]
    async fn online_users_come_from_access_log() {
        let f = fixture();
        let log = f.dir.path().join("access.log");
        std::fs::write(
            &log,
            "2026/03/01 08:00:00 1.2.3.4:5000 accepted tcp:a.com:443 [vless-ws >> direct] email: alice\n\
             2026/03/01 08:00:01 1.2.3.4:5001 rejected  invalid request email: bob \n",
        )
        .unwrap();

        let panel = f.panel.with_access_log(AccessLog::new(&log));
        let online = panel.online_users().await.unwrap();
        assert!(online.contains("alice"));
        assert!(!online.contains("bob"));
    }

    #[tokio::test]
    async fn status_reports_control() {
        let f = fixture();
        assert!(f.panel.status().await.unwrap());
        f.control.set_active(false);
        assert!(!f.panel.status().await.unwrap());
    }
}
