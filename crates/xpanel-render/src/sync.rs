//! Writing the rendered document to the engine's config path.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};
use xpanel_config::EngineConfig;
use xpanel_core::DEFAULT_ENGINE_CONFIG_PATH;
use xpanel_store::{RecordStore, write_atomic};

use crate::error::SyncError;
use crate::render::{RenderSettings, Rendered, render};

/// Regenerates the engine configuration from a record store.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config_path: PathBuf,
    settings: RenderSettings,
}

impl Synthesizer {
    pub fn new(config_path: impl Into<PathBuf>, settings: RenderSettings) -> Self {
        Self {
            config_path: config_path.into(),
            settings,
        }
    }

    /// Synthesizer writing to the configured path with the configured
    /// certificate, key and log settings.
    pub fn from_config(engine: &EngineConfig) -> Self {
        Self::new(&engine.config_path, RenderSettings::from(engine))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render from the current store contents and replace the config file.
    pub async fn sync(&self, store: &dyn RecordStore) -> Result<Rendered, SyncError> {
        self.sync_at(store, Local::now().naive_local()).await
    }

    /// Like [`sync`](Self::sync) with an explicit clock.
    pub async fn sync_at(
        &self,
        store: &dyn RecordStore,
        now: NaiveDateTime,
    ) -> Result<Rendered, SyncError> {
        let clients = store.list_clients().await?;
        let endpoints = store.list_endpoints().await?;

        let rendered = render(&clients.records, &endpoints.records, now, &self.settings);
        for orphan in &rendered.orphans {
            warn!(
                username = %orphan.username,
                tag = %orphan.tag,
                "client references no endpoint, left out of engine config"
            );
        }

        let data = serde_json::to_string_pretty(&rendered.document)?;
        write_atomic(&self.config_path, data.as_bytes())
            .await
            .map_err(|source| SyncError::Write {
                path: self.config_path.clone(),
                source,
            })?;

        info!(
            path = %self.config_path.display(),
            inbounds = endpoints.records.len(),
            orphans = rendered.orphans.len(),
            "engine config written"
        );
        Ok(rendered)
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_CONFIG_PATH, RenderSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use xpanel_core::{Client, Endpoint, Family, Protocol, Transport};
    use xpanel_store::MemoryStore;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::with_records(
            [Client {
                username: "alice".into(),
                quota: 5.0,
                used: 0.0,
                expiry: now() + Duration::days(30),
                protocol: "vless-ws".into(),
                uuid: "U1".into(),
            }],
            [Endpoint::new(Protocol::new(Family::Vless, Transport::Ws), 8080)],
        )
    }

    #[tokio::test]
    async fn sync_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let synth = Synthesizer::new(&path, RenderSettings::default());
        let store = store();

        synth.sync_at(&store, now()).await.unwrap();
        let first = tokio::fs::read(&path).await.unwrap();
        synth.sync_at(&store, now()).await.unwrap();
        let second = tokio::fs::read(&path).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn output_is_two_space_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let synth = Synthesizer::new(&path, RenderSettings::default());
        synth.sync_at(&store(), now()).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.starts_with("{\n  \"log\": {\n    \"access\""), "{text}");
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["inbounds"][1]["settings"]["clients"][0]["email"], "alice");
    }

    #[tokio::test]
    async fn from_config_uses_engine_section() {
        let dir = tempfile::tempdir().unwrap();
        let engine = EngineConfig {
            config_path: dir.path().join("xray.json").display().to_string(),
            cert_file: "/certs/a.pem".into(),
            ..Default::default()
        };
        let synth = Synthesizer::from_config(&engine);
        assert_eq!(synth.config_path(), dir.path().join("xray.json"));
        assert_eq!(synth.settings().cert_file, "/certs/a.pem");
        assert_eq!(synth.settings().key_file, "/etc/xray/xray.key");
    }

    #[tokio::test]
    async fn write_failure_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        // the target is a directory, so the final rename fails
        let path = dir.path().join("config.json");
        tokio::fs::create_dir(&path).await.unwrap();
        tokio::fs::write(path.join("keep"), b"x").await.unwrap();

        let synth = Synthesizer::new(&path, RenderSettings::default());
        let err = synth.sync_at(&store(), now()).await.unwrap_err();
        assert!(matches!(err, SyncError::Write { .. }));
        assert!(path.join("keep").exists());
        assert!(!dir.path().join("config.json.tmp").exists());
    }
}
