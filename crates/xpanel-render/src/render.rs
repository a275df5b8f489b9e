//! Pure rendering of records into an engine document.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use xpanel_config::EngineConfig;
use xpanel_core::{
    ADMIN_API_PORT, ADMIN_LISTEN, ADMIN_TAG, Client, DEFAULT_ACCESS_LOG, DEFAULT_CERT_FILE,
    DEFAULT_ENGINE_LOG_LEVEL, DEFAULT_ERROR_LOG, DEFAULT_KEY_FILE, Endpoint, FALLBACK_DEST,
    FALLBACK_PORT, Family, Transport, VISION_FLOW,
};

use crate::document::*;

/// File locations and log level written into every rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub cert_file: String,
    pub key_file: String,
    pub access_log: String,
    pub error_log: String,
    pub log_level: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            cert_file: DEFAULT_CERT_FILE.to_string(),
            key_file: DEFAULT_KEY_FILE.to_string(),
            access_log: DEFAULT_ACCESS_LOG.to_string(),
            error_log: DEFAULT_ERROR_LOG.to_string(),
            log_level: DEFAULT_ENGINE_LOG_LEVEL.to_string(),
        }
    }
}

impl From<&EngineConfig> for RenderSettings {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            cert_file: engine.cert_file.clone(),
            key_file: engine.key_file.clone(),
            access_log: engine.access_log.clone(),
            error_log: engine.error_log.clone(),
            log_level: engine.log_level.clone(),
        }
    }
}

/// A live client whose tag names no endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub username: String,
    pub tag: String,
}

/// Output of [`render`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub document: EngineDocument,
    /// Non-expired clients left out because no endpoint carries their tag.
    pub orphans: Vec<Orphan>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn scaffold(settings: &RenderSettings) -> EngineDocument {
    let mut levels = BTreeMap::new();
    levels.insert(
        "0".to_string(),
        LevelPolicy {
            stats_user_uplink: true,
            stats_user_downlink: true,
            handshake: 10,
            conn_idle: 1200,
            uplink_only: 0,
            downlink_only: 0,
            buffer_size: 512,
        },
    );

    EngineDocument {
        log: LogSection {
            access: settings.access_log.clone(),
            error: settings.error_log.clone(),
            loglevel: settings.log_level.clone(),
        },
        api: ApiSection {
            tag: ADMIN_TAG.to_string(),
            services: strings(&["HandlerService", "LoggerService", "StatsService"]),
        },
        stats: StatsSection {},
        policy: PolicySection {
            levels,
            system: SystemPolicy {
                stats_inbound_uplink: true,
                stats_inbound_downlink: true,
            },
        },
        inbounds: vec![Inbound {
            tag: ADMIN_TAG.to_string(),
            listen: Some(ADMIN_LISTEN.to_string()),
            port: ADMIN_API_PORT,
            protocol: ADMIN_PROTOCOL.to_string(),
            settings: InboundSettings {
                address: Some(ADMIN_LISTEN.to_string()),
                ..Default::default()
            },
            stream_settings: None,
            sniffing: None,
        }],
        outbounds: vec![
            Outbound {
                protocol: "freedom".to_string(),
                tag: "direct".to_string(),
            },
            Outbound {
                protocol: "blackhole".to_string(),
                tag: "blocked".to_string(),
            },
        ],
        routing: RoutingSection {
            rules: vec![
                RoutingRule {
                    rule_type: "field".to_string(),
                    inbound_tag: Some(vec![ADMIN_TAG.to_string()]),
                    ip: None,
                    outbound_tag: ADMIN_TAG.to_string(),
                },
                RoutingRule {
                    rule_type: "field".to_string(),
                    inbound_tag: None,
                    ip: Some(vec!["geoip:private".to_string()]),
                    outbound_tag: "blocked".to_string(),
                },
            ],
        },
    }
}

fn stream_settings(endpoint: &Endpoint, settings: &RenderSettings) -> StreamSettings {
    let protocol = endpoint.protocol;
    let mut stream = StreamSettings {
        network: protocol.transport.network().to_string(),
        security: "tls".to_string(),
        tls_settings: TlsSettings {
            certificates: vec![Certificate {
                certificate_file: settings.cert_file.clone(),
                key_file: settings.key_file.clone(),
            }],
            alpn: Vec::new(),
        },
        ws_settings: None,
        grpc_settings: None,
    };
    match protocol.transport {
        Transport::Xtls => stream.tls_settings.alpn = strings(&["h2", "http/1.1"]),
        Transport::Ws => {
            stream.ws_settings = Some(WsSettings {
                path: protocol.ws_path(),
            })
        }
        Transport::Grpc => {
            stream.grpc_settings = Some(GrpcSettings {
                service_name: protocol.grpc_service(),
                multi_mode: true,
            })
        }
    }
    stream
}

fn engine_client(client: &Client, endpoint: &Endpoint) -> EngineClient {
    let protocol = endpoint.protocol;
    let (id, password) = if protocol.family.is_shared_password() {
        (None, Some(client.uuid.clone()))
    } else {
        (Some(client.uuid.clone()), None)
    };
    EngineClient {
        id,
        password,
        email: client.username.clone(),
        flow: protocol
            .uses_vision_flow()
            .then(|| VISION_FLOW.to_string()),
        level: 0,
    }
}

fn user_inbound(
    endpoint: &Endpoint,
    clients: &[Client],
    now: NaiveDateTime,
    settings: &RenderSettings,
) -> Inbound {
    let protocol = endpoint.protocol;
    let members = clients
        .iter()
        .filter(|c| c.protocol == endpoint.tag && !c.is_expired(now))
        .map(|c| engine_client(c, endpoint))
        .collect();

    let fallbacks = (endpoint.port == FALLBACK_PORT).then(|| {
        vec![Fallback {
            dest: FALLBACK_DEST,
            xver: u8::from(protocol.transport == Transport::Xtls),
        }]
    });

    Inbound {
        tag: endpoint.tag.clone(),
        listen: None,
        port: endpoint.port,
        protocol: protocol.family.as_str().to_string(),
        settings: InboundSettings {
            address: None,
            clients: Some(members),
            decryption: (protocol.family == Family::Vless).then(|| "none".to_string()),
            fallbacks,
        },
        stream_settings: Some(stream_settings(endpoint, settings)),
        sniffing: Some(Sniffing {
            enabled: true,
            dest_override: strings(&["http", "tls", "quic"]),
        }),
    }
}

/// Build the full engine document for the given records.
///
/// One inbound per endpoint in storage order, after the administrative
/// inbound. Clients expired at `now` are left out.
pub fn render(
    clients: &[Client],
    endpoints: &[Endpoint],
    now: NaiveDateTime,
    settings: &RenderSettings,
) -> Rendered {
    let mut document = scaffold(settings);
    document.inbounds.extend(
        endpoints
            .iter()
            .map(|ep| user_inbound(ep, clients, now, settings)),
    );

    let orphans = clients
        .iter()
        .filter(|c| !c.is_expired(now) && !endpoints.iter().any(|ep| ep.tag == c.protocol))
        .map(|c| Orphan {
            username: c.username.clone(),
            tag: c.protocol.clone(),
        })
        .collect();

    Rendered { document, orphans }
}
