//! Share links for client applications.
//!
//! Links are plain strings a client app can import: `vless://`, `trojan://`
//! URIs, or `vmess://` followed by base64 JSON. Values are inserted
//! verbatim, without percent-encoding.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};
use xpanel_core::{Client, DEFAULT_LINK_PORT, Endpoint, Family, Protocol, Transport, VISION_FLOW};

/// Port advertised for clients attached to `tag`.
///
/// Prefers 443 when an endpoint with that tag listens there, then the first
/// endpoint with that tag, then 443.
pub fn resolve_port(tag: &str, endpoints: &[Endpoint]) -> u16 {
    let mut matching = endpoints.iter().filter(|ep| ep.tag == tag);
    if matching.clone().any(|ep| ep.port == DEFAULT_LINK_PORT) {
        return DEFAULT_LINK_PORT;
    }
    matching.next().map_or(DEFAULT_LINK_PORT, |ep| ep.port)
}

/// Encode a share link for `client` reaching `domain:port`.
///
/// Returns `None` when the client's tag does not name a known family and
/// transport.
pub fn encode(client: &Client, domain: &str, port: u16) -> Option<String> {
    let protocol = client.protocol_kind().ok()?;
    Some(match protocol.family {
        Family::Vless => uri_link(
            "vless",
            client,
            domain,
            port,
            protocol,
            &["encryption=none"],
        ),
        Family::Trojan => uri_link("trojan", client, domain, port, protocol, &[]),
        Family::Vmess => vmess_link(client, domain, port, protocol),
    })
}

/// Resolve the port from `endpoints` and encode.
pub fn encode_for(client: &Client, domain: &str, endpoints: &[Endpoint]) -> Option<String> {
    encode(client, domain, resolve_port(&client.protocol, endpoints))
}

fn uri_link(
    scheme: &str,
    client: &Client,
    domain: &str,
    port: u16,
    protocol: Protocol,
    extra: &[&str],
) -> String {
    let mut query = vec!["security=tls".to_string()];
    query.extend(extra.iter().map(|s| s.to_string()));

    match protocol.transport {
        Transport::Xtls => {
            if protocol.uses_vision_flow() {
                query.push(format!("flow={VISION_FLOW}"));
            }
            query.push("type=tcp".to_string());
            query.push(format!("sni={domain}"));
            query.push("alpn=h2,http/1.1".to_string());
        }
        Transport::Ws => {
            query.push("type=ws".to_string());
            query.push(format!("path={}", protocol.ws_path()));
            query.push(format!("host={domain}"));
            query.push(format!("sni={domain}"));
            query.push("alpn=h2,http/1.1".to_string());
        }
        Transport::Grpc => {
            query.push("type=grpc".to_string());
            query.push(format!("serviceName={}", protocol.grpc_service()));
            query.push("mode=multi".to_string());
            query.push(format!("sni={domain}"));
            query.push("alpn=h2".to_string());
        }
    }

    format!(
        "{scheme}://{}@{domain}:{port}?{}#{}",
        client.uuid,
        query.join("&"),
        client.username
    )
}

fn vmess_link(client: &Client, domain: &str, port: u16, protocol: Protocol) -> String {
    // serde_json's default map keeps keys sorted.
    let mut fields = Map::new();
    let mut put = |k: &str, v: String| {
        fields.insert(k.to_string(), Value::String(v));
    };
    put("v", "2".into());
    put("ps", client.username.clone());
    put("add", domain.into());
    put("port", port.to_string());
    put("id", client.uuid.clone());
    put("aid", "0".into());
    put("scy", "auto".into());
    put("net", protocol.transport.as_str().into());
    put("type", "none".into());
    put("tls", "tls".into());
    put("sni", domain.into());
    match protocol.transport {
        Transport::Ws => {
            put("path", protocol.ws_path());
            put("host", domain.into());
        }
        Transport::Grpc => put("path", protocol.grpc_service()),
        Transport::Xtls => {}
    }

    let json = Value::Object(fields).to_string();
    format!("vmess://{}", STANDARD.encode(json))
}
