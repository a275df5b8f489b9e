//! Protocol family and transport model.
//!
//! Endpoint tags are stored as `{family}-{transport}` strings. They are
//! parsed once into a [`Protocol`] so the synthesizer and the link encoder
//! dispatch on closed enums instead of re-splitting strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Proxy protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// VLESS, authenticated by a UUID.
    Vless,
    /// VMess, authenticated by a UUID.
    Vmess,
    /// Trojan, authenticated by a shared password.
    Trojan,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Vless, Family::Vmess, Family::Trojan];

    /// Protocol name as the engine spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Vless => "vless",
            Family::Vmess => "vmess",
            Family::Trojan => "trojan",
        }
    }

    /// Whether the credential is a password rather than an identifier.
    #[inline]
    pub fn is_shared_password(self) -> bool {
        matches!(self, Family::Trojan)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vless" => Ok(Family::Vless),
            "vmess" => Ok(Family::Vmess),
            "trojan" => Ok(Family::Trojan),
            other => Err(ParseProtocolError::UnknownFamily(other.to_string())),
        }
    }
}

/// Stream transport of an inbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Raw TLS stream (XTLS vision capable).
    Xtls,
    /// WebSocket upgrade over HTTP.
    Ws,
    /// gRPC in multi mode.
    Grpc,
}

impl Transport {
    pub const ALL: [Transport; 3] = [Transport::Xtls, Transport::Ws, Transport::Grpc];

    /// Token used in tags, paths and service names.
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Xtls => "xtls",
            Transport::Ws => "ws",
            Transport::Grpc => "grpc",
        }
    }

    /// `streamSettings.network` value.
    pub fn network(self) -> &'static str {
        match self {
            Transport::Xtls => "tcp",
            Transport::Ws => "ws",
            Transport::Grpc => "grpc",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xtls" => Ok(Transport::Xtls),
            "ws" => Ok(Transport::Ws),
            "grpc" => Ok(Transport::Grpc),
            other => Err(ParseProtocolError::UnknownTransport(other.to_string())),
        }
    }
}

/// Error returned when a `{family}-{transport}` tag cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseProtocolError {
    #[error("tag {0:?} has no transport component")]
    MissingTransport(String),
    #[error("unknown protocol family {0:?}")]
    UnknownFamily(String),
    #[error("unknown transport {0:?}")]
    UnknownTransport(String),
}

/// A protocol family paired with a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protocol {
    pub family: Family,
    pub transport: Transport,
}

impl Protocol {
    #[inline]
    pub const fn new(family: Family, transport: Transport) -> Self {
        Self { family, transport }
    }

    /// Canonical `{family}-{transport}` tag.
    pub fn tag(&self) -> String {
        format!("{}-{}", self.family, self.transport)
    }

    /// WebSocket request path that tells inbounds apart.
    pub fn ws_path(&self) -> String {
        format!("/{}", self.tag())
    }

    /// gRPC service name that tells inbounds apart.
    pub fn grpc_service(&self) -> String {
        self.tag()
    }

    /// Only VLESS over the direct stream gets the vision flow.
    #[inline]
    pub fn uses_vision_flow(&self) -> bool {
        self.family == Family::Vless && self.transport == Transport::Xtls
    }

    /// Parse a stored tag. Components past the second are ignored.
    pub fn parse_tag(tag: &str) -> Result<Self, ParseProtocolError> {
        let mut parts = tag.trim().split('-');
        let family = parts.next().unwrap_or_default();
        let Some(transport) = parts.next() else {
            return Err(ParseProtocolError::MissingTransport(tag.to_string()));
        };
        Ok(Self {
            family: family.parse()?,
            transport: transport.parse()?,
        })
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.family, self.transport)
    }
}

impl FromStr for Protocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_tag(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_tags() {
        for family in Family::ALL {
            for transport in Transport::ALL {
                let proto = Protocol::new(family, transport);
                assert_eq!(proto.tag().parse::<Protocol>().unwrap(), proto);
            }
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        let proto = Protocol::parse_tag("VLESS-XTLS").unwrap();
        assert_eq!(proto, Protocol::new(Family::Vless, Transport::Xtls));
        assert_eq!(proto.tag(), "vless-xtls");
    }

    #[test]
    fn tcp_is_not_a_transport_tag() {
        assert!(matches!(
            Protocol::parse_tag("vless-tcp"),
            Err(ParseProtocolError::UnknownTransport(ref t)) if t == "tcp"
        ));
        assert_eq!(Transport::Xtls.network(), "tcp");
    }

    #[test]
    fn parse_rejects_bad_tags() {
        assert!(matches!(
            Protocol::parse_tag("vless"),
            Err(ParseProtocolError::MissingTransport(_))
        ));
        assert!(matches!(
            Protocol::parse_tag("shadowsocks-ws"),
            Err(ParseProtocolError::UnknownFamily(_))
        ));
        assert!(matches!(
            Protocol::parse_tag("vmess-quic"),
            Err(ParseProtocolError::UnknownTransport(_))
        ));
    }

    #[test]
    fn derived_names() {
        let ws = Protocol::new(Family::Vless, Transport::Ws);
        assert_eq!(ws.ws_path(), "/vless-ws");
        let grpc = Protocol::new(Family::Trojan, Transport::Grpc);
        assert_eq!(grpc.grpc_service(), "trojan-grpc");
        assert!(Protocol::new(Family::Vless, Transport::Xtls).uses_vision_flow());
        assert!(!Protocol::new(Family::Vmess, Transport::Xtls).uses_vision_flow());
        assert!(!Protocol::new(Family::Vless, Transport::Ws).uses_vision_flow());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Protocol::new(Family::Trojan, Transport::Grpc)).unwrap();
        assert_eq!(json, r#"{"family":"trojan","transport":"grpc"}"#);
    }
}
