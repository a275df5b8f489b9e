//! Client and endpoint records.

use chrono::NaiveDateTime;

use crate::protocol::{ParseProtocolError, Protocol};
use crate::units::gib_to_bytes;

/// A proxy account.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    /// Unique account name, also the engine `email`.
    pub username: String,
    /// Allotted traffic in GB (0 = unlimited).
    pub quota: f64,
    /// Consumed traffic in bytes.
    pub used: f64,
    /// Local time after which the account is invalid.
    pub expiry: NaiveDateTime,
    /// Tag of the endpoint this account is attached to.
    pub protocol: String,
    /// UUID for identifier families, password for trojan.
    pub uuid: String,
}

impl Client {
    #[inline]
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now > self.expiry
    }

    /// Quota converted to bytes, `None` when unlimited.
    pub fn quota_bytes(&self) -> Option<f64> {
        (self.quota > 0.0).then(|| gib_to_bytes(self.quota))
    }

    /// Strictly more bytes used than allotted.
    #[inline]
    pub fn is_over_quota(&self) -> bool {
        self.quota_bytes().is_some_and(|limit| self.used > limit)
    }

    /// Parse the attached tag.
    pub fn protocol_kind(&self) -> Result<Protocol, ParseProtocolError> {
        Protocol::parse_tag(&self.protocol)
    }
}

/// A listening inbound definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Tag as stored, matched verbatim against `Client::protocol`.
    pub tag: String,
    pub protocol: Protocol,
    pub port: u16,
}

impl Endpoint {
    /// Endpoint with the canonical tag for `protocol`.
    pub fn new(protocol: Protocol, port: u16) -> Self {
        Self {
            tag: protocol.tag(),
            protocol,
            port,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::protocol::{Family, Transport};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn client(quota: f64, used: f64) -> Client {
        Client {
            username: "alice".into(),
            quota,
            used,
            expiry: at(12),
            protocol: "vless-ws".into(),
            uuid: "U1".into(),
        }
    }

    #[test]
    fn expiry_is_strict() {
        let c = client(0.0, 0.0);
        assert!(!c.is_expired(at(12)));
        assert!(c.is_expired(at(12) + Duration::seconds(1)));
        assert!(!c.is_expired(at(11)));
    }

    #[test]
    fn quota_boundary_is_strict() {
        assert!(!client(1.0, 1_073_741_824.0).is_over_quota());
        assert!(client(1.0, 1_073_741_825.0).is_over_quota());
    }

    #[test]
    fn zero_quota_is_unlimited() {
        let c = client(0.0, 1e15);
        assert_eq!(c.quota_bytes(), None);
        assert!(!c.is_over_quota());
    }

    #[test]
    fn endpoint_uses_canonical_tag() {
        let ep = Endpoint::new(Protocol::new(Family::Trojan, Transport::Grpc), 2053);
        assert_eq!(ep.tag, "trojan-grpc");
    }
}
