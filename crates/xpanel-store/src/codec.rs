//! Line format of the record files.
//!
//! Clients: `username;quota;used;expiry;protocol_tag;credential`
//! Endpoints: `active;{family}-{transport};port`
//!
//! Values are never escaped. Encoding refuses any value that contains the
//! delimiter or a line break.

use chrono::NaiveDateTime;
use xpanel_core::{
    Client, ENDPOINT_STATUS_ACTIVE, EXPIRY_FORMAT, Endpoint, Protocol, RECORD_DELIMITER,
};

use crate::error::StoreError;
use crate::loaded::{IssueKind, LineIssue, Loaded};

pub const CLIENT_FIELDS: usize = 6;
pub const ENDPOINT_FIELDS: usize = 3;

fn check_field(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.contains([RECORD_DELIMITER, '\n', '\r']) {
        return Err(StoreError::Delimiter { field });
    }
    Ok(())
}

/// Reject clients whose text fields cannot be stored as one line.
pub fn validate_client(client: &Client) -> Result<(), StoreError> {
    check_field("username", &client.username)?;
    check_field("protocol", &client.protocol)?;
    check_field("uuid", &client.uuid)?;
    Ok(())
}

/// Encode a client without the trailing newline.
pub fn encode_client(client: &Client) -> Result<String, StoreError> {
    validate_client(client)?;
    Ok(format!(
        "{};{:.2};{:.0};{};{};{}",
        client.username,
        client.quota,
        client.used,
        client.expiry.format(EXPIRY_FORMAT),
        client.protocol,
        client.uuid,
    ))
}

/// Encode an endpoint without the trailing newline.
pub fn encode_endpoint(endpoint: &Endpoint) -> String {
    format!(
        "{ENDPOINT_STATUS_ACTIVE};{};{}",
        endpoint.tag, endpoint.port
    )
}

fn parse_number(field: &'static str, value: &str, issues: &mut Vec<IssueKind>) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            issues.push(IssueKind::BadNumber {
                field,
                value: value.to_string(),
            });
            0.0
        }
    }
}

/// Decode one client line.
///
/// Returns the record plus non-fatal issues, or the reason the line must be
/// skipped. `now` stands in for an unreadable expiry.
pub fn decode_client(
    line: &str,
    now: NaiveDateTime,
) -> Result<(Client, Vec<IssueKind>), IssueKind> {
    let parts: Vec<&str> = line.split(RECORD_DELIMITER).collect();
    if parts.len() < CLIENT_FIELDS {
        return Err(IssueKind::TooFewFields {
            found: parts.len(),
            expected: CLIENT_FIELDS,
        });
    }

    let mut issues = Vec::new();
    let quota = parse_number("quota", parts[1], &mut issues);
    let used = parse_number("used", parts[2], &mut issues);
    let expiry = match NaiveDateTime::parse_from_str(parts[3].trim(), EXPIRY_FORMAT) {
        Ok(t) => t,
        Err(_) => {
            issues.push(IssueKind::BadExpiry(parts[3].to_string()));
            now
        }
    };

    let client = Client {
        username: parts[0].to_string(),
        quota,
        used,
        expiry,
        protocol: parts[4].to_string(),
        uuid: parts[5].to_string(),
    };
    Ok((client, issues))
}

/// Decode one endpoint line.
pub fn decode_endpoint(line: &str) -> Result<Endpoint, IssueKind> {
    let parts: Vec<&str> = line.split(RECORD_DELIMITER).collect();
    if parts.len() < ENDPOINT_FIELDS {
        return Err(IssueKind::TooFewFields {
            found: parts.len(),
            expected: ENDPOINT_FIELDS,
        });
    }

    let tag = parts[1].trim();
    let port = match parts[2].trim().parse::<u16>() {
        Ok(p) if p > 0 => p,
        _ => return Err(IssueKind::BadPort(parts[2].to_string())),
    };
    let protocol = Protocol::parse_tag(tag).map_err(IssueKind::BadProtocol)?;

    Ok(Endpoint {
        tag: tag.to_string(),
        protocol,
        port,
    })
}

/// Decode a whole clients file. Blank lines are ignored silently.
pub fn decode_clients(data: &str, now: NaiveDateTime) -> Loaded<Client> {
    let mut loaded = Loaded::default();
    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_client(line, now) {
            Ok((client, issues)) => {
                loaded.records.push(client);
                loaded
                    .issues
                    .extend(issues.into_iter().map(|kind| LineIssue { line: idx + 1, kind }));
            }
            Err(kind) => loaded.issues.push(LineIssue { line: idx + 1, kind }),
        }
    }
    loaded
}

/// Decode a whole endpoints file. Blank lines are ignored silently.
pub fn decode_endpoints(data: &str) -> Loaded<Endpoint> {
    let mut loaded = Loaded::default();
    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_endpoint(line) {
            Ok(endpoint) => loaded.records.push(endpoint),
            Err(kind) => loaded.issues.push(LineIssue { line: idx + 1, kind }),
        }
    }
    loaded
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use xpanel_core::{Family, Transport};

    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, EXPIRY_FORMAT).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn alice() -> Client {
        Client {
            username: "alice".into(),
            quota: 5.0,
            used: 1234.0,
            expiry: ts("2026-04-01 10:20:30"),
            protocol: "vless-ws".into(),
            uuid: "U1".into(),
        }
    }

    #[test]
    fn client_line_layout() {
        assert_eq!(
            encode_client(&alice()).unwrap(),
            "alice;5.00;1234;2026-04-01 10:20:30;vless-ws;U1"
        );
    }

    #[test]
    fn used_has_no_decimals() {
        let mut c = alice();
        c.used = 1_073_741_824.4;
        c.quota = 1.005;
        let line = encode_client(&c).unwrap();
        assert!(line.contains(";1073741824;"), "{line}");
    }

    #[test]
    fn decode_reads_encoded_line() {
        let line = encode_client(&alice()).unwrap();
        let (client, issues) = decode_client(&line, now()).unwrap();
        assert!(issues.is_empty());
        assert_eq!(client, alice());
    }

    #[test]
    fn delimiter_in_field_is_rejected() {
        let mut c = alice();
        c.uuid = "a;b".into();
        assert!(matches!(
            encode_client(&c),
            Err(StoreError::Delimiter { field: "uuid" })
        ));
        c.uuid = "ok".into();
        c.username = "bad\nname".into();
        assert!(matches!(
            encode_client(&c),
            Err(StoreError::Delimiter { field: "username" })
        ));
    }

    #[test]
    fn short_client_line_is_skipped() {
        let err = decode_client("alice;5;0;2026-01-01 00:00:00;vless-ws", now()).unwrap_err();
        assert_eq!(
            err,
            IssueKind::TooFewFields {
                found: 5,
                expected: 6
            }
        );
        assert!(err.is_skip());
    }

    #[test]
    fn bad_numbers_and_expiry_are_kept() {
        let (client, issues) = decode_client("bob;lots;x;tomorrow;vmess-ws;U2", now()).unwrap();
        assert_eq!(client.quota, 0.0);
        assert_eq!(client.used, 0.0);
        assert_eq!(client.expiry, now());
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| !i.is_skip()));
    }

    #[test]
    fn extra_client_fields_are_ignored() {
        let (client, _) =
            decode_client("carol;1.00;0;2026-05-01 00:00:00;trojan-grpc;pw;extra", now()).unwrap();
        assert_eq!(client.uuid, "pw");
    }

    #[test]
    fn endpoint_line_layout() {
        let ep = Endpoint::new(Protocol::new(Family::Vless, Transport::Ws), 8080);
        assert_eq!(encode_endpoint(&ep), "active;vless-ws;8080");
        assert_eq!(decode_endpoint("active;vless-ws;8080").unwrap(), ep);
    }

    #[test]
    fn endpoint_tag_is_kept_verbatim() {
        let ep = decode_endpoint("active; VLESS-XTLS ; 443 ").unwrap();
        assert_eq!(ep.tag, "VLESS-XTLS");
        assert_eq!(ep.protocol, Protocol::new(Family::Vless, Transport::Xtls));
        assert_eq!(ep.port, 443);
    }

    #[test]
    fn bad_endpoint_lines_are_skipped() {
        assert!(matches!(
            decode_endpoint("active;vless-ws"),
            Err(IssueKind::TooFewFields { .. })
        ));
        assert!(matches!(
            decode_endpoint("active;vless-ws;0"),
            Err(IssueKind::BadPort(_))
        ));
        assert!(matches!(
            decode_endpoint("active;vless-ws;http"),
            Err(IssueKind::BadPort(_))
        ));
        assert!(matches!(
            decode_endpoint("active;vless;443"),
            Err(IssueKind::BadProtocol(_))
        ));
        assert!(matches!(
            decode_endpoint("active;vless-tcp;443"),
            Err(IssueKind::BadProtocol(_))
        ));
    }

    #[test]
    fn malformed_line_does_not_shift_others() {
        let data = "alice;5.00;0;2026-04-01 00:00:00;vless-ws;U1\n\
                    broken;line\n\
                    \n\
                    bob;0.00;0;2026-04-02 00:00:00;vmess-grpc;U2\n";
        let loaded = decode_clients(data, now());
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].username, "alice");
        assert_eq!(loaded.records[1].username, "bob");
        assert_eq!(loaded.issues.len(), 1);
        assert_eq!(loaded.issues[0].line, 2);
        assert_eq!(loaded.skipped(), 1);
    }
}
