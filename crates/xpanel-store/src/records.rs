//! Mutation rules shared by every backend.

use xpanel_core::{ADMIN_API_PORT, ADMIN_TAG, Client, Endpoint};

use crate::codec::validate_client;
use crate::error::StoreError;
use crate::traits::ClientMutator;

/// Mutate the first client named `username`.
///
/// The edit is applied to a copy and only committed if the result is still
/// storable.
pub(crate) fn update_first(
    clients: &mut [Client],
    username: &str,
    mutator: ClientMutator<'_>,
) -> Result<Client, StoreError> {
    let slot = clients
        .iter_mut()
        .find(|c| c.username == username)
        .ok_or_else(|| StoreError::NotFound(username.to_string()))?;

    let mut updated = slot.clone();
    mutator(&mut updated);
    validate_client(&updated)?;
    *slot = updated.clone();
    Ok(updated)
}

pub(crate) fn remove_clients(clients: &mut Vec<Client>, username: &str) -> usize {
    let before = clients.len();
    clients.retain(|c| c.username != username);
    before - clients.len()
}

/// Check that a new endpoint may listen on `port`.
pub(crate) fn check_port(endpoints: &[Endpoint], port: u16) -> Result<(), StoreError> {
    if port == 0 {
        return Err(StoreError::InvalidPort(port));
    }
    if port == ADMIN_API_PORT {
        return Err(StoreError::Conflict {
            port,
            owner: ADMIN_TAG.to_string(),
        });
    }
    if let Some(existing) = endpoints.iter().find(|e| e.port == port) {
        return Err(StoreError::Conflict {
            port,
            owner: existing.tag.clone(),
        });
    }
    Ok(())
}

pub(crate) fn remove_endpoints(endpoints: &mut Vec<Endpoint>, port: u16) -> usize {
    let before = endpoints.len();
    endpoints.retain(|e| e.port != port);
    before - endpoints.len()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use xpanel_core::{Family, Protocol, Transport};

    use super::*;

    fn client(name: &str, uuid: &str) -> Client {
        Client {
            username: name.into(),
            quota: 0.0,
            used: 0.0,
            expiry: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            protocol: "vless-ws".into(),
            uuid: uuid.into(),
        }
    }

    #[test]
    fn update_touches_first_match_only() {
        let mut clients = vec![client("a", "1"), client("a", "2")];
        let updated = update_first(&mut clients, "a", &mut |c: &mut Client| c.used = 7.0).unwrap();
        assert_eq!(updated.uuid, "1");
        assert_eq!(clients[0].used, 7.0);
        assert_eq!(clients[1].used, 0.0);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let mut clients = vec![client("a", "1")];
        let err = update_first(&mut clients, "b", &mut |_: &mut Client| {}).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(name) if name == "b"));
    }

    #[test]
    fn unstorable_update_is_not_committed() {
        let mut clients = vec![client("a", "1")];
        let err = update_first(&mut clients, "a", &mut |c: &mut Client| {
            c.uuid = "x;y".into()
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Delimiter { .. }));
        assert_eq!(clients[0].uuid, "1");
    }

    #[test]
    fn remove_takes_all_matches() {
        let mut clients = vec![client("a", "1"), client("b", "2"), client("a", "3")];
        assert_eq!(remove_clients(&mut clients, "a"), 2);
        assert_eq!(clients.len(), 1);
        assert_eq!(remove_clients(&mut clients, "zzz"), 0);
    }

    #[test]
    fn port_rules() {
        let eps = vec![Endpoint::new(
            Protocol::new(Family::Vless, Transport::Xtls),
            443,
        )];
        assert!(check_port(&eps, 8443).is_ok());
        assert!(matches!(
            check_port(&eps, 443),
            Err(StoreError::Conflict { port: 443, owner }) if owner == "vless-xtls"
        ));
        assert!(matches!(
            check_port(&eps, ADMIN_API_PORT),
            Err(StoreError::Conflict { .. })
        ));
        assert!(matches!(check_port(&eps, 0), Err(StoreError::InvalidPort(0))));
    }
}
