//! Credential generation for new clients.

use rand::Rng;
use uuid::Uuid;
use xpanel_core::Family;

/// Length in hex characters of a generated trojan password.
pub const PASSWORD_HEX_LEN: usize = 32;

/// Fresh credential for `family`: a random UUID for the identifier families,
/// a random hex password for trojan.
pub fn generate_credential(family: Family) -> String {
    if family.is_shared_password() {
        let bytes: [u8; PASSWORD_HEX_LEN / 2] = rand::thread_rng().r#gen();
        hex::encode(bytes)
    } else {
        Uuid::new_v4().to_string()
    }
}
