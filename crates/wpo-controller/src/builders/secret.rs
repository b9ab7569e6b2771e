use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde_json::Value;
use wpo_core::Object;

use super::BuildError;

/// WordPress authentication keys and salts stored in the site secret.
pub const SALT_KEYS: [&str; 8] = [
    "AUTH_KEY",
    "SECURE_AUTH_KEY",
    "LOGGED_IN_KEY",
    "NONCE_KEY",
    "AUTH_SALT",
    "SECURE_AUTH_SALT",
    "LOGGED_IN_SALT",
    "NONCE_SALT",
];

const SALT_BYTES: usize = 64;

fn random_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Fills in missing salts. Existing values are never regenerated.
pub(super) fn build(object: &mut Object) -> Result<(), BuildError> {
    object.update_object_field("data", |data| {
        for key in SALT_KEYS {
            let present = data
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.is_empty());
            if !present {
                data.insert(key.to_string(), Value::String(random_salt()));
            }
        }
    });
    Ok(())
}
