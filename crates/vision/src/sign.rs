use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Korea Standard Time, the clock the food provider validates timestamps against.
const KST_OFFSET_HOURS: i64 = 9;

/// HMAC-SHA256 of `"{client_id}:{timestamp}"` keyed by `client_secret`,
/// as a lowercase hex string (64 chars). `None` if the key is rejected.
pub fn sign(client_id: &str, client_secret: &str, timestamp: &str) -> Option<String> {
    let mut mac = match <Hmac<Sha256> as Mac>::new_from_slice(client_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return None,
    };
    mac.update(client_id.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// `YYYYMMDDHHMMSSmmm` in KST, millisecond precision (17 chars).
pub fn auth_timestamp(now: DateTime<Utc>) -> String {
    (now.naive_utc() + Duration::hours(KST_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S%3f")
        .to_string()
}
