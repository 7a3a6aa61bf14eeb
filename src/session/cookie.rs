//! HMAC-SHA256 signing of the session cookie.
//!
//! Cookie value: `base64url(session_id).base64url(hmac(secret, session_id))`.
//! Only the id is signed; the session itself stays server-side.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed_mac(secret: &[u8], session_id: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 takes any key length"));
    mac.update(session_id.as_bytes());
    mac
}

/// Sign a session ID, returning the cookie value.
pub fn sign_session_id(secret: &[u8], session_id: &str) -> String {
    let signature = keyed_mac(secret, session_id).finalize().into_bytes();
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(session_id.as_bytes()),
        URL_SAFE_NO_PAD.encode(signature)
    )
}

/// Verify a signed cookie value and extract the session ID.
///
/// `None` on a bad signature or malformed value.
pub fn verify_cookie(secret: &[u8], cookie_value: &str) -> Option<String> {
    let (id_part, sig_part) = cookie_value.split_once('.')?;

    let session_id = String::from_utf8(URL_SAFE_NO_PAD.decode(id_part).ok()?).ok()?;
    let signature = URL_SAFE_NO_PAD.decode(sig_part).ok()?;

    keyed_mac(secret, &session_id).verify_slice(&signature).ok()?;

    Some(session_id)
}
