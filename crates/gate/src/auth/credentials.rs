//! Basic auth credential extraction

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::identity::Credentials;

/// Extract `Authorization: Basic <base64(user:pass)>` credentials.
///
/// Returns None for a missing header, another scheme, bad base64, non UTF-8
/// content or a payload without a `:` separator.
pub fn extract_basic_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    // Password may itself contain ':'
    let (username, password) = decoded.split_once(':')?;

    Some(Credentials::new(username, password))
}
