//! Signed session cookies.
//!
//! A signed value is `<value>.<sig>` where `sig` is the unpadded URL-safe
//! base64 HMAC-SHA256 of `value`. JWTs contain dots themselves, so the
//! signature is split off at the last one.

use axum::http::{HeaderMap, HeaderValue, header};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub struct CookieSigner {
    secret: Vec<u8>,
    secure: bool,
}

impl CookieSigner {
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            secure,
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac();
        mac.update(value.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", value, sig)
    }

    /// Returns the original value when the signature matches.
    pub fn unsign<'a>(&self, signed: &'a str) -> Option<&'a str> {
        let (value, sig) = signed.rsplit_once('.')?;
        let sig = URL_SAFE_NO_PAD.decode(sig).ok()?;
        let mut mac = self.mac();
        mac.update(value.as_bytes());
        mac.verify_slice(&sig).ok().map(|_| value)
    }

    /// Read a signed cookie from the request headers.
    pub fn read<'a>(&self, headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        find_cookie(headers, name).and_then(|raw| self.unsign(raw))
    }

    pub fn set_cookie(&self, name: &str, value: &str, max_age: Duration) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict{}",
            name,
            self.sign(value),
            max_age.as_secs(),
            if self.secure { "; Secure" } else { "" }
        )
    }

    pub fn clear_cookie(&self, name: &str) -> String {
        format!(
            "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict{}",
            name,
            if self.secure { "; Secure" } else { "" }
        )
    }
}

/// Raw value of the first cookie called `name` across all `Cookie` headers.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// Append `Set-Cookie` headers, skipping values that are not valid header text.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: impl IntoIterator<Item = String>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Invalid Set-Cookie value: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_unsign_jwt_like_values() {
        let signer = CookieSigner::new("secret", false);
        let signed = signer.sign("aaa.bbb.ccc");
        assert_eq!(signer.unsign(&signed), Some("aaa.bbb.ccc"));
    }

    #[test]
    fn tampered_values_are_rejected() {
        let signer = CookieSigner::new("secret", false);
        let signed = signer.sign("42");
        let tampered = signed.replacen("42", "43", 1);
        assert_eq!(signer.unsign(&tampered), None);
        assert_eq!(CookieSigner::new("other", false).unsign(&signed), None);
        assert_eq!(signer.unsign("unsigned"), None);
    }

    #[test]
    fn reads_cookie_from_header() {
        let signer = CookieSigner::new("secret", false);
        let mut headers = HeaderMap::new();
        let cookie = format!("theme=dark; {}={}", ACCESS_COOKIE, signer.sign("tok.en"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        assert_eq!(signer.read(&headers, ACCESS_COOKIE), Some("tok.en"));
        assert_eq!(signer.read(&headers, REFRESH_COOKIE), None);
    }

    #[test]
    fn cookie_attributes() {
        let dev = CookieSigner::new("secret", false);
        let set = dev.set_cookie(ACCESS_COOKIE, "v", Duration::from_secs(900));
        assert!(set.starts_with("access_token=v."));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("SameSite=Strict"));
        assert!(set.contains("Max-Age=900"));
        assert!(!set.contains("Secure"));

        let prod = CookieSigner::new("secret", true);
        let cleared = prod.clear_cookie(REFRESH_COOKIE);
        assert!(cleared.starts_with("refresh_token=;"));
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.ends_with("; Secure"));
    }
}
