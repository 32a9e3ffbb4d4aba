//! Signed session cookie
//!
//! Cookie value format: `<jwt>.<hex(hmac_sha256(cookie_secret, jwt))>`

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Name of the session cookie
pub const AUTH_COOKIE: &str = "token";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct CookieSigner {
    key: Vec<u8>,
    /// Add the `Secure` attribute (everything but development)
    secure: bool,
}

impl CookieSigner {
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            secure,
        }
    }

    fn mac(&self) -> Result<HmacSha256, &'static str> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| "HMAC key error")
    }

    /// Append the signature to `value`
    pub fn sign(&self, value: &str) -> Result<String, &'static str> {
        let mut mac = self.mac()?;
        mac.update(value.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{value}.{signature}"))
    }

    /// Verify a signed value and return the original, constant-time compare
    pub fn verify<'a>(&self, signed: &'a str) -> Option<&'a str> {
        let (value, signature) = signed.rsplit_once('.')?;
        let sig_bytes = hex::decode(signature).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(value.as_bytes());
        mac.verify_slice(&sig_bytes).ok()?;
        Some(value)
    }

    /// `Set-Cookie` value carrying a signed token
    pub fn session_cookie(&self, token: &str, max_age_secs: i64) -> Result<String, &'static str> {
        let signed = self.sign(token)?;
        Ok(self.with_attributes(format!("{AUTH_COOKIE}={signed}"), max_age_secs))
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_cookie(&self) -> String {
        self.with_attributes(format!("{AUTH_COOKIE}="), 0)
    }

    fn with_attributes(&self, cookie: String, max_age_secs: i64) -> String {
        let mut cookie = format!("{cookie}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Find a cookie value in a `Cookie` request header
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = CookieSigner::new("cookie-secret", false);
        let signed = signer.sign("a.b.c").unwrap();
        assert_eq!(signer.verify(&signed), Some("a.b.c"));
    }

    #[test]
    fn test_tampered_value_rejected() {
        let signer = CookieSigner::new("cookie-secret", false);
        let signed = signer.sign("a.b.c").unwrap();
        let tampered = signed.replacen("a.b", "a.x", 1);
        assert_eq!(signer.verify(&tampered), None);
        assert_eq!(signer.verify("no-signature"), None);

        let other = CookieSigner::new("other-secret", false);
        assert_eq!(other.verify(&signed), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let dev = CookieSigner::new("s", false);
        let cookie = dev.session_cookie("jwt", 3600).unwrap();
        assert!(cookie.starts_with("token=jwt."));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(!cookie.contains("Secure"));

        let prod = CookieSigner::new("s", true);
        assert!(prod.clear_cookie().ends_with("; Secure"));
        assert!(prod.clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_find_cookie() {
        let header = "theme=dark; token=abc.def; lang=en";
        assert_eq!(find_cookie(header, "token"), Some("abc.def"));
        assert_eq!(find_cookie(header, "missing"), None);
    }
}
