use http::HeaderValue;
use http::header::InvalidHeaderValue;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

const BEARER_SCHEME: &str = "Bearer ";

/// A complete `Authorization` header value sent to the GraphQL endpoint
#[derive(Debug, Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Credential for a raw token, using the bearer scheme
    pub fn bearer(token: &str) -> Self {
        Self(SecretString::from(format!("{BEARER_SCHEME}{token}")))
    }

    /// Credential for a header value that already carries its scheme
    pub fn from_header(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// The header value, sensitive so it is never printed by `http`
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(self.0.expose_secret())?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Hex encoded SHA-256 of the header value, safe to log
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.0.expose_secret().as_bytes()))
    }

    #[cfg(test)]
    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}
