//! Declarative parser configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::expiry::ExpirationPolicy;
use crate::parser::JwtTokenParser;

/// Settings for building a [`JwtTokenParser`]
///
/// ```
/// use stateless_token::{TimeUnit, TokenConfig};
///
/// let config: TokenConfig = serde_json::from_str(r#"{
///     "secret": "change-me",
///     "expiration": { "duration": 30, "unit": "MINUTES" },
///     "issuer": "auth.example.com"
/// }"#).unwrap();
///
/// assert_eq!(config.expiration.unwrap().unit, TimeUnit::Minutes);
/// ```
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Shared HMAC secret
    pub secret: String,
    /// Token lifetime; tokens never expire when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<ExpirationPolicy>,
    /// Added as the `iss` claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Added as the `aud` claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_expiration(mut self, policy: ExpirationPolicy) -> Self {
        self.expiration = Some(policy);
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Build a parser for principals of type `P`
    pub fn build<P>(&self) -> Result<JwtTokenParser<P>> {
        let mut parser = JwtTokenParser::new(self.secret.as_bytes());

        if let Some(policy) = self.expiration {
            parser.will_expire_after(Some(policy.duration), Some(policy.unit))?;
        }

        if self.issuer.is_some() || self.audience.is_some() {
            let issuer = self.issuer.clone();
            let audience = self.audience.clone();
            parser = parser.with_claims_hook(move |mut builder| {
                if let Some(iss) = &issuer {
                    builder = builder.issuer(iss.as_str());
                }
                if let Some(aud) = &audience {
                    builder = builder.audience(aud.as_str());
                }
                builder
            });
        }

        Ok(parser)
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("expiration", &self.expiration)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}
