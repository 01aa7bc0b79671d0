//! Claims set carried inside a token

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim holding the encoded principal
pub const ENTITY_CLAIM: &str = "entity";
/// Registered expiration claim (seconds since the epoch)
pub const EXPIRATION_CLAIM: &str = "exp";

/// Claims set of a token
///
/// Backed by a sorted map, so the same claims always serialize to the same
/// JSON and therefore the same signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn entity(&self) -> Option<&str> {
        self.get(ENTITY_CLAIM).and_then(Value::as_str)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get("iss").and_then(Value::as_str)
    }

    pub fn audience(&self) -> Option<&str> {
        self.get("aud").and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// In-progress claims set handed to customization hooks before signing
///
/// ```
/// use stateless_token::ClaimsBuilder;
///
/// let claims = ClaimsBuilder::new()
///     .issuer("auth.example.com")
///     .audience("api.example.com")
///     .claim("tenant", "acme")
///     .build();
///
/// assert_eq!(claims.issuer(), Some("auth.example.com"));
/// assert_eq!(claims.get("tenant").unwrap(), "acme");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClaimsBuilder {
    claims: Map<String, Value>,
}

impl ClaimsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary claim, replacing any previous value
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Remove a claim if present
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    pub fn issuer(self, iss: impl Into<String>) -> Self {
        self.claim("iss", iss.into())
    }

    pub fn audience(self, aud: impl Into<String>) -> Self {
        self.claim("aud", aud.into())
    }

    pub fn subject(self, sub: impl Into<String>) -> Self {
        self.claim("sub", sub.into())
    }

    pub fn token_id(self, jti: impl Into<String>) -> Self {
        self.claim("jti", jti.into())
    }

    pub fn issued_at(self, iat: i64) -> Self {
        self.claim("iat", iat)
    }

    pub fn not_before(self, nbf: i64) -> Self {
        self.claim("nbf", nbf)
    }

    pub fn expiration(self, exp: i64) -> Self {
        self.claim(EXPIRATION_CLAIM, exp)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn build(self) -> Claims {
        Claims(self.claims)
    }
}
