//! Compact JWS signing and verification

use std::fmt;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::Claims;
use crate::error::{Result, TokenError};

/// Signs a claims set into a compact token and verifies it back
pub trait ClaimsSigner: Send + Sync {
    fn sign(&self, claims: &Claims) -> Result<String>;

    /// Check structure and signature and return the claims.
    ///
    /// Time-based claims are not checked here.
    fn verify(&self, token: &str) -> Result<Claims>;
}

/// HMAC-SHA-512 signer over a shared secret
pub struct Hs512Signer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Hs512Signer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        let mut validation = Validation::new(Algorithm::HS512);
        // Expiry is judged by the parser against its own clock
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl fmt::Debug for Hs512Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hs512Signer")
            .field("algorithm", &Algorithm::HS512)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl ClaimsSigner for Hs512Signer {
    fn sign(&self, claims: &Claims) -> Result<String> {
        let header = Header::new(Algorithm::HS512);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Verification(e.to_string()))?;

        Ok(token_data.claims)
    }
}
