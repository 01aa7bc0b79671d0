//! Token header binding
//!
//! Tokens travel in a dedicated header, `X-AUTH-TOKEN` by default. When
//! reading, an `Authorization: Bearer <token>` header is accepted as well.
//!
//! # Format
//!
//! ```text
//! X-AUTH-TOKEN: <token>
//! Authorization: Bearer <token>
//! ```

use std::marker::PhantomData;

use stateless_token::{TokenError, TokenParser, TokenState};
use tracing::debug;

/// Header used when no other name is configured
pub const DEFAULT_TOKEN_HEADER: &str = "X-AUTH-TOKEN";

/// Writes tokens for signed-in principals onto responses and reads them back
/// from requests
pub struct TokenHeaderBinder<P, T> {
    parser: T,
    header_name: String,
    _principal: PhantomData<fn() -> P>,
}

impl<P, T: TokenParser<P>> TokenHeaderBinder<P, T> {
    pub fn new(parser: T) -> Self {
        Self::with_header(parser, DEFAULT_TOKEN_HEADER)
    }

    pub fn with_header(parser: T, header_name: impl Into<String>) -> Self {
        Self {
            parser,
            header_name: header_name.into(),
            _principal: PhantomData,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn parser(&self) -> &T {
        &self.parser
    }

    /// Create a token for `principal` and set it on `headers`, replacing any
    /// token header already present.
    pub fn add(
        &self,
        headers: &mut Vec<(String, String)>,
        principal: &P,
    ) -> Result<(), TokenError> {
        let token = self.parser.create(principal)?;

        headers.retain(|(name, _)| !name.eq_ignore_ascii_case(&self.header_name));
        headers.push((self.header_name.clone(), token));
        Ok(())
    }

    /// Find and parse the token carried by `headers`
    ///
    /// # Returns
    /// - `Ok(None)` if the request carries no token
    /// - `Ok(Some(state))` for a genuine token, valid or expired
    /// - `Err(TokenError::Verification)` for a forged or malformed token
    pub fn retrieve(
        &self,
        headers: &[(String, String)],
    ) -> Result<Option<TokenState<P>>, TokenError> {
        let Some(token) = self.extract_token(headers) else {
            debug!("No {} or bearer token found", self.header_name);
            return Ok(None);
        };

        match self.parser.parse(token) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                debug!("Token from {} rejected: {}", self.header_name, e);
                Err(e)
            }
        }
    }

    fn extract_token<'a>(&self, headers: &'a [(String, String)]) -> Option<&'a str> {
        let dedicated = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&self.header_name))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty());

        dedicated.or_else(|| {
            headers
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case("authorization"))
                .find_map(|(_, value)| bearer_token(value))
        })
    }
}

/// Extract the token from a `Bearer <token>` value (scheme is case-insensitive)
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
