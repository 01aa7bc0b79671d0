//! Token creation and parsing for typed principals

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::claims::{Claims, ClaimsBuilder, ENTITY_CLAIM, EXPIRATION_CLAIM};
use crate::clock::{Clock, SystemClock};
use crate::codec::{MessagePackCodec, PayloadCodec};
use crate::error::{Result, TokenError};
use crate::expiry::{ExpirationPolicy, TimeUnit};
use crate::radix64;
use crate::signer::{ClaimsSigner, Hs512Signer};

/// Outcome of parsing a token whose signature checked out
#[derive(Debug, Clone, PartialEq)]
pub enum TokenState<P> {
    /// Token is valid and carries this principal
    Valid(P),
    /// Token was genuine but its expiration has passed
    Expired { expired_at: DateTime<Utc> },
}

impl<P> TokenState<P> {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenState::Valid(_))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, TokenState::Expired { .. })
    }

    /// The principal, or `None` for an expired token
    pub fn into_principal(self) -> Option<P> {
        match self {
            TokenState::Valid(principal) => Some(principal),
            TokenState::Expired { .. } => None,
        }
    }
}

/// Turns principals into tokens and tokens back into principals
pub trait TokenParser<P>: Send + Sync {
    fn create(&self, principal: &P) -> Result<String>;

    /// Verify `token` and recover its principal.
    ///
    /// Returns `Err(TokenError::Verification)` for forged or malformed tokens
    /// and `Ok(TokenState::Expired)` for genuine tokens past their expiry.
    fn parse(&self, token: &str) -> Result<TokenState<P>>;
}

/// Customization step that contributes extra claims to each token
pub type ClaimsHook = Arc<dyn Fn(ClaimsBuilder) -> ClaimsBuilder + Send + Sync>;

/// JWT backed [`TokenParser`]
///
/// The principal is serialized with the codec, base64 encoded and stored in
/// the `entity` claim of an HS512 signed JWT. Tokens never expire unless an
/// expiration policy is set.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use stateless_token::{JwtTokenParser, TimeUnit, TokenParser, TokenState};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// let mut parser = JwtTokenParser::<User>::new("secret");
/// parser.expire_after(TimeUnit::Hours, 1).unwrap();
///
/// let token = parser.create(&User { name: "alice".into() }).unwrap();
/// let state = parser.parse(&token).unwrap();
///
/// assert_eq!(state, TokenState::Valid(User { name: "alice".into() }));
/// ```
pub struct JwtTokenParser<P, C = MessagePackCodec> {
    codec: C,
    signer: Box<dyn ClaimsSigner>,
    clock: Arc<dyn Clock>,
    expiration: Option<ExpirationPolicy>,
    hook: Option<ClaimsHook>,
    _principal: PhantomData<fn() -> P>,
}

impl<P> JwtTokenParser<P, MessagePackCodec> {
    /// Parser with MessagePack payloads, HS512 signatures and the system clock
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self::with_components(
            MessagePackCodec,
            Hs512Signer::new(secret),
            Arc::new(SystemClock),
        )
    }
}

impl<P, C: PayloadCodec> JwtTokenParser<P, C> {
    /// Parser with every collaborator supplied by the caller
    pub fn with_components(
        codec: C,
        signer: impl ClaimsSigner + 'static,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codec,
            signer: Box::new(signer),
            clock,
            expiration: None,
            hook: None,
            _principal: PhantomData,
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Install a hook that may add claims to every token
    ///
    /// The hook starts from an empty claims set. `entity` and, when a policy
    /// is set, `exp` are applied over its result, so it cannot change them.
    pub fn with_claims_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(ClaimsBuilder) -> ClaimsBuilder + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Make every token created from now on expire `duration` `unit`s after
    /// it is issued.
    ///
    /// Both parts are required; if either is missing this fails and the
    /// current policy is kept.
    pub fn will_expire_after(
        &mut self,
        duration: Option<u64>,
        unit: Option<TimeUnit>,
    ) -> Result<&mut Self> {
        let policy = ExpirationPolicy::from_parts(duration, unit)?;
        // Reject unrepresentable lifetimes now rather than on every create
        policy.lifetime()?;
        self.expiration = Some(policy);
        Ok(self)
    }

    /// Form of [`will_expire_after`](Self::will_expire_after) for callers
    /// that always have both parts. Unrepresentable lifetimes still fail here
    /// and leave the current policy in place.
    pub fn expire_after(&mut self, unit: TimeUnit, duration: u64) -> Result<&mut Self> {
        self.will_expire_after(Some(duration), Some(unit))
    }

    pub fn expiration(&self) -> Option<ExpirationPolicy> {
        self.expiration
    }

    fn claims_for(&self, principal: &P) -> Result<Claims>
    where
        P: Serialize,
    {
        let payload = self.codec.encode(principal).map_err(|e| {
            TokenError::InvalidArgument(format!("Principal could not be encoded: {}", e))
        })?;

        let mut builder = match &self.hook {
            Some(hook) => hook(ClaimsBuilder::new()),
            None => ClaimsBuilder::new(),
        };

        // Core claims go on last so a hook cannot replace or drop them
        builder = builder.claim(ENTITY_CLAIM, radix64::encode(&payload));
        if let Some(policy) = &self.expiration {
            builder = builder.expiration(policy.expires_at(self.clock.now())?);
        }

        Ok(builder.build())
    }

    fn expired_at(&self, claims: &Claims) -> Result<Option<DateTime<Utc>>> {
        let Some(exp) = claims.get(EXPIRATION_CLAIM) else {
            return Ok(None);
        };

        let expires_at = exp
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or_else(|| {
                TokenError::InvalidArgument(format!("Malformed expiration claim: {}", exp))
            })?;

        if self.clock.now() >= expires_at {
            Ok(Some(expires_at))
        } else {
            Ok(None)
        }
    }

    fn principal_from(&self, claims: &Claims) -> Result<P>
    where
        P: DeserializeOwned,
    {
        let entity = claims.entity().ok_or_else(|| {
            TokenError::InvalidArgument(format!("Token has no '{}' claim", ENTITY_CLAIM))
        })?;

        let payload = radix64::decode(entity)?;

        self.codec.decode(&payload).map_err(|e| {
            TokenError::InvalidArgument(format!("Principal could not be decoded: {}", e))
        })
    }
}

impl<P, C> TokenParser<P> for JwtTokenParser<P, C>
where
    P: Serialize + DeserializeOwned,
    C: PayloadCodec,
{
    fn create(&self, principal: &P) -> Result<String> {
        let claims = self.claims_for(principal)?;
        let token = self.signer.sign(&claims)?;

        trace!(claims = claims.len(), "Token created");
        Ok(token)
    }

    fn parse(&self, token: &str) -> Result<TokenState<P>> {
        let claims = self.signer.verify(token).map_err(|e| {
            debug!("Token rejected: {}", e);
            e
        })?;

        if let Some(expired_at) = self.expired_at(&claims)? {
            debug!(%expired_at, "Token expired");
            return Ok(TokenState::Expired { expired_at });
        }

        self.principal_from(&claims).map(TokenState::Valid)
    }
}

impl<P, C: fmt::Debug> fmt::Debug for JwtTokenParser<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenParser")
            .field("codec", &self.codec)
            .field("expiration", &self.expiration)
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, MockClock};
    use chrono::{Duration, TimeZone};
    use serde::{Deserialize, Serializer};

    const TEST_SECRET: &str = "test_secret_key_1234567890";

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        username: String,
        roles: Vec<String>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        number: u64,
        paid: bool,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not today"))
        }
    }

    impl<'de> Deserialize<'de> for Unserializable {
        fn deserialize<D: serde::Deserializer<'de>>(_: D) -> std::result::Result<Self, D::Error> {
            Err(serde::de::Error::custom("not today"))
        }
    }

    fn alice() -> User {
        User {
            username: "alice".to_string(),
            roles: vec!["admin".to_string()],
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn parser_with_clock(clock: &ManualClock) -> JwtTokenParser<User> {
        JwtTokenParser::new(TEST_SECRET).with_clock(Arc::new(clock.clone()))
    }

    #[test]
    fn test_round_trip_without_expiration() {
        let parser = JwtTokenParser::<User>::new(TEST_SECRET);

        let token = parser.create(&alice()).unwrap();

        assert_eq!(parser.parse(&token).unwrap(), TokenState::Valid(alice()));
    }

    #[test]
    fn test_no_expiration_claim_by_default() {
        let clock = ManualClock::new(start());
        let parser = parser_with_clock(&clock);

        let token = parser.create(&alice()).unwrap();
        let claims = Hs512Signer::new(TEST_SECRET).verify(&token).unwrap();
        assert!(!claims.contains(EXPIRATION_CLAIM));
        assert_eq!(claims.len(), 1);

        // Far in the future the token still holds
        clock.advance(Duration::days(365 * 50));
        assert!(parser.parse(&token).unwrap().is_valid());
    }

    #[test]
    fn test_expiration_with_manual_clock() {
        let clock = ManualClock::new(start());
        let mut parser = parser_with_clock(&clock);
        parser
            .will_expire_after(Some(1), Some(TimeUnit::Seconds))
            .unwrap();

        let token = parser.create(&alice()).unwrap();

        clock.advance(Duration::milliseconds(500));
        assert_eq!(parser.parse(&token).unwrap(), TokenState::Valid(alice()));

        clock.advance(Duration::milliseconds(1000));
        assert_eq!(
            parser.parse(&token).unwrap(),
            TokenState::Expired {
                expired_at: start() + Duration::seconds(1)
            }
        );
    }

    #[test]
    fn test_expiration_claim_value() {
        let clock = ManualClock::new(start());
        let mut parser = parser_with_clock(&clock);
        parser.expire_after(TimeUnit::Minutes, 30).unwrap();

        let token = parser.create(&alice()).unwrap();
        let claims = Hs512Signer::new(TEST_SECRET).verify(&token).unwrap();

        assert_eq!(
            claims.get(EXPIRATION_CLAIM).unwrap(),
            start().timestamp() + 30 * 60
        );
    }

    #[test]
    fn test_frozen_clock_gives_identical_tokens() {
        let mut clock = MockClock::new();
        clock.expect_now().times(2).return_const(start());

        let mut parser = JwtTokenParser::<User>::new(TEST_SECRET).with_clock(Arc::new(clock));
        parser.expire_after(TimeUnit::Hours, 1).unwrap();

        let first = parser.create(&alice()).unwrap();
        let second = parser.create(&alice()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let parser = JwtTokenParser::<User>::new(TEST_SECRET);
        let token = parser.create(&alice()).unwrap();

        let (signed, signature) = token.rsplit_once('.').unwrap();
        let mut bytes = signature.as_bytes().to_vec();
        // Swap the first character for a different base64url character
        bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{}.{}", signed, String::from_utf8(bytes).unwrap());

        assert!(matches!(
            parser.parse(&tampered),
            Err(TokenError::Verification(_))
        ));
    }

    #[test]
    fn test_tampered_claims_are_rejected() {
        let parser = JwtTokenParser::<User>::new(TEST_SECRET);
        let token = parser.create(&alice()).unwrap();

        let forged = ClaimsBuilder::new()
            .claim(
                ENTITY_CLAIM,
                radix64::encode(
                    &MessagePackCodec
                        .encode(&User {
                            username: "mallory".to_string(),
                            roles: vec!["admin".to_string()],
                        })
                        .unwrap(),
                ),
            )
            .build();
        let forged_token = Hs512Signer::new("attacker-secret").sign(&forged).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged_token.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert!(matches!(
            parser.parse(&spliced),
            Err(TokenError::Verification(_))
        ));
        assert!(matches!(
            parser.parse(&forged_token),
            Err(TokenError::Verification(_))
        ));
    }

    #[test]
    fn test_expired_token_with_bad_signature_is_still_rejected() {
        let clock = ManualClock::new(start());
        let mut parser = parser_with_clock(&clock);
        parser.expire_after(TimeUnit::Seconds, 1).unwrap();

        let token = parser.create(&alice()).unwrap();
        clock.advance(Duration::seconds(10));

        let other = JwtTokenParser::<User>::new("other-secret").with_clock(Arc::new(clock));
        assert!(matches!(
            other.parse(&token),
            Err(TokenError::Verification(_))
        ));
    }

    #[test]
    fn test_entity_claim_is_nested_encoding() {
        let parser = JwtTokenParser::<User>::new(TEST_SECRET);
        let token = parser.create(&alice()).unwrap();

        let claims = Hs512Signer::new(TEST_SECRET).verify(&token).unwrap();
        let bytes = radix64::decode(claims.entity().unwrap()).unwrap();

        let decoded: User = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, alice());
    }

    #[test]
    fn test_cross_type_payload_is_invalid_argument() {
        let users = JwtTokenParser::<User>::new(TEST_SECRET);
        let invoices = JwtTokenParser::<Invoice>::new(TEST_SECRET);

        let token = users.create(&alice()).unwrap();

        assert!(matches!(
            invoices.parse(&token),
            Err(TokenError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unserializable_principal_is_invalid_argument() {
        let parser = JwtTokenParser::<Unserializable>::new(TEST_SECRET);

        let err = parser.create(&Unserializable).unwrap_err();

        assert!(matches!(err, TokenError::InvalidArgument(_)));
        assert!(err.to_string().contains("not today"));
    }

    #[test]
    fn test_missing_or_corrupt_entity_is_invalid_argument() {
        let parser = JwtTokenParser::<User>::new(TEST_SECRET);
        let signer = Hs512Signer::new(TEST_SECRET);

        let no_entity = signer
            .sign(&ClaimsBuilder::new().subject("alice").build())
            .unwrap();
        assert!(matches!(
            parser.parse(&no_entity),
            Err(TokenError::InvalidArgument(_))
        ));

        let bad_base64 = signer
            .sign(&ClaimsBuilder::new().claim(ENTITY_CLAIM, "%%%").build())
            .unwrap();
        assert!(matches!(
            parser.parse(&bad_base64),
            Err(TokenError::InvalidArgument(_))
        ));

        let bad_exp = signer
            .sign(
                &ClaimsBuilder::new()
                    .claim(ENTITY_CLAIM, "")
                    .claim(EXPIRATION_CLAIM, "tomorrow")
                    .build(),
            )
            .unwrap();
        assert!(matches!(
            parser.parse(&bad_exp),
            Err(TokenError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_partial_expiration_keeps_previous_policy() {
        let mut parser = JwtTokenParser::<User>::new(TEST_SECRET);
        parser.expire_after(TimeUnit::Minutes, 5).unwrap();

        assert!(matches!(
            parser.will_expire_after(None, Some(TimeUnit::Seconds)),
            Err(TokenError::InvalidArgument(_))
        ));
        assert!(matches!(
            parser.will_expire_after(Some(1), None),
            Err(TokenError::InvalidArgument(_))
        ));

        assert_eq!(
            parser.expiration(),
            Some(ExpirationPolicy::new(5, TimeUnit::Minutes))
        );
    }

    #[test]
    fn test_partial_expiration_on_fresh_parser_sets_nothing() {
        let mut parser = JwtTokenParser::<User>::new(TEST_SECRET);

        assert!(parser.will_expire_after(None, None).is_err());
        assert_eq!(parser.expiration(), None);
    }

    #[test]
    fn test_unrepresentable_expiration_is_rejected_upfront() {
        let mut parser = JwtTokenParser::<User>::new(TEST_SECRET);

        assert!(parser
            .will_expire_after(Some(u64::MAX), Some(TimeUnit::Days))
            .is_err());
        assert_eq!(parser.expiration(), None);
    }

    #[test]
    fn test_claims_hook_adds_claims() {
        let clock = ManualClock::new(start());
        let parser = parser_with_clock(&clock).with_claims_hook(|builder| {
            assert!(builder.get(ENTITY_CLAIM).is_none());
            builder.issuer("auth-service").audience("web")
        });

        let token = parser.create(&alice()).unwrap();
        let claims = Hs512Signer::new(TEST_SECRET).verify(&token).unwrap();

        assert_eq!(claims.issuer(), Some("auth-service"));
        assert_eq!(claims.audience(), Some("web"));
        assert_eq!(parser.parse(&token).unwrap(), TokenState::Valid(alice()));
    }

    #[test]
    fn test_claims_hook_cannot_override_core_claims() {
        let clock = ManualClock::new(start());
        let mut parser = parser_with_clock(&clock).with_claims_hook(|builder| {
            builder
                .claim(ENTITY_CLAIM, "AAAA")
                .expiration(i64::MAX)
                .without(EXPIRATION_CLAIM)
        });
        parser.expire_after(TimeUnit::Seconds, 1).unwrap();

        let token = parser.create(&alice()).unwrap();
        let claims = Hs512Signer::new(TEST_SECRET).verify(&token).unwrap();

        let payload = radix64::decode(claims.entity().unwrap()).unwrap();
        assert_eq!(MessagePackCodec.decode::<User>(&payload).unwrap(), alice());
        assert_eq!(
            claims.get(EXPIRATION_CLAIM).unwrap(),
            start().timestamp() + 1
        );

        clock.advance(Duration::seconds(2));
        assert!(parser.parse(&token).unwrap().is_expired());
    }

    #[test]
    fn test_claims_hook_overriding_entity_without_policy() {
        let parser = JwtTokenParser::<User>::new(TEST_SECRET)
            .with_claims_hook(|builder| builder.claim(ENTITY_CLAIM, 42));

        let token = parser.create(&alice()).unwrap();

        assert_eq!(parser.parse(&token).unwrap(), TokenState::Valid(alice()));
    }

    #[test]
    fn test_expire_after_rejects_unrepresentable_lifetime() {
        let mut parser = JwtTokenParser::<User>::new(TEST_SECRET);
        parser.expire_after(TimeUnit::Minutes, 5).unwrap();

        assert!(matches!(
            parser.expire_after(TimeUnit::Days, u64::MAX),
            Err(TokenError::InvalidArgument(_))
        ));
        assert_eq!(
            parser.expiration(),
            Some(ExpirationPolicy::new(5, TimeUnit::Minutes))
        );
        assert!(parser.create(&alice()).is_ok());
    }

    #[test]
    fn test_failed_parse_leaves_parser_usable() {
        let parser = JwtTokenParser::<User>::new(TEST_SECRET);

        assert!(parser.parse("not.a.token").is_err());

        let token = parser.create(&alice()).unwrap();
        assert!(parser.parse(&token).unwrap().is_valid());
    }

    #[test]
    fn test_parser_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JwtTokenParser<User>>();

        let parser = Arc::new(JwtTokenParser::<User>::new(TEST_SECRET));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let parser = Arc::clone(&parser);
                std::thread::spawn(move || {
                    let user = User {
                        username: format!("user-{}", i),
                        roles: vec![],
                    };
                    let token = parser.create(&user).unwrap();
                    assert_eq!(parser.parse(&token).unwrap(), TokenState::Valid(user));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_token_state_accessors() {
        let valid = TokenState::Valid(1);
        assert!(valid.is_valid());
        assert_eq!(valid.into_principal(), Some(1));

        let expired: TokenState<i32> = TokenState::Expired {
            expired_at: start(),
        };
        assert!(expired.is_expired());
        assert_eq!(expired.into_principal(), None);
    }
}
