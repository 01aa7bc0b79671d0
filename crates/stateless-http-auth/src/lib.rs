//! HTTP token transport for stateless principal tokens
//!
//! This crate binds tokens from `stateless-token` to HTTP messages without
//! depending on any particular web framework. Headers are handled as
//! `(name, value)` pairs, which every server library can produce and consume.
//!
//! # Usage
//!
//! ```
//! use stateless_http_auth::TokenHeaderBinder;
//! use stateless_token::{JwtTokenParser, TokenState};
//!
//! let binder = TokenHeaderBinder::new(JwtTokenParser::<String>::new("secret"));
//!
//! // After a successful sign in
//! let mut response_headers = Vec::new();
//! binder.add(&mut response_headers, &"alice".to_string()).unwrap();
//!
//! // On the next request the client sends the header back
//! let state = binder.retrieve(&response_headers).unwrap();
//! assert_eq!(state, Some(TokenState::Valid("alice".to_string())));
//! ```

mod binder;

pub use binder::{TokenHeaderBinder, DEFAULT_TOKEN_HEADER};
