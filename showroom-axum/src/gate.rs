//! Admin write authorization.
//!
//! Credential issuing lives outside this service; the gate only checks a
//! presented bearer token against a configured table and fails closed.

use std::collections::HashMap;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use showroom_core::errors::ShowroomError;

/// What a credential may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Decides whether a mutating request may proceed
pub trait WriteGate: Send + Sync {
    fn authorize(&self, headers: &HeaderMap) -> Result<(), ShowroomError>;
}

/// Static bearer-token table, e.g. from `auth.tokens = "s3cret:rw,viewer:ro"`
#[derive(Debug, Clone, Default)]
pub struct TokenGate {
    tokens: HashMap<String, Access>,
}

impl TokenGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, access: Access) -> Self {
        self.tokens.insert(token.into(), access);
        self
    }

    /// Parse `token[:rw|:ro],...`; a token without a suffix is read-write
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.rsplit_once(':') {
                Some((token, "ro")) => (token.trim().to_string(), Access::ReadOnly),
                Some((token, "rw")) => (token.trim().to_string(), Access::ReadWrite),
                _ => (entry.to_string(), Access::ReadWrite),
            })
            .filter(|(token, _)| !token.is_empty())
            .collect();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

impl WriteGate for TokenGate {
    fn authorize(&self, headers: &HeaderMap) -> Result<(), ShowroomError> {
        let token = bearer(headers)
            .ok_or_else(|| ShowroomError::not_authenticated("Admin credentials required"))?;
        match self.tokens.get(token) {
            Some(Access::ReadWrite) => Ok(()),
            Some(Access::ReadOnly) => Err(ShowroomError::forbidden(
                "This credential is read-only",
            )),
            None => Err(ShowroomError::not_authenticated("Invalid credentials")),
        }
    }
}
