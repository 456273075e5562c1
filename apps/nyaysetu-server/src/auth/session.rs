// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token extraction and the authenticated user representation.
//!
//! The auth library stores the session token in a cookie as
//! `<token>.<signature>`, percent-encoded, where the signature is the
//! standard base64 of HMAC-SHA256(secret, token). API clients may send the
//! same value as a bearer token instead.

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use sha2::Sha256;
use utoipa::ToSchema;

use super::AuthError;
use crate::models::{SessionRecord, UserRecord};

/// Cookie written by the auth library over plain HTTP.
pub const SESSION_COOKIE: &str = "better-auth.session_token";
/// Cookie written by the auth library over HTTPS.
pub const SECURE_SESSION_COOKIE: &str = "__Secure-better-auth.session_token";

type HmacSha256 = Hmac<Sha256>;

/// Authenticated user resolved from a session.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email_verified: bool,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    pub fn from_records(session: SessionRecord, user: UserRecord) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            name: user.name,
            email_verified: user.email_verified,
            session_id: session.id,
            expires_at: session.expires_at,
        }
    }
}

/// Pull the raw (still signed) session value from the request.
///
/// The secure cookie wins over the plain one, and cookies win over the
/// `Authorization` header.
pub fn session_value(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    for name in [SECURE_SESSION_COOKIE, SESSION_COOKIE] {
        if let Some(value) = cookie_value(headers, name) {
            return Ok(Some(percent_decode(&value)));
        }
    }

    match headers.get(AUTHORIZATION) {
        Some(header) => {
            let header = header.to_str().map_err(|_| AuthError::MalformedToken)?;
            let token = header
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(AuthError::MalformedToken)?;
            Ok(Some(percent_decode(token)))
        }
        None => Ok(None),
    }
}

/// Find a cookie by name across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

/// Decode `%XX` escapes. Invalid escapes are kept verbatim.
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// Extract the bare session token from a cookie/bearer value.
///
/// With a secret the signature must verify. Without one (development mode)
/// a signature suffix is dropped unchecked.
pub fn session_token(value: &str, secret: Option<&str>) -> Result<String, AuthError> {
    match secret {
        Some(secret) => verify_signed_value(value, secret),
        None => {
            let token = value.rsplit_once('.').map(|(t, _)| t).unwrap_or(value);
            if token.is_empty() {
                Err(AuthError::MalformedToken)
            } else {
                Ok(token.to_string())
            }
        }
    }
}

/// Verify `<token>.<signature>` against the secret and return the token.
pub fn verify_signed_value(value: &str, secret: &str) -> Result<String, AuthError> {
    let (token, signature) = value.rsplit_once('.').ok_or(AuthError::MalformedToken)?;
    if token.is_empty() || signature.is_empty() {
        return Err(AuthError::MalformedToken);
    }

    let signature = Base64::decode_vec(signature).map_err(|_| AuthError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthError::Storage(e.to_string()))?;
    mac.update(token.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AuthError::InvalidSignature)?;

    Ok(token.to_string())
}

/// Produce the signed cookie value for a token, as the auth library does.
pub fn sign_token(token: &str, secret: &str) -> Result<String, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthError::Storage(e.to_string()))?;
    mac.update(token.as_bytes());
    let signature = Base64::encode_string(&mac.finalize().into_bytes());
    Ok(format!("{token}.{signature}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    #[test]
    fn signed_value_verifies() {
        let signed = sign_token("abc123", SECRET).unwrap();
        assert_eq!(verify_signed_value(&signed, SECRET).unwrap(), "abc123");
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let signed = sign_token("abc123", SECRET).unwrap();
        let tampered = signed.replacen("abc123", "abc124", 1);
        assert!(matches!(
            verify_signed_value(&tampered, SECRET),
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            verify_signed_value(&signed, "other-secret"),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn unsigned_value_requires_dev_mode() {
        assert!(matches!(
            session_token("abc123", Some(SECRET)),
            Err(AuthError::MalformedToken)
        ));
        assert_eq!(session_token("abc123", None).unwrap(), "abc123");
        assert_eq!(session_token("abc123.sig", None).unwrap(), "abc123");
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; better-auth.session_token=tok%2Eabc; lang=en"),
        );
        assert_eq!(session_value(&headers).unwrap().as_deref(), Some("tok.abc"));
    }

    #[test]
    fn secure_cookie_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static(
                "better-auth.session_token=plain; __Secure-better-auth.session_token=secure",
            ),
        );
        assert_eq!(session_value(&headers).unwrap().as_deref(), Some("secure"));
    }

    #[test]
    fn bearer_token_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok123"));
        assert_eq!(session_value(&headers).unwrap().as_deref(), Some("tok123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(matches!(session_value(&headers), Err(AuthError::MalformedToken)));
    }

    #[test]
    fn no_credentials_yields_none() {
        assert_eq!(session_value(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn percent_decoding_handles_base64_characters() {
        assert_eq!(percent_decode("a%2Bb%2Fc%3D"), "a+b/c=");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn signed_cookie_round_trips_through_encoding() {
        let signed = sign_token("tok", SECRET).unwrap();
        let encoded = signed
            .replace('+', "%2B")
            .replace('/', "%2F")
            .replace('=', "%3D");
        let decoded = percent_decode(&encoded);
        assert_eq!(session_token(&decoded, Some(SECRET)).unwrap(), "tok");
    }
}
