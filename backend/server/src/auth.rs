//! # Household Credential
//!
//! Cookies
//! - tidyup_auth: the household id itself, set on create and on join
//! - HttpOnly, SameSite=Lax, Secure only when `COOKIE_SECURE` is on
//!
//! Every member of a household holds the same value. There is no expiry and no
//! per-member revocation, anyone holding the id can write to the household.
use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, InvalidHeaderValue},
        request::Parts,
    },
};

use crate::error::AppError;

pub const AUTH_COOKIE: &str = "tidyup_auth";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential(pub Option<String>);

impl Credential {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == AUTH_COOKIE)
            .map(|(_, value)| value.trim_matches('"').to_string());

        Self(value)
    }

    pub fn authorize(&self, hid: &str) -> Result<(), AppError> {
        match self.0.as_deref() {
            Some(token) if token == hid => Ok(()),
            _ => Err(AppError::Forbidden("Not authorized")),
        }
    }
}

impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

pub fn issue_cookie(id: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{AUTH_COOKIE}={id}; HttpOnly; Path=/; SameSite=Lax");

    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn test_reads_cookie() {
        let credential = Credential::from_headers(&headers(&["theme=dark; tidyup_auth=abc123"]));
        assert_eq!(credential, Credential(Some("abc123".to_string())));
    }

    #[test]
    fn test_reads_across_headers() {
        let credential =
            Credential::from_headers(&headers(&["theme=dark", "tidyup_auth=\"abc123\""]));
        assert_eq!(credential.0.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_missing_cookie() {
        assert_eq!(Credential::from_headers(&HeaderMap::new()), Credential(None));
        assert_eq!(
            Credential::from_headers(&headers(&["tidyup_authx=abc"])),
            Credential(None)
        );
    }

    #[test]
    fn test_authorize() {
        let credential = Credential(Some("abc".to_string()));
        assert!(credential.authorize("abc").is_ok());
        assert!(matches!(
            credential.authorize("abd"),
            Err(AppError::Forbidden(_))
        ));
        assert!(Credential(None).authorize("abc").is_err());
    }

    #[test]
    fn test_issue_cookie() {
        let cookie = issue_cookie("abc", false).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "tidyup_auth=abc; HttpOnly; Path=/; SameSite=Lax"
        );

        let cookie = issue_cookie("abc", true).unwrap();
        assert!(cookie.to_str().unwrap().ends_with("; Secure"));
    }
}
