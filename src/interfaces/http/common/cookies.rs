//! Session cookies
//!
//! Tokens travel in two http-only cookies, `access_token` and
//! `refresh_token`. Requests without cookies may present the access token
//! as `Authorization: Bearer <token>` instead.

use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use crate::application::identity::TokenPair;
use crate::config::AppConfig;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub same_site: String,
    pub domain: Option<String>,
    pub access_max_age: i64,
    pub refresh_max_age: i64,
}

impl CookieConfig {
    /// `Secure` and `Domain` are only applied in production; plain HTTP
    /// stays usable during development.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let production = config.is_production();
        Self {
            secure: production && config.cookies.force_https,
            same_site: config.cookies.same_site.clone(),
            domain: config.cookies.domain.clone().filter(|_| production),
            access_max_age: config.security.access_token_hours * 3600,
            refresh_max_age: config.security.refresh_token_days * 86_400,
        }
    }

    fn render(&self, name: &str, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{name}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite={}",
            self.same_site
        );
        if self.secure || self.same_site.eq_ignore_ascii_case("none") {
            cookie.push_str("; Secure");
        }
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        cookie
    }

    fn append(&self, headers: &mut HeaderMap, name: &str, value: &str, max_age: i64) {
        // Token values are base64url and dots, always valid header bytes.
        if let Ok(v) = HeaderValue::from_str(&self.render(name, value, max_age)) {
            headers.append(SET_COOKIE, v);
        }
    }

    pub fn set_session(&self, headers: &mut HeaderMap, tokens: &TokenPair) {
        self.append(headers, ACCESS_COOKIE, &tokens.access_token, self.access_max_age);
        self.append(headers, REFRESH_COOKIE, &tokens.refresh_token, self.refresh_max_age);
    }

    pub fn clear_session(&self, headers: &mut HeaderMap) {
        self.append(headers, ACCESS_COOKIE, "", 0);
        self.append(headers, REFRESH_COOKIE, "", 0);
    }
}

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Access token from the cookie, falling back to the bearer header.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, ACCESS_COOKIE).or_else(|| bearer_token(headers))
}

pub fn refresh_token(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, REFRESH_COOKIE)
}
