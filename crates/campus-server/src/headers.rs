//! Security, cache-control and cookie header handling applied to every
//! gated response.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::policy::{any_prefix_matches, prefix_matches};

const STATIC_PREFIXES: [&str; 2] = ["/_next/static/", "/static/"];

static X_XSS_PROTECTION: HeaderName = HeaderName::from_static("x-xss-protection");
static PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");
static X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Build the CSP: `'self'` everywhere plus the given widget origins
/// where third-party embeds need them.
pub fn content_security_policy(widget_origins: &[String]) -> String {
    let extra = widget_origins.join(" ");
    let with_widgets = |directive: &str| {
        if extra.is_empty() {
            format!("{directive} 'self'")
        } else {
            format!("{directive} 'self' {extra}")
        }
    };

    [
        "default-src 'self'".to_string(),
        with_widgets("script-src"),
        "style-src 'self' 'unsafe-inline'".to_string(),
        "img-src 'self' data: https:".to_string(),
        with_widgets("connect-src"),
        with_widgets("frame-src"),
        "object-src 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "frame-ancestors 'none'".to_string(),
    ]
    .join("; ")
}

pub fn apply_security_headers(headers: &mut HeaderMap, csp: &HeaderValue) {
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        X_XSS_PROTECTION.clone(),
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(header::CONTENT_SECURITY_POLICY, csp.clone());
    headers.insert(
        PERMISSIONS_POLICY.clone(),
        HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
    );
    headers.remove(header::SERVER);
    headers.remove(&X_POWERED_BY);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Fingerprinted build assets.
    Immutable,
    /// Public API responses.
    ShortPublic,
    /// Anything tied to a session, and all pages.
    NoStore,
}

impl CachePolicy {
    pub fn for_path<S: AsRef<str>>(path: &str, public_prefixes: &[S]) -> Self {
        if STATIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
            CachePolicy::Immutable
        } else if prefix_matches("/api", path) && any_prefix_matches(public_prefixes, path) {
            CachePolicy::ShortPublic
        } else {
            CachePolicy::NoStore
        }
    }

    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_static(match self {
            CachePolicy::Immutable => "public, max-age=31536000, immutable",
            CachePolicy::ShortPublic => "public, max-age=60",
            CachePolicy::NoStore => "no-store, no-cache, must-revalidate",
        })
    }
}

/// Collapse `Set-Cookie` headers that set the same cookie name,
/// keeping the last one. Distinct cookies keep their relative order.
pub fn dedupe_set_cookie(headers: &mut HeaderMap) {
    let cookies: Vec<HeaderValue> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .cloned()
        .collect();
    if cookies.len() < 2 {
        return;
    }

    let mut kept: Vec<(Option<String>, HeaderValue)> = Vec::with_capacity(cookies.len());
    for value in cookies {
        let name = cookie_name(&value);
        if name.is_some() {
            kept.retain(|(n, _)| n != &name);
        }
        kept.push((name, value));
    }

    headers.remove(header::SET_COOKIE);
    for (_, value) in kept {
        headers.append(header::SET_COOKIE, value);
    }
}

fn cookie_name(value: &HeaderValue) -> Option<String> {
    let text = value.to_str().ok()?;
    let (name, _) = text.split_once('=')?;
    Some(name.trim().to_string())
}
