//! Transport → kernel request context.

use std::collections::HashMap;

use axum::http::{HeaderMap, header};

use gatehouse_infra::CookieConfig;
use gatehouse_kernel::RequestContext;

/// Header a script-driven client may use instead of the `csrf_token` form field.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Build the kernel's view of one request from its headers and input fields.
///
/// The anti-forgery hash and the session token come from cookies; the
/// submitted token from [`CSRF_HEADER`] or, failing that, the form field.
pub fn request_context(
    headers: &HeaderMap,
    cookies: &CookieConfig,
    fields: HashMap<String, String>,
) -> RequestContext {
    let jar = read_cookies(headers);
    let mut ctx = RequestContext::new().with_fields(fields);

    let header_token = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = header_token {
        ctx = ctx.with_submitted_csrf(token);
    }
    if let Some(hash) = jar.get(&cookies.csrf) {
        ctx = ctx.with_stored_csrf_hash(hash.as_str());
    }
    if let Some(token) = jar.get(&cookies.session) {
        ctx = ctx.with_session_token(token.as_str());
    }
    ctx
}

/// Parse every `Cookie` header; the first occurrence of a name wins.
pub fn read_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut jar = HashMap::new();
    let pairs = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.split_once('='));

    for (name, value) in pairs {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        jar.entry(name.to_string())
            .or_insert_with(|| value.trim().trim_matches('"').to_string());
    }
    jar
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn cookies_are_split_and_trimmed() {
        let jar = read_cookies(&headers(&[
            ("cookie", "a=1; b=\"two\" ;c=3=3"),
            ("cookie", "a=ignored; d=4"),
        ]));
        assert_eq!(jar.get("a").map(String::as_str), Some("1"));
        assert_eq!(jar.get("b").map(String::as_str), Some("two"));
        assert_eq!(jar.get("c").map(String::as_str), Some("3=3"));
        assert_eq!(jar.get("d").map(String::as_str), Some("4"));
    }

    #[test]
    fn context_reads_configured_cookie_names() {
        let config = CookieConfig::default();
        let ctx = request_context(
            &headers(&[
                ("cookie", "gatehouse_csrf=hash; gatehouse_session=sess; other=x"),
                ("x-csrf-token", " tok "),
            ]),
            &config,
            HashMap::from([("title".to_string(), "hello".to_string())]),
        );

        assert_eq!(ctx.stored_csrf_hash(), Some("hash"));
        assert_eq!(ctx.session_token(), Some("sess"));
        assert_eq!(ctx.submitted_csrf(), Some("tok"));
        assert_eq!(ctx.field("title"), Some("hello"));
    }

    #[test]
    fn form_field_token_is_used_without_the_header() {
        let ctx = request_context(
            &HeaderMap::new(),
            &CookieConfig::default(),
            HashMap::from([("csrf_token".to_string(), "from-form".to_string())]),
        );
        assert_eq!(ctx.submitted_csrf(), Some("from-form"));
        assert_eq!(ctx.session_token(), None);
    }

    #[test]
    fn blank_header_does_not_hide_the_form_token() {
        let ctx = request_context(
            &headers(&[("x-csrf-token", "  ")]),
            &CookieConfig::default(),
            HashMap::from([("csrf_token".to_string(), "from-form".to_string())]),
        );
        assert_eq!(ctx.submitted_csrf(), Some("from-form"));
    }
}
