//! Client effects → `Set-Cookie` headers.

use axum::http::HeaderValue;

use gatehouse_infra::CookieConfig;
use gatehouse_kernel::ClientEffect;

const LANGUAGE_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// Render one `Set-Cookie` value per effect.
///
/// Auth cookies are `HttpOnly` and `SameSite=Strict`; the language cookie is
/// readable by scripts and `Lax` so plain links keep the choice.
pub fn render(effect: &ClientEffect, config: &CookieConfig) -> String {
    let mut cookie = match effect {
        ClientEffect::IssueCsrf(pair) => {
            format!("{}={}; Path=/; HttpOnly; SameSite=Strict", config.csrf, pair.cookie_value())
        }
        ClientEffect::StartSession { token, expires_at } => format!(
            "{}={}; Path=/; HttpOnly; SameSite=Strict; Expires={}",
            config.session,
            token,
            expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
        ),
        ClientEffect::EndSession => {
            format!("{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0", config.session)
        }
        ClientEffect::SetLanguage(code) => format!(
            "{}={}; Path=/; SameSite=Lax; Max-Age={LANGUAGE_MAX_AGE_SECS}",
            config.language, code
        ),
    };
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn set_cookie_headers(effects: &[ClientEffect], config: &CookieConfig) -> Vec<HeaderValue> {
    effects
        .iter()
        .filter_map(|effect| {
            HeaderValue::from_str(&render(effect, config))
                .inspect_err(|e| tracing::warn!(error = %e, "unrenderable cookie dropped"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use gatehouse_auth::CsrfToken;

    use super::*;

    #[test]
    fn csrf_cookie_holds_the_hash_not_the_token() {
        let pair = CsrfToken::issue();
        let cookie = render(&ClientEffect::IssueCsrf(pair.clone()), &CookieConfig::default());
        assert!(cookie.starts_with(&format!("gatehouse_csrf={};", pair.cookie_value())));
        assert!(!cookie.contains(pair.token()));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[test]
    fn session_cookie_expires_with_the_session() {
        let expires_at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let cookie = render(
            &ClientEffect::StartSession { token: "tok".to_string(), expires_at },
            &CookieConfig::default(),
        );
        assert_eq!(
            cookie,
            "gatehouse_session=tok; Path=/; HttpOnly; SameSite=Strict; Expires=Wed, 02 Jan 2030 03:04:05 GMT"
        );
    }

    #[test]
    fn end_session_clears_and_secure_is_appended() {
        let config = CookieConfig {
            secure: true,
            ..CookieConfig::default()
        };
        assert_eq!(
            render(&ClientEffect::EndSession, &config),
            "gatehouse_session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0; Secure"
        );
    }

    #[test]
    fn every_effect_becomes_a_header() {
        let effects = [
            ClientEffect::IssueCsrf(CsrfToken::issue()),
            ClientEffect::EndSession,
            ClientEffect::SetLanguage("de".to_string()),
        ];
        assert_eq!(set_cookie_headers(&effects, &CookieConfig::default()).len(), 3);
    }
}
