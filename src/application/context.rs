//! Per-request context handed to every RPC procedure.
//!
//! Building a context never fails. Authentication is best effort: a missing,
//! malformed, expired or foreign token simply leaves the caller anonymous so
//! that public procedures keep working. Procedures that need a user check
//! [`RpcContext::user_id`] themselves.

use std::sync::Arc;

use axum::http::{
    HeaderMap,
    header::{ACCEPT_LANGUAGE, AUTHORIZATION},
};

use crate::domain::locale::{self, LOCALE_HEADER, Locale};

use super::tokens::TokenService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcContext {
    pub user_id: Option<i64>,
    pub locale: Locale,
    pub request_id: String,
}

impl RpcContext {
    pub fn anonymous(locale: Locale) -> Self {
        Self {
            user_id: None,
            locale,
            request_id: String::new(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

#[derive(Clone)]
pub struct ContextBuilder {
    tokens: Arc<TokenService>,
}

impl ContextBuilder {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    pub fn build(&self, headers: &HeaderMap, request_id: impl Into<String>) -> RpcContext {
        let user_id = bearer_token(headers).and_then(|token| self.tokens.verify(token));
        let locale = locale::negotiate(
            header_str(headers, LOCALE_HEADER),
            header_str(headers, ACCEPT_LANGUAGE.as_str()),
        );

        RpcContext {
            user_id,
            locale,
            request_id: request_id.into(),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// The token is the field right after `Bearer `; an empty field means no token.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = header_str(headers, AUTHORIZATION.as_str())?;
    let token = raw.strip_prefix("Bearer ")?.split(' ').next()?;
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;

    use super::*;

    const SECRET: &str = "context-secret";

    fn builder(secret: Option<&str>) -> ContextBuilder {
        ContextBuilder::new(Arc::new(TokenService::new(
            secret,
            Duration::from_secs(3600),
        )))
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).expect("header value"));
        }
        map
    }

    fn token_for(user_id: i64) -> String {
        TokenService::new(Some(SECRET), Duration::from_secs(3600))
            .issue(user_id)
            .expect("issue")
    }

    #[test]
    fn valid_bearer_token_sets_user_id() {
        let auth = format!("Bearer {}", token_for(17));
        let ctx = builder(Some(SECRET)).build(&headers(&[("authorization", auth.as_str())]), "req-1");

        assert_eq!(ctx.user_id, Some(17));
        assert_eq!(ctx.request_id, "req-1");
        assert!(ctx.is_authenticated());
    }

    #[test]
    fn missing_secret_leaves_caller_anonymous() {
        let auth = format!("Bearer {}", token_for(17));
        let ctx = builder(None).build(&headers(&[("authorization", auth.as_str())]), "");
        assert_eq!(ctx.user_id, None);
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let token = token_for(3);
        for value in [token.clone(), format!("Basic {token}"), format!("bearer {token}")] {
            let ctx = builder(Some(SECRET)).build(&headers(&[("authorization", value.as_str())]), "");
            assert_eq!(ctx.user_id, None, "{value}");
        }
    }

    #[test]
    fn empty_bearer_field_is_no_token() {
        let value = format!("Bearer  {}", token_for(3));
        let ctx = builder(Some(SECRET)).build(&headers(&[("authorization", value.as_str())]), "");
        assert_eq!(ctx.user_id, None);
    }

    #[test]
    fn locale_comes_from_headers() {
        let b = builder(None);
        let zh = b.build(
            &headers(&[("x-locale", "zh"), ("accept-language", "en-US")]),
            "",
        );
        assert_eq!(zh.locale, Locale::Zh);

        let fallthrough = b.build(
            &headers(&[("x-locale", "fr"), ("accept-language", "zh-CN,en;q=0.5")]),
            "",
        );
        assert_eq!(fallthrough.locale, Locale::Zh);

        assert_eq!(b.build(&HeaderMap::new(), "").locale, Locale::En);
    }
}
