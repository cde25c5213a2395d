//! Custom Axum extractors.
//!
//! Buyers identify themselves with their phone number, kept by the storefront in the
//! `killPhone` cookie.

use axum::{async_trait, extract::FromRequestParts};
use http::{HeaderMap, header::COOKIE, request::Parts};
use flashsale_core::CustomerId;

/// Cookie carrying the buyer's phone number.
pub const PHONE_COOKIE: &str = "killPhone";

/// The buyer's registered phone, if the request carries a usable one.
///
/// Never rejects: a missing or non-numeric cookie yields `RegisteredPhone(None)` and
/// the handler decides what to answer.
///
/// # Example
///
/// ```ignore
/// async fn handler(RegisteredPhone(phone): RegisteredPhone) -> String {
///     phone.map_or_else(|| "anonymous".into(), |p| p.to_string())
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredPhone(pub Option<CustomerId>);

#[async_trait]
impl<S> FromRequestParts<S> for RegisteredPhone
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(phone_from_cookies(&parts.headers)))
    }
}

/// First `killPhone` cookie across all `Cookie` headers that parses as a number.
fn phone_from_cookies(headers: &HeaderMap) -> Option<CustomerId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| *name == PHONE_COOKIE)
        .find_map(|(_, value)| value.trim().parse::<i64>().ok())
        .map(CustomerId::new)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use http::Request;

    async fn extract(cookies: &[&str]) -> RegisteredPhone {
        let mut builder = Request::builder();
        for cookie in cookies {
            builder = builder.header(COOKIE, *cookie);
        }
        let (mut parts, ()) = builder.body(()).expect("Valid request").into_parts();
        RegisteredPhone::from_request_parts(&mut parts, &())
            .await
            .expect("Infallible")
    }

    #[tokio::test]
    async fn test_phone_from_single_cookie() {
        let phone = extract(&["killPhone=13800138000"]).await;
        assert_eq!(phone, RegisteredPhone(Some(CustomerId::new(13_800_138_000))));
    }

    #[tokio::test]
    async fn test_phone_among_other_cookies() {
        let phone = extract(&["theme=dark; killPhone=13800138000 ; lang=en"]).await;
        assert_eq!(phone.0, Some(CustomerId::new(13_800_138_000)));
    }

    #[tokio::test]
    async fn test_phone_in_second_cookie_header() {
        let phone = extract(&["theme=dark", "killPhone=13900000001"]).await;
        assert_eq!(phone.0, Some(CustomerId::new(13_900_000_001)));
    }

    #[tokio::test]
    async fn test_missing_cookie_is_none() {
        assert_eq!(extract(&[]).await.0, None);
        assert_eq!(extract(&["theme=dark"]).await.0, None);
    }

    #[tokio::test]
    async fn test_non_numeric_phone_is_none() {
        assert_eq!(extract(&["killPhone=abc"]).await.0, None);
        assert_eq!(extract(&["killPhone="]).await.0, None);
        assert_eq!(extract(&["xkillPhone=13800138000"]).await.0, None);
    }
}
