use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use seatkeeper_core::{RequestContext, TokenClaims};

/// Request headers carrying the caller token, in lookup order.
pub const IDENTITY_HEADERS: [&str; 2] = ["grpcgateway-authorization", "bearer-token"];

/// Attaches the caller's [`RequestContext`] to the request.
///
/// Missing identity is not rejected here; services refuse anonymous callers.
pub async fn resolve_request_context(mut request: Request, next: Next) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip());
    let context = request_context(request.headers()).with_remote_addr(remote_addr);

    request.extensions_mut().insert(context);
    next.run(request).await
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    let Some(token) = requestor_token(headers) else {
        return RequestContext::anonymous();
    };

    // Token introspection is not wired yet; the raw token is the identity.
    RequestContext::new(token, TokenClaims::from_token(token))
}

fn requestor_token(headers: &HeaderMap) -> Option<&str> {
    IDENTITY_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::request_context;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn first_non_empty_identity_header_wins() {
        let context = request_context(&headers(&[
            ("grpcgateway-authorization", "gateway-user"),
            ("bearer-token", "bearer-user"),
        ]));
        assert_eq!(context.requestor(), "gateway-user");

        let context = request_context(&headers(&[
            ("grpcgateway-authorization", ""),
            ("bearer-token", "bearer-user"),
        ]));
        assert_eq!(context.requestor(), "bearer-user");
    }

    #[test]
    fn token_is_used_verbatim() {
        let context = request_context(&headers(&[("bearer-token", "Bearer u1 ")]));
        assert_eq!(context.requestor(), "Bearer u1 ");
    }

    #[test]
    fn missing_headers_yield_anonymous_context() {
        assert_eq!(request_context(&HeaderMap::new()).requestor(), "");
    }
}
