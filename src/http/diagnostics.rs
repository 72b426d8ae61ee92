//! Diagnostic handlers.
//!
//! Used to check by hand what reaches the upstream once the proxy and the
//! processors have had their way with a request.
//!
//! - `GET /headers` echoes the request headers as JSON
//! - `GET /response-headers?k=v` turns each query pair into a response header

use std::collections::BTreeMap;

use axum::{
    extract::RawQuery,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HeadersEcho {
    pub headers: BTreeMap<String, String>,
}

/// `GET /headers`
///
/// Each header appears once with its first value, under its canonical
/// `Title-Case` name. `Host` and `Method` are always present.
pub async fn request_headers(method: Method, uri: Uri, headers: HeaderMap) -> Json<HeadersEcho> {
    let mut echoed = BTreeMap::new();
    for name in headers.keys() {
        if let Some(value) = headers.get(name) {
            echoed.insert(
                title_case(name.as_str()),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();
    echoed.insert("Host".to_string(), host);
    echoed.insert("Method".to_string(), method.to_string());

    Json(HeadersEcho { headers: echoed })
}

/// `GET /response-headers`
///
/// Repeated keys produce repeated headers. Pairs that are not a valid header
/// are still echoed in the body.
pub async fn response_headers(RawQuery(query): RawQuery) -> Response {
    let mut requested: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        requested
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let mut headers = HeaderMap::new();
    for (key, values) in &requested {
        let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
            tracing::debug!(header = %key, "Skipping invalid header name");
            continue;
        };
        for (i, value) in values.iter().enumerate() {
            let Ok(value) = HeaderValue::from_str(value) else {
                continue;
            };
            if i == 0 {
                headers.insert(name.clone(), value);
            } else {
                headers.append(name.clone(), value);
            }
        }
    }

    let mut response = Json(&requested).into_response();
    response.headers_mut().extend(headers);
    response
}

/// `content-type` → `Content-Type`
fn title_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("content-type"), "Content-Type");
        assert_eq!(title_case("x-request-id"), "X-Request-Id");
        assert_eq!(title_case("accept"), "Accept");
    }
}
