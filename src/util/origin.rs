//! Request origin detection.

use axum::http::{
    HeaderMap, Uri,
    header::{FORWARDED, HOST},
};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const DEFAULT_SCHEME: &str = "http";
const DEFAULT_HOST: &str = "localhost";

/// `scheme://host` the client addressed, honouring proxy headers.
pub fn request_origin(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = forwarded_proto(headers)
        .or_else(|| uri.scheme_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| DEFAULT_SCHEME.to_string());

    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|authority| authority.to_string()))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    format!("{scheme}://{host}")
}

fn forwarded_proto(headers: &HeaderMap) -> Option<String> {
    if let Some(proto) = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return Some(proto.to_ascii_lowercase());
    }

    // RFC 7239: `Forwarded: for=1.2.3.4;proto=https`
    let forwarded = headers.get(FORWARDED)?.to_str().ok()?;
    forwarded
        .split(',')
        .next()?
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("proto"))
        .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn uses_host_header_with_default_scheme() {
        let origin = request_origin(
            &headers(&[("host", "api.example:8000")]),
            &Uri::from_static("/places/"),
        );
        assert_eq!(origin, "http://api.example:8000");
    }

    #[test]
    fn forwarded_proto_wins_over_uri_scheme() {
        let origin = request_origin(
            &headers(&[("host", "api.example"), ("x-forwarded-proto", "HTTPS, http")]),
            &Uri::from_static("http://internal/places/"),
        );
        assert_eq!(origin, "https://api.example");

        let origin = request_origin(
            &headers(&[("host", "api.example"), ("forwarded", "for=10.0.0.1;proto=https")]),
            &Uri::from_static("/places/"),
        );
        assert_eq!(origin, "https://api.example");
    }

    #[test]
    fn falls_back_to_uri_authority_then_localhost() {
        let origin = request_origin(&HeaderMap::new(), &Uri::from_static("https://a.example/x"));
        assert_eq!(origin, "https://a.example");

        let origin = request_origin(&HeaderMap::new(), &Uri::from_static("/x"));
        assert_eq!(origin, "http://localhost");
    }
}
