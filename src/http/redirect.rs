//! Redirect replay.
//!
//! The upstream client never follows redirects on its own. The relay decides
//! here whether a 3xx answer is replayed against its `Location`, keeping
//! method, body and `Authorization` unchanged.

use axum::http::{header, HeaderMap, StatusCode};

use crate::http::request::OutboundRequest;

/// Statuses whose `Location` is replayed.
pub const REPLAYED_STATUSES: [StatusCode; 4] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// Decide the follow-up request for an upstream response.
///
/// Returns the original request (method, headers, body) aimed at the
/// `Location` resolved against the original URL, or `None` when the
/// response must be relayed as-is.
pub fn resolve_redirect(
    request: &OutboundRequest,
    status: StatusCode,
    headers: &HeaderMap,
) -> Option<OutboundRequest> {
    if !REPLAYED_STATUSES.contains(&status) {
        return None;
    }

    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    let next = request.url.join(location.trim()).ok()?;

    Some(request.retarget(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};
    use bytes::Bytes;
    use url::Url;

    fn original() -> OutboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=xyz"),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("4"));
        OutboundRequest {
            method: Method::POST,
            url: Url::parse("https://backend.example.com/api/missions/7/submit?group_id=3")
                .unwrap(),
            headers,
            body: Some(Bytes::from_static(b"\x00\x01\x02\x03")),
        }
    }

    fn location(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_relative_location_resolved_against_original() {
        let request = original();
        let next = resolve_redirect(
            &request,
            StatusCode::TEMPORARY_REDIRECT,
            &location("/missions/7"),
        )
        .unwrap();

        assert_eq!(next.url.as_str(), "https://backend.example.com/missions/7");
        assert_eq!(next.method, Method::POST);
        assert_eq!(next.headers, request.headers);
        assert_eq!(next.body, request.body);
    }

    #[test]
    fn test_path_relative_location() {
        let next = resolve_redirect(&original(), StatusCode::FOUND, &location("submit/"))
            .unwrap();
        assert_eq!(
            next.url.as_str(),
            "https://backend.example.com/api/missions/7/submit/"
        );
    }

    #[test]
    fn test_absolute_location_keeps_authorization() {
        let next = resolve_redirect(
            &original(),
            StatusCode::PERMANENT_REDIRECT,
            &location("https://files.example.net/upload"),
        )
        .unwrap();

        assert_eq!(next.url.as_str(), "https://files.example.net/upload");
        assert_eq!(next.headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn test_every_replayed_status() {
        for status in REPLAYED_STATUSES {
            assert!(
                resolve_redirect(&original(), status, &location("/teams/")).is_some(),
                "{status} should be replayed"
            );
        }
    }

    #[test]
    fn test_other_statuses_not_replayed() {
        for status in [
            StatusCode::OK,
            StatusCode::SEE_OTHER,
            StatusCode::NOT_MODIFIED,
            StatusCode::MULTIPLE_CHOICES,
            StatusCode::NOT_FOUND,
        ] {
            assert!(resolve_redirect(&original(), status, &location("/teams/")).is_none());
        }
    }

    #[test]
    fn test_missing_location_not_replayed() {
        assert!(
            resolve_redirect(&original(), StatusCode::MOVED_PERMANENTLY, &HeaderMap::new())
                .is_none()
        );
    }

    #[test]
    fn test_unresolvable_location_not_replayed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::LOCATION,
            HeaderValue::from_bytes(b"http://\xff\xfe").unwrap(),
        );
        assert!(resolve_redirect(&original(), StatusCode::FOUND, &headers).is_none());

        assert!(resolve_redirect(&original(), StatusCode::FOUND, &location("http://[::1")).is_none());
    }
}
