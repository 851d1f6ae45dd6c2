use http::header::HeaderName;
use http::{HeaderMap, Method, Request, Response, StatusCode};
use hyper::Body;

/// Immutable request snapshot taken when a request starts being tracked.
/// Holds only what the token resolvers need, so it can outlive the hyper
/// request it was taken from.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: Method,
    /// URI path with the query string stripped.
    pub path: String,
    /// Whether the transport the request arrived on is encrypted.
    pub encrypted: bool,
}

impl RequestRecord {
    pub fn new(req: &Request<Body>, encrypted: bool) -> RequestRecord {
        RequestRecord {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            encrypted,
        }
    }
}

/// Response snapshot handed to the formatter by a terminal event.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseRecord {
    pub fn new(res: &Response<Body>) -> ResponseRecord {
        ResponseRecord {
            status: res.status(),
            headers: res.headers().clone(),
        }
    }

    /// Header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use http::header;

    use super::*;

    #[test]
    fn request_record_strips_query() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("https://example.com/health?verbose=1")
            .body(Body::empty())
            .unwrap();

        let record = RequestRecord::new(&req, true);
        assert_eq!(record.method, Method::GET);
        assert_eq!(record.path, "/health");
        assert!(record.encrypted);
    }

    #[test]
    fn response_record_header_lookup() {
        let res = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::empty())
            .unwrap();

        let record = ResponseRecord::new(&res);
        assert_eq!(record.header(&header::CONTENT_TYPE), Some("text/plain"));
        assert_eq!(record.header(&header::CONTENT_LENGTH), None);
    }
}
