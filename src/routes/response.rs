//! Response envelope and request helpers shared by the route modules
//!
//! Every JSON response uses the envelope `{status, message, data?, total?}`
//! where `status` is a [`RespCode`] and `message` its fixed text.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{self, HeaderValue};
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use tracing::{debug, error};

use crate::services::{Page, Paged};
use crate::types::{QuillError, RespCode, Result};

pub type HttpResponse = Response<Full<Bytes>>;

/// Error type a request body must convert into
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: RespCode,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(code: RespCode, data: Option<T>) -> Self {
        Self {
            status: code,
            message: code.message(),
            data,
            total: None,
        }
    }
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    with_cors(response)
}

/// 200 with `data`
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, &Envelope::new(RespCode::Success, Some(data)))
}

/// 200 with no payload
pub fn ok_empty() -> HttpResponse {
    json_response(StatusCode::OK, &Envelope::<()>::new(RespCode::Success, None))
}

/// 200 with a page of items and the overall total
pub fn ok_paged<T: Serialize>(page: Paged<T>) -> HttpResponse {
    let mut envelope = Envelope::new(RespCode::Success, Some(page.items));
    envelope.total = Some(page.total);
    json_response(StatusCode::OK, &envelope)
}

/// Envelope for a bare status code
pub fn code_response(code: RespCode) -> HttpResponse {
    json_response(code.http_status(), &Envelope::<()>::new(code, None))
}

/// Envelope for an error; detail stays in the server log
pub fn error_response(err: &QuillError) -> HttpResponse {
    if err.is_server_fault() {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected: {}", err);
    }

    let code = err.resp_code();
    json_response(err.status_code(), &Envelope::<()>::new(code, None))
}

pub fn cors_preflight() -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    with_cors(response)
}

fn with_cors(mut response: HttpResponse) -> HttpResponse {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    response
}

/// Read and decode a JSON request body
///
/// Reading stops as soon as the body exceeds [`MAX_BODY_BYTES`].
pub async fn parse_json_body<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                QuillError::BadRequest("Request body too large".into())
            } else {
                QuillError::BadRequest(format!("Failed to read body: {}", e))
            }
        })?;

    serde_json::from_slice(&body.to_bytes())
        .map_err(|e| QuillError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Decoded query-string parameters
#[derive(Debug, Default)]
pub struct Query(HashMap<String, String>);

impl Query {
    pub fn from_query_string(query: Option<&str>) -> Self {
        let mut params = HashMap::new();

        for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.replace('+', " ");
            let value = urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or(value);
            params.insert(key.to_string(), value);
        }

        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// `pageSize` and `pageNum`; unparseable values fall back to the defaults
    pub fn page(&self) -> Page {
        let number = |key: &str| self.get(key).and_then(|v| v.parse::<u64>().ok());
        Page::new(number("pageSize"), number("pageNum"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_envelope_hides_detail() {
        let response = error_response(&QuillError::Database("10.0.0.5 refused".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );

        let json = body_json(response).await;
        assert_eq!(json["status"], 500);
        assert!(!json.to_string().contains("10.0.0.5"));
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_paged_envelope() {
        let response = ok_paged(Paged {
            items: vec!["a", "b"],
            total: 7,
        });
        let json = body_json(response).await;
        assert_eq!(json["status"], 200);
        assert_eq!(json["data"], serde_json::json!(["a", "b"]));
        assert_eq!(json["total"], 7);
    }

    #[tokio::test]
    async fn test_oversized_body_stops_at_the_limit() {
        use futures_util::{stream, StreamExt};
        use http_body_util::StreamBody;
        use hyper::body::Frame;
        use std::convert::Infallible;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        const CHUNK: usize = 1024;
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let chunks = stream::iter(0..8 * 1024).map(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(Frame::data(Bytes::from(vec![b' '; CHUNK])))
        });
        let req = Request::new(StreamBody::new(chunks));

        let err = parse_json_body::<serde_json::Value, _>(req).await.unwrap_err();
        assert!(matches!(&err, QuillError::BadRequest(msg) if msg == "Request body too large"));
        assert_eq!(pulled.load(Ordering::SeqCst), MAX_BODY_BYTES / CHUNK + 1);
    }

    #[tokio::test]
    async fn test_body_at_the_limit_is_read() {
        let mut json = b"{\"name\":\"".to_vec();
        json.resize(MAX_BODY_BYTES - 2, b'a');
        json.extend_from_slice(b"\"}");
        let req = Request::new(Full::new(Bytes::from(json)));

        let value: serde_json::Value = parse_json_body(req).await.unwrap();
        assert_eq!(value["name"].as_str().unwrap().len(), MAX_BODY_BYTES - 11);
    }

    #[test]
    fn test_query_parsing() {
        let query = Query::from_query_string(Some("keyword=hello%20world&pageSize=5&pageNum=x&flag"));
        assert_eq!(query.get("keyword"), Some("hello world"));
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.page(), Page::new(Some(5), None));

        let query = Query::from_query_string(Some("keyword=a+b"));
        assert_eq!(query.get("keyword"), Some("a b"));
        assert!(Query::from_query_string(None).get("keyword").is_none());
    }

    #[test]
    fn test_preflight() {
        let response = cors_preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }
}
