//! Request-id tagging for gRPC calls.
//!
//! Every call passing through [`RequestIdInterceptor`] leaves with a non-empty
//! request id stored in its [`Tags`] under [`REQUEST_ID_KEY`]. An id supplied
//! by the caller in the `x-request-id` metadata is kept; otherwise a UUID v4 is
//! generated and echoed back into the metadata. The interceptor never rejects
//! a call.
//!
//! tonic runs the same interceptor for unary and streaming methods, so the two
//! constructors differ only in the call shape they log.

use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::trace;
use uuid::Uuid;

use super::tags::{extract, Tags};

/// Tag key holding the request id
pub const REQUEST_ID_KEY: &str = "request_id";

/// Metadata key a caller may use to supply its own request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shape of the calls an interceptor instance is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    Unary,
    Streaming,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestIdInterceptor {
    shape: CallShape,
}

impl RequestIdInterceptor {
    pub fn new(shape: CallShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> CallShape {
        self.shape
    }

    /// Tag `request` with its request id and return the id
    pub fn tag<T>(&self, request: &mut Request<T>) -> String {
        if let Some(existing) = extract(request).and_then(|tags| tags.get(REQUEST_ID_KEY)) {
            if !existing.is_empty() {
                return existing.to_string();
            }
        }

        let inbound = request
            .metadata()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let request_id = match inbound {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                if let Ok(value) = id.parse::<MetadataValue<Ascii>>() {
                    request.metadata_mut().insert(REQUEST_ID_HEADER, value);
                }
                id
            }
        };

        Tags::update(request, |tags| {
            tags.set(REQUEST_ID_KEY, request_id.clone());
        });
        trace!(shape = ?self.shape, request_id = %request_id, "Tagged request");
        request_id
    }
}

impl Interceptor for RequestIdInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        self.tag(&mut request);
        Ok(request)
    }
}

/// Interceptor for unary methods
pub fn new_unary_interceptor() -> RequestIdInterceptor {
    RequestIdInterceptor::new(CallShape::Unary)
}

/// Interceptor for client-, server- and bidi-streaming methods
pub fn new_streaming_interceptor() -> RequestIdInterceptor {
    RequestIdInterceptor::new(CallShape::Streaming)
}

/// Read the request id from a request's extensions
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl<T> RequestIdExt for Request<T> {
    fn request_id(&self) -> Option<&str> {
        extract(self).and_then(|tags| tags.get(REQUEST_ID_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use http_body::Frame;
    use http_body_util::{BodyExt, StreamBody};
    use tonic::body::BoxBody;
    use tonic::codegen::{http, InterceptedService};
    use tower::{service_fn, ServiceExt};

    #[test]
    fn test_unary_call_gets_generated_id() {
        let mut interceptor = new_unary_interceptor();
        let request = interceptor.call(Request::new(())).unwrap();

        let id = request.request_id().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(
            request.metadata().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap(),
            id
        );
    }

    #[test]
    fn test_inbound_header_is_reused() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(REQUEST_ID_HEADER, "req-42".parse().unwrap());

        let request = new_unary_interceptor().call(request).unwrap();
        assert_eq!(request.request_id(), Some("req-42"));
    }

    #[test]
    fn test_blank_header_is_replaced() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(REQUEST_ID_HEADER, "  ".parse().unwrap());

        let request = new_unary_interceptor().call(request).unwrap();
        let id = request.request_id().unwrap();
        assert!(!id.trim().is_empty());
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_distinct_calls_get_distinct_ids() {
        let mut interceptor = new_unary_interceptor();
        let first = interceptor.call(Request::new(())).unwrap();
        let second = interceptor.call(Request::new(())).unwrap();
        assert_ne!(first.request_id(), second.request_id());
    }

    #[test]
    fn test_existing_tags_are_preserved() {
        let mut request = Request::new(());
        Tags::update(&mut request, |tags| {
            tags.set("peer", "10.0.0.7");
        });

        let request = new_unary_interceptor().call(request).unwrap();
        let tags = extract(&request).unwrap();
        assert_eq!(tags.get("peer"), Some("10.0.0.7"));
        assert!(tags.contains(REQUEST_ID_KEY));
    }

    /// Handler answering `<tagged id>|<echoed header>|<request body>`
    async fn echo_tags(request: http::Request<BoxBody>) -> Result<http::Response<BoxBody>, Status> {
        let request_id = request
            .extensions()
            .get::<Tags>()
            .and_then(|tags| tags.get(REQUEST_ID_KEY))
            .unwrap_or_default()
            .to_string();
        let echoed = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let payload = request.into_body().collect().await?.to_bytes();
        let body = format!("{request_id}|{echoed}|{}", String::from_utf8_lossy(&payload));
        Ok(http::Response::new(tonic::body::boxed(body)))
    }

    async fn response_text(response: http::Response<BoxBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_streaming_call_carries_id_to_handler() {
        let interceptor = new_streaming_interceptor();
        assert_eq!(interceptor.shape(), CallShape::Streaming);
        let service = InterceptedService::new(service_fn(echo_tags), interceptor);

        let frames = stream::iter(["one", "two", "three"])
            .map(|chunk| Ok::<_, Status>(Frame::data(Bytes::from_static(chunk.as_bytes()))));
        let request = http::Request::builder()
            .uri("/fixtures.Ping/PingStream")
            .body(tonic::body::boxed(StreamBody::new(frames)))
            .unwrap();

        let text = response_text(service.oneshot(request).await.unwrap()).await;
        let parts: Vec<&str> = text.split('|').collect();

        assert!(Uuid::parse_str(parts[0]).is_ok());
        assert_eq!(parts[1], parts[0]);
        assert_eq!(parts[2], "onetwothree");
    }

    #[tokio::test]
    async fn test_unary_service_reuses_inbound_id() {
        let service = InterceptedService::new(service_fn(echo_tags), new_unary_interceptor());

        let request = http::Request::builder()
            .uri("/fixtures.Ping/Ping")
            .header(REQUEST_ID_HEADER, "req-7")
            .body(tonic::body::empty_body())
            .unwrap();

        let text = response_text(service.oneshot(request).await.unwrap()).await;
        assert_eq!(text, "req-7|req-7|");
    }

    #[test]
    fn test_tag_is_stable_when_applied_twice() {
        let interceptor = new_streaming_interceptor();
        let mut request = Request::new(());
        let first = interceptor.tag(&mut request);
        let second = interceptor.tag(&mut request);
        assert_eq!(first, second);
    }
}
