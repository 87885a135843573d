//! gRPC middleware for services exercised against ephemeral datastores.
//!
//! Provides request tagging so every inbound call, unary or streaming, carries
//! a request id that handlers and logs can correlate on.

pub mod request_id;
pub mod tags;

pub use request_id::{
    new_streaming_interceptor, new_unary_interceptor, CallShape, RequestIdExt,
    RequestIdInterceptor, REQUEST_ID_HEADER, REQUEST_ID_KEY,
};
pub use tags::{extract, Tags};
