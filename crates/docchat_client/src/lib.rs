//! crates/docchat_client/src/lib.rs
//!
//! Client for the DocChat API. Holds the access token in memory and, when the
//! server reports an expired token, refreshes it once through the HTTP-only
//! refresh cookie before retrying the request.

pub mod client;
pub mod session;

pub use client::{
    ApiClient, ApiRequest, ApiResponse, ClientError, FilePart, ReqwestTransport, RequestBody,
    Transport,
};
pub use session::SessionState;
