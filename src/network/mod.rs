//! HTTP networking module
//!
//! Provides the HTTP client and request/response types used by every
//! outbound collaborator.

mod client;
mod request;

pub use client::HttpClient;
pub use request::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
