//! Blocking client for the BBJ forum API.
//!
//! # Overview
//! Every endpoint is a typed method on `BbjClient`. All of them go through a
//! single pipeline: encode the parameters, attach the session's `User`/`Auth`
//! headers when allowed, run the round-trip on a `Transport`, decode the JSON
//! body and turn the service's error envelope into an `ApiError`.
//!
//! # Design
//! - The service only speaks `POST /api/<endpoint>` with JSON both ways, and
//!   puts its errors in the body. Status codes are not interpreted.
//! - `Transport` is the I/O seam. `UreqTransport` is the real one; tests
//!   substitute canned transports.
//! - Credentials are a single `Option<Credentials>`, replaced atomically by
//!   the helpers in `auth`. The pipeline itself only reads them.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

mod auth;
pub mod client;
pub mod config;
mod endpoints;
pub mod error;
pub mod http;
pub mod session;
pub mod types;
mod validate;

#[cfg(test)]
mod testing;

pub use client::{parse_response, BbjClient, RequestOptions};
pub use config::ClientConfig;
pub use error::{classify, ApiError, ErrorKind, ErrorRecord};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use session::{hash_secret, Credentials, Secret, Session};
pub use types::{Message, Thread, User, UserUpdate, Usermap};
