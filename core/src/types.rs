//! Domain DTOs for the BBJ API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently.
//! Fields the client does not know about are kept in `extra` so a newer
//! server does not break decoding. Integration tests catch schema drift
//! between the two crates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response-scoped map from user id to profile. Callers resolve `author`
/// fields against it.
pub type Usermap = HashMap<String, User>;

/// A user profile as returned by `get_me`, `user_register` and usermaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    /// Only present in responses that echo the caller's own registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_hash: Option<String>,
    #[serde(default)]
    pub quip: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub color: u8,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A thread. `messages` is only filled in by `thread_load`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub created: f64,
    #[serde(default)]
    pub last_mod: f64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single post inside a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub post_id: u64,
    pub thread_id: String,
    pub author: String,
    pub body: String,
    #[serde(default)]
    pub created: f64,
    #[serde(default)]
    pub edited: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for `user_update`. Only the fields present are sent; omitted
/// fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u8>,
}

/// The `data` payload of `db_validate`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ValidationOutcome {
    #[serde(rename = "bool")]
    pub valid: bool,
    #[serde(default)]
    pub description: Option<String>,
}
