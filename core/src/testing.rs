//! Canned transport and response builders for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};

/// Replays queued responses in order and records every request it sees.
#[derive(Debug)]
pub(crate) struct CannedTransport {
    responses: RefCell<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl CannedTransport {
    pub(crate) fn new() -> Self {
        Self {
            responses: RefCell::new(VecDeque::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn push_json(&self, status: u16, body: Value) {
        self.responses.borrow_mut().push_back(Ok(HttpResponse {
            status,
            body: body.to_string().into_bytes(),
        }));
    }

    pub(crate) fn push_unreachable(&self) {
        self.responses.borrow_mut().push_back(Err(ApiError::Unreachable {
            url: "http://127.0.0.1:7099/api".to_string(),
            reason: "connection refused".to_string(),
        }));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    /// Endpoint names of the recorded requests, in order.
    pub(crate) fn endpoints(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.url.rsplit('/').next().unwrap_or_default().to_string())
            .collect()
    }

    pub(crate) fn pending(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl Transport for CannedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no canned response left for {}", request.url))
    }
}

pub(crate) fn ok(data: Value) -> Value {
    json!({ "data": data })
}

pub(crate) fn service_error(code: i64, description: &str) -> Value {
    json!({ "error": { "code": code, "description": description } })
}

pub(crate) fn anon_user() -> Value {
    json!({ "user_id": "anonymous", "user_name": "anonymous" })
}

pub(crate) fn user(name: &str, auth_hash: Option<&str>) -> Value {
    let mut user = json!({
        "user_id": format!("id-{name}"),
        "user_name": name,
        "quip": "",
        "bio": "",
        "color": 0,
        "is_admin": false,
        "created": 0.0
    });
    if let Some(hash) = auth_hash {
        user["auth_hash"] = json!(hash);
    }
    user
}

pub(crate) fn valid() -> Value {
    ok(json!({ "bool": true, "description": null }))
}

pub(crate) fn invalid(description: &str) -> Value {
    ok(json!({ "bool": false, "description": description }))
}
