//! The request pipeline every BBJ call goes through.
//!
//! # Design
//! A call is split the same way on every endpoint: `build_request` encodes
//! the parameters and attaches auth headers, the `Transport` performs the
//! round-trip, and `parse_response` decodes the body and classifies any
//! error envelope. `request` composes the three. The pipeline only reads
//! the session; the helpers in `auth` are the only writers.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{classify, record_from_error_object, ApiError};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::session::Session;
use crate::types::User;

/// Per-call options. Never serialized into the request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Send the request anonymously even when credentials are set.
    pub skip_auth: bool,
}

impl RequestOptions {
    pub fn anonymous() -> Self {
        Self { skip_auth: true }
    }
}

/// Blocking client for the BBJ forum API.
///
/// Construction performs a `get_me` call, so an existing client has always
/// reached its server at least once.
pub struct BbjClient<T = UreqTransport> {
    pub(crate) base_url: String,
    pub(crate) transport: T,
    pub(crate) session: Session,
}

// Hand-written so the auth hash never reaches a log line.
impl<T: fmt::Debug> fmt::Debug for BbjClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BbjClient")
            .field("base_url", &self.base_url)
            .field("transport", &self.transport)
            .field("user", &self.session.username())
            .field("send_auth", &self.session.send_auth)
            .finish_non_exhaustive()
    }
}

impl BbjClient<UreqTransport> {
    /// Connect over HTTP using `config`. Fails with `ApiError::Unreachable`
    /// if the server is down.
    pub fn connect(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_transport(config, UreqTransport::new(config.timeout))
    }
}

impl<T: Transport> BbjClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Result<Self, ApiError> {
        let mut client = Self {
            base_url: config.base_url(),
            transport,
            session: Session::default(),
        };
        let me = client.get_me()?;
        client.session.set_profile(me);
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The profile from the most recent `get_me`, if one is cached.
    pub fn profile(&self) -> Option<&User> {
        self.session.profile()
    }

    /// Turn header attachment on or off without touching the credentials.
    pub fn set_send_auth(&mut self, send_auth: bool) {
        self.session.send_auth = send_auth;
    }

    pub fn build_request<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &P,
        options: RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let body = match serde_json::to_value(params).map_err(|e| ApiError::Serialization(e.to_string()))? {
            Value::Null => Value::Object(Map::new()),
            object @ Value::Object(_) => object,
            other => {
                return Err(ApiError::Serialization(format!(
                    "parameters for {endpoint} must be a JSON object, got {other}"
                )))
            }
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(auth) = self.session.auth_headers(options.skip_auth) {
            headers.extend(auth);
        }

        Ok(HttpRequest {
            url: self.endpoint_url(endpoint),
            headers,
            body: body.to_string(),
        })
    }

    /// Send one call through the pipeline and return the decoded response
    /// object unchanged.
    pub fn request<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &P,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let request = self.build_request(endpoint, params, options)?;
        let authenticated = request.header("Auth").is_some();
        let response = self.transport.execute(&request)?;
        tracing::debug!(
            target: "bbj_core::client",
            endpoint,
            authenticated,
            status = response.status,
            "request completed"
        );
        parse_response(&response)
    }
}

/// Decode a response body and turn an error envelope into an `ApiError`.
///
/// The status code is ignored: the service reports failures in the body.
pub fn parse_response(response: &HttpResponse) -> Result<Value, ApiError> {
    let value: Value = serde_json::from_slice(&response.body)
        .map_err(|e| ApiError::Decode(format!("HTTP {} with non-JSON body: {e}", response.status)))?;
    if let Some(error) = value.get("error").filter(|e| is_truthy(e)) {
        return Err(classify(record_from_error_object(error)?));
    }
    Ok(value)
}

/// Move `field` out of a response object and deserialize it.
pub(crate) fn take_field<D: DeserializeOwned>(response: &mut Value, field: &str) -> Result<D, ApiError> {
    let value = response
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| ApiError::Decode(format!("response has no {field:?} field")))?;
    serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("unexpected {field:?} payload: {e}")))
}

pub(crate) fn take_data<D: DeserializeOwned>(response: &mut Value) -> Result<D, ApiError> {
    take_field(response, "data")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Credentials;
    use crate::testing::{anon_user, ok, service_error, CannedTransport};
    use serde_json::json;

    fn client(transport: &CannedTransport) -> BbjClient<&CannedTransport> {
        transport.push_json(200, ok(anon_user()));
        BbjClient::with_transport(&ClientConfig::default(), transport).unwrap()
    }

    fn login(client: &mut BbjClient<&CannedTransport>) {
        client.session = client
            .session
            .with_identity(Some(Credentials::new("desvox", "hash")), None);
    }

    #[test]
    fn construction_fetches_profile() {
        let transport = CannedTransport::new();
        let c = client(&transport);
        assert_eq!(c.profile().unwrap().user_name, "anonymous");
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://127.0.0.1:7099/api/get_me");
        assert_eq!(requests[0].body, "{}");
    }

    #[test]
    fn debug_names_the_user_but_not_the_hash() {
        let transport = CannedTransport::new();
        let mut c = client(&transport);
        c.session = c
            .session
            .with_identity(Some(Credentials::new("desvox", "5ca1ab1e")), None);
        let shown = format!("{c:?}");
        assert!(shown.contains("desvox"));
        assert!(shown.contains("127.0.0.1:7099"));
        assert!(!shown.contains("5ca1ab1e"));
    }

    #[test]
    fn construction_fails_when_unreachable() {
        let transport = CannedTransport::new();
        transport.push_unreachable();
        let result = BbjClient::with_transport(&ClientConfig::default(), &transport);
        assert!(matches!(result, Err(ApiError::Unreachable { .. })));
    }

    #[test]
    fn build_request_sets_content_type_and_url() {
        let transport = CannedTransport::new();
        let req = client(&transport)
            .build_request("thread_load", &json!({"thread_id": "t1"}), RequestOptions::default())
            .unwrap();
        assert_eq!(req.url, "http://127.0.0.1:7099/api/thread_load");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.header("User"), None);
        let body: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(body, json!({"thread_id": "t1"}));
    }

    #[test]
    fn non_object_params_are_rejected() {
        let transport = CannedTransport::new();
        let err = client(&transport)
            .build_request("thread_load", &json!(["t1"]), RequestOptions::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }

    #[test]
    fn credentials_are_attached_when_present() {
        let transport = CannedTransport::new();
        let mut c = client(&transport);
        login(&mut c);
        let req = c.build_request("get_me", &(), RequestOptions::default()).unwrap();
        assert_eq!(req.header("User"), Some("desvox"));
        assert_eq!(req.header("Auth"), Some("hash"));
    }

    #[test]
    fn skip_auth_sends_anonymously_and_stays_off_the_wire() {
        let transport = CannedTransport::new();
        let mut c = client(&transport);
        login(&mut c);
        transport.push_json(200, ok(json!(true)));
        c.request("user_is_registered", &json!({"target_user": "desvox"}), RequestOptions::anonymous())
            .unwrap();

        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.header("User"), None);
        assert_eq!(sent.header("Auth"), None);
        let body: Value = serde_json::from_str(&sent.body).unwrap();
        assert_eq!(body, json!({"target_user": "desvox"}));
        assert!(!sent.body.contains("skip"));
    }

    #[test]
    fn send_auth_off_sends_anonymously() {
        let transport = CannedTransport::new();
        let mut c = client(&transport);
        login(&mut c);
        c.set_send_auth(false);
        let req = c.build_request("get_me", &(), RequestOptions::default()).unwrap();
        assert_eq!(req.header("Auth"), None);
    }

    #[test]
    fn error_envelope_is_classified_regardless_of_status() {
        let transport = CannedTransport::new();
        let c = client(&transport);
        transport.push_json(400, service_error(3, "thread_id is required"));
        let err = c.request("thread_load", &(), RequestOptions::default()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
        assert_eq!(err.description(), Some("thread_id is required"));
        assert_eq!(err.body(), Some(&json!({"code": 3, "description": "thread_id is required"})));
    }

    #[test]
    fn success_with_error_status_is_returned() {
        let transport = CannedTransport::new();
        let c = client(&transport);
        transport.push_json(500, ok(json!(1)));
        let value = c.request("anything", &(), RequestOptions::default()).unwrap();
        assert_eq!(value, json!({"data": 1}));
    }

    #[test]
    fn falsy_error_field_is_not_an_error() {
        let response = HttpResponse {
            status: 200,
            body: br#"{"data": [], "error": null}"#.to_vec(),
        };
        assert!(parse_response(&response).is_ok());
        let response = HttpResponse {
            status: 200,
            body: br#"{"data": [], "error": false}"#.to_vec(),
        };
        assert!(parse_response(&response).is_ok());
    }

    #[test]
    fn non_json_body_is_a_decode_fault() {
        for body in [&b""[..], &b"<html>bad gateway</html>"[..]] {
            let response = HttpResponse {
                status: 502,
                body: body.to_vec(),
            };
            assert!(matches!(parse_response(&response), Err(ApiError::Decode(_))));
        }
    }

    #[test]
    fn missing_data_field_is_a_decode_fault() {
        let mut value = json!({"usermap": {}});
        let err = take_data::<bool>(&mut value).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
