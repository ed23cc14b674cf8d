//! Credential state held by a client.
//!
//! # Design
//! Username and auth hash live together in one `Credentials` value, so the
//! session can only ever hold both or neither. The whole `Session` is
//! replaced at once when credentials change; callers never observe a
//! half-updated state.

use sha2::{Digest, Sha256};

use crate::types::User;

/// Hex-encoded SHA-256 digest of `secret`. This is the only form of a
/// password the service ever sees or stores.
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// A password as supplied by the caller.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    /// A raw password. It is hashed before it leaves the client.
    Plain(String),
    /// An already-hashed password, sent as is.
    Hashed(String),
}

impl Secret {
    pub fn plain(secret: &str) -> Self {
        Secret::Plain(secret.to_string())
    }

    pub fn hashed(hash: &str) -> Self {
        Secret::Hashed(hash.to_string())
    }

    pub fn into_hash(self) -> String {
        match self {
            Secret::Plain(raw) => hash_secret(&raw),
            Secret::Hashed(hash) => hash,
        }
    }
}

// Keeps passwords out of logs and panic messages.
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Secret::Plain(_) => f.write_str("Secret::Plain(..)"),
            Secret::Hashed(_) => f.write_str("Secret::Hashed(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub auth_hash: String,
}

impl Credentials {
    pub fn new(username: &str, auth_hash: &str) -> Self {
        Self {
            username: username.to_string(),
            auth_hash: auth_hash.to_string(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.auth_hash.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    credentials: Option<Credentials>,
    /// When false, requests are always anonymous even with credentials set.
    pub send_auth: bool,
    profile: Option<User>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            credentials: None,
            send_auth: true,
            profile: None,
        }
    }
}

impl Session {
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }

    pub fn profile(&self) -> Option<&User> {
        self.profile.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// The `User`/`Auth` header pair to attach, if any.
    ///
    /// Headers are attached only when sending is enabled, both fields are
    /// non-empty, and the caller did not ask to skip auth.
    pub fn auth_headers(&self, skip_auth: bool) -> Option<[(String, String); 2]> {
        if skip_auth || !self.send_auth {
            return None;
        }
        let creds = self.credentials.as_ref().filter(|c| c.is_complete())?;
        Some([
            ("User".to_string(), creds.username.clone()),
            ("Auth".to_string(), creds.auth_hash.clone()),
        ])
    }

    pub(crate) fn set_profile(&mut self, profile: User) {
        self.profile = Some(profile);
    }

    /// A copy of this session with `credentials` and `profile` swapped in.
    pub(crate) fn with_identity(&self, credentials: Option<Credentials>, profile: Option<User>) -> Self {
        Self {
            credentials,
            send_auth: self.send_auth,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            hash_secret("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hashed_secret_is_not_rehashed() {
        let hash = hash_secret("sandvich");
        assert_eq!(Secret::plain("sandvich").into_hash(), hash);
        assert_eq!(Secret::hashed(&hash).into_hash(), hash);
    }

    #[test]
    fn secret_debug_hides_value() {
        let shown = format!("{:?}", Secret::plain("hunter2"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn anonymous_session_sends_no_headers() {
        assert!(Session::default().auth_headers(false).is_none());
    }

    #[test]
    fn headers_need_all_three_conditions() {
        let session = Session::default().with_identity(Some(Credentials::new("desvox", "hash")), None);
        let headers = session.auth_headers(false).unwrap();
        assert_eq!(headers[0], ("User".to_string(), "desvox".to_string()));
        assert_eq!(headers[1], ("Auth".to_string(), "hash".to_string()));

        assert!(session.auth_headers(true).is_none());

        let mut muted = session.clone();
        muted.send_auth = false;
        assert!(muted.auth_headers(false).is_none());

        let blank = Session::default().with_identity(Some(Credentials::new("desvox", "")), None);
        assert!(blank.auth_headers(false).is_none());
    }

    #[test]
    fn with_identity_keeps_send_auth() {
        let mut session = Session::default();
        session.send_auth = false;
        let next = session.with_identity(Some(Credentials::new("a", "b")), None);
        assert!(!next.send_auth);
        assert_eq!(next.username(), Some("a"));
    }
}
