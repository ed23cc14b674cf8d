//! Credential helpers: the only code that changes a client's session.
//!
//! Every change replaces the session as a whole, so a failure part way
//! through leaves either the old identity or no identity, never a mix.

use serde_json::json;

use crate::client::{take_data, BbjClient, RequestOptions};
use crate::error::{ApiError, ErrorKind, ErrorRecord};
use crate::http::Transport;
use crate::session::{Credentials, Secret};
use crate::types::User;

const CREDENTIAL_MISMATCH: &str = "Auth and User do not match";

impl<T: Transport> BbjClient<T> {
    /// Make `username` the active identity for later requests.
    ///
    /// With `verify`, the server must confirm the pair first. A rejected
    /// pair clears any current identity and returns `AuthorizationDenied`.
    /// Malformed values return `InvalidArgument` and leave the session as it
    /// was.
    pub fn set_credentials(&mut self, username: &str, secret: Secret, verify: bool) -> Result<(), ApiError> {
        let auth_hash = secret.into_hash();

        if verify {
            let rejection = match self.validate_credentials(username, &auth_hash, true) {
                Ok(true) => None,
                Ok(false) => Some(ErrorRecord {
                    code: ErrorKind::AuthorizationDenied.code(),
                    description: CREDENTIAL_MISMATCH.to_string(),
                    body: json!({ "code": 5, "description": CREDENTIAL_MISMATCH }),
                }),
                Err(ApiError::AuthorizationDenied(record)) => Some(record),
                Err(e) => return Err(e),
            };
            if let Some(record) = rejection {
                self.session = self.session.with_identity(None, None);
                tracing::info!(target: "bbj_core::auth", username, "credentials rejected, session is anonymous");
                return Err(ApiError::AuthorizationDenied(record));
            }
        }

        let next = self
            .session
            .with_identity(Some(Credentials::new(username, &auth_hash)), None);
        let previous = std::mem::replace(&mut self.session, next);
        match self.get_me() {
            Ok(profile) => {
                self.session.set_profile(profile);
                tracing::info!(target: "bbj_core::auth", username, "credentials committed");
                Ok(())
            }
            Err(e) => {
                self.session = previous;
                Err(e)
            }
        }
    }

    /// Check `username`/`auth_hash` against the server without changing the
    /// session. `auth_hash` must already be hashed.
    ///
    /// Malformed values always raise `InvalidArgument`. A rejected pair
    /// raises `AuthorizationDenied` when `raise` is set and returns
    /// `Ok(false)` otherwise.
    pub fn validate_credentials(&self, username: &str, auth_hash: &str, raise: bool) -> Result<bool, ApiError> {
        self.validate_all(
            [("user_name", username), ("auth_hash", auth_hash)],
            Some(ErrorKind::InvalidArgument),
        )?;

        let params = json!({ "target_user": username, "target_hash": auth_hash });
        match self.request("check_auth", &params, RequestOptions::anonymous()) {
            Ok(mut response) => take_data(&mut response),
            Err(ApiError::AuthorizationDenied(_)) if !raise => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Register a new account and return the server's record of it.
    ///
    /// With `set_as_current`, the new account becomes the active identity.
    pub fn register_user(&mut self, username: &str, secret: Secret, set_as_current: bool) -> Result<User, ApiError> {
        let auth_hash = secret.into_hash();
        let params = json!({ "user_name": username, "auth_hash": auth_hash });
        let mut response = self.request("user_register", &params, RequestOptions::anonymous())?;
        let user: User = take_data(&mut response)?;

        if user.user_name != username {
            return Err(ApiError::IntegrityMismatch(format!(
                "registered {username:?} but server echoed {:?}",
                user.user_name
            )));
        }
        if user.auth_hash.as_deref() != Some(auth_hash.as_str()) {
            return Err(ApiError::IntegrityMismatch(format!(
                "server echoed a different auth hash for {username:?}"
            )));
        }

        if set_as_current {
            self.set_credentials(username, Secret::Hashed(auth_hash), false)?;
        }
        Ok(user)
    }

    /// Drop the active identity. Later requests are anonymous.
    pub fn clear_credentials(&mut self) {
        self.session = self.session.with_identity(None, None);
        tracing::info!(target: "bbj_core::auth", "credentials cleared");
    }
}
