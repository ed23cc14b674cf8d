//! Server-side value validation through `db_validate`.

use serde::Serialize;
use serde_json::json;

use crate::client::{take_data, BbjClient, RequestOptions};
use crate::error::{ApiError, ErrorKind, ErrorRecord};
use crate::http::Transport;
use crate::types::ValidationOutcome;

impl<T: Transport> BbjClient<T> {
    /// Ask the server whether `value` is acceptable for `key`.
    ///
    /// On rejection, `on_failure = None` returns `Ok(false)`; otherwise an
    /// error of that kind is raised carrying the server's reason and the
    /// kind's own code. Always sent anonymously.
    pub fn validate<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        on_failure: Option<ErrorKind>,
    ) -> Result<bool, ApiError> {
        let value = serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let params = json!({ "key": key, "value": value });

        let rejection = match self.request("db_validate", &params, RequestOptions::anonymous()) {
            Ok(mut response) => {
                let data: serde_json::Value = take_data(&mut response)?;
                let outcome: ValidationOutcome = serde_json::from_value(data.clone())
                    .map_err(|e| ApiError::Decode(format!("unexpected db_validate payload: {e}")))?;
                if outcome.valid {
                    return Ok(true);
                }
                ErrorRecord {
                    code: ErrorKind::PolicyViolation.code(),
                    description: outcome.description.unwrap_or_default(),
                    body: data,
                }
            }
            // Some servers reject through the error envelope instead.
            Err(ApiError::PolicyViolation(record)) => record,
            Err(e) => return Err(e),
        };

        tracing::debug!(target: "bbj_core::validate", key, reason = %rejection.description, "value rejected");
        match on_failure {
            None => Ok(false),
            // The raised kind's code wins; the server's object stays in `body`.
            Some(kind) => Err(kind.into_error(ErrorRecord {
                code: kind.code(),
                ..rejection
            })),
        }
    }

    /// `validate` each pair in order. With `on_failure` set, stops at the
    /// first rejection.
    pub fn validate_all<I, K, V>(&self, pairs: I, on_failure: Option<ErrorKind>) -> Result<Vec<bool>, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        pairs
            .into_iter()
            .map(|(key, value)| self.validate(key.as_ref(), &value, on_failure))
            .collect()
    }
}
