//! Thin typed wrappers over the pipeline, one per endpoint.

use serde_json::{json, Value};

use crate::client::{take_data, take_field, BbjClient, RequestOptions};
use crate::error::ApiError;
use crate::http::Transport;
use crate::types::{Thread, User, UserUpdate, Usermap};

impl<T: Transport> BbjClient<T> {
    /// The user the server sees for this client: the active identity, or the
    /// anonymous user.
    pub fn get_me(&self) -> Result<User, ApiError> {
        let mut response = self.request("get_me", &(), RequestOptions::default())?;
        take_data(&mut response)
    }

    /// All threads, most recently active first, with a usermap covering
    /// their authors.
    ///
    /// ```no_run
    /// # fn main() -> Result<(), bbj_core::ApiError> {
    /// let client = bbj_core::BbjClient::connect(&bbj_core::ClientConfig::default())?;
    /// let (threads, usermap) = client.thread_index()?;
    /// for thread in &threads {
    ///     println!("{} by {}", thread.title, usermap[&thread.author].user_name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn thread_index(&self) -> Result<(Vec<Thread>, Usermap), ApiError> {
        let mut response = self.request("thread_index", &(), RequestOptions::default())?;
        let threads = take_data(&mut response)?;
        Ok((threads, take_usermap(&mut response)?))
    }

    /// One thread with its messages, and a usermap covering every author.
    pub fn thread_load(&self, thread_id: &str) -> Result<(Thread, Usermap), ApiError> {
        let params = json!({ "thread_id": thread_id });
        let mut response = self.request("thread_load", &params, RequestOptions::default())?;
        let thread = take_data(&mut response)?;
        Ok((thread, take_usermap(&mut response)?))
    }

    /// Update the active user's profile and refresh the cached copy.
    pub fn user_update(&mut self, update: &UserUpdate) -> Result<User, ApiError> {
        let mut response = self.request("user_update", update, RequestOptions::default())?;
        let updated: User = take_data(&mut response)?;
        let profile = self.get_me()?;
        self.session.set_profile(profile);
        Ok(updated)
    }

    pub fn user_is_registered(&self, username: &str) -> Result<bool, ApiError> {
        let params = json!({ "target_user": username });
        let mut response = self.request("user_is_registered", &params, RequestOptions::anonymous())?;
        take_data(&mut response)
    }
}

// An absent usermap is read as empty.
fn take_usermap(response: &mut Value) -> Result<Usermap, ApiError> {
    if response.get("usermap").is_none() {
        return Ok(Usermap::new());
    }
    take_field(response, "usermap")
}
