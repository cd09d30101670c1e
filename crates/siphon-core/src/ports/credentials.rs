//! Credential provider port (driven/secondary port)
//!
//! Supplies the username/password pair used for HTTP basic authentication
//! against the management console.

use std::fmt;

/// Basic-auth credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API user name
    pub username: String,
    /// API user password
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs and panics.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Port trait for credential lookup
pub trait ICredentialProvider: Send + Sync {
    /// Returns the credentials to authenticate with
    fn credentials(&self) -> anyhow::Result<Credentials>;
}
