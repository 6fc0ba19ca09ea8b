//! Credentials, sessions and the scoped connection guard
//!
//! A `Connection` owns one authenticated session for the duration of one
//! logical operation. It is released explicitly with `release()`; if it is
//! dropped instead (early return, error path) the session is still signed
//! out on a best-effort basis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Server, ServerResult};

/// How to authenticate against the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignInMethod {
    /// Username + password
    #[default]
    UsernamePassword,
    /// Personal access token name + secret
    AccessToken,
}

impl SignInMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignInMethod::UsernamePassword => "username_password",
            SignInMethod::AccessToken => "access_token",
        }
    }
}

impl FromStr for SignInMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "username_password" => Ok(SignInMethod::UsernamePassword),
            "access_token" => Ok(SignInMethod::AccessToken),
            other => Err(format!(
                "invalid sign-in method '{}'. Valid: username_password, access_token",
                other
            )),
        }
    }
}

/// Sign-in credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub method: SignInMethod,
    /// Username, or access token name
    pub name: String,
    /// Password, or access token secret
    pub secret: String,
    /// Site content URL; empty for the default site
    pub site: String,
}

impl Credentials {
    /// Build credentials; a site of `default` (any case) selects the default site
    pub fn new(
        method: SignInMethod,
        name: impl Into<String>,
        secret: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        let site = site.into();
        let site = if site.eq_ignore_ascii_case("default") {
            String::new()
        } else {
            site
        };
        Self {
            method,
            name: name.into(),
            secret: secret.into(),
            site,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("method", &self.method)
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .field("site", &self.site)
            .finish()
    }
}

/// An authenticated session
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Auth token sent with every request
    pub token: String,
    /// Site LUID the session is bound to
    pub site_id: String,
    pub user_id: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("site_id", &self.site_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// A session plus the server it belongs to
pub struct Connection<'a> {
    server: &'a dyn Server,
    session: Session,
    released: bool,
}

impl<'a> Connection<'a> {
    /// Authenticate and wrap the resulting session
    pub fn open(server: &'a dyn Server, credentials: &Credentials) -> ServerResult<Self> {
        tracing::debug!(
            method = credentials.method.as_str(),
            site = %credentials.site,
            "signing in"
        );
        let session = server.connect(credentials)?;
        tracing::info!(site_id = %session.site_id, "signed in");
        Ok(Self {
            server,
            session,
            released: false,
        })
    }

    pub fn server(&self) -> &'a dyn Server {
        self.server
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Sign out and consume the connection
    pub fn release(mut self) -> ServerResult<()> {
        self.released = true;
        let result = self.server.disconnect(&self.session);
        if result.is_ok() {
            tracing::debug!("signed out");
        }
        result
    }
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.server.disconnect(&self.session) {
            tracing::warn!(error = %e, "sign-out on drop failed");
        }
    }
}
