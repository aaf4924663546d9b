//! Holder of the single upstream credential.

use std::sync::Arc;

use tracing::{debug, info};

use crate::model::Credential;
use crate::ports::{AuthError, LoginPort};

/// Owns the current credential and logs in again once it was invalidated.
///
/// The upstream advertises no token lifetime, so a credential is kept until a
/// request made with it fails.
pub struct CredentialManager {
    login_port: Arc<dyn LoginPort>,
    current: Option<Credential>,
}

impl CredentialManager {
    /// Create a manager that logs in through `login_port`.
    #[must_use]
    pub fn new(login_port: Arc<dyn LoginPort>) -> Self {
        Self {
            login_port,
            current: None,
        }
    }

    /// Return the held credential, logging in first if none is held.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when the login fails; nothing is stored then.
    pub async fn acquire(&mut self) -> Result<Credential, AuthError> {
        if let Some(credential) = &self.current {
            return Ok(credential.clone());
        }

        debug!("logging in to upstream");
        let credential = self.login_port.login().await?;
        info!("obtained upstream credential");
        self.current = Some(credential.clone());
        Ok(credential)
    }

    /// Drop the held credential so the next [`acquire`](Self::acquire) logs in.
    pub fn invalidate(&mut self) {
        if self.current.take().is_some() {
            debug!("upstream credential cleared");
        }
    }

    /// Whether a credential is currently held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.current.is_some()
    }
}
