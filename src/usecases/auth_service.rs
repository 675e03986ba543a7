//! Handle Login / 2FA flow. Delegates to the auth adapter.
//!
//! Prompts run through inquire; an already-authorized stored session skips
//! the whole flow.

use crate::domain::{DomainError, SignInResult};
use crate::ports::AuthPort;
use inquire::{Password, Text};
use std::sync::Arc;
use tracing::info;

pub struct AuthService {
    auth: Arc<dyn AuthPort>,
    api_hash: String,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthPort>, api_hash: String) -> Self {
        Self { auth, api_hash }
    }

    /// Run the full flow: phone -> code -> 2FA password when required.
    /// Returns when authenticated.
    pub async fn run_auth_flow(&self) -> Result<(), DomainError> {
        if self.auth.is_authenticated().await? {
            info!("session already authorized");
            return Ok(());
        }

        let phone = Text::new("Phone number (international format):")
            .prompt()
            .map_err(|e| DomainError::Auth(e.to_string()))?;
        self.auth
            .request_login_code(phone.trim(), &self.api_hash)
            .await?;

        let code = Text::new("Login code:")
            .prompt()
            .map_err(|e| DomainError::Auth(e.to_string()))?;

        match self.auth.sign_in(code.trim()).await? {
            SignInResult::Success => info!("signed in"),
            SignInResult::PasswordRequired { hint } => {
                let prompt = match hint.as_deref() {
                    Some(h) if !h.is_empty() => format!("2FA password (hint: {h}):"),
                    _ => "2FA password:".to_string(),
                };
                let password = Password::new(&prompt)
                    .without_confirmation()
                    .prompt()
                    .map_err(|e| DomainError::Auth(e.to_string()))?;
                self.auth.check_password(password.as_bytes()).await?;
                info!("signed in with 2FA");
            }
        }
        Ok(())
    }
}
