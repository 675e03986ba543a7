//! Implements AuthPort using grammers Client.
//!
//! Holds a client (clone shared with the gateway in main) and tracks where
//! the login flow currently stands, so the port methods can be called in
//! sequence without the caller threading tokens around.

use crate::domain::{DomainError, SignInResult};
use crate::ports::AuthPort;
use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::Client;
use tokio::sync::Mutex;

/// Where the interactive login currently stands.
enum FlowState {
    Idle,
    /// request_login_code succeeded; the token is consumed by sign_in.
    CodeSent(LoginToken),
    /// sign_in demanded 2FA; the token is consumed by check_password.
    PasswordNeeded(PasswordToken),
}

/// Auth adapter. Wraps grammers Client for login/2FA.
pub struct GrammersAuthAdapter {
    client: Client,
    flow: Mutex<FlowState>,
}

impl GrammersAuthAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            flow: Mutex::new(FlowState::Idle),
        }
    }
}

#[async_trait]
impl AuthPort for GrammersAuthAdapter {
    async fn is_authenticated(&self) -> Result<bool, DomainError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| DomainError::Auth(e.to_string()))
    }

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError> {
        let token = self
            .client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| DomainError::Auth(format!("request_login_code: {}", e)))?;
        *self.flow.lock().await = FlowState::CodeSent(token);
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError> {
        let mut flow = self.flow.lock().await;
        let FlowState::CodeSent(token) = std::mem::replace(&mut *flow, FlowState::Idle) else {
            return Err(DomainError::Auth(
                "request_login_code must be called before sign_in".into(),
            ));
        };
        match self.client.sign_in(&token, code).await {
            Ok(_user) => Ok(SignInResult::Success),
            Err(grammers_client::SignInError::PasswordRequired(pt)) => {
                let hint = pt.hint().map(String::from);
                *flow = FlowState::PasswordNeeded(pt);
                Ok(SignInResult::PasswordRequired { hint })
            }
            Err(grammers_client::SignInError::InvalidCode) => Err(DomainError::Auth(
                "Invalid login code. Run again and enter the correct code.".into(),
            )),
            Err(grammers_client::SignInError::SignUpRequired) => Err(DomainError::Auth(
                "Sign-up required. Create an account with the official Telegram app first.".into(),
            )),
            Err(e) => Err(DomainError::Auth(format!("sign in: {}", e))),
        }
    }

    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError> {
        let mut flow = self.flow.lock().await;
        let FlowState::PasswordNeeded(token) = std::mem::replace(&mut *flow, FlowState::Idle)
        else {
            return Err(DomainError::Auth(
                "sign_in must return PasswordRequired before check_password".into(),
            ));
        };
        self.client
            .check_password(token, password)
            .await
            .map_err(|e| DomainError::Auth(format!("check_password: {}", e)))?;
        Ok(())
    }
}
