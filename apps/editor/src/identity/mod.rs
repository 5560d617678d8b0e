use async_trait::async_trait;
use thiserror::Error;

use crate::models::record::AuthenticatedUser;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Answers "who is signed in". `Ok(None)` means nobody is.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<AuthenticatedUser>, IdentityError>;
}

/// Always reports the same user. Used where identity is resolved up front.
pub struct StaticIdentity(pub Option<AuthenticatedUser>);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<AuthenticatedUser>, IdentityError> {
        Ok(self.0.clone())
    }
}
