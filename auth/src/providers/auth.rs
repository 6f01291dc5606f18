//! Auth provider trait.

use crate::error::Result;
use crate::state::{AuthResponse, AuthSession, Credentials, User};

/// Hosted auth service.
///
/// Implementations keep the current session themselves, so `sign_out`,
/// `get_session` and `get_user` act on whoever signed in last. Servers
/// answering many callers use the `*_with_token` operations, which act only
/// on the access token they are given.
///
/// # Example
///
/// ```ignore
/// let response = auth.sign_in_with_password(&Credentials::new(email, password)).await?;
/// let user = auth.get_user().await?;
/// ```
pub trait AuthProvider: Send + Sync {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`](crate::AuthError::Provider) when the
    /// credentials are rejected, or a transport/decoding error.
    fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthResponse>> + Send;

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`](crate::AuthError::Provider) when the
    /// provider refuses the registration.
    fn sign_up(&self, credentials: &Credentials)
    -> impl Future<Output = Result<AuthResponse>> + Send;

    /// End the current session. Signing out without a session succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the logout.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    /// The current session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    fn get_session(&self) -> impl Future<Output = Result<Option<AuthSession>>> + Send;

    /// The user of the current session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the session token.
    fn get_user(&self) -> impl Future<Output = Result<Option<User>>> + Send;

    /// The user owning `access_token`, or `None` when the provider does not
    /// accept the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached.
    fn get_user_with_token(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Revoke `access_token`. Tokens the provider no longer knows succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the logout.
    fn sign_out_with_token(&self, access_token: &str) -> impl Future<Output = Result<()>> + Send;
}
