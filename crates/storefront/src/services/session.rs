//! Authenticated session store.
//!
//! Owns the current login: on success it installs the bearer token on the
//! shared [`ApiClient`] so every subsequent request is authenticated, and
//! logout tears both down together. The token itself never leaves the
//! [`AuthSession`]; callers only see the [`User`] profile.

use std::sync::RwLock;

use tracing::{debug, instrument};

use allblackery_core::Email;

use crate::api::types::User;
use crate::api::{ApiClient, ApiError, AuthSession};

/// Holds the logged-in user, if any, and keeps the API client's bearer
/// token in sync with it.
pub struct SessionStore {
    api: ApiClient,
    session: RwLock<Option<AuthSession>>,
}

impl SessionStore {
    /// Create an empty store bound to an API client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            session: RwLock::new(None),
        }
    }

    /// Login with email and password and install the session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` on wrong credentials; the store is
    /// left untouched on any failure.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<User, ApiError> {
        let session = self.api.login(email, password).await?;
        Ok(self.install(session))
    }

    /// Login via a Google ID token and install the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    #[instrument(skip_all)]
    pub async fn login_with_google(&self, id_token: &str) -> Result<User, ApiError> {
        let session = self.api.google_sign_in(id_token).await?;
        Ok(self.install(session))
    }

    /// Drop the session and the client's bearer token.
    pub fn logout(&self) {
        self.api.clear_bearer_token();
        if let Ok(mut guard) = self.session.write() {
            *guard = None;
        }
        debug!("session cleared");
    }

    /// The logged-in user's profile, if any.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.session
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|session| session.user.clone()))
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn install(&self, session: AuthSession) -> User {
        self.api.set_bearer_token(session.access_token.clone());
        let user = session.user.clone();
        if let Ok(mut guard) = self.session.write() {
            *guard = Some(session);
        }
        debug!(user_id = %user.id, "session installed");
        user
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use chrono::Utc;
    use secrecy::SecretString;
    use url::Url;

    use allblackery_core::{CurrencyCode, UserId};

    use crate::config::StorefrontConfig;

    fn test_client() -> ApiClient {
        let config = StorefrontConfig {
            api_base_url: Url::parse("http://localhost:8000/api/").unwrap(),
            api_timeout: std::time::Duration::from_secs(10),
            stripe_publishable_key: "pk_test_abc".to_string(),
            currency: CurrencyCode::Usd,
            otp_expiry_secs: 300,
        };
        ApiClient::new(&config).unwrap()
    }

    fn test_session() -> AuthSession {
        AuthSession {
            user: User {
                id: UserId::new("usr_1"),
                email: "user@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                avatar: None,
                role: "user".to_string(),
                is_verified: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            access_token: SecretString::from("jwt-token"),
            token_type: "bearer".to_string(),
        }
    }

    #[test]
    fn test_install_sets_token_and_user() {
        let api = test_client();
        let store = SessionStore::new(api.clone());
        assert!(!store.is_authenticated());
        assert!(!api.has_bearer_token());

        let user = store.install(test_session());
        assert_eq!(user.id, UserId::new("usr_1"));
        assert!(store.is_authenticated());
        assert!(api.has_bearer_token());
        assert_eq!(store.user().unwrap().first_name, "Ada");
    }

    #[test]
    fn test_logout_clears_both() {
        let api = test_client();
        let store = SessionStore::new(api.clone());
        store.install(test_session());

        store.logout();
        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
        assert!(!api.has_bearer_token());
    }
}
