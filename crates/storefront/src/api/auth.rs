//! Authentication endpoints: registration, login, Google sign-in, password
//! reset, and OTP challenges.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use allblackery_core::{ChannelTarget, Email, OtpCode, OtpPurpose, UserId};

use super::types::User;
use super::{ApiClient, ApiEnvelope, ApiError};

/// An authenticated session as returned by login and Google sign-in.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: SecretString,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSessionWire {
    user: User,
    access_token: String,
    token_type: String,
}

impl From<AuthSessionWire> for AuthSession {
    fn from(wire: AuthSessionWire) -> Self {
        Self {
            user: wire.user,
            access_token: SecretString::from(wire.access_token),
            token_type: wire.token_type,
        }
    }
}

/// Payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub email: Email,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredUser {
    user_id: UserId,
}

/// Payload for `POST /auth/reset-password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordPayload {
    pub email: Email,
    pub otp: OtpCode,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
struct OtpRequestWire<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(rename = "type")]
    channel_type: &'static str,
    purpose: OtpPurpose,
}

impl<'a> OtpRequestWire<'a> {
    fn new(target: &'a ChannelTarget, purpose: OtpPurpose) -> Self {
        let (email, phone) = match target {
            ChannelTarget::Email(email) => (Some(email.as_str()), None),
            ChannelTarget::Phone(phone) => (None, Some(phone.as_str())),
        };
        Self {
            email,
            phone,
            channel_type: target.channel_type(),
            purpose,
        }
    }
}

#[derive(Debug, Serialize)]
struct OtpVerifyWire<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    otp: &'a str,
    purpose: OtpPurpose,
}

/// Flat response body shared by the OTP endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    /// Seconds until the challenge expires (send only).
    #[serde(default)]
    pub expires_in: Option<u32>,
}

impl ApiClient {
    /// Register a new account. The backend mails an OTP challenge; the
    /// account stays unverified until [`Self::verify_otp`] succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the email is already registered.
    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn register(&self, payload: &RegisterPayload) -> Result<UserId, ApiError> {
        let envelope: ApiEnvelope<RegisteredUser> =
            self.post_json("auth/register", payload).await?;
        Ok(envelope.into_result()?.user_id)
    }

    /// Login with email and password.
    ///
    /// On success the caller owns the session; installing the token on this
    /// client is the session store's job, not this method's.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` on wrong credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<AuthSession, ApiError> {
        #[derive(Serialize)]
        struct Payload<'a> {
            email: &'a str,
            password: &'a str,
        }

        let envelope: ApiEnvelope<AuthSessionWire> = self
            .post_json(
                "auth/login",
                &Payload {
                    email: email.as_str(),
                    password,
                },
            )
            .await?;
        Ok(envelope.into_result()?.into())
    }

    /// Exchange a Google ID token for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    #[instrument(skip(self, id_token))]
    pub async fn google_sign_in(&self, id_token: &str) -> Result<AuthSession, ApiError> {
        #[derive(Serialize)]
        struct Payload<'a> {
            token: &'a str,
        }

        let envelope: ApiEnvelope<AuthSessionWire> = self
            .post_json("auth/google", &Payload { token: id_token })
            .await?;
        Ok(envelope.into_result()?.into())
    }

    /// Request a password-reset challenge for an email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. The backend answers success
    /// even for unknown addresses, so no account-existence oracle here.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &Email) -> Result<String, ApiError> {
        #[derive(Serialize)]
        struct Payload<'a> {
            email: &'a str,
        }

        let envelope: ApiEnvelope<serde_json::Value> = self
            .post_json(
                "auth/forgot-password",
                &Payload {
                    email: email.as_str(),
                },
            )
            .await?;
        envelope.into_ack()
    }

    /// Complete a password reset with the emailed OTP.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` on a wrong or expired code.
    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn reset_password(&self, payload: &ResetPasswordPayload) -> Result<String, ApiError> {
        let envelope: ApiEnvelope<serde_json::Value> =
            self.post_json("auth/reset-password", payload).await?;
        envelope.into_ack()
    }

    /// Ask the backend to issue an OTP challenge.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the server refuses the target and
    /// transport errors otherwise.
    #[instrument(skip(self), fields(recipient = %target, purpose = %purpose))]
    pub async fn send_otp(
        &self,
        target: &ChannelTarget,
        purpose: OtpPurpose,
    ) -> Result<OtpResponse, ApiError> {
        let response: OtpResponse = self
            .post_json_flat("auth/send-otp", &OtpRequestWire::new(target, purpose))
            .await?;
        if !response.success {
            return Err(ApiError::Rejected(response.message));
        }
        Ok(response)
    }

    /// Submit an OTP code for verification.
    ///
    /// A wrong or expired code surfaces as `ApiError::Rejected` with the
    /// server's message; callers that want a non-error mismatch value map it
    /// (the OTP session manager does).
    ///
    /// # Errors
    ///
    /// `ApiError::Rejected` on mismatch, `ApiError::Http` on transport
    /// failure.
    #[instrument(skip(self, code), fields(recipient = %target, purpose = %purpose))]
    pub async fn verify_otp(
        &self,
        target: &ChannelTarget,
        code: &OtpCode,
        purpose: OtpPurpose,
    ) -> Result<OtpResponse, ApiError> {
        let (email, phone) = match target {
            ChannelTarget::Email(email) => (Some(email.as_str()), None),
            ChannelTarget::Phone(phone) => (None, Some(phone.as_str())),
        };

        let response: OtpResponse = self
            .post_json_flat(
                "auth/verify-otp",
                &OtpVerifyWire {
                    email,
                    phone,
                    otp: code.as_str(),
                    purpose,
                },
            )
            .await?;
        if !response.success {
            return Err(ApiError::Rejected(response.message));
        }
        Ok(response)
    }

    /// Fetch the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a valid bearer token.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let envelope: ApiEnvelope<User> = self.get_json("users/me").await?;
        envelope.into_result()
    }
}
