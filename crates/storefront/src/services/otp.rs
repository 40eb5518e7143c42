//! OTP challenge session manager.
//!
//! Owns send/verify/resend state for one-time-passcode challenges used in
//! registration, login, password reset, and profile updates. One session
//! manages one (target, purpose) flow; a view creates it on mount and drops
//! it on unmount.
//!
//! # Challenge lifecycle
//!
//! `Idle -> Sent -> {Verified | Expired}`. A resend while `Sent` supersedes
//! the prior challenge with a fresh one (the old code is dead the moment
//! the new one is issued). `Verified` and `Expired` are terminal for a
//! challenge instance; a new `send_challenge` always starts fresh.
//!
//! # Countdown
//!
//! The countdown ticks once per second on a tokio task and stops at zero.
//! The ticker is cancelled on supersede, on successful verify, and on drop,
//! so no tick can mutate state after the owning view is gone.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use allblackery_core::{ChannelTarget, OtpCode, OtpCodeError, OtpPurpose};

use crate::api::auth::OtpResponse;
use crate::api::{ApiClient, ApiError};

/// Fallback validity window when the server omits `expiresIn`.
const DEFAULT_EXPIRES_IN: u32 = 300;

/// Transport seam for the two OTP endpoints.
///
/// [`ApiClient`] is the production implementation; tests drop in mocks so
/// no test touches the network.
pub trait OtpTransport: Send + Sync {
    fn send_otp(
        &self,
        target: &ChannelTarget,
        purpose: OtpPurpose,
    ) -> impl Future<Output = Result<OtpResponse, ApiError>> + Send;

    fn verify_otp(
        &self,
        target: &ChannelTarget,
        code: &OtpCode,
        purpose: OtpPurpose,
    ) -> impl Future<Output = Result<OtpResponse, ApiError>> + Send;
}

impl OtpTransport for ApiClient {
    async fn send_otp(
        &self,
        target: &ChannelTarget,
        purpose: OtpPurpose,
    ) -> Result<OtpResponse, ApiError> {
        Self::send_otp(self, target, purpose).await
    }

    async fn verify_otp(
        &self,
        target: &ChannelTarget,
        code: &OtpCode,
        purpose: OtpPurpose,
    ) -> Result<OtpResponse, ApiError> {
        Self::verify_otp(self, target, code, purpose).await
    }
}

/// Errors from [`OtpSession::send_challenge`].
#[derive(Debug, Error)]
pub enum OtpSendError {
    /// The request failed or the server refused the target.
    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Errors from [`OtpSession::verify_challenge`].
#[derive(Debug, Error)]
pub enum OtpVerifyError {
    /// The code is not six digits - caught locally, never dispatched.
    #[error("invalid code: {0}")]
    InvalidCode(#[from] OtpCodeError),

    /// Another verification is already in flight for this challenge.
    #[error("verification already in progress")]
    Busy,

    /// Transport failure; the code was not consumed server-side.
    #[error("{0}")]
    Api(ApiError),
}

/// Errors from [`OtpSession::resend_challenge`].
#[derive(Debug, Error)]
pub enum OtpResendError {
    /// The countdown has not reached zero; no request was made.
    #[error("resend available in {remaining} seconds")]
    Cooldown {
        /// Seconds left on the countdown.
        remaining: u32,
    },

    /// The resend itself failed.
    #[error("{0}")]
    Send(#[from] OtpSendError),
}

/// Metadata about an issued challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeMeta {
    /// Seconds until the code expires.
    pub expires_in: u32,
    /// Server acknowledgement message.
    pub message: String,
}

/// Result of a verification attempt that reached the server.
///
/// A wrong or expired code is a value (`verified: false`), not an error -
/// the caller re-presents the message and lets the user try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub verified: bool,
    pub message: String,
}

/// Phase of the current challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePhase {
    /// No challenge issued yet.
    Idle,
    /// A code is out and the countdown is running.
    Sent,
    /// The code was accepted. Terminal.
    Verified,
    /// The countdown reached zero before a successful verify. Terminal.
    Expired,
}

/// OTP challenge session.
///
/// All operations take `&self`; interior state is shared with the countdown
/// ticker task.
pub struct OtpSession<T: OtpTransport> {
    transport: T,
    default_expires_in: u32,
    countdown: Arc<AtomicU32>,
    phase: Arc<Mutex<ChallengePhase>>,
    verify_in_flight: AtomicBool,
    ticker: Mutex<Option<CancellationToken>>,
}

impl<T: OtpTransport> OtpSession<T> {
    /// Create a session with the default 300-second fallback window.
    pub fn new(transport: T) -> Self {
        Self::with_default_expiry(transport, DEFAULT_EXPIRES_IN)
    }

    /// Create a session with a custom fallback window (config-driven).
    pub fn with_default_expiry(transport: T, default_expires_in: u32) -> Self {
        Self {
            transport,
            default_expires_in,
            countdown: Arc::new(AtomicU32::new(0)),
            phase: Arc::new(Mutex::new(ChallengePhase::Idle)),
            verify_in_flight: AtomicBool::new(false),
            ticker: Mutex::new(None),
        }
    }

    /// Issue a new challenge.
    ///
    /// On success the countdown resets to the server-provided window
    /// (default 300s) and any prior challenge is superseded.
    ///
    /// # Errors
    ///
    /// Returns `OtpSendError::Api` on transport failure or server refusal;
    /// the session state is untouched in that case.
    pub async fn send_challenge(
        &self,
        target: &ChannelTarget,
        purpose: OtpPurpose,
    ) -> Result<ChallengeMeta, OtpSendError> {
        let response = self.transport.send_otp(target, purpose).await?;
        let expires_in = response.expires_in.unwrap_or(self.default_expires_in);

        self.start_challenge(expires_in);
        debug!(recipient = %target, purpose = %purpose, expires_in, "OTP challenge issued");

        Ok(ChallengeMeta {
            expires_in,
            message: response.message,
        })
    }

    /// Verify a code against the current challenge.
    ///
    /// The code is validated locally first; anything that is not exactly
    /// six digits never reaches the network. A server-side mismatch
    /// (invalid or expired code) comes back as `Ok` with
    /// `verified: false`.
    ///
    /// # Errors
    ///
    /// - `OtpVerifyError::InvalidCode` - local validation failure
    /// - `OtpVerifyError::Busy` - a verification is already in flight
    /// - `OtpVerifyError::Api` - transport failure
    pub async fn verify_challenge(
        &self,
        target: &ChannelTarget,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<VerifyOutcome, OtpVerifyError> {
        let code = OtpCode::parse(code)?;

        // Single-flight: a second verify while one is pending would race
        // the server over the same code.
        if self
            .verify_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OtpVerifyError::Busy);
        }
        // The flag must clear even if this future is dropped mid-await
        // (view navigated away), or the session stays busy forever.
        let _in_flight = InFlightGuard(&self.verify_in_flight);

        let result = self.transport.verify_otp(target, &code, purpose).await;

        match result {
            Ok(response) => {
                self.finish_challenge(ChallengePhase::Verified);
                debug!(recipient = %target, "OTP verified");
                Ok(VerifyOutcome {
                    verified: true,
                    message: response.message,
                })
            }
            // The server processed the attempt and said no; the challenge
            // stays live for another try.
            Err(ApiError::Rejected(message)) => Ok(VerifyOutcome {
                verified: false,
                message,
            }),
            Err(err) => Err(OtpVerifyError::Api(err)),
        }
    }

    /// Re-issue the challenge once the cooldown has elapsed.
    ///
    /// # Errors
    ///
    /// Returns `OtpResendError::Cooldown` while the countdown is above
    /// zero - no network call is made in that case.
    pub async fn resend_challenge(
        &self,
        target: &ChannelTarget,
        purpose: OtpPurpose,
    ) -> Result<ChallengeMeta, OtpResendError> {
        let remaining = self.countdown.load(Ordering::Acquire);
        if remaining > 0 {
            return Err(OtpResendError::Cooldown { remaining });
        }

        Ok(self.send_challenge(target, purpose).await?)
    }

    /// Seconds left on the current challenge.
    #[must_use]
    pub fn countdown(&self) -> u32 {
        self.countdown.load(Ordering::Acquire)
    }

    /// Whether a resend would be accepted right now.
    #[must_use]
    pub fn can_resend(&self) -> bool {
        self.countdown() == 0
    }

    /// Whether a challenge is currently out.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.phase() == ChallengePhase::Sent
    }

    /// Current challenge phase.
    #[must_use]
    pub fn phase(&self) -> ChallengePhase {
        self.phase
            .lock()
            .map(|guard| *guard)
            .unwrap_or(ChallengePhase::Idle)
    }

    /// Format a countdown as `M:SS` for display.
    #[must_use]
    pub fn format_countdown(seconds: u32) -> String {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    }

    /// Reset state for a fresh challenge and restart the ticker.
    fn start_challenge(&self, expires_in: u32) {
        self.stop_ticker();
        if let Ok(mut phase) = self.phase.lock() {
            *phase = ChallengePhase::Sent;
        }
        self.countdown.store(expires_in, Ordering::Release);

        let cancel = CancellationToken::new();
        // Pin the tick schedule to the moment the challenge was issued, not
        // to whenever the spawned task is first polled; missed ticks then
        // burst-catch-up regardless of scheduling delay.
        let interval = tokio::time::interval_at(
            tokio::time::Instant::now() + Duration::from_secs(1),
            Duration::from_secs(1),
        );
        // Unconstrained: a catch-up burst after clock suspension must drain
        // all missed ticks in one scheduling pass; the loop awaits a full
        // second between ticks otherwise, so it cannot starve the runtime.
        tokio::spawn(tokio::task::unconstrained(run_ticker(
            interval,
            Arc::clone(&self.countdown),
            Arc::clone(&self.phase),
            cancel.clone(),
        )));
        if let Ok(mut ticker) = self.ticker.lock() {
            *ticker = Some(cancel);
        }
    }

    /// Move the current challenge to a terminal phase and stop ticking.
    fn finish_challenge(&self, terminal: ChallengePhase) {
        self.stop_ticker();
        self.countdown.store(0, Ordering::Release);
        if let Ok(mut phase) = self.phase.lock() {
            *phase = terminal;
        }
    }

    fn stop_ticker(&self) {
        if let Ok(mut ticker) = self.ticker.lock()
            && let Some(cancel) = ticker.take()
        {
            cancel.cancel();
        }
    }
}

impl<T: OtpTransport> Drop for OtpSession<T> {
    fn drop(&mut self) {
        // View unmounted; make sure no tick outlives the session.
        self.stop_ticker();
    }
}

/// Clears the verify single-flight flag on drop, including when the
/// owning future is cancelled.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One-second countdown loop. Runs until cancelled or the countdown hits
/// zero; at zero a still-`Sent` challenge becomes `Expired`.
async fn run_ticker(
    mut interval: tokio::time::Interval,
    countdown: Arc<AtomicU32>,
    phase: Arc<Mutex<ChallengePhase>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let remaining = countdown
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1))
                    .map_or(0, |prev| prev.saturating_sub(1));

                if remaining == 0 {
                    if let Ok(mut guard) = phase.lock()
                        && *guard == ChallengePhase::Sent
                    {
                        *guard = ChallengePhase::Expired;
                    }
                    break;
                }
            }
        }
    }
}

/// Digit-by-digit code entry buffer.
///
/// Mirrors the verification dialog's input boxes: digits are pushed one at
/// a time and the completed code pops out exactly once, the instant the
/// sixth digit lands.
#[derive(Debug, Default)]
pub struct DigitBuffer {
    digits: String,
}

impl DigitBuffer {
    /// Empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one digit. Returns the full code exactly when the sixth digit
    /// completes it; non-digits and overflow are ignored.
    pub fn push_digit(&mut self, c: char) -> Option<OtpCode> {
        if !c.is_ascii_digit() || self.digits.len() >= OtpCode::LENGTH {
            return None;
        }
        self.digits.push(c);
        if self.digits.len() == OtpCode::LENGTH {
            OtpCode::parse(&self.digits).ok()
        } else {
            None
        }
    }

    /// Remove the last digit (backspace).
    pub fn pop_digit(&mut self) {
        self.digits.pop();
    }

    /// Replace the buffer from a paste, truncated to six characters.
    /// Returns the code if the paste completed it.
    pub fn paste(&mut self, text: &str) -> Option<OtpCode> {
        self.digits = text
            .chars()
            .filter(char::is_ascii_digit)
            .take(OtpCode::LENGTH)
            .collect();
        if self.digits.len() == OtpCode::LENGTH {
            OtpCode::parse(&self.digits).ok()
        } else {
            None
        }
    }

    /// Current buffer contents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Clear after a failed attempt (the input boxes reset).
    pub fn clear(&mut self) {
        self.digits.clear();
    }
}
