//! Workflow services.
//!
//! The collaborating units behind the storefront's stateful flows:
//!
//! - [`otp`] - send/verify/resend/countdown state for OTP challenges
//! - [`checkout`] - step progression and order summary for checkout
//! - [`payment`] - client-side payment confirmation against the SDK
//! - [`session`] - process-wide auth session with explicit transitions
//!
//! Each service is independent and instantiated per view; none of them
//! shares mutable state with another.

pub mod checkout;
pub mod otp;
pub mod payment;
pub mod session;
